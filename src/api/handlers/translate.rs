//! Translation endpoint

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::api::middleware::BearerAuth;
use crate::api::server::AppState;
use crate::error::RelayError;
use crate::models::{Outcome, StatsEntry, TranslateRequest, TranslationResult};

/// Exhausted dispatch plus a readable summary
#[derive(Serialize)]
struct FailedTranslation {
    #[serde(flatten)]
    result: TranslationResult,
    message: String,
}

/// Translate through the proxy pool and record the outcome.
///
/// A body that is missing or not JSON is treated like one with empty fields.
pub async fn translate(
    State(state): State<AppState>,
    _auth: BearerAuth,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    body: Option<Json<TranslateRequest>>,
) -> Result<Response, RelayError> {
    let Json(req) = body.unwrap_or_default();
    if req.text.is_empty() || req.lang.is_empty() {
        return Err(RelayError::InvalidRequest("Missing fields".to_string()));
    }

    let pool = state.aggregator.fetch_proxies().await;
    let result = state.dispatcher.dispatch(&req.text, &req.lang, &pool).await;

    state.stats.record(StatsEntry {
        ip: connect_info
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        language: req.lang,
        characters: req.text.chars().count() as i64,
        outcome: Outcome::from_success(result.success),
    });

    if result.success {
        return Ok((StatusCode::OK, Json(result)).into_response());
    }

    let message = result.failure_summary().unwrap_or_default();
    Ok((
        StatusCode::BAD_GATEWAY,
        Json(FailedTranslation { result, message }),
    )
        .into_response())
}
