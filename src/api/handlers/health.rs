//! Health check endpoint

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::api::server::AppState;

/// Liveness plus a glance at the cached pool. Never touches the network.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "lingua-relay",
            "uptimeSecs": state.started_at.elapsed().as_secs(),
            "cachedProxies": state.aggregator.snapshot().len(),
            "poolRefreshedAt": state.aggregator.last_refreshed().map(|t| t.to_rfc3339()),
            "sources": state.aggregator.source_names(),
        })),
    )
}
