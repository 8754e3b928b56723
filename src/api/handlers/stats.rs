//! Request statistics

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::api::middleware::BearerAuth;
use crate::api::server::AppState;

pub async fn get_stats(State(state): State<AppState>, _auth: BearerAuth) -> Response {
    match state.stats.summary().await {
        Ok(report) => Json(json!({
            "success": true,
            "globalStats": report.global_stats,
            "perLanguageStats": report.per_language_stats,
            "perIpStats": report.per_ip_stats,
        }))
        .into_response(),
        Err(e) => {
            error!("Error fetching stats: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": "Failed to retrieve stats" })),
            )
                .into_response()
        }
    }
}
