//! Proxy pool listing

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::api::middleware::BearerAuth;
use crate::api::server::AppState;

/// Current aggregated pool, refreshed first if the cache has expired
pub async fn list_proxies(State(state): State<AppState>, _auth: BearerAuth) -> impl IntoResponse {
    let pool = state.aggregator.fetch_proxies().await;
    Json(json!({ "success": true, "data": pool }))
}
