//! CORS configuration for the public API
//!
//! Callers authenticate with a bearer header, never cookies, so credentials
//! are not allowed and `*` is accepted as a wildcard.

use axum::http::header;
use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{debug, warn};

/// Create a CORS layer for the configured origins.
///
/// An empty list sends no CORS headers at all, so only same-origin callers
/// can use the API from a browser.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);

    if allowed_origins.iter().any(|o| o == "*") {
        debug!("CORS: allowing any origin");
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("CORS: ignoring invalid origin {:?}", o);
                None
            }
        })
        .collect();

    debug!("CORS: allowing origins: {:?}", origins);
    base.allow_origin(AllowOrigin::list(origins))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use tower::ServiceExt;

    async fn allow_origin_header(origins: &[String], origin: &str) -> Option<String> {
        let app = axum::Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(cors_layer(origins));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("Origin", origin)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        response
            .headers()
            .get("access-control-allow-origin")
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn test_cors_empty_origins_sends_no_header() {
        assert!(allow_origin_header(&[], "https://example.com").await.is_none());
    }

    #[tokio::test]
    async fn test_cors_wildcard() {
        let origins = vec!["*".to_string()];
        assert_eq!(
            allow_origin_header(&origins, "https://anything.example").await.as_deref(),
            Some("*")
        );
    }

    #[tokio::test]
    async fn test_cors_list_allows_only_configured() {
        let origins = vec![
            "https://example.com".to_string(),
            "https://app.example.com".to_string(),
        ];

        assert_eq!(
            allow_origin_header(&origins, "https://app.example.com").await.as_deref(),
            Some("https://app.example.com")
        );
        assert!(allow_origin_header(&origins, "https://evil.example").await.is_none());
    }
}
