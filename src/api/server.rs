//! API server using Axum

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::config::ApiServerConfig;
use crate::error::{RelayError, Result};
use crate::proxy::{ProxyAggregator, TranslationDispatcher};
use crate::repository::StatsSink;

use super::middleware::{cors_layer, RequestLogging};
use super::routes;

/// Shared state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub api_token: Arc<str>,
    pub aggregator: Arc<ProxyAggregator>,
    pub dispatcher: Arc<TranslationDispatcher>,
    pub stats: Arc<dyn StatsSink>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        api_token: &str,
        aggregator: Arc<ProxyAggregator>,
        dispatcher: Arc<TranslationDispatcher>,
        stats: Arc<dyn StatsSink>,
    ) -> Self {
        Self {
            api_token: Arc::from(api_token),
            aggregator,
            dispatcher,
            stats,
            started_at: Instant::now(),
        }
    }
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Build the router with every layer applied
    pub fn build_router(&self) -> Router {
        routes::create_router(self.state.clone()).layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&self.config.cors_origins))
                .layer(axum::middleware::from_fn(RequestLogging::log_request)),
        )
    }

    /// Run the API server
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|_| {
                RelayError::InvalidConfig(format!(
                    "Invalid API server address {}:{}",
                    self.config.host, self.config.port
                ))
            })?;

        let router = self.build_router();

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server listening on {}", addr);

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await
        .map_err(|e| RelayError::Internal(e.to_string()))?;

        info!("API server shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sqlx::sqlite::SqlitePoolOptions;
    use tower::ServiceExt;

    use crate::proxy::{DispatcherConfig, DEFAULT_CACHE_TTL};
    use crate::repository::StatsRepository;
    use crate::translate::GoogleTranslator;

    async fn server(cors_origins: Vec<String>) -> ApiServer {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        let aggregator = Arc::new(ProxyAggregator::new(Vec::new(), DEFAULT_CACHE_TTL));
        let dispatcher = Arc::new(TranslationDispatcher::new(
            Arc::new(GoogleTranslator::default()),
            DispatcherConfig::default(),
        ));
        let state = AppState::new(
            "token",
            aggregator,
            dispatcher,
            Arc::new(StatsRepository::new(pool)),
        );

        ApiServer::new(
            ApiServerConfig {
                port: 0,
                host: "127.0.0.1".to_string(),
                api_token: "token".to_string(),
                cors_origins,
            },
            state,
        )
    }

    #[tokio::test]
    async fn test_router_layers_serve_health() {
        let router = server(vec!["https://app.example".to_string()]).await.build_router();

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("Origin", "https://app.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "https://app.example"
        );
    }

    #[tokio::test]
    async fn test_run_rejects_bad_address() {
        let mut server = server(Vec::new()).await;
        server.config.host = "not an address".to_string();

        let (_tx, rx) = watch::channel(false);
        let err = server.run(rx).await.unwrap_err();
        assert!(matches!(err, RelayError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let server = server(Vec::new()).await;
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(async move { server.run(rx).await });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        assert!(task.await.unwrap().is_ok());
    }
}
