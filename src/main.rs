//! Lingua Relay - Entry Point
//!
//! Starts the translation API with graceful shutdown support.

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lingua_relay::api::{ApiServer, AppState};
use lingua_relay::config::{Config, LogConfig};
use lingua_relay::database::Database;
use lingua_relay::proxy::{DispatcherConfig, ProxyAggregator, TranslationDispatcher};
use lingua_relay::repository::{StatsRepository, StatsSink};
use lingua_relay::services::{PoolRefreshConfig, PoolRefreshService};
use lingua_relay::sources::{build_http_client, create_sources};
use lingua_relay::translate::{GoogleTranslator, Translator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config.log);

    info!("Starting Lingua Relay");

    // Stats database
    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to stats database")?;
    db.run_migrations().await.context("Failed to run migrations")?;
    let stats: Arc<dyn StatsSink> = Arc::new(StatsRepository::new(db.pool().clone()));

    // Proxy sources and aggregator
    let source_client = build_http_client(config.sources.fetch_timeout())?;
    let sources = create_sources(&config.sources.enabled, source_client);
    let aggregator = Arc::new(ProxyAggregator::new(sources, config.sources.cache_ttl()));
    info!("Enabled proxy sources: {:?}", aggregator.source_names());

    // Upstream translator and dispatcher
    let translator: Arc<dyn Translator> = Arc::new(GoogleTranslator::new(
        config.dispatch.translate_endpoint.clone(),
        config.dispatch.attempt_timeout(),
    )?);
    let dispatcher_config = DispatcherConfig::from(&config.dispatch);
    info!(
        "Dispatcher: max {} proxy attempts, {:?} per attempt, direct attempt {}",
        dispatcher_config.max_retries,
        dispatcher_config.attempt_timeout,
        if dispatcher_config.direct_attempt { "on" } else { "off" }
    );
    let dispatcher = Arc::new(TranslationDispatcher::new(translator, dispatcher_config));

    let (shutdown_tx, _) = watch::channel(false);

    // Optional background pool refresh
    let refresh_task = config.sources.prefetch_interval().map(|interval| {
        let service = PoolRefreshService::new(aggregator.clone(), PoolRefreshConfig { interval });
        let refresh_shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move {
            service.run(refresh_shutdown).await;
        })
    });

    // API server
    let state = AppState::new(&config.api.api_token, aggregator, dispatcher, stats);
    let api_server = ApiServer::new(config.api.clone(), state);
    let api_shutdown = shutdown_tx.subscribe();
    let api_task = tokio::spawn(async move {
        if let Err(e) = api_server.run(api_shutdown).await {
            error!("API server error: {}", e);
        }
    });

    info!("API listening on {}", config.api_addr());

    shutdown_signal().await;
    info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);

    let _ = api_task.await;
    if let Some(task) = refresh_task {
        let _ = task.await;
    }
    db.close().await;

    info!("Lingua Relay stopped");
    Ok(())
}

/// JSON or human-readable output, filtered by `RUST_LOG` or `LOG_LEVEL`
fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("lingua_relay={},tower_http={}", log.level, log.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if log.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
