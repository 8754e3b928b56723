//! Background proxy pool refresh
//!
//! Keeps the aggregator warm so request handlers rarely pay for a
//! fan-out. The first refresh runs immediately on startup.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, info, instrument, warn};

use crate::proxy::ProxyAggregator;

/// Pool refresh service configuration
#[derive(Clone)]
pub struct PoolRefreshConfig {
    /// Time between forced refreshes
    pub interval: Duration,
}

impl Default for PoolRefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(240),
        }
    }
}

/// Pool refresh service
pub struct PoolRefreshService {
    aggregator: Arc<ProxyAggregator>,
    config: PoolRefreshConfig,
}

impl PoolRefreshService {
    pub fn new(aggregator: Arc<ProxyAggregator>, config: PoolRefreshConfig) -> Self {
        Self { aggregator, config }
    }

    /// Run until the shutdown channel flips to `true`
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting proxy pool refresh service (every {}s, sources: {:?})",
            self.config.interval.as_secs(),
            self.aggregator.source_names()
        );

        let mut ticker = interval(self.config.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let pool = self.aggregator.refresh().await;
                    if pool.is_empty() {
                        warn!("Proxy pool is empty after refresh");
                    } else {
                        debug!(count = pool.len(), "Proxy pool refreshed in background");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Proxy pool refresh service shutting down");
                        break;
                    }
                }
            }
        }
    }
}
