//! Proxy source plugins
//!
//! Each source turns one public proxy list into [`ProxyRecord`]s. Sources
//! apply their own quality filter and never fail outward: any network or
//! parse problem is logged and yields an empty list.

mod free_proxy_list;
mod proxifly;
mod proxy_free_only;
mod spys_one;

pub use free_proxy_list::FreeProxyListSource;
pub use proxifly::ProxiflySource;
pub use proxy_free_only::ProxyFreeOnlySource;
pub use spys_one::SpysOneSource;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{RelayError, Result};
use crate::models::ProxyRecord;

/// Free-form per-call options handed to a source (page size, limits, ...)
pub type SourceOptions = serde_json::Map<String, Value>;

/// Identifiers accepted in `RELAY_PROXY_SOURCES`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Proxifly,
    FreeProxyList,
    SpysOne,
    ProxyFreeOnly,
}

impl SourceKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "proxifly" => Some(Self::Proxifly),
            "free_proxy_list" | "free-proxy-list" | "freeproxylist" | "scrape" => {
                Some(Self::FreeProxyList)
            }
            "spys_one" | "spys-one" | "spysone" | "spys" => Some(Self::SpysOne),
            "proxy_free_only" | "proxy-free-only" | "proxyfreeonly" => Some(Self::ProxyFreeOnly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proxifly => "proxifly",
            Self::FreeProxyList => "free_proxy_list",
            Self::SpysOne => "spys_one",
            Self::ProxyFreeOnly => "proxy_free_only",
        }
    }
}

/// Uniform contract for proxy list providers
#[async_trait]
pub trait ProxySource: Send + Sync {
    /// Stable identifier, also stamped on every record as `source`
    fn name(&self) -> &'static str;

    /// Fetch and filter the provider's list. May fail.
    async fn try_fetch(&self, options: &SourceOptions) -> Result<Vec<ProxyRecord>>;

    /// Fetch the provider's list, swallowing every error into an empty list.
    async fn fetch_proxies(&self, options: &SourceOptions) -> Vec<ProxyRecord> {
        match self.try_fetch(options).await {
            Ok(proxies) => {
                debug!(source = self.name(), count = proxies.len(), "Fetched proxies");
                proxies
            }
            Err(e) => {
                warn!(source = self.name(), error = %e, "Error fetching proxies");
                Vec::new()
            }
        }
    }
}

/// Create a proxy source for the given identifier
pub fn create_source(kind: SourceKind, client: reqwest::Client) -> Arc<dyn ProxySource> {
    match kind {
        SourceKind::Proxifly => Arc::new(ProxiflySource::new(client)),
        SourceKind::FreeProxyList => Arc::new(FreeProxyListSource::new(client)),
        SourceKind::SpysOne => Arc::new(SpysOneSource::new(client)),
        SourceKind::ProxyFreeOnly => Arc::new(ProxyFreeOnlySource::new(client)),
    }
}

/// Create every source in `kinds`, preserving order
pub fn create_sources(kinds: &[SourceKind], client: reqwest::Client) -> Vec<Arc<dyn ProxySource>> {
    kinds
        .iter()
        .map(|kind| create_source(*kind, client.clone()))
        .collect()
}

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// HTTP client shared by all sources
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(5)))
        .user_agent(random_user_agent())
        .build()
        .map_err(|e| RelayError::Http(format!("Failed to build source HTTP client: {}", e)))
}

/// GET `url` and return the body, failing on non-2xx statuses
async fn get_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.text().await?)
}

/// Proxy lists disagree on whether ports are numbers or strings.
fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(n) => Ok(n),
        Port::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProxyProtocol;

    struct FailingSource;

    #[async_trait]
    impl ProxySource for FailingSource {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn try_fetch(&self, _options: &SourceOptions) -> Result<Vec<ProxyRecord>> {
            Err(RelayError::Http("connection refused".to_string()))
        }
    }

    struct FixedSource;

    #[async_trait]
    impl ProxySource for FixedSource {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn try_fetch(&self, _options: &SourceOptions) -> Result<Vec<ProxyRecord>> {
            Ok(vec![ProxyRecord::new("10.0.0.1", 80, ProxyProtocol::Http, "fixed")])
        }
    }

    #[test]
    fn test_source_kind_from_str() {
        assert_eq!(SourceKind::from_str("proxifly"), Some(SourceKind::Proxifly));
        assert_eq!(
            SourceKind::from_str("Free-Proxy-List"),
            Some(SourceKind::FreeProxyList)
        );
        assert_eq!(SourceKind::from_str("spys"), Some(SourceKind::SpysOne));
        assert_eq!(
            SourceKind::from_str("proxyfreeonly"),
            Some(SourceKind::ProxyFreeOnly)
        );
        assert_eq!(SourceKind::from_str("unknown"), None);
    }

    #[test]
    fn test_create_sources_preserves_order_and_names() {
        let client = reqwest::Client::new();
        let kinds = [
            SourceKind::SpysOne,
            SourceKind::Proxifly,
            SourceKind::ProxyFreeOnly,
            SourceKind::FreeProxyList,
        ];
        let names: Vec<&str> = create_sources(&kinds, client)
            .iter()
            .map(|s| s.name())
            .collect();

        assert_eq!(
            names,
            vec!["spys_one", "proxifly", "proxy_free_only", "free_proxy_list"]
        );
        for kind in kinds {
            assert_eq!(SourceKind::from_str(kind.as_str()), Some(kind));
        }
    }

    #[tokio::test]
    async fn test_fetch_proxies_swallows_errors() {
        let proxies = FailingSource.fetch_proxies(&SourceOptions::new()).await;
        assert!(proxies.is_empty());
    }

    #[test]
    fn test_fetch_proxies_passes_results_through() {
        let proxies = tokio_test::block_on(FixedSource.fetch_proxies(&SourceOptions::new()));
        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies[0].source(), "fixed");
    }

    #[test]
    fn test_deserialize_port_accepts_numbers_and_strings() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(deserialize_with = "deserialize_port")]
            port: u16,
        }

        let a: Row = serde_json::from_str(r#"{"port": 8080}"#).unwrap();
        let b: Row = serde_json::from_str(r#"{"port": " 3128 "}"#).unwrap();
        assert_eq!(a.port, 8080);
        assert_eq!(b.port, 3128);
        assert!(serde_json::from_str::<Row>(r#"{"port": "http"}"#).is_err());
    }
}
