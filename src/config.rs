use crate::error::{RelayError, Result};
use crate::sources::SourceKind;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiServerConfig,
    /// Proxy source aggregation
    pub sources: SourcesConfig,
    /// Translation dispatch
    pub dispatch: DispatchConfig,
    /// Stats database configuration
    pub database: DatabaseConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port for the API server (default: 3000)
    pub port: u16,
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// Bearer token required on /v1 routes
    pub api_token: String,
    /// Allowed CORS origins (comma-separated, `*` for any, empty = no CORS headers)
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SourcesConfig {
    /// Enabled proxy sources, in registration order
    pub enabled: Vec<SourceKind>,
    /// How long an aggregated pool stays fresh, in seconds
    pub cache_ttl_secs: u64,
    /// Per-source HTTP timeout, in seconds
    pub fetch_timeout_secs: u64,
    /// Background refresh period in seconds, 0 disables it
    pub prefetch_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Upper bound on proxy attempts per translation
    pub max_retries: usize,
    /// Per-attempt timeout in milliseconds
    pub attempt_timeout_ms: u64,
    /// Try the upstream once without a proxy before walking the pool
    pub direct_attempt: bool,
    /// Upstream translation endpoint
    pub translate_endpoint: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// sqlx connection URL for the stats database
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

pub const DEFAULT_TRANSLATE_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            api: ApiServerConfig {
                port: get_env_or("API_PORT", "3000").parse().map_err(|_| {
                    RelayError::InvalidConfig("API_PORT must be a valid port number".into())
                })?,
                host: get_env_or("API_HOST", "0.0.0.0"),
                api_token: get_env_or("API_TOKEN", "you-are-lucky"),
                cors_origins: split_list(&get_env_or("CORS_ORIGINS", "")),
            },
            sources: SourcesConfig {
                enabled: parse_sources(&get_env_or(
                    "RELAY_PROXY_SOURCES",
                    "proxifly,free_proxy_list",
                ))?,
                cache_ttl_secs: get_env_or("RELAY_CACHE_TTL_SECS", "300")
                    .parse()
                    .map_err(|_| {
                        RelayError::InvalidConfig(
                            "RELAY_CACHE_TTL_SECS must be a number of seconds".into(),
                        )
                    })?,
                fetch_timeout_secs: get_env_or("RELAY_SOURCE_TIMEOUT_SECS", "10")
                    .parse()
                    .unwrap_or(10),
                prefetch_interval_secs: get_env_or("RELAY_PREFETCH_INTERVAL_SECS", "0")
                    .parse()
                    .unwrap_or(0),
            },
            dispatch: DispatchConfig {
                max_retries: get_env_or("RELAY_MAX_RETRIES", "15")
                    .parse()
                    .map_err(|_| {
                        RelayError::InvalidConfig("RELAY_MAX_RETRIES must be a valid number".into())
                    })?,
                attempt_timeout_ms: get_env_or("RELAY_ATTEMPT_TIMEOUT_MS", "3000")
                    .parse()
                    .map_err(|_| {
                        RelayError::InvalidConfig(
                            "RELAY_ATTEMPT_TIMEOUT_MS must be a number of milliseconds".into(),
                        )
                    })?,
                direct_attempt: get_env_or("RELAY_DIRECT_ATTEMPT", "false")
                    .parse()
                    .unwrap_or(false),
                translate_endpoint: parse_endpoint(&get_env_or(
                    "TRANSLATE_ENDPOINT",
                    DEFAULT_TRANSLATE_ENDPOINT,
                ))?,
            },
            database: DatabaseConfig {
                url: get_env_or("DATABASE_URL", "sqlite://data/stats.db?mode=rwc"),
                max_connections: get_env_or("DB_MAX_CONNECTIONS", "5").parse().map_err(|_| {
                    RelayError::InvalidConfig("DB_MAX_CONNECTIONS must be a valid number".into())
                })?,
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "pretty"),
            },
        })
    }

    /// Get the API server address
    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

impl SourcesConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn prefetch_interval(&self) -> Option<Duration> {
        (self.prefetch_interval_secs > 0).then(|| Duration::from_secs(self.prefetch_interval_secs))
    }
}

impl DispatchConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

fn parse_sources(raw: &str) -> Result<Vec<SourceKind>> {
    let mut kinds = Vec::new();
    for name in split_list(raw) {
        let kind = SourceKind::from_str(&name).ok_or_else(|| RelayError::UnknownSource(name))?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

fn parse_endpoint(raw: &str) -> Result<String> {
    let url = url::Url::parse(raw).map_err(|e| {
        RelayError::InvalidConfig(format!("TRANSLATE_ENDPOINT must be an absolute URL: {}", e))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        other => Err(RelayError::InvalidConfig(format!(
            "TRANSLATE_ENDPOINT scheme must be http or https, got {}",
            other
        ))),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
