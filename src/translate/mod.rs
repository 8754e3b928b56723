//! Upstream translation client
//!
//! The dispatcher only knows the [`Translator`] trait; the Google client is
//! the production implementation.

mod google;

pub use google::GoogleTranslator;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::ProxyRecord;

/// Why a single upstream call failed. Every variant is retryable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Upstream rejected request with status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Unexpected upstream response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for TranslateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TranslateError::Timeout
        } else if let Some(status) = err.status() {
            TranslateError::Upstream {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            TranslateError::Network(err.to_string())
        }
    }
}

/// Where to send an upstream call through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EgressRoute {
    pub host: String,
    pub port: u16,
}

impl EgressRoute {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// HTTPS-capable list entries still speak plain HTTP to their clients
    /// and tunnel with CONNECT, so the proxy URL is always `http://`.
    pub fn proxy_url(&self) -> String {
        format!("http://{}", format_tcp_addr(&self.host, self.port))
    }
}

impl From<&ProxyRecord> for EgressRoute {
    fn from(record: &ProxyRecord) -> Self {
        Self::new(record.ip(), record.port())
    }
}

fn format_tcp_addr(host: &str, port: u16) -> String {
    if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Successful upstream translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    pub detected_source: Option<String>,
}

/// External translation service, optionally routed through an egress proxy
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        target_lang: &str,
        route: Option<&EgressRoute>,
    ) -> Result<Translation, TranslateError>;
}
