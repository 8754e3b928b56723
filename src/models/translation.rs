use serde::{Deserialize, Serialize};

use super::ProxyRecord;

/// Error message carried by a dispatch that ran out of candidates
pub const EXHAUSTED: &str = "exhausted";

/// Body of `POST /v1/translate`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranslateRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub lang: String,
}

/// One step of the retry loop. Never persisted.
#[derive(Debug, Clone)]
pub struct DispatchAttempt {
    /// `None` for the direct (un-proxied) attempt
    pub proxy: Option<ProxyRecord>,
    pub index: usize,
    pub timeout_ms: u64,
}

/// The only value a dispatch hands back to its caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
    pub proxy_used: Option<String>,
    pub retries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl TranslationResult {
    pub fn succeeded(translated_text: String, proxy_used: Option<String>, retries: usize) -> Self {
        Self {
            success: true,
            translated_text: Some(translated_text),
            proxy_used,
            retries,
            error_message: None,
        }
    }

    pub fn exhausted(last_proxy: Option<String>, retries: usize) -> Self {
        Self {
            success: false,
            translated_text: None,
            proxy_used: last_proxy,
            retries,
            error_message: Some(EXHAUSTED.to_string()),
        }
    }

    /// Human-readable account of a failed dispatch, `None` on success.
    pub fn failure_summary(&self) -> Option<String> {
        if self.success {
            return None;
        }

        let attempts = match self.retries {
            1 => "1 proxy attempt".to_string(),
            n => format!("{} proxy attempts", n),
        };

        Some(match &self.proxy_used {
            Some(ip) => format!("translation failed after {}, last tried {}", attempts, ip),
            None => format!("translation failed after {}", attempts),
        })
    }
}
