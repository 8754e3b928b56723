use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Outcome of one translation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }

    pub fn from_success(success: bool) -> Self {
        if success {
            Outcome::Success
        } else {
            Outcome::Failure
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row written per translation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsEntry {
    pub ip: String,
    pub language: String,
    pub characters: i64,
    pub outcome: Outcome,
}

/// Totals across all requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct GlobalStats {
    pub total_requests: i64,
    pub successful_requests: i64,
    pub failed_requests: i64,
    pub total_characters: i64,
    pub unique_ips: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LanguageStats {
    pub language: String,
    pub total_requests: i64,
    pub successful_requests: i64,
    pub failed_requests: i64,
    pub total_characters: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct IpStats {
    pub ip: String,
    pub request_count: i64,
    pub total_characters: i64,
}

/// Body of `GET /v1/stats`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub global_stats: GlobalStats,
    pub per_language_stats: Vec<LanguageStats>,
    pub per_ip_stats: Vec<IpStats>,
}
