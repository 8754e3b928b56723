use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};

/// Protocol an egress proxy speaks to its clients' targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProtocol {
    Http,
    Https,
}

impl ProxyProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyProtocol::Http => "http",
            ProxyProtocol::Https => "https",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "http" => Some(ProxyProtocol::Http),
            "https" => Some(ProxyProtocol::Https),
            _ => None,
        }
    }
}

impl fmt::Display for ProxyProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source-reported anonymity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Anonymity {
    Normal,
    Anonymous,
    Elite,
    #[default]
    Unknown,
}

impl Anonymity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Anonymity::Normal => "normal",
            Anonymity::Anonymous => "anonymous",
            Anonymity::Elite => "elite",
            Anonymity::Unknown => "unknown",
        }
    }

    /// Parse the many spellings proxy lists use. Anything unrecognised is `Unknown`.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "normal" | "transparent" | "noa" => Anonymity::Normal,
            "anonymous" | "anm" => Anonymity::Anonymous,
            "elite" | "elite proxy" | "high" | "high anonymous" | "hia" => Anonymity::Elite,
            _ => Anonymity::Unknown,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Anonymity::Anonymous | Anonymity::Elite)
    }
}

impl fmt::Display for Anonymity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of a proxy candidate across sources
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyKey {
    pub ip: String,
    pub port: u16,
}

/// A proxy candidate produced by one source.
///
/// Fields are fixed once built; the `with_*` builders only apply before the
/// record is shared through a `ProxyPool`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRecord {
    ip: String,
    port: u16,
    protocol: ProxyProtocol,
    country: Option<String>,
    anonymity: Anonymity,
    google_compatible: bool,
    source: String,
}

impl ProxyRecord {
    pub fn new(
        ip: impl Into<String>,
        port: u16,
        protocol: ProxyProtocol,
        source: impl Into<String>,
    ) -> Self {
        Self {
            ip: ip.into(),
            port,
            protocol,
            country: None,
            anonymity: Anonymity::Unknown,
            google_compatible: false,
            source: source.into(),
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        let country = country.into();
        self.country = if country.trim().is_empty() {
            None
        } else {
            Some(country)
        };
        self
    }

    pub fn with_anonymity(mut self, anonymity: Anonymity) -> Self {
        self.anonymity = anonymity;
        self
    }

    pub fn with_google_compatible(mut self, google_compatible: bool) -> Self {
        self.google_compatible = google_compatible;
        self
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn protocol(&self) -> ProxyProtocol {
        self.protocol
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn anonymity(&self) -> Anonymity {
        self.anonymity
    }

    pub fn google_compatible(&self) -> bool {
        self.google_compatible
    }

    /// Name of the source that produced this record
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn key(&self) -> ProxyKey {
        ProxyKey {
            ip: self.ip.clone(),
            port: self.port,
        }
    }

    /// `ip:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

/// Ordered, deduplicated snapshot of proxy candidates.
///
/// Cloning is cheap; every clone shares the same backing list.
#[derive(Debug, Clone, Default)]
pub struct ProxyPool(Arc<Vec<ProxyRecord>>);

impl ProxyPool {
    pub fn new(records: Vec<ProxyRecord>) -> Self {
        Self(Arc::new(records))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ProxyRecord> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProxyRecord> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ProxyRecord] {
        &self.0
    }

    /// True when both pools are the same cached snapshot.
    pub fn ptr_eq(a: &ProxyPool, b: &ProxyPool) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl From<Vec<ProxyRecord>> for ProxyPool {
    fn from(records: Vec<ProxyRecord>) -> Self {
        Self::new(records)
    }
}

impl Serialize for ProxyPool {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.as_slice().serialize(serializer)
    }
}
