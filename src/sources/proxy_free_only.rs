//! proxyfreeonly.com JSON API

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{deserialize_port, ProxySource, SourceOptions};
use crate::error::Result;
use crate::models::{Anonymity, ProxyProtocol, ProxyRecord};

const URL: &str = "https://proxyfreeonly.com/api/free-proxy-list";

const DEFAULT_PARAMS: &[(&str, &str)] = &[
    ("limit", "500"),
    ("page", "1"),
    ("sortBy", "lastChecked"),
    ("sortType", "desc"),
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entry {
    ip: String,
    #[serde(deserialize_with = "deserialize_port")]
    port: u16,
    #[serde(default)]
    protocols: Vec<String>,
    #[serde(default)]
    anonymity_level: String,
    #[serde(default)]
    google: bool,
    #[serde(default)]
    country: Option<String>,
}

pub struct ProxyFreeOnlySource {
    client: reqwest::Client,
    url: String,
}

impl ProxyFreeOnlySource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: URL.to_string(),
        }
    }
}

#[async_trait]
impl ProxySource for ProxyFreeOnlySource {
    fn name(&self) -> &'static str {
        "proxy_free_only"
    }

    async fn try_fetch(&self, options: &SourceOptions) -> Result<Vec<ProxyRecord>> {
        let params = query_params(options);
        let body = self
            .client
            .get(&self.url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_response(&body, self.name())
    }
}

/// Defaults overridden by caller options, defaults first.
fn query_params(options: &SourceOptions) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = DEFAULT_PARAMS
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    for (key, value) in options {
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        match params.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => params.push((key.clone(), value)),
        }
    }

    params
}

/// Keep anonymous or Google-passing entries whose first protocol is http(s).
fn parse_response(body: &str, source: &str) -> Result<Vec<ProxyRecord>> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };

    let mut proxies = Vec::new();
    for item in items {
        let entry: Entry = serde_json::from_value(item)?;

        let anonymity = Anonymity::from_str(&entry.anonymity_level);
        if anonymity != Anonymity::Anonymous && !entry.google {
            continue;
        }

        let Some(protocol) = entry
            .protocols
            .first()
            .and_then(|p| ProxyProtocol::from_str(p))
        else {
            continue;
        };

        proxies.push(
            ProxyRecord::new(entry.ip, entry.port, protocol, source)
                .with_country(entry.country.unwrap_or_default())
                .with_anonymity(anonymity)
                .with_google_compatible(entry.google),
        );
    }

    Ok(proxies)
}
