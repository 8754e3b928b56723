//! Proxifly free proxy list (JSON dumps published on GitHub)

use async_trait::async_trait;
use serde::Deserialize;

use super::{deserialize_port, get_text, ProxySource, SourceOptions};
use crate::error::Result;
use crate::models::{Anonymity, ProxyProtocol, ProxyRecord};

const HTTP_URL: &str =
    "https://raw.githubusercontent.com/proxifly/free-proxy-list/main/proxies/protocols/http/data.json";
const HTTPS_URL: &str =
    "https://raw.githubusercontent.com/proxifly/free-proxy-list/main/proxies/protocols/https/data.json";

const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
struct Entry {
    ip: String,
    #[serde(deserialize_with = "deserialize_port")]
    port: u16,
    #[serde(default)]
    protocol: String,
    #[serde(default)]
    https: bool,
    #[serde(default)]
    anonymity: String,
    #[serde(default)]
    geolocation: Option<Geolocation>,
}

#[derive(Debug, Deserialize)]
struct Geolocation {
    country: Option<String>,
}

pub struct ProxiflySource {
    client: reqwest::Client,
    http_url: String,
    https_url: String,
}

impl ProxiflySource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            http_url: HTTP_URL.to_string(),
            https_url: HTTPS_URL.to_string(),
        }
    }
}

#[async_trait]
impl ProxySource for ProxiflySource {
    fn name(&self) -> &'static str {
        "proxifly"
    }

    async fn try_fetch(&self, options: &SourceOptions) -> Result<Vec<ProxyRecord>> {
        let limit = options
            .get("limit")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_LIMIT);

        let (http_body, https_body) = futures::try_join!(
            get_text(&self.client, &self.http_url),
            get_text(&self.client, &self.https_url),
        )?;

        let mut entries = parse_entries(&http_body)?;
        entries.extend(parse_entries(&https_body)?);

        Ok(select(entries, limit, self.name()))
    }
}

fn parse_entries(body: &str) -> Result<Vec<Entry>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(body)?)
}

/// Keep anonymous and elite entries, capped at `limit`.
fn select(entries: Vec<Entry>, limit: usize, source: &str) -> Vec<ProxyRecord> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let anonymity = Anonymity::from_str(&entry.anonymity);
            if !anonymity.is_anonymous() {
                return None;
            }

            let protocol = ProxyProtocol::from_str(&entry.protocol).unwrap_or(if entry.https {
                ProxyProtocol::Https
            } else {
                ProxyProtocol::Http
            });

            let country = entry
                .geolocation
                .and_then(|g| g.country)
                .unwrap_or_default();

            Some(
                ProxyRecord::new(entry.ip, entry.port, protocol, source)
                    .with_country(country)
                    .with_anonymity(anonymity),
            )
        })
        .take(limit)
        .collect()
}
