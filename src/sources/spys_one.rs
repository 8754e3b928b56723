//! spys.me plain-text proxy list
//!
//! Each data line reads `ip:port CC-A[-S][!] [+|-]` where `A` is the
//! anonymity flag (N, A or H), `S` marks SSL support and the trailing
//! `+` means the proxy passed Google.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::{get_text, ProxySource, SourceOptions};
use crate::error::Result;
use crate::models::{Anonymity, ProxyProtocol, ProxyRecord};

const URL: &str = "https://spys.me/proxy.txt";

static ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<ip>\d{1,3}(?:\.\d{1,3}){3}):(?P<port>\d{1,5})$").expect("valid address regex")
});

pub struct SpysOneSource {
    client: reqwest::Client,
    url: String,
}

impl SpysOneSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: URL.to_string(),
        }
    }
}

#[async_trait]
impl ProxySource for SpysOneSource {
    fn name(&self) -> &'static str {
        "spys_one"
    }

    async fn try_fetch(&self, _options: &SourceOptions) -> Result<Vec<ProxyRecord>> {
        let body = get_text(&self.client, &self.url).await?;
        Ok(parse_list(&body, self.name()))
    }
}

fn parse_list(body: &str, source: &str) -> Vec<ProxyRecord> {
    body.lines()
        .filter_map(|line| parse_line(line, source))
        .collect()
}

/// Parse one line, returning a record only for Google-passing proxies rated
/// exactly `N` or `H`.
fn parse_line(line: &str, source: &str) -> Option<ProxyRecord> {
    let mut tokens = line.split_whitespace();
    let address = tokens.next()?;
    let flags = tokens.next()?;
    let google_token = tokens.next().unwrap_or("");

    let caps = ADDRESS.captures(address)?;
    let ip = caps.name("ip")?.as_str();
    let port = caps.name("port")?.as_str().parse::<u16>().ok()?;

    let mut parts = flags.split('-');
    let country = parts.next()?;
    if country.len() != 2 {
        return None;
    }
    // `N!` and `H!` ratings do not count.
    let anonymity = match parts.next()? {
        "H" => Anonymity::Elite,
        "N" => Anonymity::Normal,
        _ => return None,
    };

    let mut ssl = false;
    let mut google = google_token == "+";
    for part in parts {
        match part.trim_end_matches('!') {
            "S" => ssl = true,
            "+" => google = true,
            _ => {}
        }
    }

    if !google {
        return None;
    }

    let protocol = if ssl {
        ProxyProtocol::Https
    } else {
        ProxyProtocol::Http
    };

    Some(
        ProxyRecord::new(ip, port, protocol, source)
            .with_country(country)
            .with_anonymity(anonymity)
            .with_google_compatible(true),
    )
}
