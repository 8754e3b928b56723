//! free-proxy-list.net HTML table scraper

use async_trait::async_trait;
use scraper::{Html, Selector};

use super::{get_text, ProxySource, SourceOptions};
use crate::error::{RelayError, Result};
use crate::models::{Anonymity, ProxyProtocol, ProxyRecord};

const URL: &str = "https://free-proxy-list.net/";

pub struct FreeProxyListSource {
    client: reqwest::Client,
    url: String,
}

impl FreeProxyListSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: URL.to_string(),
        }
    }
}

#[async_trait]
impl ProxySource for FreeProxyListSource {
    fn name(&self) -> &'static str {
        "free_proxy_list"
    }

    async fn try_fetch(&self, _options: &SourceOptions) -> Result<Vec<ProxyRecord>> {
        let html = get_text(&self.client, &self.url).await?;
        parse_table(&html, self.name())
    }
}

/// Rows look like: ip | port | code | country | anonymity | google | https | last checked.
/// Only anonymous rows that pass Google are kept.
fn parse_table(html: &str, source: &str) -> Result<Vec<ProxyRecord>> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("table.table tbody tr")
        .map_err(|e| RelayError::ProxyListParse(format!("row selector: {}", e)))?;
    let cell_selector = Selector::parse("td")
        .map_err(|e| RelayError::ProxyListParse(format!("cell selector: {}", e)))?;

    let mut proxies = Vec::new();

    for row in document.select(&row_selector) {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();

        if cells.len() < 6 {
            continue;
        }

        let anonymity = cells[4].to_lowercase();
        let google = cells[5].to_lowercase();
        if anonymity != "anonymous" || google != "yes" {
            continue;
        }

        let Ok(port) = cells[1].parse::<u16>() else {
            continue;
        };

        let protocol = match cells.get(6).map(|s| s.to_lowercase()) {
            Some(https) if https == "yes" => ProxyProtocol::Https,
            _ => ProxyProtocol::Http,
        };

        proxies.push(
            ProxyRecord::new(cells[0].clone(), port, protocol, source)
                .with_country(cells[2].clone())
                .with_anonymity(Anonymity::Anonymous)
                .with_google_compatible(true),
        );
    }

    Ok(proxies)
}
