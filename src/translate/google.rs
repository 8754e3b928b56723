//! Google Translate client using the public `translate_a/single` endpoint

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Proxy};
use serde_json::Value;
use tracing::debug;

use super::{EgressRoute, TranslateError, Translation, Translator};
use crate::config::DEFAULT_TRANSLATE_ENDPOINT;

pub struct GoogleTranslator {
    endpoint: String,
    source_lang: String,
    connect_timeout: Duration,
    direct: Client,
}

impl GoogleTranslator {
    pub fn new(endpoint: impl Into<String>, connect_timeout: Duration) -> Result<Self, TranslateError> {
        let direct = Self::client_builder(connect_timeout)
            .build()
            .map_err(|e| TranslateError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            source_lang: "auto".to_string(),
            connect_timeout,
            direct,
        })
    }

    /// Force a source language instead of auto-detection
    pub fn with_source_lang(mut self, lang: impl Into<String>) -> Self {
        self.source_lang = lang.into();
        self
    }

    fn client_builder(connect_timeout: Duration) -> reqwest::ClientBuilder {
        Client::builder()
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(0)
    }

    /// Proxies are per-client in reqwest, so each routed call gets its own.
    fn client_for(&self, route: Option<&EgressRoute>) -> Result<Client, TranslateError> {
        let Some(route) = route else {
            return Ok(self.direct.clone());
        };

        let proxy = Proxy::all(route.proxy_url())
            .map_err(|e| TranslateError::Network(format!("Invalid proxy {}: {}", route.proxy_url(), e)))?;

        Self::client_builder(self.connect_timeout)
            .proxy(proxy)
            .build()
            .map_err(|e| TranslateError::Network(format!("Failed to build proxied client: {}", e)))
    }
}

impl Default for GoogleTranslator {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_TRANSLATE_ENDPOINT.to_string(),
            source_lang: "auto".to_string(),
            connect_timeout: Duration::from_secs(3),
            direct: Client::new(),
        }
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(
        &self,
        text: &str,
        target_lang: &str,
        route: Option<&EgressRoute>,
    ) -> Result<Translation, TranslateError> {
        let client = self.client_for(route)?;

        debug!(
            via = route.map(|r| r.proxy_url()).as_deref().unwrap_or("direct"),
            target_lang,
            "Calling upstream translator"
        );

        let response = client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", self.source_lang.as_str()),
                ("tl", target_lang),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = status.canonical_reason().unwrap_or("unknown").to_string();
            return Err(TranslateError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        parse_response(&body)
    }
}

/// The body is a nested array: `[[["translated","original",...],...],null,"en",...]`.
fn parse_response(body: &str) -> Result<Translation, TranslateError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| TranslateError::Parse(e.to_string()))?;

    let segments = value
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslateError::Parse("missing translation segments".to_string()))?;

    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    if text.is_empty() {
        return Err(TranslateError::Parse("empty translation".to_string()));
    }

    let detected_source = value.get(2).and_then(Value::as_str).map(str::to_string);

    Ok(Translation {
        text,
        detected_source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_joins_segments() {
        let body = r#"[[["Сайн уу. ","Hello. ",null,null,10],["Сайн байна уу?","How are you?",null,null,10]],null,"en",null,null,null,1,[],[["en"],null,[1],["en"]]]"#;
        let translation = parse_response(body).unwrap();

        assert_eq!(translation.text, "Сайн уу. Сайн байна уу?");
        assert_eq!(translation.detected_source.as_deref(), Some("en"));
    }

    #[test]
    fn test_parse_rejects_unexpected_shapes() {
        assert!(matches!(parse_response("<html>captcha</html>"), Err(TranslateError::Parse(_))));
        assert!(matches!(parse_response(r#"{"error":1}"#), Err(TranslateError::Parse(_))));
        assert!(matches!(parse_response("[[],null,\"en\"]"), Err(TranslateError::Parse(_))));
    }

    #[test]
    fn test_client_for_accepts_routes() {
        let translator = GoogleTranslator::new(DEFAULT_TRANSLATE_ENDPOINT, Duration::from_secs(1)).unwrap();
        assert!(translator.client_for(None).is_ok());
        assert!(translator
            .client_for(Some(&EgressRoute::new("10.0.0.1", 8080)))
            .is_ok());
    }
}
