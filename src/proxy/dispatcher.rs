//! Translation retry dispatcher
//!
//! Walks a proxy pool in order, one upstream call per candidate, each raced
//! against a per-attempt timer. The walk itself is the [`DispatchState`]
//! machine driven by a [`DispatchPlan`]; the dispatcher only runs attempts.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::config::DispatchConfig;
use crate::models::{DispatchAttempt, ProxyPool, TranslationResult};
use crate::translate::{EgressRoute, TranslateError, Translation, Translator};

/// Configuration for the dispatcher
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Upper bound on proxy attempts per request
    pub max_retries: usize,
    /// Budget for one upstream call
    pub attempt_timeout: Duration,
    /// Try once without a proxy before walking the pool
    pub direct_attempt: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_retries: 15,
            attempt_timeout: Duration::from_millis(3000),
            direct_attempt: false,
        }
    }
}

impl From<&DispatchConfig> for DispatcherConfig {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            attempt_timeout: config.attempt_timeout(),
            direct_attempt: config.direct_attempt,
        }
    }
}

/// Where the retry loop currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Direct,
    Proxy(usize),
    Exhausted,
}

/// Transition table for one dispatch, fixed by config and pool size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPlan {
    pub max_retries: usize,
    pub pool_len: usize,
    pub direct_attempt: bool,
}

impl DispatchPlan {
    pub fn new(config: &DispatcherConfig, pool_len: usize) -> Self {
        Self {
            max_retries: config.max_retries,
            pool_len,
            direct_attempt: config.direct_attempt,
        }
    }

    pub fn start(&self) -> DispatchState {
        if self.direct_attempt {
            DispatchState::Direct
        } else {
            self.proxy_state(0)
        }
    }

    /// State after the attempt made in `state` failed.
    pub fn after_failure(&self, state: DispatchState) -> DispatchState {
        match state {
            DispatchState::Direct => self.proxy_state(0),
            DispatchState::Proxy(index) => self.proxy_state(index + 1),
            DispatchState::Exhausted => DispatchState::Exhausted,
        }
    }

    /// Number of proxy attempts this plan allows
    pub fn proxy_budget(&self) -> usize {
        self.max_retries.min(self.pool_len)
    }

    fn proxy_state(&self, index: usize) -> DispatchState {
        if index < self.proxy_budget() {
            DispatchState::Proxy(index)
        } else {
            DispatchState::Exhausted
        }
    }
}

/// Drives a translation through successive egress proxies
pub struct TranslationDispatcher {
    translator: Arc<dyn Translator>,
    config: DispatcherConfig,
}

impl TranslationDispatcher {
    pub fn new(translator: Arc<dyn Translator>, config: DispatcherConfig) -> Self {
        Self { translator, config }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Produce exactly one result for the request. Never fails.
    #[instrument(skip(self, text, lang, pool), fields(lang = %lang, pool_size = pool.len()))]
    pub async fn dispatch(&self, text: &str, lang: &str, pool: &ProxyPool) -> TranslationResult {
        let plan = DispatchPlan::new(&self.config, pool.len());
        let timeout_ms = self.config.attempt_timeout.as_millis() as u64;
        let mut state = plan.start();
        let mut attempts = 0usize;
        let mut last_ip: Option<String> = None;

        loop {
            let attempt = match state {
                DispatchState::Direct => DispatchAttempt {
                    proxy: None,
                    index: 0,
                    timeout_ms,
                },
                DispatchState::Proxy(index) => {
                    let Some(record) = pool.get(index) else {
                        break;
                    };
                    attempts = index + 1;
                    last_ip = Some(record.ip().to_string());
                    DispatchAttempt {
                        proxy: Some(record.clone()),
                        index,
                        timeout_ms,
                    }
                }
                DispatchState::Exhausted => break,
            };

            let via = attempt
                .proxy
                .as_ref()
                .map(|p| p.address())
                .unwrap_or_else(|| "direct".to_string());

            match self.run_attempt(text, lang, &attempt).await {
                Ok(translation) => {
                    let proxy_used = attempt.proxy.as_ref().map(|p| p.ip().to_string());
                    info!(via = %via, retries = attempt.index, "Translation succeeded");
                    return TranslationResult::succeeded(translation.text, proxy_used, attempt.index);
                }
                Err(e) => {
                    warn!(
                        "Translation through {} failed: {} ({})",
                        via,
                        e,
                        attempt_label(&attempt, plan.proxy_budget())
                    );
                }
            }

            state = plan.after_failure(state);
        }

        let result = TranslationResult::exhausted(last_ip, attempts);
        if let Some(summary) = result.failure_summary() {
            warn!("{}", summary);
        }
        result
    }

    /// Run one upstream call on its own task, raced against the attempt
    /// timer. A call that loses the race is aborted.
    async fn run_attempt(
        &self,
        text: &str,
        lang: &str,
        attempt: &DispatchAttempt,
    ) -> Result<Translation, TranslateError> {
        let translator = self.translator.clone();
        let text = text.to_string();
        let lang = lang.to_string();
        let route = attempt.proxy.as_ref().map(EgressRoute::from);

        let started = Instant::now();
        let mut handle =
            tokio::spawn(async move { translator.translate(&text, &lang, route.as_ref()).await });

        let outcome = tokio::select! {
            biased;
            joined = &mut handle => match joined {
                Ok(result) => result,
                Err(e) => Err(TranslateError::Network(format!("attempt task failed: {}", e))),
            },
            _ = tokio::time::sleep(Duration::from_millis(attempt.timeout_ms)) => {
                handle.abort();
                Err(TranslateError::Timeout)
            }
        };

        debug!(
            index = attempt.index,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = outcome.is_ok(),
            "Attempt finished"
        );

        outcome
    }
}

/// Log label for an attempt. The direct attempt sits outside the proxy budget.
fn attempt_label(attempt: &DispatchAttempt, proxy_budget: usize) -> String {
    match attempt.proxy {
        Some(_) => format!("attempt {}/{}", attempt.index + 1, proxy_budget),
        None => "direct attempt".to_string(),
    }
}
