//! Proxy source aggregation with a TTL cache
//!
//! Fans out to every configured source, merges their lists and keeps the
//! result as one immutable snapshot. Readers on a cache hit only touch the
//! `ArcSwap`; refreshes are serialized so racing callers share one fan-out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use indexmap::IndexMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::models::{ProxyKey, ProxyPool, ProxyRecord};
use crate::sources::{ProxySource, SourceOptions};

/// How long an aggregated pool is served without refreshing
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// The cached snapshot. Replaced as a whole, never mutated.
#[derive(Debug, Clone)]
pub struct ProxyCache {
    pub entries: ProxyPool,
    pub fetched_at: Option<Instant>,
    /// Wall-clock time of `fetched_at`, for reporting only
    pub refreshed_at: Option<DateTime<Utc>>,
    pub ttl: Duration,
}

impl ProxyCache {
    fn empty(ttl: Duration) -> Self {
        Self {
            entries: ProxyPool::default(),
            fetched_at: None,
            refreshed_at: None,
            ttl,
        }
    }

    pub fn is_fresh(&self, now: Instant) -> bool {
        match self.fetched_at {
            Some(fetched_at) => now.saturating_duration_since(fetched_at) < self.ttl,
            None => false,
        }
    }
}

/// Produces deduplicated proxy pools from a fixed, ordered set of sources
pub struct ProxyAggregator {
    sources: Vec<Arc<dyn ProxySource>>,
    options: SourceOptions,
    cache: ArcSwap<ProxyCache>,
    refresh_lock: Mutex<()>,
    /// Completed refresh attempts, including ones that found nothing
    generation: AtomicU64,
}

impl ProxyAggregator {
    pub fn new(sources: Vec<Arc<dyn ProxySource>>, ttl: Duration) -> Self {
        Self {
            sources,
            options: SourceOptions::new(),
            cache: ArcSwap::from_pointee(ProxyCache::empty(ttl)),
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Options passed to every source on each refresh
    pub fn with_options(mut self, options: SourceOptions) -> Self {
        self.options = options;
        self
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Current cached pool, without any network activity
    pub fn snapshot(&self) -> ProxyPool {
        self.cache.load().entries.clone()
    }

    /// Return the cached pool while fresh, otherwise refresh it.
    pub async fn fetch_proxies(&self) -> ProxyPool {
        if let Some(pool) = self.fresh_snapshot() {
            debug!(count = pool.len(), "Returning cached proxies");
            return pool;
        }

        let seen = self.generation.load(Ordering::Acquire);
        let _guard = self.refresh_lock.lock().await;

        // A refresh finished while we waited for the lock. Its result stands
        // even when it came back empty and left the cache stale.
        if self.generation.load(Ordering::Acquire) != seen {
            let pool = self.snapshot();
            debug!(count = pool.len(), "Returning proxies refreshed by a concurrent caller");
            return pool;
        }
        if let Some(pool) = self.fresh_snapshot() {
            return pool;
        }

        self.refresh_locked().await
    }

    /// Refresh regardless of cache freshness
    pub async fn refresh(&self) -> ProxyPool {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// When the current pool was last successfully refreshed
    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.cache.load().refreshed_at
    }

    fn fresh_snapshot(&self) -> Option<ProxyPool> {
        let cache = self.cache.load();
        cache
            .is_fresh(Instant::now())
            .then(|| cache.entries.clone())
    }

    #[instrument(skip(self), fields(sources = self.sources.len()))]
    async fn refresh_locked(&self) -> ProxyPool {
        let now = Instant::now();

        let batches = join_all(
            self.sources
                .iter()
                .map(|source| source.fetch_proxies(&self.options)),
        )
        .await;

        let fetched: usize = batches.iter().map(Vec::len).sum();
        let merged = merge_batches(batches);
        self.generation.fetch_add(1, Ordering::Release);

        if merged.is_empty() {
            let stale = self.cache.load();
            if stale.entries.is_empty() {
                warn!("All proxy sources returned nothing and no cached pool exists");
            } else {
                warn!(
                    count = stale.entries.len(),
                    "All proxy sources returned nothing, serving stale pool"
                );
            }
            return stale.entries.clone();
        }

        let pool = ProxyPool::new(merged);
        let ttl = self.cache.load().ttl;
        self.cache.store(Arc::new(ProxyCache {
            entries: pool.clone(),
            fetched_at: Some(now),
            refreshed_at: Some(Utc::now()),
            ttl,
        }));

        info!(
            fetched = fetched,
            unique = pool.len(),
            "Proxy pool refreshed"
        );

        pool
    }
}

/// Concatenate batches in source order and dedupe by `(ip, port)`.
///
/// A later batch's record replaces an earlier one with the same key. The
/// replaced record keeps the position where the key was first seen.
pub fn merge_batches(batches: Vec<Vec<ProxyRecord>>) -> Vec<ProxyRecord> {
    let mut merged: IndexMap<ProxyKey, ProxyRecord> = IndexMap::new();
    for record in batches.into_iter().flatten() {
        merged.insert(record.key(), record);
    }
    merged.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RelayError, Result};
    use crate::models::ProxyProtocol;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct StaticSource {
        name: &'static str,
        records: std::sync::Mutex<Vec<ProxyRecord>>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl StaticSource {
        fn new(name: &'static str, records: Vec<ProxyRecord>) -> Arc<Self> {
            Self::with_delay(name, records, Duration::ZERO)
        }

        fn with_delay(name: &'static str, records: Vec<ProxyRecord>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                name,
                records: std::sync::Mutex::new(records),
                calls: AtomicUsize::new(0),
                delay,
            })
        }

        fn set_records(&self, records: Vec<ProxyRecord>) {
            *self.records.lock().unwrap() = records;
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProxySource for StaticSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn try_fetch(&self, _options: &SourceOptions) -> Result<Vec<ProxyRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(self.records.lock().unwrap().clone())
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl ProxySource for BrokenSource {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn try_fetch(&self, _options: &SourceOptions) -> Result<Vec<ProxyRecord>> {
            Err(RelayError::Http("503 Service Unavailable".to_string()))
        }
    }

    fn record(ip: &str, port: u16, source: &str) -> ProxyRecord {
        ProxyRecord::new(ip, port, ProxyProtocol::Http, source)
    }

    fn addresses(pool: &ProxyPool) -> Vec<String> {
        pool.iter().map(|r| r.address()).collect()
    }

    #[test]
    fn test_merge_later_source_wins() {
        let merged = merge_batches(vec![
            vec![record("1.1.1.1", 80, "a"), record("2.2.2.2", 80, "a")],
            vec![record("3.3.3.3", 80, "b"), record("1.1.1.1", 80, "b")],
            vec![record("1.1.1.1", 8080, "c")],
        ]);

        let keys: Vec<String> = merged.iter().map(|r| r.address()).collect();
        assert_eq!(
            keys,
            vec!["1.1.1.1:80", "2.2.2.2:80", "3.3.3.3:80", "1.1.1.1:8080"]
        );
        assert_eq!(merged[0].source(), "b");
        assert_eq!(merged[1].source(), "a");
    }

    #[test]
    fn test_merge_duplicate_within_one_source() {
        let merged = merge_batches(vec![vec![
            record("1.1.1.1", 80, "first"),
            record("1.1.1.1", 80, "second"),
        ]]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source(), "second");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_dedupes_across_sources() {
        let a = StaticSource::new("a", vec![record("1.1.1.1", 80, "a"), record("2.2.2.2", 80, "a")]);
        let b = StaticSource::new("b", vec![record("1.1.1.1", 80, "b")]);
        let aggregator = ProxyAggregator::new(vec![a, b], DEFAULT_CACHE_TTL);

        let pool = aggregator.fetch_proxies().await;

        assert_eq!(addresses(&pool), vec!["1.1.1.1:80", "2.2.2.2:80"]);
        assert_eq!(pool.get(0).unwrap().source(), "b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_cache_is_reused() {
        let source = StaticSource::new("a", vec![record("1.1.1.1", 80, "a")]);
        let aggregator = ProxyAggregator::new(vec![source.clone()], DEFAULT_CACHE_TTL);

        let first = aggregator.fetch_proxies().await;
        tokio::time::advance(Duration::from_secs(299)).await;
        let second = aggregator.fetch_proxies().await;

        assert_eq!(source.calls(), 1);
        assert!(ProxyPool::ptr_eq(&first, &second));
        assert!(ProxyPool::ptr_eq(&first, &aggregator.snapshot()));
        assert!(aggregator.last_refreshed().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_cache_refreshes() {
        let source = StaticSource::new("a", vec![record("1.1.1.1", 80, "a")]);
        let aggregator = ProxyAggregator::new(vec![source.clone()], DEFAULT_CACHE_TTL);

        let first = aggregator.fetch_proxies().await;
        source.set_records(vec![record("9.9.9.9", 80, "a")]);
        tokio::time::advance(DEFAULT_CACHE_TTL).await;
        let second = aggregator.fetch_proxies().await;

        assert_eq!(source.calls(), 2);
        assert!(!ProxyPool::ptr_eq(&first, &second));
        assert_eq!(addresses(&second), vec!["9.9.9.9:80"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_refresh_serves_stale_pool() {
        let source = StaticSource::new("a", vec![record("1.1.1.1", 80, "a")]);
        let aggregator = ProxyAggregator::new(vec![source.clone()], DEFAULT_CACHE_TTL);

        let populated = aggregator.fetch_proxies().await;
        source.set_records(Vec::new());

        let forced = aggregator.refresh().await;
        assert!(ProxyPool::ptr_eq(&populated, &forced));

        tokio::time::advance(DEFAULT_CACHE_TTL * 2).await;
        let expired = aggregator.fetch_proxies().await;
        assert!(ProxyPool::ptr_eq(&populated, &expired));
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_refresh_without_prior_pool() {
        let aggregator = ProxyAggregator::new(
            vec![Arc::new(BrokenSource), StaticSource::new("a", Vec::new())],
            DEFAULT_CACHE_TTL,
        );

        let pool = aggregator.fetch_proxies().await;
        assert!(pool.is_empty());
        assert!(aggregator.snapshot().is_empty());
        assert!(aggregator.last_refreshed().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_source_does_not_poison_others() {
        let good = StaticSource::new("good", vec![record("1.1.1.1", 80, "good")]);
        let aggregator =
            ProxyAggregator::new(vec![Arc::new(BrokenSource), good], DEFAULT_CACHE_TTL);

        let pool = aggregator.fetch_proxies().await;
        assert_eq!(addresses(&pool), vec!["1.1.1.1:80"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sources_are_fetched_concurrently() {
        let slow_a = StaticSource::with_delay("a", vec![record("1.1.1.1", 80, "a")], Duration::from_secs(2));
        let slow_b = StaticSource::with_delay("b", vec![record("2.2.2.2", 80, "b")], Duration::from_secs(2));
        let aggregator = ProxyAggregator::new(vec![slow_a, slow_b], DEFAULT_CACHE_TTL);

        let started = Instant::now();
        let pool = aggregator.fetch_proxies().await;

        assert_eq!(pool.len(), 2);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_refresh() {
        let source = StaticSource::with_delay("a", vec![record("1.1.1.1", 80, "a")], Duration::from_secs(1));
        let aggregator = Arc::new(ProxyAggregator::new(vec![source.clone()], DEFAULT_CACHE_TTL));

        let (first, second) = tokio::join!(aggregator.fetch_proxies(), aggregator.fetch_proxies());

        assert_eq!(source.calls(), 1);
        assert!(ProxyPool::ptr_eq(&first, &second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_outage_waiters_share_one_empty_refresh() {
        let source = StaticSource::with_delay("a", Vec::new(), Duration::from_secs(10));
        let aggregator = Arc::new(ProxyAggregator::new(vec![source.clone()], DEFAULT_CACHE_TTL));

        let started = Instant::now();
        let handles: Vec<_> = (0..5)
            .map(|_| {
                let aggregator = aggregator.clone();
                tokio::spawn(async move {
                    let pool = aggregator.fetch_proxies().await;
                    (pool.len(), started.elapsed())
                })
            })
            .collect();

        for handle in handles {
            let (len, waited) = handle.await.unwrap();
            assert_eq!(len, 0);
            assert!(waited <= Duration::from_secs(10), "waited {:?}", waited);
        }
        assert_eq!(source.calls(), 1);

        // A caller arriving after the empty refresh still retries the sources.
        aggregator.fetch_proxies().await;
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_source_names_in_registration_order() {
        let aggregator = ProxyAggregator::new(
            vec![StaticSource::new("z", Vec::new()), StaticSource::new("a", Vec::new())],
            DEFAULT_CACHE_TTL,
        );
        assert_eq!(aggregator.source_names(), vec!["z", "a"]);
    }
}
