//! Proxy pool management and request dispatch
//!
//! - Aggregating candidates from every enabled source with a TTL cache
//! - Walking the pool with per-attempt timeouts until a translation succeeds

pub mod aggregator;
pub mod dispatcher;

pub use aggregator::{merge_batches, ProxyAggregator, ProxyCache, DEFAULT_CACHE_TTL};
pub use dispatcher::{DispatchPlan, DispatchState, DispatcherConfig, TranslationDispatcher};
