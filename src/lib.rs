//! Lingua Relay - translation API over rotating free proxies
//!
//! Translation requests that the upstream service would block or rate-limit
//! are retried through egress proxies collected from public lists.
//!
//! ## Features
//!
//! - Pluggable proxy sources (proxifly, free-proxy-list.net, spys.me, proxyfreeonly)
//! - Aggregated, deduplicated proxy pool with a TTL cache and stale fallback
//! - Sequential retry dispatcher with a per-attempt timeout
//! - Bearer-protected REST API with per-request stats in SQLite

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod proxy;
pub mod repository;
pub mod services;
pub mod sources;
pub mod translate;

pub use config::Config;
pub use database::Database;
pub use error::{RelayError, Result};
