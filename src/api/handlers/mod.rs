//! API request handlers

pub mod health;
pub mod proxies;
pub mod stats;
pub mod translate;
