//! Background services

pub mod pool_refresh;

pub use pool_refresh::{PoolRefreshConfig, PoolRefreshService};
