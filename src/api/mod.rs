//! HTTP API
//!
//! `/health` is open; everything under `/v1` requires the bearer token.

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

pub use server::{ApiServer, AppState};
