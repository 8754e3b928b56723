//! API middleware

mod auth;
mod cors;
mod logging;

pub use auth::BearerAuth;
pub use cors::cors_layer;
pub use logging::RequestLogging;
