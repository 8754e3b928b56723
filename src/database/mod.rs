//! Stats database access

mod migrations;
mod pool;

pub use migrations::run_migrations;
pub use pool::Database;
