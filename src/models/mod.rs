pub mod proxy;
pub mod stats;
pub mod translation;

pub use proxy::*;
pub use stats::*;
pub use translation::*;
