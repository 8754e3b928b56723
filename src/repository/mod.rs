pub mod stats;

pub use stats::{StatsRepository, StatsSink};
