//! Shared utilities for the case resolution engine.

pub mod logging;
pub mod stats;
pub mod time;

pub use logging::{init_logging, LogFormat, LoggingError};
pub use stats::StatsCounter;
pub use time::{format_duration, format_remaining};
