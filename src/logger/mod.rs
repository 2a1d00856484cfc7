//! Tracing setup: a bootstrap filter until settings are parsed, then the configured one.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
