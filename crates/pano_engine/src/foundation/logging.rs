//! Logging utilities and structured logging support

use std::str::FromStr;
use std::sync::Once;

pub use log::{debug, info, warn, error, trace};

static INIT: Once = Once::new();

/// Initialize the logging system
///
/// `level` is the default filter (`"info"`, `"debug"`, ...). A `RUST_LOG`
/// environment variable still takes precedence. Repeated calls are no-ops.
pub fn init(level: &str) {
    INIT.call_once(|| {
        let filter = log::LevelFilter::from_str(level).unwrap_or(log::LevelFilter::Info);
        env_logger::Builder::new()
            .filter_level(filter)
            .parse_default_env()
            .format_timestamp_millis()
            .try_init()
            .ok();
    });
}
