//! Logging utilities and structured logging support

use serde::{Deserialize, Serialize};
use std::sync::Once;

pub use log::{debug, error, info, trace, warn};

/// Logger configuration.
///
/// `filter` follows the `env_logger` filter syntax (e.g. "info",
/// "poke_engine=debug").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Explicit filter; falls back to `RUST_LOG`, then `info`
    pub filter: Option<String>,
    /// Emit ANSI colours
    pub color: bool,
}

static INIT: Once = Once::new();

/// Initialize the logging system once per process.
///
/// Subsequent calls are ignored.
pub fn init_logging(config: &LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = &config.filter {
            builder.parse_filters(filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        builder.write_style(if config.color {
            env_logger::WriteStyle::Auto
        } else {
            env_logger::WriteStyle::Never
        });

        // A test harness may already own the global logger.
        if builder.try_init().is_ok() {
            log::debug!("logging initialized");
        }
    });
}
