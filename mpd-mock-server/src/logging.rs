//! Logging setup for the fake server's binaries and test harnesses.

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging mode for different use cases.
#[derive(Debug, Clone, Copy)]
pub enum LoggingMode {
    /// No output at all.
    Silent,
    /// Compact stderr output for development.
    Development,
    /// Verbose diagnostics with source locations.
    Debug,
}

/// Logging configuration error.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to initialize tracing subscriber: {0}")]
    TracingInit(String),
}

/// Initialize logging with the specified mode.
///
/// `RUST_LOG` overrides the default filter of the chosen mode. Call this
/// once, early; a second initialization fails.
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    let default_level = match mode {
        LoggingMode::Silent => return Ok(()),
        LoggingMode::Development => "info",
        LoggingMode::Debug => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match mode {
        LoggingMode::Silent => unreachable!(),
        LoggingMode::Development => Registry::default()
            .with(fmt::layer().with_target(false).compact())
            .with(filter)
            .try_init()
            .map_err(|e| LoggingError::TracingInit(e.to_string())),
        LoggingMode::Debug => Registry::default()
            .with(fmt::layer().pretty().with_file(true).with_line_number(true))
            .with(filter)
            .try_init()
            .map_err(|e| LoggingError::TracingInit(e.to_string())),
    }
}
