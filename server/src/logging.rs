//! Structured logging initialization.
//!
//! Configures the tracing subscriber for structured logging output.
//! The RUST_LOG environment variable takes precedence over configuration file settings.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize the logging subsystem.
///
/// The RUST_LOG environment variable takes precedence over the configuration
/// file level setting. If RUST_LOG is not set, the level from config is used.
///
/// # Example
///
/// ```ignore
/// use server::logging;
/// use server::config::LoggingConfig;
///
/// let config = LoggingConfig::default();
/// logging::init(&config);
///
/// tracing::info!("Server starting");
/// ```
pub fn init(config: &LoggingConfig) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(config.level.as_str())
    };

    let base = fmt::layer()
        .with_target(config.target)
        .with_thread_names(config.thread_names);

    let layer = match (config.format, config.timestamps) {
        (LogFormat::Pretty, true) => base.with_ansi(true).boxed(),
        (LogFormat::Pretty, false) => base.with_ansi(true).without_time().boxed(),
        (LogFormat::Json, true) => base.json().boxed(),
        (LogFormat::Json, false) => base.json().without_time().boxed(),
        (LogFormat::Compact, true) => base.compact().with_ansi(true).boxed(),
        (LogFormat::Compact, false) => base.compact().with_ansi(true).without_time().boxed(),
    };

    tracing_subscriber::registry().with(filter).with(layer).init();
}
