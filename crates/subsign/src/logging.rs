//! Process-wide logging setup.
//!
//! Installs a `tracing-subscriber` registry (env filter + plain or JSON fmt
//! layer) and bridges `log` records, which the database layer emits, into
//! tracing.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::config::LoggingConfig;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Failed to install tracing subscriber: {0}")]
    SetSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("Failed to bridge log records: {0}")]
    SetLogger(#[from] tracing_log::log_tracer::SetLoggerError),
}

/// Builds the filter: `RUST_LOG` when set, otherwise the configured level.
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(from_env) = EnvFilter::try_from_default_env() {
        return Ok(from_env);
    }
    EnvFilter::try_new(&config.level).map_err(|e| LoggingError::InvalidFilter {
        filter: config.level.clone(),
        reason: e.to_string(),
    })
}

/// Installs the global subscriber. Call once at process start.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = build_filter(config)?;

    if config.json {
        let subscriber = Registry::default()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr));
        tracing::subscriber::set_global_default(subscriber)?;
    }

    tracing_log::LogTracer::init()?;

    tracing::debug!(level = %config.level, json = config.json, "Logging initialised");
    Ok(())
}
