//! Tracing subscriber setup.
//!
//! `RUST_LOG` takes precedence over `logging.level`. Console output goes to
//! stderr so it never mixes with command output on stdout. JSON output is one
//! object per line on stdout for log collectors, with the structured fields
//! (`key`, `bucket`, `error`) kept as separate JSON keys.

use crate::config::{ConfigError, LogFormat, LoggingConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// The filter to install: `RUST_LOG` when set, `level` otherwise.
pub fn env_filter(level: &str) -> Result<EnvFilter, ConfigError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| ConfigError::Validation(format!("logging.level {level:?}: {e}"))),
    }
}

/// Install the global subscriber. Call once, before any event is logged.
pub fn init(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = env_filter(&config.level)?;

    let log_layer = match config.format {
        LogFormat::Console => fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(false)
            .flatten_event(true)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry().with(log_layer).init();
    Ok(())
}
