//! Tracing subscriber setup.

use crate::config::LoggingConfig;
use crate::error::ConfigError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.filter`. Call once at startup;
/// a second call fails with [`ConfigError::Logging`].
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
    config.validate()?;

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter).map_err(|e| ConfigError::InvalidValue {
            field: "logging.filter",
            reason: e.to_string(),
        })?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    result.map_err(|e| ConfigError::Logging {
        reason: e.to_string(),
    })?;

    tracing::info!(filter = %config.filter, json = config.json, "Logging initialized");
    Ok(())
}
