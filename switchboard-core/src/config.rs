//! Configuration loading for switchboard.
//!
//! Every field has a default so a partial TOML document is valid, but
//! unknown fields are rejected to catch typos early.

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;

/// Default lookup service root; resources live under `{base_url}/messages/{id}`.
pub const DEFAULT_LOOKUP_BASE_URL: &str = "https://api.pluralkit.me/v2";

/// Default request timeout for the lookup service.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Default text shown when a handler fails unexpectedly.
pub const DEFAULT_GENERIC_ERROR_MESSAGE: &str =
    "Something went wrong while handling this interaction.";

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SwitchboardConfig {
    pub lookup: LookupConfig,
    pub components: ComponentDefaults,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LookupConfig {
    pub base_url: String,
    pub cache_capacity: usize,
    pub request_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LOOKUP_BASE_URL.to_string(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            user_agent: concat!("switchboard/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl LookupConfig {
    /// Set the lookup service root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the cache capacity.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "lookup.base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "lookup.base_url",
                reason: format!("{} is not an http(s) URL", base_url),
            });
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "lookup.cache_capacity",
                reason: "must be > 0".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "lookup.request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Defaults applied to components that don't override them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComponentDefaults {
    /// Acknowledge with a deferred update instead of an immediate ack.
    pub deferred_ack: bool,
    /// Respond ephemerally (only the activating user sees responses).
    pub ephemeral: bool,
    pub generic_error_message: String,
}

impl Default for ComponentDefaults {
    fn default() -> Self {
        Self {
            deferred_ack: false,
            ephemeral: true,
            generic_error_message: DEFAULT_GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

impl ComponentDefaults {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generic_error_message.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "components.generic_error_message",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.filter.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "logging.filter",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl SwitchboardConfig {
    /// Read, parse and validate a TOML config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: SwitchboardConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.lookup.validate()?;
        self.components.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = SwitchboardConfig::from_toml_str("").unwrap();
        assert_eq!(config, SwitchboardConfig::default());
        assert_eq!(config.lookup.cache_capacity, 10_000);
        assert_eq!(config.lookup.base_url, DEFAULT_LOOKUP_BASE_URL);
        assert!(!config.components.deferred_ack);
    }

    #[test]
    fn test_partial_document_overrides() {
        let config = SwitchboardConfig::from_toml_str(
            r#"
            [lookup]
            cache_capacity = 50

            [components]
            deferred_ack = true

            [logging]
            json = true
            "#,
        )
        .unwrap();
        assert_eq!(config.lookup.cache_capacity, 50);
        assert!(config.components.deferred_ack);
        assert!(config.logging.json);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = SwitchboardConfig::from_toml_str("[lookup]\ncache_capacity = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "lookup.cache_capacity",
                ..
            }
        ));
    }

    #[test]
    fn test_non_http_base_url_rejected() {
        let config = LookupConfig::default().with_base_url("ftp://example.com");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = SwitchboardConfig::from_toml_str("[lookup]\ncache_size = 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = SwitchboardConfig::from_path(Path::new("/nonexistent/switchboard.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
