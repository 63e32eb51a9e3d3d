//! switchboard core
//!
//! Shared building blocks for interactive-component dispatch:
//! the platform data model, the failure taxonomy, the error enums, the
//! bounded recency cache used in front of remote lookups, configuration and
//! logging setup.

pub mod cache;
pub mod config;
pub mod error;
pub mod failure;
pub mod logging;
pub mod types;

pub use cache::{CacheStats, LruCache, DEFAULT_CACHE_CAPACITY};
pub use config::{ComponentDefaults, LoggingConfig, LookupConfig, SwitchboardConfig};
pub use error::{
    CacheError, CallbackError, ComponentError, ConfigError, DispatchError, LookupError, PlatformError,
    SwitchboardError, SwitchboardResult, STATUS_NOT_FOUND,
};
pub use failure::{BoxError, DomainFailure, ExecutionFault, FailureReason};
pub use logging::init_tracing;
pub use types::{
    ActivationEvent, CallbackKind, ControlType, Permissions, ResponseMessage, Snowflake,
    SnowflakeParseError, User, Visibility,
};
