//! Error types for switchboard operations

use crate::{CallbackKind, ControlType};
use thiserror::Error;

/// HTTP status the lookup service uses for "no such resource".
pub const STATUS_NOT_FOUND: u16 = 404;

/// Bounded recency cache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache capacity must be greater than 0")]
    ZeroCapacity,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Failed to initialize logging: {reason}")]
    Logging { reason: String },
}

/// Remote lookup errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("{path} -> {status}: {cause}")]
    RemoteFault {
        path: String,
        status: u16,
        cause: String,
    },

    #[error("Request to {path} failed: {reason}")]
    Transport { path: String, reason: String },

    #[error("Invalid response body from {path}: {reason}")]
    Decode { path: String, reason: String },
}

impl LookupError {
    /// HTTP status carried by a remote fault, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            LookupError::RemoteFault { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this is the expected "resource does not exist" outcome.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(STATUS_NOT_FOUND)
    }
}

/// Callback registry errors. These indicate programming mistakes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallbackError {
    #[error("Callback {id:?} is not registered")]
    NotFound { id: String },

    #[error("Callback {id:?} is registered as {actual}, but {expected} was requested")]
    KindMismatch {
        id: String,
        expected: CallbackKind,
        actual: CallbackKind,
    },
}

/// Errors reported by the platform's response delivery surface.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Platform rejected {operation}: {reason}")]
    DeliveryFailed {
        operation: &'static str,
        reason: String,
    },
}

/// Errors raised while assembling a component. These indicate programming
/// mistakes and are reported at startup rather than on first activation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComponentError {
    #[error("Component custom id must not be empty")]
    EmptyCustomId,

    #[error("Component {custom_id:?} has no action")]
    MissingAction { custom_id: String },

    #[error("Component {custom_id:?} has both an inline action and callback {callback_id:?}")]
    ConflictingHandlers {
        custom_id: String,
        callback_id: String,
    },

    #[error("Component {custom_id:?} is already registered")]
    DuplicateCustomId { custom_id: String },

    #[error(transparent)]
    Callback(#[from] CallbackError),
}

/// Errors that escape a component dispatch.
///
/// Domain failures never show up here; they are converted to user-facing
/// responses inside the dispatcher.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Callback(#[from] CallbackError),

    #[error("No component registered for custom id {custom_id:?}")]
    UnknownComponent { custom_id: String },

    #[error("Component {custom_id:?} is a {expected:?}, but the activation came from a {actual:?}")]
    ControlMismatch {
        custom_id: String,
        expected: ControlType,
        actual: ControlType,
    },
}

/// Master error type for all switchboard errors.
#[derive(Debug, Error)]
pub enum SwitchboardError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Callback error: {0}")]
    Callback(#[from] CallbackError),

    #[error("Component error: {0}")]
    Component(#[from] ComponentError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Result type alias for switchboard operations.
pub type SwitchboardResult<T> = Result<T, SwitchboardError>;

// =============================================================================
// TESTS
// =============================================================================
