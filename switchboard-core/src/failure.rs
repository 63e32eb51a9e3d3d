//! Failure taxonomy for component invocations.
//!
//! A [`DomainFailure`] is meant for the end user: it carries a reason that is
//! safe to show. A [`FailureReason`] tags where in the invocation lifecycle a
//! failure was detected, so the response builder (and operators reading the
//! logs) can tell "the user failed a business check" apart from "the bot
//! lacks permission" or "the handler crashed".

use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Raw fault escaping a handler body.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failure meant to be translated into a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct DomainFailure {
    reason: String,
}

impl DomainFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Unclassified fault that escaped a handler body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionFault {
    /// Correlates the user-visible message with the operator log entry.
    pub reference: Uuid,
    pub detail: String,
}

impl ExecutionFault {
    pub fn new(reference: Uuid, detail: impl Into<String>) -> Self {
        Self {
            reference,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ExecutionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (reference {})", self.detail, self.reference)
    }
}

/// Where a failure was detected. Constructed at the point of detection and
/// consumed immediately by the response builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// A check supplied by the component's author failed.
    ProvidedCheckFailure(DomainFailure),
    /// The bot's own permission checks failed.
    OwnPermissionsCheckFailure(DomainFailure),
    /// The handler body reported a domain failure.
    RelayedFailure(DomainFailure),
    /// The handler body failed in an unclassified way.
    ExecutionError(ExecutionFault),
}

impl FailureReason {
    /// Stable tag used in log fields.
    pub fn tag(&self) -> &'static str {
        match self {
            FailureReason::ProvidedCheckFailure(_) => "provided_check_failure",
            FailureReason::OwnPermissionsCheckFailure(_) => "own_permissions_check_failure",
            FailureReason::RelayedFailure(_) => "relayed_failure",
            FailureReason::ExecutionError(_) => "execution_error",
        }
    }

    /// The wrapped domain failure, if this reason is domain-classified.
    pub fn domain_failure(&self) -> Option<&DomainFailure> {
        match self {
            FailureReason::ProvidedCheckFailure(failure)
            | FailureReason::OwnPermissionsCheckFailure(failure)
            | FailureReason::RelayedFailure(failure) => Some(failure),
            FailureReason::ExecutionError(_) => None,
        }
    }

    pub fn is_domain_classified(&self) -> bool {
        self.domain_failure().is_some()
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::ExecutionError(fault) => write!(f, "{}: {}", self.tag(), fault),
            _ => match self.domain_failure() {
                Some(failure) => write!(f, "{}: {}", self.tag(), failure),
                None => f.write_str(self.tag()),
            },
        }
    }
}
