//! Handler actions and the reusable callback registry.
//!
//! A component either carries its own action or names a [`Callback`]
//! registered up front. Callbacks bundle an action with its checks and a
//! [`CallbackKind`]; resolving one under the wrong kind is an error, never a
//! silent mis-execution.

use crate::check::{Check, CheckOutcome, CheckPipeline};
use crate::context::InvocationContext;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use switchboard_core::{
    ActivationEvent, BoxError, CallbackError, CallbackKind, DomainFailure, LookupError,
};

// ============================================================================
// ACTIONS
// ============================================================================

/// How a handler body can fail.
#[derive(Debug)]
pub enum ActionError {
    /// Shown to the user as-is.
    Relayed(DomainFailure),
    /// Anything else; reported through the generic fault path.
    Unexpected(BoxError),
}

impl ActionError {
    pub fn relay(reason: impl Into<String>) -> Self {
        ActionError::Relayed(DomainFailure::new(reason))
    }

    pub fn unexpected(err: impl Into<BoxError>) -> Self {
        ActionError::Unexpected(err.into())
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionError::Relayed(failure) => write!(f, "{}", failure),
            ActionError::Unexpected(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ActionError {}

impl From<DomainFailure> for ActionError {
    fn from(failure: DomainFailure) -> Self {
        ActionError::Relayed(failure)
    }
}

/// A lookup miss is something the user can be told about; every other
/// lookup failure is unexpected.
impl From<LookupError> for ActionError {
    fn from(err: LookupError) -> Self {
        if err.is_not_found() {
            ActionError::relay("I couldn't find that message.")
        } else {
            ActionError::Unexpected(Box::new(err))
        }
    }
}

pub type ActionResult = Result<(), ActionError>;

/// A handler body.
#[async_trait]
pub trait ComponentAction: Send + Sync {
    async fn call(&self, ctx: &mut InvocationContext) -> ActionResult;
}

/// Action backed by a synchronous closure.
pub struct FnAction<F>(F);

/// Wrap a closure as a [`ComponentAction`].
pub fn action_fn<F>(func: F) -> FnAction<F>
where
    F: Fn(&mut InvocationContext) -> ActionResult + Send + Sync,
{
    FnAction(func)
}

#[async_trait]
impl<F> ComponentAction for FnAction<F>
where
    F: Fn(&mut InvocationContext) -> ActionResult + Send + Sync,
{
    async fn call(&self, ctx: &mut InvocationContext) -> ActionResult {
        (self.0)(ctx)
    }
}

// ============================================================================
// CALLBACKS
// ============================================================================

/// A named, reusable action/check pair.
#[derive(Clone)]
pub struct Callback {
    id: String,
    kind: CallbackKind,
    action: Arc<dyn ComponentAction>,
    checks: CheckPipeline,
}

impl Callback {
    pub fn new(
        id: impl Into<String>,
        kind: CallbackKind,
        action: impl ComponentAction + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            action: Arc::new(action),
            checks: CheckPipeline::new(),
        }
    }

    pub fn with_check(mut self, check: impl Check + 'static) -> Self {
        self.checks = self.checks.with(check);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> CallbackKind {
        self.kind
    }

    pub async fn run_checks(&self, event: &ActivationEvent) -> CheckOutcome {
        self.checks.run(event).await
    }

    pub async fn call(&self, ctx: &mut InvocationContext) -> ActionResult {
        self.action.call(ctx).await
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("checks", &self.checks)
            .finish()
    }
}

/// Id-keyed store of callbacks.
///
/// Filled during startup, then shared read-only (`Arc<CallbackRegistry>`),
/// so lookups on the hot path take no lock.
///
/// # Example
/// ```ignore
/// let mut registry = CallbackRegistry::new();
/// registry.register(Callback::new("vote", CallbackKind::PublicButton, VoteAction));
/// let registry = Arc::new(registry);
///
/// let callback = registry.resolve("vote", CallbackKind::PublicButton)?;
/// ```
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    callbacks: HashMap<String, Callback>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback under its id, replacing any previous one.
    pub fn register(&mut self, callback: Callback) -> Option<Callback> {
        self.callbacks.insert(callback.id.clone(), callback)
    }

    /// Look up a callback, requiring it to be of `expected` kind.
    ///
    /// # Errors
    /// - [`CallbackError::NotFound`] if nothing is registered under `id`
    /// - [`CallbackError::KindMismatch`] if it was registered as another kind
    pub fn resolve(&self, id: &str, expected: CallbackKind) -> Result<&Callback, CallbackError> {
        let callback = self
            .callbacks
            .get(id)
            .ok_or_else(|| CallbackError::NotFound { id: id.to_string() })?;

        if callback.kind != expected {
            return Err(CallbackError::KindMismatch {
                id: id.to_string(),
                expected,
                actual: callback.kind,
            });
        }

        Ok(callback)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.callbacks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.callbacks.keys().collect();
        ids.sort();
        f.debug_struct("CallbackRegistry").field("ids", &ids).finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
