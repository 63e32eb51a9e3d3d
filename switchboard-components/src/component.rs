//! Interactive components and the mutual-exclusion dispatcher.
//!
//! Each [`InteractiveComponent`] owns a `tokio::sync::Mutex` held for the
//! whole of an activation's handling, so handler bodies of one component
//! never overlap. Waiters are served first-come-first-served. The guard is a
//! scoped lock: it is released on success, on domain failure, on an
//! unexpected fault, on a panic in the handler body, and when the
//! dispatching task is cancelled.
//!
//! # Lifecycle of one activation
//!
//! 1. acquire the component guard
//! 2. run the author-provided checks; report failures directly
//! 3. acknowledge the interaction (exactly once)
//! 4. populate the invocation context
//! 5. record a breadcrumb
//! 6. run the bot's own permission checks; report failures as follow-ups
//! 7. run the handler body
//! 8. convert relayed failures to responses; route anything else to the
//!    generic fault handler

use crate::breadcrumb::{Breadcrumb, BreadcrumbTrail};
use crate::callback::{ActionError, Callback, CallbackRegistry, ComponentAction};
use crate::check::{BotPermissionsCheck, Check, CheckOutcome, CheckPipeline};
use crate::context::InvocationContext;
use crate::response::{InitialResponseBuilder, InteractionResponder, ResponseSelector};
use futures_util::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use switchboard_core::{
    ActivationEvent, CallbackKind, ComponentDefaults, ComponentError, ConfigError, ControlType,
    DispatchError, DomainFailure, ExecutionFault, FailureReason, Permissions, ResponseMessage,
    Visibility,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

// ============================================================================
// SETTINGS
// ============================================================================

/// Renders a failure into the response shown to the user.
pub type FailureResponseBuilder = Arc<dyn Fn(&str, &FailureReason) -> ResponseMessage + Send + Sync>;

/// Default failure rendering: the message text, shown only to the user.
pub fn default_failure_response(content: &str, _reason: &FailureReason) -> ResponseMessage {
    ResponseMessage::ephemeral(content)
}

/// Settings shared by a group of components.
#[derive(Clone)]
pub struct ComponentSettings {
    defaults: ComponentDefaults,
    pub failure_response: FailureResponseBuilder,
    pub breadcrumbs: Arc<BreadcrumbTrail>,
}

impl ComponentSettings {
    /// Build settings from loaded configuration, rejecting invalid defaults.
    pub fn from_config(defaults: &ComponentDefaults) -> Result<Self, ConfigError> {
        defaults.validate()?;
        Ok(Self::with_defaults(defaults.clone()))
    }

    fn with_defaults(defaults: ComponentDefaults) -> Self {
        Self {
            defaults,
            failure_response: Arc::new(default_failure_response),
            breadcrumbs: Arc::new(BreadcrumbTrail::default()),
        }
    }

    pub fn defaults(&self) -> &ComponentDefaults {
        &self.defaults
    }

    pub fn with_failure_response(mut self, builder: FailureResponseBuilder) -> Self {
        self.failure_response = builder;
        self
    }

    pub fn with_breadcrumbs(mut self, trail: Arc<BreadcrumbTrail>) -> Self {
        self.breadcrumbs = trail;
        self
    }
}

impl Default for ComponentSettings {
    fn default() -> Self {
        Self::with_defaults(ComponentDefaults::default())
    }
}

impl fmt::Debug for ComponentSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSettings")
            .field("defaults", &self.defaults)
            .field("breadcrumbs", &self.breadcrumbs.len())
            .finish()
    }
}

// ============================================================================
// OUTCOME
// ============================================================================

/// How an activation concluded. Errors that escape dispatch are reported
/// through [`DispatchError`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler body ran to completion.
    Completed,
    /// An author-provided check failed. `reported` is false for silent
    /// failures.
    ProvidedCheckFailed { reported: bool },
    /// The bot lacks something it needs.
    OwnPermissionsCheckFailed { reported: bool },
    /// The handler body relayed a domain failure to the user.
    RelayedFailure,
    /// The handler body failed unexpectedly; `reference` correlates the
    /// user-facing message with the operator log.
    ExecutionFailed { reference: Uuid },
}

// ============================================================================
// COMPONENT
// ============================================================================

#[derive(Clone)]
enum Handler {
    Inline(Arc<dyn ComponentAction>),
    Callback(String),
}

/// A button or select menu that reacts to activations.
pub struct InteractiveComponent {
    custom_id: String,
    control: ControlType,
    selector: ResponseSelector,
    checks: CheckPipeline,
    bot_checks: CheckPipeline,
    handler: Handler,
    registry: Arc<CallbackRegistry>,
    responder: Arc<dyn InteractionResponder>,
    settings: ComponentSettings,
    guard: Mutex<()>,
}

impl InteractiveComponent {
    pub fn custom_id(&self) -> &str {
        &self.custom_id
    }

    pub fn control(&self) -> ControlType {
        self.control
    }

    pub fn visibility(&self) -> Visibility {
        self.selector.visibility()
    }

    /// Callback kind this component accepts.
    pub fn callback_kind(&self) -> CallbackKind {
        CallbackKind::for_component(self.control, self.visibility())
    }

    /// Whether an activation currently holds the guard.
    pub fn is_busy(&self) -> bool {
        self.guard.try_lock().is_err()
    }

    /// Handle one activation. At most one call runs at a time per component;
    /// concurrent calls wait their turn in arrival order.
    pub async fn handle(&self, event: ActivationEvent) -> Result<DispatchOutcome, DispatchError> {
        let span = info_span!(
            "component",
            custom_id = %self.custom_id,
            interaction_id = %event.interaction_id,
            user_id = %event.user.id,
        );

        async move {
            if event.control != self.control {
                warn!(
                    expected = ?self.control,
                    actual = ?event.control,
                    "Activation from the wrong kind of control"
                );
                return Err(DispatchError::ControlMismatch {
                    custom_id: self.custom_id.clone(),
                    expected: self.control,
                    actual: event.control,
                });
            }

            let _guard = self.guard.lock().await;
            debug!("Guard acquired");
            self.dispatch(event).await
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, event: ActivationEvent) -> Result<DispatchOutcome, DispatchError> {
        let callback = match &self.handler {
            Handler::Inline(_) => None,
            Handler::Callback(id) => Some(self.resolve_callback(id)?),
        };

        let provided = match callback {
            Some(callback) => match self.checks.run(&event).await {
                CheckOutcome::Passed => callback.run_checks(&event).await,
                failed => failed,
            },
            None => self.checks.run(&event).await,
        };
        if let CheckOutcome::Failed(failure) = provided {
            return self.reject_unacknowledged(&event, failure).await;
        }

        let handle = self
            .selector
            .acknowledge(self.responder.as_ref(), &event)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to acknowledge interaction");
                e
            })?;

        let mut ctx = InvocationContext::populate(event, handle, self.responder.clone());

        let breadcrumb = self.settings.breadcrumbs.record(
            Breadcrumb::new("component", "Component activated")
                .with_data("custom_id", &self.custom_id)
                .with_data("interaction_id", ctx.event().interaction_id)
                .with_data("user_id", ctx.user().id)
                .with_data("channel_id", ctx.channel_id())
                .with_data("ack_state", format!("{:?}", ctx.handle().state())),
        );

        let permissions = self.bot_checks.run(ctx.event()).await;
        if let CheckOutcome::Failed(failure) = permissions {
            return match failure {
                Some(failure) => {
                    info!(reason = %failure, "Bot permission check failed");
                    let reason = FailureReason::OwnPermissionsCheckFailure(failure);
                    self.deliver_failure(&mut ctx, &reason).await?;
                    Ok(DispatchOutcome::OwnPermissionsCheckFailed { reported: true })
                }
                None => {
                    ctx.handle_mut().complete();
                    Ok(DispatchOutcome::OwnPermissionsCheckFailed { reported: false })
                }
            };
        }

        let result = AssertUnwindSafe(self.execute(callback, &mut ctx))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(())) => {
                ctx.handle_mut().complete();
                debug!("Handler completed");
                Ok(DispatchOutcome::Completed)
            }
            Ok(Err(ActionError::Relayed(failure))) => {
                warn!(reason = %failure, "Handler relayed a failure");
                let reason = FailureReason::RelayedFailure(failure);
                self.deliver_failure(&mut ctx, &reason).await?;
                Ok(DispatchOutcome::RelayedFailure)
            }
            Ok(Err(ActionError::Unexpected(err))) => {
                self.handle_error(&mut ctx, breadcrumb, err.to_string()).await
            }
            Err(panic) => {
                self.handle_error(&mut ctx, breadcrumb, panic_message(panic.as_ref()))
                    .await
            }
        }
    }

    fn resolve_callback(&self, id: &str) -> Result<&Callback, DispatchError> {
        self.registry
            .resolve(id, self.callback_kind())
            .map_err(|e| {
                error!(callback_id = id, error = %e, "Callback resolution failed");
                DispatchError::from(e)
            })
    }

    async fn execute(
        &self,
        callback: Option<&Callback>,
        ctx: &mut InvocationContext,
    ) -> Result<(), ActionError> {
        match (&self.handler, callback) {
            (_, Some(callback)) => callback.call(ctx).await,
            (Handler::Inline(action), None) => action.call(ctx).await,
            (Handler::Callback(id), None) => Err(ActionError::unexpected(format!(
                "callback {:?} was not resolved before execution",
                id
            ))),
        }
    }

    /// Report an author-check failure. The interaction is still
    /// unacknowledged, so the failure message itself acknowledges it.
    async fn reject_unacknowledged(
        &self,
        event: &ActivationEvent,
        failure: Option<DomainFailure>,
    ) -> Result<DispatchOutcome, DispatchError> {
        let Some(failure) = failure else {
            debug!("Provided check failed silently");
            return Ok(DispatchOutcome::ProvidedCheckFailed { reported: false });
        };

        info!(reason = %failure, "Provided check failed");
        let content = failure.reason().to_string();
        let reason = FailureReason::ProvidedCheckFailure(failure);
        let message = (self.settings.failure_response)(&content, &reason)
            .with_visibility(self.visibility());

        self.responder
            .respond_directly(event, message)
            .await
            .map_err(|e| {
                error!(error = %e, failure = reason.tag(), "Failed to deliver check failure");
                e
            })?;

        Ok(DispatchOutcome::ProvidedCheckFailed { reported: true })
    }

    /// Deliver a failure through the acknowledged handle.
    async fn deliver_failure(
        &self,
        ctx: &mut InvocationContext,
        reason: &FailureReason,
    ) -> Result<(), DispatchError> {
        let content = match reason {
            FailureReason::ExecutionError(fault) => format!(
                "{} (reference: {})",
                self.settings.defaults.generic_error_message, fault.reference
            ),
            _ => reason
                .domain_failure()
                .map(|failure| failure.reason().to_string())
                .unwrap_or_default(),
        };
        let message =
            (self.settings.failure_response)(&content, reason).with_visibility(self.visibility());

        ctx.respond_with(message).await.map_err(|e| {
            error!(error = %e, failure = reason.tag(), "Failed to deliver failure response");
            e
        })?;
        ctx.handle_mut().complete();
        Ok(())
    }

    /// Generic fault handler: log everything an operator needs, then tell
    /// the user something went wrong without interpreting the fault.
    async fn handle_error(
        &self,
        ctx: &mut InvocationContext,
        breadcrumb: Uuid,
        detail: String,
    ) -> Result<DispatchOutcome, DispatchError> {
        let crumb = self.settings.breadcrumbs.get(breadcrumb);
        error!(
            reference = %breadcrumb,
            error = %detail,
            breadcrumb = ?crumb.as_ref().map(|c| &c.data),
            "Unexpected error while handling component"
        );

        let reason = FailureReason::ExecutionError(ExecutionFault::new(breadcrumb, detail));
        self.deliver_failure(ctx, &reason).await?;
        Ok(DispatchOutcome::ExecutionFailed {
            reference: breadcrumb,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("handler panicked: {}", message)
    } else {
        "handler panicked".to_string()
    }
}

impl fmt::Debug for InteractiveComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handler = match &self.handler {
            Handler::Inline(_) => "inline".to_string(),
            Handler::Callback(id) => format!("callback:{}", id),
        };
        f.debug_struct("InteractiveComponent")
            .field("custom_id", &self.custom_id)
            .field("control", &self.control)
            .field("selector", &self.selector)
            .field("checks", &self.checks)
            .field("handler", &handler)
            .finish()
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Assembles an [`InteractiveComponent`].
///
/// # Example
/// ```ignore
/// let component = ComponentBuilder::button("confirm")
///     .public()
///     .check(check_fn("owner_only", |e| (e.user.id == owner).into()))
///     .require_bot_permissions(Permissions::SEND_MESSAGES)
///     .action(ConfirmAction)
///     .build(responder, registry, settings)?;
/// ```
pub struct ComponentBuilder {
    custom_id: String,
    control: ControlType,
    visibility: Option<Visibility>,
    deferred_ack: Option<bool>,
    initial_response: Option<InitialResponseBuilder>,
    checks: CheckPipeline,
    required_bot_permissions: Permissions,
    action: Option<Arc<dyn ComponentAction>>,
    callback_id: Option<String>,
}

impl ComponentBuilder {
    fn new(custom_id: impl Into<String>, control: ControlType) -> Self {
        Self {
            custom_id: custom_id.into(),
            control,
            visibility: None,
            deferred_ack: None,
            initial_response: None,
            checks: CheckPipeline::new(),
            required_bot_permissions: Permissions::empty(),
            action: None,
            callback_id: None,
        }
    }

    pub fn button(custom_id: impl Into<String>) -> Self {
        Self::new(custom_id, ControlType::Button)
    }

    pub fn select_menu(custom_id: impl Into<String>) -> Self {
        Self::new(custom_id, ControlType::SelectMenu)
    }

    pub fn ephemeral(self) -> Self {
        self.visibility(Visibility::Ephemeral)
    }

    pub fn public(self) -> Self {
        self.visibility(Visibility::Public)
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Acknowledge with a deferred update instead of an immediate ack.
    pub fn deferred_ack(mut self, deferred: bool) -> Self {
        self.deferred_ack = Some(deferred);
        self
    }

    /// Open the interaction with content instead of an empty ack.
    pub fn initial_response<F>(mut self, builder: F) -> Self
    where
        F: Fn(&ActivationEvent) -> ResponseMessage + Send + Sync + 'static,
    {
        self.initial_response = Some(Arc::new(builder));
        self
    }

    pub fn check(mut self, check: impl Check + 'static) -> Self {
        self.checks = self.checks.with(check);
        self
    }

    pub fn require_bot_permissions(mut self, permissions: Permissions) -> Self {
        self.required_bot_permissions |= permissions;
        self
    }

    pub fn action(mut self, action: impl ComponentAction + 'static) -> Self {
        self.action = Some(Arc::new(action));
        self
    }

    /// Use a registered callback's action and checks.
    pub fn use_callback(mut self, id: impl Into<String>) -> Self {
        self.callback_id = Some(id.into());
        self
    }

    /// Validate and build. A callback reference is resolved here so that a
    /// missing or mistyped callback fails at startup.
    pub fn build(
        self,
        responder: Arc<dyn InteractionResponder>,
        registry: Arc<CallbackRegistry>,
        settings: ComponentSettings,
    ) -> Result<InteractiveComponent, ComponentError> {
        if self.custom_id.trim().is_empty() {
            return Err(ComponentError::EmptyCustomId);
        }

        let visibility = self.visibility.unwrap_or(if settings.defaults.ephemeral {
            Visibility::Ephemeral
        } else {
            Visibility::Public
        });

        let handler = match (self.action, self.callback_id) {
            (Some(_), Some(callback_id)) => {
                return Err(ComponentError::ConflictingHandlers {
                    custom_id: self.custom_id,
                    callback_id,
                })
            }
            (Some(action), None) => Handler::Inline(action),
            (None, Some(callback_id)) => {
                registry.resolve(
                    &callback_id,
                    CallbackKind::for_component(self.control, visibility),
                )?;
                Handler::Callback(callback_id)
            }
            (None, None) => {
                return Err(ComponentError::MissingAction {
                    custom_id: self.custom_id,
                })
            }
        };

        let deferred_ack = self.deferred_ack.unwrap_or(settings.defaults.deferred_ack);
        let mut selector = ResponseSelector::new(visibility, deferred_ack);
        if let Some(builder) = self.initial_response {
            selector = selector.with_initial_response(builder);
        }

        Ok(InteractiveComponent {
            custom_id: self.custom_id,
            control: self.control,
            selector,
            checks: self.checks,
            bot_checks: CheckPipeline::new()
                .with(BotPermissionsCheck::new(self.required_bot_permissions)),
            handler,
            registry,
            responder,
            settings,
            guard: Mutex::new(()),
        })
    }
}
