//! Acknowledgement and response selection.
//!
//! Every activation must be acknowledged exactly once before its handler
//! runs. The acknowledgement state machine:
//!
//! ```text
//!                     ┌──→ RespondedWithContent ──┐
//! Unacknowledged ─────┼──→ Acknowledged ──────────┼──→ Completed
//!                     └──→ DeferredAcknowledged ──┘
//! ```
//!
//! There is no way back to `Unacknowledged`.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use switchboard_core::{ActivationEvent, PlatformError, ResponseMessage, Snowflake, Visibility};
use tracing::debug;

/// Builds the content an activation is opened with, instead of an empty ack.
pub type InitialResponseBuilder = Arc<dyn Fn(&ActivationEvent) -> ResponseMessage + Send + Sync>;

/// Acknowledgement lifecycle of one interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckState {
    Unacknowledged,
    RespondedWithContent,
    Acknowledged,
    DeferredAcknowledged,
    Completed,
}

impl AckState {
    /// The state after moving to `next`, or `None` if the move is illegal.
    pub fn advance(self, next: AckState) -> Option<AckState> {
        use AckState::*;
        match (self, next) {
            (Unacknowledged, RespondedWithContent | Acknowledged | DeferredAcknowledged) => {
                Some(next)
            }
            (RespondedWithContent | Acknowledged | DeferredAcknowledged, Completed) => {
                Some(Completed)
            }
            _ => None,
        }
    }

    pub fn is_acknowledged(self) -> bool {
        !matches!(self, AckState::Unacknowledged)
    }
}

/// Output surface of the platform layer.
///
/// Implementations wrap the platform's HTTP client; the dispatcher only
/// relies on these four operations.
#[async_trait]
pub trait InteractionResponder: Send + Sync {
    /// Respond to an unacknowledged interaction with content. This also
    /// counts as its acknowledgement.
    async fn respond_directly(
        &self,
        event: &ActivationEvent,
        message: ResponseMessage,
    ) -> Result<(), PlatformError>;

    /// Acknowledge without content.
    async fn acknowledge_immediately(
        &self,
        event: &ActivationEvent,
        visibility: Visibility,
    ) -> Result<(), PlatformError>;

    /// Acknowledge and reserve the right to render content later.
    async fn acknowledge_deferred(
        &self,
        event: &ActivationEvent,
        visibility: Visibility,
    ) -> Result<(), PlatformError>;

    /// Send content after acknowledgement.
    async fn send_follow_up(
        &self,
        handle: &ResponseHandle,
        message: ResponseMessage,
    ) -> Result<(), PlatformError>;
}

/// Result of acknowledging an interaction; used for every later response.
#[derive(Clone, PartialEq, Eq)]
pub struct ResponseHandle {
    pub interaction_id: Snowflake,
    pub token: String,
    pub visibility: Visibility,
    state: AckState,
}

impl ResponseHandle {
    fn new(event: &ActivationEvent, visibility: Visibility, state: AckState) -> Self {
        Self {
            interaction_id: event.interaction_id,
            token: event.token.clone(),
            visibility,
            state,
        }
    }

    pub fn state(&self) -> AckState {
        self.state
    }

    /// Mark the interaction as finished. Returns `false` if it already was.
    pub fn complete(&mut self) -> bool {
        match self.state.advance(AckState::Completed) {
            Some(next) => {
                self.state = next;
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for ResponseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseHandle")
            .field("interaction_id", &self.interaction_id)
            .field("token", &"[REDACTED]")
            .field("visibility", &self.visibility)
            .field("state", &self.state)
            .finish()
    }
}

/// Which acknowledgement a component will perform.
#[derive(Clone)]
pub enum AckStrategy {
    Respond(InitialResponseBuilder),
    Immediate,
    Deferred,
}

impl AckStrategy {
    pub fn target_state(&self) -> AckState {
        match self {
            AckStrategy::Respond(_) => AckState::RespondedWithContent,
            AckStrategy::Immediate => AckState::Acknowledged,
            AckStrategy::Deferred => AckState::DeferredAcknowledged,
        }
    }
}

impl fmt::Debug for AckStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AckStrategy::Respond(_) => f.write_str("Respond(..)"),
            AckStrategy::Immediate => f.write_str("Immediate"),
            AckStrategy::Deferred => f.write_str("Deferred"),
        }
    }
}

/// Decides how a component acknowledges its activations.
#[derive(Clone)]
pub struct ResponseSelector {
    initial_response: Option<InitialResponseBuilder>,
    deferred_ack: bool,
    visibility: Visibility,
}

impl ResponseSelector {
    pub fn new(visibility: Visibility, deferred_ack: bool) -> Self {
        Self {
            initial_response: None,
            deferred_ack,
            visibility,
        }
    }

    pub fn with_initial_response(mut self, builder: InitialResponseBuilder) -> Self {
        self.initial_response = Some(builder);
        self
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// An initial response builder wins; otherwise the deferred flag picks
    /// between an immediate and a deferred acknowledgement.
    pub fn strategy(&self) -> AckStrategy {
        match &self.initial_response {
            Some(builder) => AckStrategy::Respond(builder.clone()),
            None if self.deferred_ack => AckStrategy::Deferred,
            None => AckStrategy::Immediate,
        }
    }

    /// Perform exactly one acknowledgement transition.
    pub async fn acknowledge(
        &self,
        responder: &dyn InteractionResponder,
        event: &ActivationEvent,
    ) -> Result<ResponseHandle, PlatformError> {
        let strategy = self.strategy();
        match &strategy {
            AckStrategy::Respond(builder) => {
                let message = builder(event).with_visibility(self.visibility);
                responder.respond_directly(event, message).await?;
            }
            AckStrategy::Immediate => {
                responder
                    .acknowledge_immediately(event, self.visibility)
                    .await?;
            }
            AckStrategy::Deferred => {
                responder.acknowledge_deferred(event, self.visibility).await?;
            }
        }

        let state = strategy.target_state();
        debug!(interaction_id = %event.interaction_id, ?state, "Interaction acknowledged");

        Ok(ResponseHandle::new(event, self.visibility, state))
    }
}

impl fmt::Debug for ResponseSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseSelector")
            .field("strategy", &self.strategy())
            .field("visibility", &self.visibility)
            .finish()
    }
}
