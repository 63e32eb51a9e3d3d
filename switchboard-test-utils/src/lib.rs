//! Switchboard Test Utilities
//!
//! Shared test infrastructure for the Switchboard workspace:
//! - A recording interaction responder with injectable delivery failures
//! - A scripted lookup transport that counts requests
//! - Event and message fixtures
//! - Proptest generators

pub use switchboard_components::{InteractionResponder, ResponseHandle};
pub use switchboard_core::{
    ActivationEvent, ControlType, Permissions, PlatformError, ResponseMessage, Snowflake, User,
    Visibility,
};
pub use switchboard_lookup::{LookupTransport, TransportFailure, TransportResponse};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// RECORDING RESPONDER
// ============================================================================

/// One call observed by [`RecordingResponder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponderCall {
    RespondDirectly {
        interaction_id: Snowflake,
        message: ResponseMessage,
    },
    AcknowledgeImmediately {
        interaction_id: Snowflake,
        visibility: Visibility,
    },
    AcknowledgeDeferred {
        interaction_id: Snowflake,
        visibility: Visibility,
    },
    FollowUp {
        interaction_id: Snowflake,
        message: ResponseMessage,
    },
}

impl ResponderCall {
    pub fn operation(&self) -> &'static str {
        match self {
            ResponderCall::RespondDirectly { .. } => "respond_directly",
            ResponderCall::AcknowledgeImmediately { .. } => "acknowledge_immediately",
            ResponderCall::AcknowledgeDeferred { .. } => "acknowledge_deferred",
            ResponderCall::FollowUp { .. } => "send_follow_up",
        }
    }

    pub fn interaction_id(&self) -> Snowflake {
        match self {
            ResponderCall::RespondDirectly { interaction_id, .. }
            | ResponderCall::AcknowledgeImmediately { interaction_id, .. }
            | ResponderCall::AcknowledgeDeferred { interaction_id, .. }
            | ResponderCall::FollowUp { interaction_id, .. } => *interaction_id,
        }
    }

    /// Content carried by the call, if any.
    pub fn message(&self) -> Option<&ResponseMessage> {
        match self {
            ResponderCall::RespondDirectly { message, .. }
            | ResponderCall::FollowUp { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Responder that records every call in order. Operations listed with
/// [`RecordingResponder::failing_on`] return a delivery failure instead.
#[derive(Debug, Default)]
pub struct RecordingResponder {
    calls: Mutex<Vec<ResponderCall>>,
    failing: Vec<&'static str>,
}

impl RecordingResponder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call to `operation` (e.g. `"send_follow_up"`).
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.failing.push(operation);
        self
    }

    pub fn calls(&self) -> Vec<ResponderCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn calls_for(&self, interaction_id: impl Into<Snowflake>) -> Vec<ResponderCall> {
        let id = interaction_id.into();
        self.calls()
            .into_iter()
            .filter(|call| call.interaction_id() == id)
            .collect()
    }

    /// Operation names in call order.
    pub fn operations(&self) -> Vec<&'static str> {
        self.calls().iter().map(ResponderCall::operation).collect()
    }

    /// Content of every message sent, in order.
    pub fn contents(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(ResponderCall::message)
            .map(|m| m.content.clone())
            .collect()
    }

    fn record(&self, call: ResponderCall) -> Result<(), PlatformError> {
        let operation = call.operation();
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        if self.failing.contains(&operation) {
            return Err(PlatformError::DeliveryFailed {
                operation,
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl InteractionResponder for RecordingResponder {
    async fn respond_directly(
        &self,
        event: &ActivationEvent,
        message: ResponseMessage,
    ) -> Result<(), PlatformError> {
        self.record(ResponderCall::RespondDirectly {
            interaction_id: event.interaction_id,
            message,
        })
    }

    async fn acknowledge_immediately(
        &self,
        event: &ActivationEvent,
        visibility: Visibility,
    ) -> Result<(), PlatformError> {
        self.record(ResponderCall::AcknowledgeImmediately {
            interaction_id: event.interaction_id,
            visibility,
        })
    }

    async fn acknowledge_deferred(
        &self,
        event: &ActivationEvent,
        visibility: Visibility,
    ) -> Result<(), PlatformError> {
        self.record(ResponderCall::AcknowledgeDeferred {
            interaction_id: event.interaction_id,
            visibility,
        })
    }

    async fn send_follow_up(
        &self,
        handle: &ResponseHandle,
        message: ResponseMessage,
    ) -> Result<(), PlatformError> {
        self.record(ResponderCall::FollowUp {
            interaction_id: handle.interaction_id,
            message,
        })
    }
}

// ============================================================================
// SCRIPTED TRANSPORT
// ============================================================================

/// Lookup transport answering from a fixed URL table. Unscripted URLs get a
/// transport failure.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: HashMap<String, TransportResponse>,
    requests: Mutex<Vec<String>>,
    count: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, url: impl Into<String>, response: TransportResponse) -> Self {
        self.responses.insert(url.into(), response);
        self
    }

    pub fn with_json(self, url: impl Into<String>, status: u16, body: &serde_json::Value) -> Self {
        self.with_response(url, TransportResponse::new(status, body.to_string()))
    }

    /// Total requests issued.
    pub fn request_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl LookupTransport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportFailure> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| TransportFailure(format!("no scripted response for {}", url)))
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Ready-made events and lookup payloads.

    use super::*;
    use serde_json::json;

    pub const BASE_URL: &str = "http://lookup.test/v2";
    pub const CHANNEL_ID: u64 = 800_000_000_000_000_001;
    pub const GUILD_ID: u64 = 900_000_000_000_000_001;

    pub fn test_user(id: u64) -> User {
        User::new(id, format!("user-{}", id))
    }

    /// A guild button press by `user_id`. The bot holds every permission it
    /// might be asked for.
    pub fn button_event(interaction_id: u64, user_id: u64, custom_id: &str) -> ActivationEvent {
        ActivationEvent::new(
            interaction_id,
            format!("token-{}", interaction_id),
            test_user(user_id),
            CHANNEL_ID,
            custom_id,
            ControlType::Button,
        )
        .with_guild(GUILD_ID)
        .with_app_permissions(Permissions::all().difference(Permissions::ADMINISTRATOR))
    }

    pub fn select_event(
        interaction_id: u64,
        user_id: u64,
        custom_id: &str,
        values: &[&str],
    ) -> ActivationEvent {
        let mut event = button_event(interaction_id, user_id, custom_id);
        event.control = ControlType::SelectMenu;
        event.with_values(values.iter().copied())
    }

    pub fn message_url(id: u64) -> String {
        format!("{}/messages/{}", BASE_URL, id)
    }

    /// Lookup payload for a proxied message, with one field the client does
    /// not know about.
    pub fn proxied_message_json(id: u64, sender: u64) -> serde_json::Value {
        json!({
            "id": id.to_string(),
            "original": (id - 1).to_string(),
            "sender": sender.to_string(),
            "channel": CHANNEL_ID.to_string(),
            "guild": GUILD_ID.to_string(),
            "timestamp": "2024-03-01T12:00:00Z",
            "system": { "id": "exmpl", "name": "Example System", "tag": null },
            "member": { "id": "abcde", "name": "riley", "display_name": "Riley" },
            "webhook": "123"
        })
    }

    pub fn not_found_json() -> serde_json::Value {
        json!({ "message": "Message not found.", "code": 20006 })
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for platform types.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_snowflake() -> impl Strategy<Value = Snowflake> {
        (1u64..(1u64 << 63)).prop_map(Snowflake::new)
    }

    pub fn arb_visibility() -> impl Strategy<Value = Visibility> {
        prop_oneof![Just(Visibility::Ephemeral), Just(Visibility::Public)]
    }

    pub fn arb_control_type() -> impl Strategy<Value = ControlType> {
        prop_oneof![Just(ControlType::Button), Just(ControlType::SelectMenu)]
    }

    pub fn arb_permissions() -> impl Strategy<Value = Permissions> {
        any::<u64>().prop_map(Permissions::from_bits_truncate)
    }

    pub fn arb_custom_id() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_:-]{0,31}"
    }

    pub fn arb_event() -> impl Strategy<Value = ActivationEvent> {
        (
            arb_snowflake(),
            arb_snowflake(),
            arb_custom_id(),
            arb_control_type(),
            arb_permissions(),
        )
            .prop_map(|(interaction_id, user_id, custom_id, control, permissions)| {
                ActivationEvent::new(
                    interaction_id,
                    format!("token-{}", interaction_id),
                    User::new(user_id, "generated"),
                    fixtures::CHANNEL_ID,
                    custom_id,
                    control,
                )
                .with_app_permissions(permissions)
            })
    }
}
