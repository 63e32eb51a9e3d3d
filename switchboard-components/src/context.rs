//! Per-activation invocation context.

use crate::response::{InteractionResponder, ResponseHandle};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use switchboard_core::{
    ActivationEvent, ControlType, PlatformError, ResponseMessage, Snowflake, User,
};

/// Everything a handler body needs about the activation it is handling.
///
/// Created fresh after acknowledgement and owned by a single in-flight
/// invocation.
pub struct InvocationContext {
    event: ActivationEvent,
    handle: ResponseHandle,
    responder: Arc<dyn InteractionResponder>,
    data: HashMap<String, JsonValue>,
}

impl InvocationContext {
    /// Build a context from the triggering event and the acknowledgement
    /// handle chosen for it.
    pub(crate) fn populate(
        event: ActivationEvent,
        handle: ResponseHandle,
        responder: Arc<dyn InteractionResponder>,
    ) -> Self {
        let mut data = HashMap::new();
        data.insert(
            "custom_id".to_string(),
            JsonValue::String(event.custom_id.clone()),
        );
        if event.control == ControlType::SelectMenu {
            data.insert(
                "values".to_string(),
                JsonValue::from(event.values.clone()),
            );
        }

        Self {
            event,
            handle,
            responder,
            data,
        }
    }

    pub fn event(&self) -> &ActivationEvent {
        &self.event
    }

    pub fn handle(&self) -> &ResponseHandle {
        &self.handle
    }

    pub(crate) fn handle_mut(&mut self) -> &mut ResponseHandle {
        &mut self.handle
    }

    pub fn user(&self) -> &User {
        &self.event.user
    }

    pub fn channel_id(&self) -> Snowflake {
        self.event.channel_id
    }

    pub fn guild_id(&self) -> Option<Snowflake> {
        self.event.guild_id
    }

    /// Selected option values (select menus only).
    pub fn values(&self) -> &[String] {
        &self.event.values
    }

    /// First selected value, if any.
    pub fn selected(&self) -> Option<&str> {
        self.event.values.first().map(String::as_str)
    }

    /// Stash auxiliary data for later steps of the handler.
    pub fn insert_data<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<(), serde_json::Error> {
        self.data.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn data(&self, key: &str) -> Option<&JsonValue> {
        self.data.get(key)
    }

    /// Send a follow-up with the component's visibility.
    pub async fn respond(&self, content: impl Into<String>) -> Result<(), PlatformError> {
        let message = ResponseMessage::new(content, self.handle.visibility);
        self.respond_with(message).await
    }

    pub async fn respond_with(&self, message: ResponseMessage) -> Result<(), PlatformError> {
        self.responder.send_follow_up(&self.handle, message).await
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("event", &self.event)
            .field("handle", &self.handle)
            .field("data", &self.data)
            .finish()
    }
}
