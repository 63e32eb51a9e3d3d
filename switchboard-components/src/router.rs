//! Routes activations to components by custom id.

use crate::component::{DispatchOutcome, InteractiveComponent};
use std::collections::HashMap;
use std::sync::Arc;
use switchboard_core::{ActivationEvent, ComponentError, DispatchError};
use tracing::warn;

/// Maps custom ids to live components.
#[derive(Debug, Default, Clone)]
pub struct ComponentRouter {
    components: HashMap<String, Arc<InteractiveComponent>>,
}

impl ComponentRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component. Custom ids are unique within a router.
    pub fn register(
        &mut self,
        component: InteractiveComponent,
    ) -> Result<Arc<InteractiveComponent>, ComponentError> {
        let custom_id = component.custom_id().to_string();
        if self.components.contains_key(&custom_id) {
            return Err(ComponentError::DuplicateCustomId { custom_id });
        }
        let component = Arc::new(component);
        self.components.insert(custom_id, component.clone());
        Ok(component)
    }

    pub fn unregister(&mut self, custom_id: &str) -> Option<Arc<InteractiveComponent>> {
        self.components.remove(custom_id)
    }

    pub fn get(&self, custom_id: &str) -> Option<&Arc<InteractiveComponent>> {
        self.components.get(custom_id)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Hand the event to the component it names. The router holds no lock
    /// of its own; each component serializes its own activations.
    pub async fn dispatch(&self, event: ActivationEvent) -> Result<DispatchOutcome, DispatchError> {
        let Some(component) = self.components.get(&event.custom_id).cloned() else {
            warn!(custom_id = %event.custom_id, "No component registered for custom id");
            return Err(DispatchError::UnknownComponent {
                custom_id: event.custom_id,
            });
        };
        component.handle(event).await
    }
}
