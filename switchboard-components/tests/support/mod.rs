#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use switchboard_components::{
    ActionResult, CallbackRegistry, Check, CheckOutcome, ComponentAction, ComponentBuilder,
    ComponentSettings, InteractiveComponent, InvocationContext,
};
use switchboard_core::{ActivationEvent, ComponentError};
use switchboard_test_utils::RecordingResponder;

/// Builds components against a shared recording responder.
pub struct Harness {
    pub responder: Arc<RecordingResponder>,
    pub registry: Arc<CallbackRegistry>,
    pub settings: ComponentSettings,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_responder(RecordingResponder::new())
    }

    pub fn with_responder(responder: RecordingResponder) -> Self {
        Self {
            responder: Arc::new(responder),
            registry: Arc::new(CallbackRegistry::new()),
            settings: ComponentSettings::default(),
        }
    }

    pub fn with_registry(mut self, registry: CallbackRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_settings(mut self, settings: ComponentSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn try_build(&self, builder: ComponentBuilder) -> Result<InteractiveComponent, ComponentError> {
        builder.build(
            self.responder.clone(),
            self.registry.clone(),
            self.settings.clone(),
        )
    }

    pub fn build(&self, builder: ComponentBuilder) -> Arc<InteractiveComponent> {
        Arc::new(self.try_build(builder).expect("component builds"))
    }
}

/// Counts invocations and optionally replies.
#[derive(Default)]
pub struct CountingAction {
    pub calls: Arc<AtomicUsize>,
    pub reply: Option<String>,
}

impl CountingAction {
    pub fn replying(reply: &str) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            reply: Some(reply.to_string()),
        }
    }
}

#[async_trait]
impl ComponentAction for CountingAction {
    async fn call(&self, ctx: &mut InvocationContext) -> ActionResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reply) = &self.reply {
            ctx.respond(reply.clone())
                .await
                .map_err(switchboard_components::ActionError::unexpected)?;
        }
        Ok(())
    }
}

/// Sleeps inside the handler body while tracking how many bodies overlap.
#[derive(Clone)]
pub struct SlowAction {
    pub delay: Duration,
    pub active: Arc<AtomicUsize>,
    pub max_active: Arc<AtomicUsize>,
    pub order: Arc<Mutex<Vec<u64>>>,
}

impl SlowAction {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
            order: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn order(&self) -> Vec<u64> {
        self.order.lock().unwrap().clone()
    }
}

#[async_trait]
impl ComponentAction for SlowAction {
    async fn call(&self, ctx: &mut InvocationContext) -> ActionResult {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.order.lock().unwrap().push(ctx.user().id.get());
        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Passing check that sleeps while tracking how many checks overlap.
#[derive(Clone)]
pub struct SlowCheck {
    pub delay: Duration,
    pub active: Arc<AtomicUsize>,
    pub max_active: Arc<AtomicUsize>,
    pub runs: Arc<AtomicUsize>,
}

impl SlowCheck {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Check for SlowCheck {
    async fn check(&self, _event: &ActivationEvent) -> CheckOutcome {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.runs.fetch_add(1, Ordering::SeqCst);
        CheckOutcome::pass()
    }

    fn name(&self) -> &str {
        "slow"
    }
}
