//! Check pipeline.
//!
//! Checks are gating predicates evaluated strictly in order; the first
//! failure short-circuits the pipeline. A failing check may carry a
//! [`DomainFailure`] to show the user, or fail silently.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use switchboard_core::{ActivationEvent, DomainFailure, Permissions};
use tracing::debug;

/// Result of evaluating a check (or a whole pipeline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Passed,
    /// `None` means the activation is dropped without telling the user.
    Failed(Option<DomainFailure>),
}

impl CheckOutcome {
    pub fn pass() -> Self {
        CheckOutcome::Passed
    }

    /// Fail with a reason the user will see.
    pub fn fail(reason: impl Into<String>) -> Self {
        CheckOutcome::Failed(Some(DomainFailure::new(reason)))
    }

    pub fn fail_silently() -> Self {
        CheckOutcome::Failed(None)
    }

    pub fn passed(&self) -> bool {
        matches!(self, CheckOutcome::Passed)
    }
}

impl From<bool> for CheckOutcome {
    fn from(passed: bool) -> Self {
        if passed {
            CheckOutcome::Passed
        } else {
            CheckOutcome::Failed(None)
        }
    }
}

/// A gating predicate over an activation event.
///
/// Checks are stateless across invocations.
#[async_trait]
pub trait Check: Send + Sync {
    async fn check(&self, event: &ActivationEvent) -> CheckOutcome;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Check backed by a synchronous closure.
pub struct FnCheck<F> {
    name: String,
    func: F,
}

/// Wrap a closure as a named [`Check`].
pub fn check_fn<F>(name: impl Into<String>, func: F) -> FnCheck<F>
where
    F: Fn(&ActivationEvent) -> CheckOutcome + Send + Sync,
{
    FnCheck {
        name: name.into(),
        func,
    }
}

#[async_trait]
impl<F> Check for FnCheck<F>
where
    F: Fn(&ActivationEvent) -> CheckOutcome + Send + Sync,
{
    async fn check(&self, event: &ActivationEvent) -> CheckOutcome {
        (self.func)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Passes when the bot holds every required permission in the channel.
///
/// Direct messages carry no channel permissions and always pass, as does
/// an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotPermissionsCheck {
    required: Permissions,
}

impl BotPermissionsCheck {
    pub fn new(required: Permissions) -> Self {
        Self { required }
    }

    pub fn required(&self) -> Permissions {
        self.required
    }
}

#[async_trait]
impl Check for BotPermissionsCheck {
    async fn check(&self, event: &ActivationEvent) -> CheckOutcome {
        if self.required.is_empty()
            || event.is_direct_message()
            || event.app_permissions.contains(Permissions::ADMINISTRATOR)
        {
            return CheckOutcome::Passed;
        }

        let missing = self.required.difference(event.app_permissions);
        if missing.is_empty() {
            CheckOutcome::Passed
        } else {
            CheckOutcome::fail(format!(
                "I don't have the permissions I need to do that: {}",
                missing.display_names().join(", ")
            ))
        }
    }

    fn name(&self) -> &str {
        "bot_permissions"
    }
}

/// Ordered, short-circuiting sequence of checks.
#[derive(Clone, Default)]
pub struct CheckPipeline {
    checks: Vec<Arc<dyn Check>>,
}

impl CheckPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a check.
    pub fn with(mut self, check: impl Check + 'static) -> Self {
        self.push(Arc::new(check));
        self
    }

    pub fn push(&mut self, check: Arc<dyn Check>) {
        self.checks.push(check);
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Evaluate checks in order, stopping at the first failure.
    pub async fn run(&self, event: &ActivationEvent) -> CheckOutcome {
        for check in &self.checks {
            let outcome = check.check(event).await;
            if !outcome.passed() {
                debug!(
                    check = check.name(),
                    custom_id = %event.custom_id,
                    reported = matches!(outcome, CheckOutcome::Failed(Some(_))),
                    "Check failed"
                );
                return outcome;
            }
        }
        CheckOutcome::Passed
    }
}

impl fmt::Debug for CheckPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.checks.iter().map(|c| c.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use switchboard_core::{ControlType, User};

    fn event() -> ActivationEvent {
        ActivationEvent::new(1u64, "token", User::new(2u64, "alice"), 3u64, "id", ControlType::Button)
            .with_guild(4u64)
    }

    struct CountingCheck {
        calls: Arc<AtomicUsize>,
        outcome: CheckOutcome,
    }

    #[async_trait]
    impl Check for CountingCheck {
        async fn check(&self, _event: &ActivationEvent) -> CheckOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    #[tokio::test]
    async fn test_empty_pipeline_passes() {
        assert!(CheckPipeline::new().run(&event()).await.passed());
    }

    #[tokio::test]
    async fn test_short_circuits_after_first_failure() {
        let never_run = Arc::new(AtomicUsize::new(0));
        let pipeline = CheckPipeline::new()
            .with(check_fn("fail", |_| CheckOutcome::fail("nope")))
            .with(CountingCheck {
                calls: never_run.clone(),
                outcome: CheckOutcome::Passed,
            });

        let outcome = pipeline.run(&event()).await;
        assert_eq!(outcome, CheckOutcome::fail("nope"));
        assert_eq!(never_run.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_runs_all_checks_in_order_when_passing() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let pipeline = CheckPipeline::new()
            .with(CountingCheck {
                calls: first.clone(),
                outcome: CheckOutcome::Passed,
            })
            .with(CountingCheck {
                calls: second.clone(),
                outcome: CheckOutcome::fail_silently(),
            });

        assert_eq!(pipeline.run(&event()).await, CheckOutcome::Failed(None));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bot_permissions_lists_missing() {
        let check = BotPermissionsCheck::new(Permissions::SEND_MESSAGES | Permissions::EMBED_LINKS);
        let event = event().with_app_permissions(Permissions::SEND_MESSAGES);

        match check.check(&event).await {
            CheckOutcome::Failed(Some(failure)) => {
                assert!(failure.reason().contains("Embed Links"));
                assert!(!failure.reason().contains("Send Messages"));
            }
            other => panic!("expected reported failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bot_permissions_pass_cases() {
        let check = BotPermissionsCheck::new(Permissions::MANAGE_MESSAGES);

        let admin = event().with_app_permissions(Permissions::ADMINISTRATOR);
        assert!(check.check(&admin).await.passed());

        let granted = event().with_app_permissions(Permissions::MANAGE_MESSAGES);
        assert!(check.check(&granted).await.passed());

        let mut direct = event();
        direct.guild_id = None;
        assert!(check.check(&direct).await.passed());
    }

    #[test]
    fn test_outcome_from_bool() {
        assert!(CheckOutcome::from(true).passed());
        assert_eq!(CheckOutcome::from(false), CheckOutcome::Failed(None));
    }
}
