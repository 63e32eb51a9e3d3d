mod support;

use async_trait::async_trait;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use support::{CountingAction, Harness};
use switchboard_components::{
    check_fn, ActionResult, Callback, CallbackRegistry, CheckOutcome, ComponentAction,
    ComponentBuilder, ComponentRouter, DispatchOutcome, InvocationContext,
};
use switchboard_core::{CallbackError, CallbackKind, ComponentError, ControlType, DispatchError};
use switchboard_lookup::{LookupClient, MessageCache};
use switchboard_test_utils::fixtures::{
    button_event, message_url, not_found_json, proxied_message_json, select_event, BASE_URL,
};
use switchboard_test_utils::ScriptedTransport;

#[tokio::test]
async fn registered_callback_runs_with_its_checks() {
    let action = CountingAction::replying("picked");
    let calls = action.calls.clone();
    let mut registry = CallbackRegistry::new();
    registry.register(
        Callback::new("pick-colour", CallbackKind::EphemeralSelectMenu, action).with_check(
            check_fn("not_green", |event| {
                if event.values.iter().any(|v| v == "green") {
                    CheckOutcome::fail("Green is not allowed.")
                } else {
                    CheckOutcome::pass()
                }
            }),
        ),
    );
    let harness = Harness::new().with_registry(registry);
    let component = harness.build(ComponentBuilder::select_menu("colour").use_callback("pick-colour"));

    let outcome = component
        .handle(select_event(1, 2, "colour", &["green"]))
        .await
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::ProvidedCheckFailed { reported: true });
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let outcome = component
        .handle(select_event(2, 2, "colour", &["red"]))
        .await
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.responder.contents(), vec!["Green is not allowed.", "picked"]);
}

#[test]
fn callback_kind_must_match_component() {
    let mut registry = CallbackRegistry::new();
    registry.register(Callback::new(
        "confirm",
        CallbackKind::PublicButton,
        CountingAction::default(),
    ));
    let harness = Harness::new().with_registry(registry);

    let err = harness
        .try_build(ComponentBuilder::button("confirm").ephemeral().use_callback("confirm"))
        .unwrap_err();
    assert_eq!(
        err,
        ComponentError::Callback(CallbackError::KindMismatch {
            id: "confirm".to_string(),
            expected: CallbackKind::EphemeralButton,
            actual: CallbackKind::PublicButton,
        })
    );

    assert!(harness
        .try_build(ComponentBuilder::button("confirm").public().use_callback("confirm"))
        .is_ok());
}

#[test]
fn missing_callback_fails_at_build() {
    let harness = Harness::new();
    let err = harness
        .try_build(ComponentBuilder::button("b").use_callback("nowhere"))
        .unwrap_err();
    assert_eq!(
        err,
        ComponentError::Callback(CallbackError::NotFound {
            id: "nowhere".to_string()
        })
    );
}

#[tokio::test]
async fn router_dispatches_by_custom_id() {
    let harness = Harness::new();
    let yes = CountingAction::default();
    let yes_calls = yes.calls.clone();
    let no = CountingAction::default();
    let no_calls = no.calls.clone();

    let mut router = ComponentRouter::new();
    router
        .register(harness.try_build(ComponentBuilder::button("yes").action(yes)).unwrap())
        .unwrap();
    router
        .register(harness.try_build(ComponentBuilder::button("no").action(no)).unwrap())
        .unwrap();
    assert_eq!(router.len(), 2);

    router.dispatch(button_event(1, 1, "yes")).await.unwrap();
    router.dispatch(button_event(2, 1, "yes")).await.unwrap();
    router.dispatch(button_event(3, 1, "no")).await.unwrap();

    assert_eq!(yes_calls.load(Ordering::SeqCst), 2);
    assert_eq!(no_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn router_rejects_unknown_and_duplicate_ids() {
    let harness = Harness::new();
    let mut router = ComponentRouter::new();
    router
        .register(harness.try_build(ComponentBuilder::button("a").action(CountingAction::default())).unwrap())
        .unwrap();

    let err = router
        .register(harness.try_build(ComponentBuilder::button("a").action(CountingAction::default())).unwrap())
        .unwrap_err();
    assert_eq!(
        err,
        ComponentError::DuplicateCustomId {
            custom_id: "a".to_string()
        }
    );

    let err = router.dispatch(button_event(1, 1, "missing")).await.unwrap_err();
    assert_eq!(
        err,
        DispatchError::UnknownComponent {
            custom_id: "missing".to_string()
        }
    );
    assert!(harness.responder.calls().is_empty());

    assert!(router.unregister("a").is_some());
    assert!(router.is_empty());
}

#[tokio::test]
async fn activation_from_other_control_kind_is_rejected() {
    let harness = Harness::new();
    let pressed = CountingAction::default();
    let pressed_calls = pressed.calls.clone();
    let picked = CountingAction::default();
    let picked_calls = picked.calls.clone();

    let mut router = ComponentRouter::new();
    router
        .register(harness.try_build(ComponentBuilder::button("x").action(pressed)).unwrap())
        .unwrap();
    router
        .register(harness.try_build(ComponentBuilder::select_menu("menu").action(picked)).unwrap())
        .unwrap();

    let err = router
        .dispatch(select_event(1, 1, "x", &["a"]))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DispatchError::ControlMismatch {
            custom_id: "x".to_string(),
            expected: ControlType::Button,
            actual: ControlType::SelectMenu,
        }
    );

    let err = router.dispatch(button_event(2, 1, "menu")).await.unwrap_err();
    assert!(matches!(err, DispatchError::ControlMismatch { .. }));

    assert_eq!(pressed_calls.load(Ordering::SeqCst), 0);
    assert_eq!(picked_calls.load(Ordering::SeqCst), 0);
    assert!(harness.responder.calls().is_empty());

    router.dispatch(button_event(3, 1, "x")).await.unwrap();
    assert_eq!(pressed_calls.load(Ordering::SeqCst), 1);
}

/// Looks up the selected message and reports who sent it.
struct WhoSentAction {
    lookup: Arc<LookupClient<ScriptedTransport>>,
}

#[async_trait]
impl ComponentAction for WhoSentAction {
    async fn call(&self, ctx: &mut InvocationContext) -> ActionResult {
        let id = ctx.selected().unwrap_or_default().to_string();
        let message = self.lookup.fetch(&id).await?;
        let author = message.author_name().unwrap_or("someone").to_string();
        ctx.respond(format!("That was sent by {}.", author))
            .await
            .map_err(switchboard_components::ActionError::unexpected)?;
        Ok(())
    }
}

#[tokio::test]
async fn lookup_misses_are_relayed_to_the_user() {
    let transport = ScriptedTransport::new()
        .with_json(message_url(500), 200, &proxied_message_json(500, 9))
        .with_json(message_url(404), 404, &not_found_json());
    let lookup = Arc::new(LookupClient::new(
        transport,
        BASE_URL,
        Arc::new(MessageCache::new(32).unwrap()),
    ));
    let harness = Harness::new();
    let component = harness.build(
        ComponentBuilder::select_menu("who")
            .action(WhoSentAction { lookup: lookup.clone() }),
    );

    let found = component.handle(select_event(1, 2, "who", &["500"])).await.unwrap();
    assert_eq!(found, DispatchOutcome::Completed);

    let missing = component.handle(select_event(2, 2, "who", &["404"])).await.unwrap();
    assert_eq!(missing, DispatchOutcome::RelayedFailure);

    let unreachable = component.handle(select_event(3, 2, "who", &["1"])).await.unwrap();
    assert!(matches!(unreachable, DispatchOutcome::ExecutionFailed { .. }));

    let contents = harness.responder.contents();
    assert_eq!(contents[0], "That was sent by Riley.");
    assert_eq!(contents[1], "I couldn't find that message.");
    assert_eq!(lookup.cache().len(), 1);
}
