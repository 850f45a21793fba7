//! Dispatcher behaviour: re-resolution before acting, post-conditions and
//! report records.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{app_screen, button, context};

use findmy_ui_core::action::{Action, ActionOutcome, SwipeDirection};
use findmy_ui_core::descriptor::Descriptor;
use findmy_ui_core::dispatch::{DispatchOutcome, PostCondition};
use findmy_ui_core::element::{kind, UIElement};
use findmy_ui_core::memory::{MemoryBackend, RecordedAction};

fn devices_tab() -> Descriptor {
    Descriptor::label("Devices").of_type(kind::BUTTON)
}

// ---------------------------------------------------------------------------
// No backend action on a missing element
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_missing_element_sends_nothing() {
    let backend = Arc::new(MemoryBackend::new(app_screen(vec![button("People", 780.0)])));
    let ctx = context(&backend);
    let dispatcher = ctx.dispatcher();

    let actions = [
        Action::Tap,
        Action::DoubleTap,
        Action::LongPress { duration_ms: 1_000 },
        Action::Swipe { direction: SwipeDirection::Left },
        Action::TypeText { text: "Laptop".into() },
        Action::ClearText,
    ];
    for action in actions {
        let outcome = dispatcher.perform(&devices_tab(), action, None).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::NotFound);
    }
    assert!(backend.gestures().is_empty());

    let records = ctx.report().actions().await;
    assert_eq!(records.len(), 6);
    assert!(records.iter().all(|r| r.outcome == ActionOutcome::NotFound));
}

#[tokio::test(start_paused = true)]
async fn test_element_removed_after_wait_is_not_tapped() {
    let backend = Arc::new(MemoryBackend::new(app_screen(vec![button("Devices", 780.0)])));
    let ctx = context(&backend);

    let seen = ctx.waiter().wait_for_element(&devices_tab(), None).await.unwrap();
    assert!(seen.is_some());

    backend.mutate(|screen| {
        screen.remove(&Descriptor::label("Devices"));
    });
    let outcome = ctx.dispatcher().tap(&devices_tab()).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::NotFound);
    assert!(backend.gestures().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_tap_uses_fresh_position() {
    let backend = Arc::new(MemoryBackend::new(app_screen(vec![button("Devices", 780.0)])));
    let ctx = context(&backend);
    ctx.waiter().wait_for_element(&devices_tab(), None).await.unwrap();

    backend.mutate(|screen| {
        screen.update(&Descriptor::label("Devices"), |b| {
            b.frame = Some(findmy_ui_core::element::ElementFrame::new(20.0, 100.0, 350.0, 44.0));
        });
    });
    ctx.dispatcher().tap(&devices_tab()).await.unwrap();
    assert_eq!(backend.gestures(), vec![RecordedAction::Tap { x: 195, y: 122 }]);
}

// ---------------------------------------------------------------------------
// Post-conditions
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_post_condition_met() {
    let backend = Arc::new(MemoryBackend::new(app_screen(vec![button("Devices", 780.0)])));
    backend.on_tap(Descriptor::label("Devices"), |screen| {
        screen.app[0].children.push(
            UIElement::new(kind::TABLE)
                .with_id("FindMyListEntries")
                .with_frame(0.0, 120.0, 390.0, 600.0),
        );
    });
    let ctx = context(&backend);

    let list = Descriptor::id("FindMyListEntries");
    let outcome = ctx
        .dispatcher()
        .perform(&devices_tab(), Action::Tap, Some(PostCondition::Appears(list)))
        .await
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::Performed { post_condition_met: Some(true) });
}

#[tokio::test(start_paused = true)]
async fn test_post_condition_miss_is_not_fatal() {
    let backend = Arc::new(MemoryBackend::new(app_screen(vec![button("Devices", 780.0)])));
    let ctx = context(&backend);

    let outcome = ctx
        .dispatcher()
        .perform(&devices_tab(), Action::Tap, Some(PostCondition::Gone))
        .await
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::Performed { post_condition_met: Some(false) });
    assert_eq!(backend.gestures().len(), 1);

    let records = ctx.report().actions().await;
    assert_eq!(records[0].outcome, ActionOutcome::PostConditionMissed);
    assert!(records[0].outcome.is_delivered());
}

// ---------------------------------------------------------------------------
// Gestures
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_type_text_focuses_then_types() {
    let field = UIElement::new(kind::TEXT_FIELD)
        .with_id("SearchField")
        .with_frame(20.0, 120.0, 350.0, 36.0);
    let backend = Arc::new(MemoryBackend::new(app_screen(vec![field])));
    let ctx = context(&backend);

    let search = Descriptor::id("SearchField");
    ctx.dispatcher().type_text(&search, "Laptop").await.unwrap();
    assert_eq!(
        backend.gestures(),
        vec![
            RecordedAction::Tap { x: 195, y: 138 },
            RecordedAction::TypeText("Laptop".into()),
        ]
    );
    let value = ctx.waiter().resolve_now(&search).await.unwrap().and_then(|f| f.value);
    assert_eq!(value.as_deref(), Some("Laptop"));
}

#[tokio::test(start_paused = true)]
async fn test_long_press_uses_configured_hold() {
    let backend = Arc::new(MemoryBackend::new(app_screen(vec![button("Chi’s Laptop", 200.0)])));
    let ctx = context(&backend);
    ctx.dispatcher().long_press(&Descriptor::label("Chi’s Laptop")).await.unwrap();
    assert_eq!(
        backend.gestures(),
        vec![RecordedAction::LongPress {
            x: 195,
            y: 222,
            duration: Duration::from_millis(ctx.config().long_press_ms),
        }]
    );
}
