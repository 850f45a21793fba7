//! Scenarios end to end against the simulated app.

mod common;

use std::time::Duration;

use common::{launched, simulated, taps};

use findmy_ui_core::descriptor::{Descriptor, Scope};
use findmy_ui_core::element::kind;
use findmy_ui_core::memory::RecordedAction;
use findmy_ui_core::report::ReportEntry;
use findmy_ui_pages::{device_detail, fixture};
use findmy_ui_pages::navigation::NavigationError;
use findmy_ui_pages::scenarios::{self, ClearNotifications, DevicePlaySound, NavigateTabs, Scenario};

// Tap points on the simulated 390x844 screen.
const DEVICES_TAB: (i32, i32) = (146, 805);
const FIRST_CELL: (i32, i32) = (195, 142);
const PLAY_SOUND: (i32, i32) = (195, 536);
const ALERT_OK: (i32, i32) = (195, 382);
const CARD_CLOSE: (i32, i32) = (352, 425);
const CENTRE_CLEAR: (i32, i32) = (352, 75);
const ALERT_SECOND_BUTTON: (i32, i32) = (195, 432);

fn play_sound_on_device() -> Descriptor {
    Descriptor::label(device_detail::PLAY_SOUND_LABEL).within(Descriptor::id(fixture::DEVICE_CARD_ID))
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[test]
fn test_scenario_names_are_unique() {
    let all = scenarios::all();
    let mut names: Vec<_> = all.iter().map(|s| s.name()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), all.len());
    assert!(all.iter().all(|s| !s.description().is_empty()));
}

#[test]
fn test_find_by_name() {
    assert_eq!(scenarios::find("device-play-sound").unwrap().name(), "device-play-sound");
    assert!(scenarios::find("no-such-scenario").is_none());
}

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_navigate_tabs_screenshots_each_tab() {
    let (_backend, mut ctx) = launched().await;
    NavigateTabs.run(&mut ctx).await.unwrap();

    let names: Vec<_> = ctx.screenshot_names().collect();
    assert_eq!(names, ["devices_tab", "items_tab", "me_tab", "people_tab"]);
    assert!(!ctx.screenshot("me_tab").unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_tab_screenshots_reach_the_report() {
    let (_backend, mut ctx) = simulated();
    assert!(scenarios::run(&NavigateTabs, &mut ctx).await.passed());

    let shots: Vec<_> = ctx
        .report()
        .entries()
        .await
        .into_iter()
        .filter_map(|e| match e {
            ReportEntry::Screenshot { name, .. } => Some(name),
            _ => None,
        })
        .collect();
    assert_eq!(shots, ["people_tab", "devices_tab", "items_tab", "me_tab"]);
    // The context's own copies go with the reset.
    assert_eq!(ctx.screenshot_names().count(), 0);
}

// ---------------------------------------------------------------------------
// Device flow
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_device_play_sound_flow() {
    let (backend, mut ctx) = simulated();

    let outcome = scenarios::run(&DevicePlaySound, &mut ctx).await;
    assert!(outcome.passed(), "{:?}", outcome.result);

    let taps: Vec<_> = taps(&backend);
    assert_eq!(taps, vec![DEVICES_TAB, FIRST_CELL, PLAY_SOUND, ALERT_OK, CARD_CLOSE]);
    assert!(!backend.screen().contains(&Descriptor::of_kind(kind::ALERT).system()));
    // The run ends with a reset, which terminates the app.
    assert!(backend.launched().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_device_play_sound_stays_within_timeouts() {
    let (_backend, mut ctx) = simulated();
    let outcome = scenarios::run(&DevicePlaySound, &mut ctx).await;
    assert!(outcome.passed());
    // Map and list each get 10s and the alert 15s; the simulator answers at once,
    // so only settle delays add up.
    assert!(outcome.elapsed < Duration::from_secs(10), "took {:?}", outcome.elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_device_play_sound_without_alert() {
    let (backend, mut ctx) = simulated();
    // Runs after the fixture's own reaction and takes its alert away again.
    backend.on_tap(play_sound_on_device(), |s| {
        s.remove_all(&Descriptor::of_kind(kind::ALERT).system());
    });

    let outcome = scenarios::run(&DevicePlaySound, &mut ctx).await;
    assert!(outcome.passed(), "{:?}", outcome.result);
    assert_eq!(taps(&backend), vec![DEVICES_TAB, FIRST_CELL, PLAY_SOUND, CARD_CLOSE]);
    // The whole alert window was waited out.
    assert!(outcome.elapsed >= ctx.config().sound_alert_timeout(), "took {:?}", outcome.elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_alert_without_ok_gets_its_first_button() {
    let (backend, mut ctx) = simulated();
    backend.on_tap(play_sound_on_device(), |s| {
        s.remove_all(&Descriptor::of_kind(kind::ALERT).system());
        let alert = fixture::alert(fixture::PLAY_SOUND_ALERT_TITLE, "Sound is playing.", &["Stop", "Cancel"]);
        s.push_root(Scope::System, alert);
    });
    let scenario = scenarios::find("play-sound-notification").unwrap();

    let outcome = scenarios::run(scenario.as_ref(), &mut ctx).await;
    assert!(outcome.passed(), "{:?}", outcome.result);
    let taps = taps(&backend);
    let stop = taps.iter().position(|t| *t == ALERT_OK).expect("first alert button tapped");
    let close = taps.iter().position(|t| *t == CARD_CLOSE).unwrap();
    assert!(stop < close);
    assert!(!taps.contains(&ALERT_SECOND_BUTTON));
    assert!(!backend.screen().contains(&Descriptor::of_kind(kind::ALERT).system()));
}

#[tokio::test(start_paused = true)]
async fn test_missing_device_is_reported_not_tapped() {
    use findmy_ui_pages::main_page::MainPage;

    let (backend, ctx) = launched().await;
    let result = MainPage::wait(&ctx)
        .await
        .unwrap()
        .go_to_devices()
        .await
        .unwrap()
        .open_device("Tablet")
        .await;

    match result {
        Err(NavigationError::ElementMissing { page, .. }) => assert_eq!(page, "main"),
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("no tablet should be listed"),
    }
    assert_eq!(taps(&backend), vec![DEVICES_TAB]);
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_clear_notifications_scenario() {
    let (_backend, mut ctx) = simulated();
    let outcome = scenarios::run(&ClearNotifications, &mut ctx).await;
    assert!(outcome.passed(), "{:?}", outcome.result);
}

#[tokio::test(start_paused = true)]
async fn test_clear_all_empties_centre_within_settle() {
    let (backend, ctx) = launched().await;
    let notifications = ctx.notifications();
    assert_eq!(notifications.count().await.unwrap(), fixture::INITIAL_NOTIFICATIONS.len());

    assert!(notifications.clear_all().await.unwrap());
    assert!(notifications.wait_until_cleared(Duration::from_secs(2)).await.unwrap());
    assert!(!notifications.has_notifications().await.unwrap());

    assert_eq!(
        backend.gestures(),
        vec![
            RecordedAction::Swipe { from: (195, 24), to: (195, 675) },
            RecordedAction::Tap { x: CENTRE_CLEAR.0, y: CENTRE_CLEAR.1 },
            RecordedAction::Tap { x: CENTRE_CLEAR.0, y: CENTRE_CLEAR.1 },
            RecordedAction::Swipe { from: (195, 675), to: (195, 0) },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_play_sound_notification_with_default_handler() {
    let (backend, mut ctx) = simulated();
    let scenario = scenarios::find("play-sound-notification").unwrap();

    let outcome = scenarios::run(scenario.as_ref(), &mut ctx).await;
    assert!(outcome.passed(), "{:?}", outcome.result);
    // The handler cleared the Play Sound alert before Close was tapped.
    let taps = taps(&backend);
    let ok = taps.iter().position(|t| *t == ALERT_OK).unwrap();
    let close = taps.iter().position(|t| *t == CARD_CLOSE).unwrap();
    assert!(ok < close);
}

// ---------------------------------------------------------------------------
// Whole suite
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_every_scenario_passes_on_simulator() {
    let (_backend, mut ctx) = simulated();
    for scenario in scenarios::all() {
        let outcome = scenarios::run(scenario.as_ref(), &mut ctx).await;
        assert!(outcome.passed(), "{} failed: {:?}", outcome.name, outcome.result);
    }
    assert!(ctx.app().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_disconnected_simulator_is_environment_failure() {
    let (backend, mut ctx) = simulated();
    backend.disconnect();

    let outcome = scenarios::run(&DevicePlaySound, &mut ctx).await;
    let err = outcome.result.unwrap_err();
    assert!(err.is_environment(), "{err}");
    assert!(taps(&backend).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_scenario_state_is_reset_between_runs() {
    let (_backend, mut ctx) = simulated();
    ctx.set_test_data("device", "Chi’s Laptop");

    let first = scenarios::find("first-device").unwrap();
    assert!(scenarios::run(first.as_ref(), &mut ctx).await.passed());
    assert!(ctx.test_data("device").is_none());
    assert!(scenarios::run(first.as_ref(), &mut ctx).await.passed());
}
