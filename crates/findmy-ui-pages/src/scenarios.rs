//! Named, runnable test flows.
//!
//! Each scenario starts on the home screen of a freshly launched app and
//! drives it through the page objects. [`run`] takes care of the launch and
//! of resetting the context afterwards, so scenarios can run back to back on
//! one context.

use std::time::Duration;

use async_trait::async_trait;
use findmy_ui_core::alerts::{AlertQuery, AlertWait};
use findmy_ui_core::context::TestContext;
use findmy_ui_core::error::{ensure, UiError};
use findmy_ui_core::notifications::NotificationQuery;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::base::{arrive, Page};
use crate::main_page::{MainPage, Tab};
use crate::me_page::MePage;
use crate::navigation::{NavResult, NavigationError};

/// The device the device scenarios look for, by a fragment of its name.
pub const DEVICE_KEYWORD: &str = "Laptop";

/// How long the detail map and the home list get to show up.
const SCREEN_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait(?Send)]
pub trait Scenario {
    /// Stable name used on the command line.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Runs the flow against an app that has just been launched.
    async fn run(&self, ctx: &mut TestContext) -> NavResult<()>;
}

/// Every scenario, in the order `list` shows them.
pub fn all() -> Vec<Box<dyn Scenario>> {
    vec![
        Box::new(NavigateTabs),
        Box::new(DevicePlaySound),
        Box::new(DeviceDetails),
        Box::new(DeviceDirections),
        Box::new(DeviceLocation),
        Box::new(FirstDevice),
        Box::new(FirstPerson),
        Box::new(FirstItem),
        Box::new(MeClearIgnored),
        Box::new(ClearNotifications),
        Box::new(PlaySoundNotification),
    ]
}

pub fn find(name: &str) -> Option<Box<dyn Scenario>> {
    all().into_iter().find(|s| s.name() == name)
}

/// Result of one scenario run.
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub name: &'static str,
    pub elapsed: Duration,
    pub result: NavResult<()>,
}

impl ScenarioOutcome {
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

/// Launches the app, runs `scenario` and resets the context.
///
/// A failed reset is only reported when the scenario itself passed.
pub async fn run(scenario: &dyn Scenario, ctx: &mut TestContext) -> ScenarioOutcome {
    let name = scenario.name();
    let span = info_span!("scenario", name);
    async {
        let start = Instant::now();
        let mut result = match ctx.launch_app().await {
            Ok(_) => scenario.run(ctx).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = &result {
            warn!(error = %e, "scenario failed");
            ctx.report().note(format!("{name} failed: {e}")).await;
        }
        if let Err(e) = ctx.reset().await {
            warn!(error = %e, "reset failed");
            if result.is_ok() {
                result = Err(e.into());
            }
        }
        let elapsed = start.elapsed();
        info!(passed = result.is_ok(), elapsed_ms = elapsed.as_millis() as u64, "scenario finished");
        ScenarioOutcome { name, elapsed, result }
    }
    .instrument(span)
    .await
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

pub struct NavigateTabs;

#[async_trait(?Send)]
impl Scenario for NavigateTabs {
    fn name(&self) -> &'static str {
        "navigate-tabs"
    }

    fn description(&self) -> &'static str {
        "Visit every tab, check it becomes selected and screenshot it"
    }

    async fn run(&self, ctx: &mut TestContext) -> NavResult<()> {
        MainPage::wait(ctx).await?.verify_all_tabs_visible().await?;
        // Pages borrow the context, so each one is dropped before the screenshot.
        for tab in [Tab::People, Tab::Devices, Tab::Items] {
            {
                let main = MainPage::wait(ctx).await?.select_tab(tab).await?;
                main.verify_tab_selected(tab).await?;
                main.verify_list_displayed().await?;
            }
            ctx.capture_screenshot(&tab_screenshot(tab)).await?;
        }

        MainPage::wait(ctx).await?.open_me().await?.verify_displayed().await?;
        ctx.capture_screenshot(&tab_screenshot(Tab::Me)).await?;

        let me: MePage<'_> = arrive(ctx, None).await?;
        let main = me.select_tab(Tab::People).await?;
        main.verify_tab_selected(Tab::People).await?;
        Ok(())
    }
}

/// `people_tab`, `devices_tab` and so on.
pub fn tab_screenshot(tab: Tab) -> String {
    format!("{}_tab", tab.label().to_lowercase())
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

pub struct DevicePlaySound;

#[async_trait(?Send)]
impl Scenario for DevicePlaySound {
    fn name(&self) -> &'static str {
        "device-play-sound"
    }

    fn description(&self) -> &'static str {
        "Play a sound on the laptop, acknowledge the alert and close the card"
    }

    async fn run(&self, ctx: &mut TestContext) -> NavResult<()> {
        let detail = MainPage::wait(ctx)
            .await?
            .go_to_devices()
            .await?
            .open_device(DEVICE_KEYWORD)
            .await?;
        detail.base().verify_exists(crate::base::map(), Some(SCREEN_TIMEOUT)).await?;

        let name = detail.device_name().await?;
        ensure(name.to_lowercase().contains(&DEVICE_KEYWORD.to_lowercase()), || {
            format!("device name {name:?} does not mention {DEVICE_KEYWORD}")
        })?;

        detail.verify_play_sound_visible().await?;
        let detail = detail.play_sound().await?;

        let alerts = ctx.alerts();
        match alerts
            .wait_for_alert(&AlertQuery::any(), Some(ctx.config().sound_alert_timeout()))
            .await?
        {
            AlertWait::Found(alert) if alert.buttons().iter().any(|b| b == "OK") => {
                debug!(title = %alert.title(), "acknowledging alert");
                ensure(alerts.tap_ok().await?, || "OK could not be tapped".to_string())?;
                alerts.verify_no_alert().await?;
            }
            AlertWait::Found(alert) => debug!(title = %alert.title(), "alert without OK left alone"),
            AlertWait::TimedOut => debug!("no alert after play sound"),
        }

        let main = detail.close().await?;
        main.base()
            .verify_exists(MainPage::anchor(), Some(SCREEN_TIMEOUT))
            .await?;
        Ok(())
    }
}

pub struct DeviceDetails;

#[async_trait(?Send)]
impl Scenario for DeviceDetails {
    fn name(&self) -> &'static str {
        "device-details"
    }

    fn description(&self) -> &'static str {
        "Open the laptop card and check its actions are offered"
    }

    async fn run(&self, ctx: &mut TestContext) -> NavResult<()> {
        let detail = MainPage::wait(ctx)
            .await?
            .go_to_devices()
            .await?
            .open_device(DEVICE_KEYWORD)
            .await?;
        detail.verify_play_sound_visible().await?;
        detail.verify_directions_visible().await?;
        detail.verify_lost_mode_visible().await?;
        detail.verify_close_visible().await?;
        detail.close().await?;
        Ok(())
    }
}

pub struct DeviceDirections;

#[async_trait(?Send)]
impl Scenario for DeviceDirections {
    fn name(&self) -> &'static str {
        "device-directions"
    }

    fn description(&self) -> &'static str {
        "Ask for directions to the laptop"
    }

    async fn run(&self, ctx: &mut TestContext) -> NavResult<()> {
        let detail = MainPage::wait(ctx)
            .await?
            .go_to_devices()
            .await?
            .open_device(DEVICE_KEYWORD)
            .await?;
        detail.verify_directions_visible().await?;
        ensure(detail.is_directions_enabled().await?, || {
            "directions should be enabled".to_string()
        })?;
        detail.get_directions().await?.close().await?;
        Ok(())
    }
}

pub struct DeviceLocation;

#[async_trait(?Send)]
impl Scenario for DeviceLocation {
    fn name(&self) -> &'static str {
        "device-location"
    }

    fn description(&self) -> &'static str {
        "Check the laptop card shows where and when it was last seen"
    }

    async fn run(&self, ctx: &mut TestContext) -> NavResult<()> {
        let detail = MainPage::wait(ctx)
            .await?
            .go_to_devices()
            .await?
            .open_device(DEVICE_KEYWORD)
            .await?;
        let location = detail.location_text().await?;
        let last_seen = detail.last_seen_text().await?;
        ensure(!location.is_empty(), || "location text is empty".to_string())?;
        ensure(!last_seen.is_empty(), || "last seen text is empty".to_string())?;
        detail.verify_map_displayed().await?;
        detail.close().await?;
        Ok(())
    }
}

pub struct FirstDevice;

#[async_trait(?Send)]
impl Scenario for FirstDevice {
    fn name(&self) -> &'static str {
        "first-device"
    }

    fn description(&self) -> &'static str {
        "Open whichever device is listed first"
    }

    async fn run(&self, ctx: &mut TestContext) -> NavResult<()> {
        let main = MainPage::wait(ctx).await?.go_to_devices().await?;
        main.verify_list_displayed().await?;
        let count = main.verify_list_has_at_least(1).await?;
        debug!(count, "devices listed");
        let detail = main.open_device_at(0).await?;
        detail.verify_displayed().await?;
        detail.close().await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// People, items and Me
// ---------------------------------------------------------------------------

pub struct FirstPerson;

#[async_trait(?Send)]
impl Scenario for FirstPerson {
    fn name(&self) -> &'static str {
        "first-person"
    }

    fn description(&self) -> &'static str {
        "Open the first person sharing their location"
    }

    async fn run(&self, ctx: &mut TestContext) -> NavResult<()> {
        let detail = MainPage::wait(ctx).await?.open_first_person().await?;
        detail.verify_displayed().await?;
        let name = detail.person_name().await?;
        ensure(!name.is_empty(), || "person name is empty".to_string())?;
        detail.verify_contact_visible().await?;
        detail.verify_directions_visible().await?;
        detail.close().await?;
        Ok(())
    }
}

pub struct FirstItem;

#[async_trait(?Send)]
impl Scenario for FirstItem {
    fn name(&self) -> &'static str {
        "first-item"
    }

    fn description(&self) -> &'static str {
        "Open the first item and check its card"
    }

    async fn run(&self, ctx: &mut TestContext) -> NavResult<()> {
        let detail = MainPage::wait(ctx).await?.open_first_item().await?;
        detail.verify_displayed().await?;
        let name = detail.item_name().await?;
        detail.verify_item_name(&name).await?;
        detail.verify_play_sound_visible().await?;
        detail.verify_find_nearby_visible().await?;
        detail.close().await?;
        Ok(())
    }
}

pub struct MeClearIgnored;

#[async_trait(?Send)]
impl Scenario for MeClearIgnored {
    fn name(&self) -> &'static str {
        "me-clear-ignored"
    }

    fn description(&self) -> &'static str {
        "Start clearing ignored items on the Me tab, then cancel"
    }

    async fn run(&self, ctx: &mut TestContext) -> NavResult<()> {
        let me = MainPage::wait(ctx).await?.open_me().await?;
        me.verify_displayed().await?;
        let me = me.clear_ignored_items().await?.confirm_clear_ignored(false).await?;
        ctx.alerts().verify_no_alert().await?;
        ensure(me.is_displayed().await?, || "Me page should still be shown".to_string())?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

pub struct ClearNotifications;

#[async_trait(?Send)]
impl Scenario for ClearNotifications {
    fn name(&self) -> &'static str {
        "clear-notifications"
    }

    fn description(&self) -> &'static str {
        "Clear the notification centre and check it stays empty"
    }

    async fn run(&self, ctx: &mut TestContext) -> NavResult<()> {
        MainPage::wait(ctx).await?;
        let notifications = ctx.notifications();
        let before = notifications.count().await?;
        debug!(before, "notifications before clearing");
        notifications.clear_all().await?;
        let settle = ctx.config().soft_settle();
        ensure(notifications.wait_until_cleared(settle).await?, || {
            format!("notifications still present {}ms after clearing", settle.as_millis())
        })?;
        ensure(!notifications.has_notifications().await?, || {
            "notification centre is not empty".to_string()
        })?;
        Ok(())
    }
}

pub struct PlaySoundNotification;

#[async_trait(?Send)]
impl Scenario for PlaySoundNotification {
    fn name(&self) -> &'static str {
        "play-sound-notification"
    }

    fn description(&self) -> &'static str {
        "Play a sound on the first device and wait for its notification"
    }

    async fn run(&self, ctx: &mut TestContext) -> NavResult<()> {
        // The Play Sound alert is left to the default handler.
        ctx.add_default_interruption_handler();

        let detail = MainPage::wait(ctx).await?.open_first_device().await?;
        detail.verify_displayed().await?;

        let notifications = ctx.notifications();
        notifications.clear_all().await?;
        notifications.wait_until_cleared(ctx.config().soft_settle()).await?;

        let detail = detail.play_sound().await?;
        let query = NotificationQuery::matches(".*(sound|playing|Sound).*").map_err(UiError::from)?;
        match notifications
            .wait_for_notification(&query, Some(ctx.config().sound_alert_timeout()), false)
            .await?
        {
            Some(found) => info!(label = found.label_text(), "sound notification received"),
            None => return Err(missing_notification(&query)),
        }
        notifications
            .verify_notification_exists(&NotificationQuery::text_contains("Sound playing"), None)
            .await?;

        detail.close().await?;
        Ok(())
    }
}

#[track_caller]
fn missing_notification(query: &NotificationQuery) -> NavigationError {
    UiError::assertion(format!("no notification matching {query}")).into()
}
