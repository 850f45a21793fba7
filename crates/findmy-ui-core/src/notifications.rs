//! Notification centre helpers.
//!
//! Notifications live in the system scope. The centre is opened and closed
//! with raw swipes across the screen, which are not tied to any element, so
//! they go straight to the backend. Everything that targets a notification
//! goes through the dispatcher.

use std::fmt;
use std::panic::Location;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use crate::action::SwipeDirection;
use crate::config::SuiteConfig;
use crate::descriptor::{Descriptor, DescriptorError, Matcher, Scope};
use crate::dispatch::Dispatcher;
use crate::element::{kind, UIElement};
use crate::error::{UiError, Verification};
use crate::report::Report;
use crate::wait::{poll_until, Waiter};

/// Identifier of a notification banner in the centre.
pub const NOTIFICATION_ID: &str = "NotificationShortLookView";
/// Identifier fragment shared by notification list cells.
pub const NOTIFICATION_CELL_ID: &str = "NotificationCell";
pub const CLEAR_LABEL: &str = "Clear";
pub const CLEAR_ALL_LABEL: &str = "Clear All Notifications";

/// Logical size used when no root reports a frame.
const FALLBACK_SCREEN: (f64, f64) = (390.0, 844.0);

/// Which notification to look for.
#[derive(Debug, Clone)]
pub struct NotificationQuery {
    descriptor: Descriptor,
}

impl NotificationQuery {
    pub fn any() -> Self {
        Self {
            descriptor: Descriptor::id(NOTIFICATION_ID).system(),
        }
    }

    /// A notification whose label, or one of its texts, is exactly `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self::with_text(Matcher::Label(text.into()))
    }

    /// A notification mentioning `part`, ignoring case.
    pub fn text_contains(part: impl AsRef<str>) -> Self {
        Self::with_text(Matcher::LabelContains(part.as_ref().to_lowercase()))
    }

    pub fn matches(pattern: &str) -> Result<Self, DescriptorError> {
        let matcher = Descriptor::label_matches(pattern)?.matcher().clone();
        Ok(Self::with_text(matcher))
    }

    /// A notification posted by the app named `app`.
    pub fn from_app(app: impl AsRef<str>) -> Self {
        let name = Matcher::All(vec![
            Matcher::Type(kind::STATIC_TEXT.to_string()),
            Matcher::LabelContains(app.as_ref().to_lowercase()),
        ]);
        Self {
            descriptor: Self::any().descriptor.containing(name),
        }
    }

    fn with_text(text: Matcher) -> Self {
        let matcher = Matcher::Any(vec![text.clone(), Matcher::HasDescendant(Box::new(text))]);
        Self {
            descriptor: Self::any().descriptor.and(matcher),
        }
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }
}

impl Default for NotificationQuery {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Display for NotificationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descriptor)
    }
}

/// Notification centre interactions.
#[derive(Clone, Copy)]
pub struct Notifications<'a> {
    waiter: Waiter<'a>,
    dispatcher: Dispatcher<'a>,
    config: &'a SuiteConfig,
    report: Option<&'a Report>,
}

impl<'a> Notifications<'a> {
    pub fn new(waiter: Waiter<'a>, config: &'a SuiteConfig, report: Option<&'a Report>) -> Self {
        let waiter = waiter.without_monitor();
        let mut dispatcher = Dispatcher::new(waiter, config);
        if let Some(report) = report {
            dispatcher = dispatcher.with_report(report);
        }
        Self {
            waiter,
            dispatcher,
            config,
            report,
        }
    }

    /// Screen size from the first root that has a frame.
    async fn screen_size(&self) -> Result<(f64, f64), UiError> {
        for scope in [Scope::App, Scope::System] {
            if let Some(roots) = self.waiter.snapshot(scope).await? {
                if let Some(frame) = roots.iter().filter_map(|r| r.frame).find(|f| f.has_area()) {
                    return Ok((frame.width, frame.height));
                }
            }
        }
        Ok(FALLBACK_SCREEN)
    }

    async fn status_bar(&self) -> Result<Option<UIElement>, UiError> {
        let bar = Descriptor::of_kind(kind::STATUS_BAR);
        for scope in [Scope::System, Scope::App] {
            if let Some(found) = self.waiter.resolve_now(&bar.clone().in_scope(scope)).await? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    async fn note(&self, message: &str) {
        if let Some(report) = self.report {
            report.note(message).await;
        }
    }

    /// Pulls the notification centre down, from the status bar when there is
    /// one and from the top edge otherwise.
    pub async fn open(&self) -> Result<(), UiError> {
        let (width, height) = self.screen_size().await?;
        let to = ((width * 0.5) as i32, (height * 0.8) as i32);
        let from = match self.status_bar().await?.and_then(|b| b.frame) {
            Some(frame) => frame.center(),
            None => ((width * 0.5) as i32, 0),
        };
        debug!(?from, ?to, "opening notification centre");
        self.waiter.backend().swipe(from, to, None).await?;
        self.note("opened notification centre").await;
        sleep(self.config.notification_open()).await;
        Ok(())
    }

    /// Pushes the notification centre back up.
    pub async fn close(&self) -> Result<(), UiError> {
        let (width, height) = self.screen_size().await?;
        let from = ((width * 0.5) as i32, (height * 0.8) as i32);
        let to = ((width * 0.5) as i32, 0);
        debug!(?from, ?to, "closing notification centre");
        self.waiter.backend().swipe(from, to, None).await?;
        self.note("closed notification centre").await;
        sleep(self.config.notification_close()).await;
        Ok(())
    }

    /// Polls the system scope until a matching notification shows up,
    /// optionally opening the centre first.
    pub async fn wait_for_notification(
        &self,
        query: &NotificationQuery,
        timeout: Option<Duration>,
        open_center: bool,
    ) -> Result<Option<UIElement>, UiError> {
        if open_center {
            self.open().await?;
        }
        let timeout = timeout.unwrap_or(self.waiter.default_timeout());
        let descriptor = query.descriptor();
        let found = poll_until(self.waiter.policy(), timeout, || async move {
            Ok(self
                .waiter
                .snapshot(Scope::System)
                .await?
                .and_then(|roots| descriptor.resolve(&roots).cloned()))
        })
        .await?;
        debug!(%query, found = found.is_some(), "notification wait finished");
        Ok(found)
    }

    /// Taps the first notification matching `query`. Returns `false` when
    /// there is none.
    pub async fn tap_notification(&self, query: &NotificationQuery) -> Result<bool, UiError> {
        Ok(self.dispatcher.tap(query.descriptor()).await?.is_performed())
    }

    pub async fn tap_first_notification(&self) -> Result<bool, UiError> {
        self.tap_notification(&NotificationQuery::any()).await
    }

    /// Swipes a notification away.
    pub async fn dismiss_notification(
        &self,
        query: &NotificationQuery,
        direction: SwipeDirection,
    ) -> Result<bool, UiError> {
        Ok(self.dispatcher.swipe(query.descriptor(), direction).await?.is_performed())
    }

    /// Dismisses the notification whose text is `text` by swiping it up.
    pub async fn clear(&self, text: &str) -> Result<bool, UiError> {
        self.dismiss_notification(&NotificationQuery::text(text), SwipeDirection::Up)
            .await
    }

    /// Opens the centre, taps "Clear" and then "Clear All Notifications"
    /// when present, and closes it again. Returns whether anything was tapped.
    pub async fn clear_all(&self) -> Result<bool, UiError> {
        self.open().await?;
        let mut tapped = false;
        for label in [CLEAR_LABEL, CLEAR_ALL_LABEL] {
            let button = Descriptor::label(label).of_type(kind::BUTTON).system();
            if self.dispatcher.tap(&button).await?.is_performed() {
                debug!(button = label, "tapped");
                tapped = true;
            }
        }
        self.close().await?;
        info!(tapped, "cleared notifications");
        Ok(tapped)
    }

    /// True once no notification is left, within `timeout`.
    pub async fn wait_until_cleared(&self, timeout: Duration) -> Result<bool, UiError> {
        self.waiter
            .wait_until_gone(NotificationQuery::any().descriptor(), Some(timeout))
            .await
    }

    pub async fn count(&self) -> Result<usize, UiError> {
        self.waiter.count(NotificationQuery::any().descriptor()).await
    }

    pub async fn has_notifications(&self) -> Result<bool, UiError> {
        Ok(self.count().await? > 0)
    }

    /// Labels of every notification on screen.
    pub async fn texts(&self) -> Result<Vec<String>, UiError> {
        Ok(self
            .waiter
            .all(NotificationQuery::any().descriptor())
            .await?
            .iter()
            .map(|n| n.label_text().to_string())
            .filter(|t| !t.is_empty())
            .collect())
    }

    /// Fails unless a matching notification appears within `timeout`.
    #[track_caller]
    pub fn verify_notification_exists<'s>(
        &'s self,
        query: &'s NotificationQuery,
        timeout: Option<Duration>,
    ) -> Verification<'s, UIElement> {
        let location = Location::caller();
        Box::pin(async move {
            self.wait_for_notification(query, timeout, false)
                .await?
                .ok_or_else(|| UiError::assertion_at(format!("expected notification {query}"), location))
        })
    }

    /// Fails if a matching notification is on screen now.
    #[track_caller]
    pub fn verify_no_notification<'s>(&'s self, query: &'s NotificationQuery) -> Verification<'s, ()> {
        let location = Location::caller();
        Box::pin(async move {
            match self.waiter.resolve_now(query.descriptor()).await? {
                None => Ok(()),
                Some(found) => Err(UiError::assertion_at(
                    format!("unexpected notification {:?}", found.label_text()),
                    location,
                )),
            }
        })
    }

    /// Human-readable summary of the notification centre.
    pub async fn describe_notifications(&self) -> Result<String, UiError> {
        let notifications = self.waiter.all(NotificationQuery::any().descriptor()).await?;
        let cells = self
            .waiter
            .count(&Descriptor::id_contains(NOTIFICATION_CELL_ID).system())
            .await?;
        let mut out = format!("notifications: {} (cells: {cells})\n", notifications.len());
        for (i, n) in notifications.iter().enumerate() {
            out.push_str(&format!("  [{i}] {:?}\n", n.label_text()));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryBackend, RecordedAction, Screen};

    fn banner(i: usize, app: &str, text: &str) -> UIElement {
        UIElement::new(kind::OTHER)
            .with_id(NOTIFICATION_ID)
            .with_label(format!("{app}, {text}"))
            .with_frame(10.0, 100.0 + 90.0 * i as f64, 370.0, 80.0)
            .with_child(UIElement::new(kind::STATIC_TEXT).with_label(app))
            .with_child(UIElement::new(kind::STATIC_TEXT).with_label(text))
    }

    fn centre() -> Screen {
        let app = UIElement::new(kind::APPLICATION)
            .with_label("Find My")
            .with_frame(0.0, 0.0, 390.0, 844.0)
            .with_hittable(false);
        let system = UIElement::new(kind::OTHER)
            .with_frame(0.0, 0.0, 390.0, 844.0)
            .with_hittable(false)
            .with_children(vec![
                banner(0, "Find My", "Chi’s Laptop was found near Home"),
                banner(1, "Messages", "See you soon"),
            ]);
        Screen::new(vec![app], vec![system])
    }

    fn helper<'a>(backend: &'a MemoryBackend, config: &'a SuiteConfig) -> Notifications<'a> {
        Notifications::new(Waiter::new(backend, config), config, None)
    }

    #[tokio::test(start_paused = true)]
    async fn queries_by_text_and_app() {
        let backend = MemoryBackend::new(centre());
        let config = SuiteConfig::default();
        let n = helper(&backend, &config);

        assert_eq!(n.count().await.unwrap(), 2);
        assert!(n
            .wait_for_notification(&NotificationQuery::from_app("find my"), Some(Duration::ZERO), false)
            .await
            .unwrap()
            .is_some());
        assert!(n
            .wait_for_notification(&NotificationQuery::text("See you soon"), Some(Duration::ZERO), false)
            .await
            .unwrap()
            .is_some());
        assert!(n
            .wait_for_notification(&NotificationQuery::matches(".*was found near.*").unwrap(), Some(Duration::ZERO), false)
            .await
            .unwrap()
            .is_some());
        assert!(n
            .wait_for_notification(&NotificationQuery::text_contains("weather"), Some(Duration::ZERO), false)
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            n.texts().await.unwrap(),
            vec!["Find My, Chi’s Laptop was found near Home", "Messages, See you soon"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn open_and_close_swipe_across_the_screen() {
        let backend = MemoryBackend::new(centre());
        let config = SuiteConfig::default();
        let n = helper(&backend, &config);
        n.open().await.unwrap();
        n.close().await.unwrap();
        assert_eq!(
            backend.gestures(),
            vec![
                RecordedAction::Swipe { from: (195, 0), to: (195, 675) },
                RecordedAction::Swipe { from: (195, 675), to: (195, 0) },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn clear_dismisses_one_notification() {
        let backend = MemoryBackend::new(centre());
        backend.on_swipe(
            Descriptor::id(NOTIFICATION_ID).system().and(Matcher::Label("Messages, See you soon".into())),
            |s| {
                s.remove(NotificationQuery::text("See you soon").descriptor());
            },
        );
        let config = SuiteConfig::default();
        let n = helper(&backend, &config);
        assert!(n.clear("See you soon").await.unwrap());
        assert_eq!(n.count().await.unwrap(), 1);
        assert!(!n.clear("See you soon").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_all_taps_both_buttons() {
        let mut screen = centre();
        screen.system[0].children.push(
            UIElement::new(kind::BUTTON)
                .with_label(CLEAR_LABEL)
                .with_frame(340.0, 60.0, 30.0, 30.0),
        );
        let backend = MemoryBackend::new(screen);
        backend.on_tap(Descriptor::label(CLEAR_LABEL).system(), |s| {
            s.update(&Descriptor::label(CLEAR_LABEL).system(), |b| {
                b.label = Some(CLEAR_ALL_LABEL.to_string());
            });
        });
        backend.on_tap(Descriptor::label(CLEAR_ALL_LABEL).system(), |s| {
            s.remove_all(NotificationQuery::any().descriptor());
        });
        let config = SuiteConfig::default();
        let n = helper(&backend, &config);

        assert!(n.clear_all().await.unwrap());
        assert!(n.wait_until_cleared(config.soft_settle()).await.unwrap());
        assert!(!n.has_notifications().await.unwrap());
        let line = line!() + 1;
        let err = n.verify_notification_exists(&NotificationQuery::any(), Some(Duration::ZERO)).await.unwrap_err();
        match err {
            UiError::Assertion { location, .. } => assert_eq!(location.line(), line),
            other => panic!("unexpected {other:?}"),
        }
    }
}
