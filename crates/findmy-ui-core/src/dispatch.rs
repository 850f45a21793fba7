//! Interaction dispatch.
//!
//! The [`Dispatcher`] turns an [`Action`] on a [`Descriptor`] into backend
//! gestures. It re-resolves the descriptor from a fresh snapshot immediately
//! before acting, so it never taps where an element *used* to be. If the
//! element is gone the dispatch reports [`DispatchOutcome::NotFound`] and
//! nothing is sent to the device.
//!
//! After the gesture the dispatcher waits out the action's settle delay and,
//! when asked, checks a post-condition once. A missed post-condition is logged
//! at `warn`, not failed.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info_span, warn, Instrument};

use crate::action::{Action, ActionOutcome, ActionRecord, SwipeDirection};
use crate::backend::AccessibilityBackend;
use crate::config::SuiteConfig;
use crate::descriptor::Descriptor;
use crate::element::{kind, ElementFrame, UIElement};
use crate::error::UiError;
use crate::report::Report;
use crate::wait::Waiter;

/// Label of the inline button iOS text fields show for clearing their contents.
pub const CLEAR_TEXT_LABEL: &str = "Clear text";

/// Checked once after an action has settled.
#[derive(Debug, Clone)]
pub enum PostCondition {
    /// The target no longer resolves.
    Gone,
    /// Another element resolves.
    Appears(Descriptor),
}

/// Result of [`Dispatcher::perform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The action was delivered. `post_condition_met` is `None` when no
    /// post-condition was requested.
    Performed { post_condition_met: Option<bool> },
    /// The target was absent at dispatch time; nothing was sent.
    NotFound,
}

impl DispatchOutcome {
    pub fn is_performed(&self) -> bool {
        matches!(self, DispatchOutcome::Performed { .. })
    }
}

/// Performs actions on elements, one at a time.
#[derive(Clone, Copy)]
pub struct Dispatcher<'a> {
    waiter: Waiter<'a>,
    config: &'a SuiteConfig,
    report: Option<&'a Report>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(waiter: Waiter<'a>, config: &'a SuiteConfig) -> Self {
        Self {
            waiter,
            config,
            report: None,
        }
    }

    /// Records every dispatch into `report`.
    pub fn with_report(mut self, report: &'a Report) -> Self {
        self.report = Some(report);
        self
    }

    pub fn waiter(&self) -> &Waiter<'a> {
        &self.waiter
    }

    fn backend(&self) -> &'a dyn AccessibilityBackend {
        self.waiter.backend()
    }

    /// Re-resolves `descriptor`, performs `action` on it, settles, and checks
    /// `post_condition` once.
    pub async fn perform(
        &self,
        descriptor: &Descriptor,
        action: Action,
        post_condition: Option<PostCondition>,
    ) -> Result<DispatchOutcome, UiError> {
        let span = info_span!("dispatch", action = action.name(), descriptor = %descriptor);
        async {
            let start = Instant::now();
            let element = self
                .waiter
                .resolve_now(descriptor)
                .await?
                .filter(|e| e.frame.map_or(false, |f| f.has_area()));

            let Some(element) = element else {
                debug!("target not found, nothing dispatched");
                self.record(&action, descriptor, ActionOutcome::NotFound, start).await;
                return Ok(DispatchOutcome::NotFound);
            };

            if let Err(e) = self.deliver(&action, &element).await {
                warn!(error = %e, "action failed");
                self.record(&action, descriptor, ActionOutcome::Failed(e.to_string()), start)
                    .await;
                return Err(e);
            }

            sleep(Duration::from_millis(action.settle_ms(self.config))).await;

            let post_condition_met = match &post_condition {
                None => None,
                Some(PostCondition::Gone) => Some(!self.waiter.exists_now(descriptor).await?),
                Some(PostCondition::Appears(other)) => Some(self.waiter.exists_now(other).await?),
            };
            let outcome = if post_condition_met == Some(false) {
                warn!(?post_condition, "post-condition not met");
                ActionOutcome::PostConditionMissed
            } else {
                ActionOutcome::Performed
            };
            self.record(&action, descriptor, outcome, start).await;
            debug!(elapsed_ms = start.elapsed().as_millis() as u64, "action complete");
            Ok(DispatchOutcome::Performed { post_condition_met })
        }
        .instrument(span)
        .await
    }

    async fn deliver(&self, action: &Action, element: &UIElement) -> Result<(), UiError> {
        let backend = self.backend();
        // Callers filter out frameless elements before delivering.
        let frame = element.frame.unwrap_or(ElementFrame::new(0.0, 0.0, 0.0, 0.0));
        let (x, y) = frame.center();
        match action {
            Action::Tap => backend.tap(x, y).await?,
            Action::DoubleTap => backend.double_tap(x, y).await?,
            Action::LongPress { duration_ms } => {
                backend.long_press(x, y, Duration::from_millis(*duration_ms)).await?
            }
            Action::Swipe { direction } => {
                let (from, to) = direction.endpoints(&frame);
                backend.swipe(from, to, None).await?
            }
            Action::TypeText { text } => {
                backend.tap(x, y).await?;
                backend.type_text(text).await?
            }
            Action::ClearText => {
                let clear_button = Descriptor::label(CLEAR_TEXT_LABEL).of_type(kind::BUTTON);
                let inline = clear_button
                    .resolve(std::slice::from_ref(element))
                    .and_then(|b| b.frame);
                match inline {
                    Some(button) => {
                        let (bx, by) = button.center();
                        backend.tap(bx, by).await?
                    }
                    None => {
                        backend.tap(x, y).await?;
                        let length = element.value.as_deref().map_or(0, |v| v.chars().count());
                        if length > 0 {
                            backend.type_text(&"\u{8}".repeat(length)).await?
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn record(&self, action: &Action, descriptor: &Descriptor, outcome: ActionOutcome, start: Instant) {
        if let Some(report) = self.report {
            let elapsed = start.elapsed().as_millis() as u64;
            report
                .record_action(ActionRecord::new(action.clone(), descriptor.to_string(), outcome, elapsed))
                .await;
        }
    }

    pub async fn tap(&self, descriptor: &Descriptor) -> Result<DispatchOutcome, UiError> {
        self.perform(descriptor, Action::Tap, None).await
    }

    pub async fn double_tap(&self, descriptor: &Descriptor) -> Result<DispatchOutcome, UiError> {
        self.perform(descriptor, Action::DoubleTap, None).await
    }

    /// Long press for the configured hold time.
    pub async fn long_press(&self, descriptor: &Descriptor) -> Result<DispatchOutcome, UiError> {
        let action = Action::LongPress {
            duration_ms: self.config.long_press_ms,
        };
        self.perform(descriptor, action, None).await
    }

    pub async fn swipe(&self, descriptor: &Descriptor, direction: SwipeDirection) -> Result<DispatchOutcome, UiError> {
        self.perform(descriptor, Action::Swipe { direction }, None).await
    }

    pub async fn type_text(&self, descriptor: &Descriptor, text: &str) -> Result<DispatchOutcome, UiError> {
        let action = Action::TypeText { text: text.to_string() };
        self.perform(descriptor, action, None).await
    }

    pub async fn clear_text(&self, descriptor: &Descriptor) -> Result<DispatchOutcome, UiError> {
        self.perform(descriptor, Action::ClearText, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::AccessibilityBackend;
    use crate::memory::{MemoryBackend, RecordedAction, Screen};

    fn field(value: Option<&str>, with_clear: bool) -> UIElement {
        let mut field = UIElement::new(kind::TEXT_FIELD)
            .with_id("name")
            .with_frame(0.0, 100.0, 200.0, 40.0);
        if let Some(v) = value {
            field = field.with_value(v);
        }
        if with_clear {
            field = field.with_child(
                UIElement::new(kind::BUTTON)
                    .with_label(CLEAR_TEXT_LABEL)
                    .with_frame(170.0, 110.0, 20.0, 20.0),
            );
        }
        field
    }

    #[tokio::test(start_paused = true)]
    async fn clear_text_prefers_inline_button() {
        let backend = MemoryBackend::new(Screen::new(vec![field(Some("abc"), true)], vec![]));
        let config = SuiteConfig::default();
        let dispatcher = Dispatcher::new(Waiter::new(&backend, &config), &config);
        dispatcher.clear_text(&Descriptor::id("name")).await.unwrap();
        assert_eq!(backend.gestures(), vec![RecordedAction::Tap { x: 180, y: 120 }]);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_text_deletes_each_character() {
        let backend = MemoryBackend::new(Screen::new(vec![field(Some("Chi’s"), false)], vec![]));
        let config = SuiteConfig::default();
        let dispatcher = Dispatcher::new(Waiter::new(&backend, &config), &config);
        dispatcher.clear_text(&Descriptor::id("name")).await.unwrap();

        let screen = backend.screen();
        let value = Descriptor::id("name").resolve(&screen.app).unwrap().value.clone();
        assert_eq!(value.as_deref(), Some(""));
        assert_eq!(
            backend.gestures(),
            vec![
                RecordedAction::Tap { x: 100, y: 120 },
                RecordedAction::TypeText("\u{8}".repeat(5)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn frameless_target_counts_as_missing() {
        let backend = MemoryBackend::with_app(vec![UIElement::new(kind::BUTTON).with_label("Ghost")]);
        let config = SuiteConfig::default();
        let dispatcher = Dispatcher::new(Waiter::new(&backend, &config), &config);
        let outcome = dispatcher.tap(&Descriptor::label("Ghost")).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::NotFound);
        assert!(backend.gestures().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn settle_delay_follows_action_weight() {
        let backend = MemoryBackend::new(Screen::new(vec![field(None, false)], vec![]));
        let config = SuiteConfig::default();
        let dispatcher = Dispatcher::new(Waiter::new(&backend, &config), &config);

        let start = Instant::now();
        dispatcher.tap(&Descriptor::id("name")).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(500));

        let start = Instant::now();
        dispatcher.long_press(&Descriptor::id("name")).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
        assert!(backend.is_connected());
    }
}
