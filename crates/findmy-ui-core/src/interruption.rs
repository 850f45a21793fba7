//! Interruption handling for unexpected system modals.
//!
//! Handlers are registered on the [`TestContext`](crate::context::TestContext)
//! and serviced by the wait engine before every probe: if a system-scope alert
//! is on screen, handlers are offered it newest first until one picks a
//! button. The monitor taps that button and reports whether the alert went
//! away within the configured dismiss timeout.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backend::AccessibilityBackend;
use crate::config::SuiteConfig;
use crate::descriptor::{Descriptor, Scope};
use crate::element::{kind, UIElement};
use crate::error::UiError;
use crate::wait::{poll_until, PollPolicy};

/// Decides how to get rid of a blocking system alert.
pub trait InterruptionHandler: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Label of the button to tap, or `None` to pass the alert on to the
    /// next handler.
    fn choose_button(&self, alert: &UIElement) -> Option<String>;
}

/// Taps "OK" when the alert has it, otherwise its first button.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAlertHandler;

impl InterruptionHandler for DefaultAlertHandler {
    fn name(&self) -> &str {
        "default"
    }

    fn choose_button(&self, alert: &UIElement) -> Option<String> {
        let buttons = alert_buttons(alert);
        buttons
            .iter()
            .find(|b| b.label_text() == "OK")
            .or_else(|| buttons.first())
            .map(|b| b.label_text().to_string())
    }
}

/// A handler built from a closure.
pub struct FnHandler<F> {
    name: String,
    choose: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&UIElement) -> Option<String> + Send + Sync,
{
    pub fn new(name: impl Into<String>, choose: F) -> Self {
        Self {
            name: name.into(),
            choose,
        }
    }
}

impl<F> InterruptionHandler for FnHandler<F>
where
    F: Fn(&UIElement) -> Option<String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_button(&self, alert: &UIElement) -> Option<String> {
        (self.choose)(alert)
    }
}

/// Buttons of an alert in document order.
pub fn alert_buttons(alert: &UIElement) -> Vec<&UIElement> {
    alert
        .descendants()
        .skip(1)
        .filter(|e| e.is_type(kind::BUTTON))
        .collect()
}

/// Opaque handle returned when registering a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// What servicing an interruption achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interruption {
    /// No system alert was on screen.
    None,
    /// An alert was present but every handler declined it.
    Declined { alert: String },
    /// A handler picked a button and it was tapped.
    Handled {
        handler: String,
        alert: String,
        button: String,
        /// Whether the alert went away before the dismiss timeout.
        cleared: bool,
    },
}

/// Ordered set of interruption handlers.
pub struct InterruptionMonitor {
    handlers: Vec<(HandlerId, Box<dyn InterruptionHandler>)>,
    next_id: u64,
    policy: PollPolicy,
    dismiss_timeout: Duration,
}

impl Default for InterruptionMonitor {
    fn default() -> Self {
        Self::from_config(&SuiteConfig::default())
    }
}

impl InterruptionMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Polls for dismissal with the config's poll policy, for at most
    /// `alert_dismiss`.
    pub fn from_config(config: &SuiteConfig) -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 0,
            policy: PollPolicy::from_config(config),
            dismiss_timeout: config.alert_dismiss(),
        }
    }

    /// Registers a handler. Later registrations are consulted first.
    pub fn add(&mut self, handler: Box<dyn InterruptionHandler>) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        debug!(handler = handler.name(), "interruption handler registered");
        self.handlers.push((id, handler));
        id
    }

    pub fn remove(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(h, _)| *h != id);
        before != self.handlers.len()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Offers the first system alert on screen to the handlers.
    ///
    /// Transient snapshot failures count as "no alert"; fatal backend errors
    /// are returned.
    pub async fn service(&self, backend: &dyn AccessibilityBackend) -> Result<Interruption, UiError> {
        if self.handlers.is_empty() {
            return Ok(Interruption::None);
        }
        let alerts = Descriptor::of_kind(kind::ALERT).system();
        let Some(system) = system_snapshot(backend).await? else {
            return Ok(Interruption::None);
        };
        let Some(alert) = alerts.resolve(&system) else {
            return Ok(Interruption::None);
        };
        let title = alert.label_text().to_string();

        for (_, handler) in self.handlers.iter().rev() {
            let Some(button) = handler.choose_button(alert) else {
                continue;
            };
            let Some((x, y)) = alert_buttons(alert)
                .into_iter()
                .find(|b| b.label_text() == button)
                .and_then(|b| b.frame)
                .map(|f| f.center())
            else {
                warn!(handler = handler.name(), %button, "chosen button not on alert");
                continue;
            };

            info!(handler = handler.name(), alert = %title, %button, "handling interruption");
            backend.tap(x, y).await?;

            let still_there = !self.wait_until_gone(backend, &title).await?;
            if still_there {
                warn!(alert = %title, "alert still present after interruption handler");
            }
            return Ok(Interruption::Handled {
                handler: handler.name().to_string(),
                alert: title,
                button,
                cleared: !still_there,
            });
        }

        debug!(alert = %title, "all interruption handlers declined");
        Ok(Interruption::Declined { alert: title })
    }

    /// Whether the alert titled `title` left the system scope in time.
    async fn wait_until_gone(&self, backend: &dyn AccessibilityBackend, title: &str) -> Result<bool, UiError> {
        let alert = &Descriptor::label(title).of_type(kind::ALERT).system();
        let gone = poll_until(&self.policy, self.dismiss_timeout, || async move {
            Ok(system_snapshot(backend)
                .await?
                .filter(|roots| alert.resolve(roots).is_none())
                .map(|_| ()))
        })
        .await?;
        Ok(gone.is_some())
    }
}

async fn system_snapshot(backend: &dyn AccessibilityBackend) -> Result<Option<Vec<UIElement>>, UiError> {
    match backend.snapshot(Scope::System).await {
        Ok(roots) => Ok(Some(roots)),
        Err(e) if e.is_fatal() => Err(e.into()),
        Err(e) => {
            debug!(error = %e, "system snapshot failed");
            Ok(None)
        }
    }
}
