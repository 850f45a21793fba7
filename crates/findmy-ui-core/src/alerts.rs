//! Alert helpers.
//!
//! Alerts can come from two places: the system overlay (permission prompts,
//! springboard dialogs) and the app itself. Every poll step checks the system
//! scope first and only then the app, so when both show a matching alert the
//! system one wins.
//!
//! These helpers deliberately bypass the interruption monitor: a test that
//! waits for an alert wants to see it, not have a handler tap it away.

use std::fmt;
use std::panic::Location;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::SuiteConfig;
use crate::descriptor::{Descriptor, DescriptorError, Matcher, Scope};
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::element::{kind, UIElement};
use crate::error::{UiError, Verification};
use crate::interruption::alert_buttons;
use crate::report::Report;
use crate::wait::{poll_until, Waiter};

/// Typographic apostrophe iOS uses in "Don’t Allow".
const DONT_ALLOW_LABELS: [&str; 2] = ["Don’t Allow", "Don't Allow"];

/// Which alert to look for.
#[derive(Debug, Clone)]
pub struct AlertQuery {
    descriptor: Descriptor,
}

impl AlertQuery {
    /// Any alert at all.
    pub fn any() -> Self {
        Self {
            descriptor: Descriptor::of_kind(kind::ALERT),
        }
    }

    /// An alert whose title, or one of whose texts, is exactly `title`.
    pub fn titled(title: impl Into<String>) -> Self {
        Self::with_text(Matcher::Label(title.into()))
    }

    /// An alert with `part` somewhere in its title or texts, ignoring case.
    pub fn title_contains(part: impl AsRef<str>) -> Self {
        Self::with_text(Matcher::LabelContains(part.as_ref().to_lowercase()))
    }

    /// An alert whose title or one of its texts fully matches `pattern`.
    pub fn title_matches(pattern: &str) -> Result<Self, DescriptorError> {
        let matcher = Descriptor::label_matches(pattern)?.matcher().clone();
        Ok(Self::with_text(matcher))
    }

    fn with_text(text: Matcher) -> Self {
        let matcher = Matcher::Any(vec![text.clone(), Matcher::HasDescendant(Box::new(text))]);
        Self {
            descriptor: Descriptor::of_kind(kind::ALERT).and(matcher),
        }
    }

    /// The query as a descriptor evaluated in `scope`.
    pub fn descriptor(&self, scope: Scope) -> Descriptor {
        self.descriptor.clone().in_scope(scope)
    }
}

impl Default for AlertQuery {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Display for AlertQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descriptor)
    }
}

/// An alert as seen in one snapshot, with the scope it was found in.
#[derive(Debug, Clone, PartialEq)]
pub struct FoundAlert {
    pub scope: Scope,
    pub element: UIElement,
}

impl FoundAlert {
    /// The alert's label, falling back to its first static text.
    pub fn title(&self) -> String {
        let label = self.element.label_text();
        if !label.is_empty() {
            return label.to_string();
        }
        self.messages().into_iter().next().unwrap_or_default()
    }

    pub fn buttons(&self) -> Vec<String> {
        alert_buttons(&self.element)
            .into_iter()
            .map(|b| b.label_text().to_string())
            .collect()
    }

    /// Every static text inside the alert, title included.
    pub fn messages(&self) -> Vec<String> {
        self.element
            .descendants()
            .skip(1)
            .filter(|e| e.is_type(kind::STATIC_TEXT))
            .map(|e| e.label_text().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Descriptor that re-finds this alert in later snapshots.
    pub fn descriptor(&self) -> Descriptor {
        let base = match self.element.label.as_deref() {
            Some(label) if !label.is_empty() => Descriptor::label(label).of_type(kind::ALERT),
            _ => Descriptor::of_kind(kind::ALERT),
        };
        base.in_scope(self.scope)
    }

    /// Descriptor for the button labelled `label` inside this alert.
    pub fn button(&self, label: &str) -> Descriptor {
        Descriptor::label(label)
            .of_type(kind::BUTTON)
            .within(self.descriptor())
            .in_scope(self.scope)
    }
}

/// Result of [`Alerts::wait_for_alert`].
#[derive(Debug, Clone, PartialEq)]
pub enum AlertWait {
    Found(FoundAlert),
    TimedOut,
}

impl AlertWait {
    pub fn is_found(&self) -> bool {
        matches!(self, AlertWait::Found(_))
    }

    pub fn into_alert(self) -> Option<FoundAlert> {
        match self {
            AlertWait::Found(alert) => Some(alert),
            AlertWait::TimedOut => None,
        }
    }
}

/// Alert waits and interactions over both scopes.
#[derive(Clone, Copy)]
pub struct Alerts<'a> {
    waiter: Waiter<'a>,
    dispatcher: Dispatcher<'a>,
    config: &'a SuiteConfig,
}

impl<'a> Alerts<'a> {
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
        }
    }

    /// One probe of both scopes, system first.
    pub async fn find(&self, query: &AlertQuery) -> Result<Option<FoundAlert>, UiError> {
        for scope in [Scope::System, Scope::App] {
            let Some(roots) = self.waiter.snapshot(scope).await? else {
                continue;
            };
            if let Some(element) = query.descriptor(scope).resolve(&roots) {
                return Ok(Some(FoundAlert {
                    scope,
                    element: element.clone(),
                }));
            }
        }
        Ok(None)
    }

    /// Polls both scopes until an alert matching `query` shows up.
    pub async fn wait_for_alert(&self, query: &AlertQuery, timeout: Option<Duration>) -> Result<AlertWait, UiError> {
        let timeout = timeout.unwrap_or(self.waiter.default_timeout());
        let found = poll_until(self.waiter.policy(), timeout, || async move { self.find(query).await }).await?;
        Ok(match found {
            Some(alert) => {
                debug!(%query, scope = %alert.scope, title = %alert.title(), "alert found");
                AlertWait::Found(alert)
            }
            None => {
                debug!(%query, "no alert before timeout");
                AlertWait::TimedOut
            }
        })
    }

    pub async fn wait_for_any_alert(&self, timeout: Option<Duration>) -> Result<AlertWait, UiError> {
        self.wait_for_alert(&AlertQuery::any(), timeout).await
    }

    pub async fn wait_for_alert_titled(&self, title: &str, timeout: Option<Duration>) -> Result<AlertWait, UiError> {
        self.wait_for_alert(&AlertQuery::titled(title), timeout).await
    }

    /// The alert on screen right now, if any.
    pub async fn current_alert(&self) -> Result<Option<FoundAlert>, UiError> {
        self.find(&AlertQuery::any()).await
    }

    pub async fn has_alert(&self) -> Result<bool, UiError> {
        Ok(self.current_alert().await?.is_some())
    }

    /// Alerts in both scopes combined.
    pub async fn alert_count(&self) -> Result<usize, UiError> {
        let any = AlertQuery::any();
        let system = self.waiter.count(&any.descriptor(Scope::System)).await?;
        let app = self.waiter.count(&any.descriptor(Scope::App)).await?;
        Ok(system + app)
    }

    /// Title of the current alert, or an empty string.
    pub async fn title(&self) -> Result<String, UiError> {
        Ok(self.current_alert().await?.map(|a| a.title()).unwrap_or_default())
    }

    pub async fn buttons(&self) -> Result<Vec<String>, UiError> {
        Ok(self.current_alert().await?.map(|a| a.buttons()).unwrap_or_default())
    }

    pub async fn messages(&self) -> Result<Vec<String>, UiError> {
        Ok(self.current_alert().await?.map(|a| a.messages()).unwrap_or_default())
    }

    /// Taps the button labelled `label` on the current alert.
    ///
    /// Returns `false` when there is no alert or no such button. With
    /// `wait_for_dismissal` the alert is given the configured dismiss time to
    /// go away; if it stays, that is logged and still counts as a tap.
    pub async fn tap_button(&self, label: &str, wait_for_dismissal: bool) -> Result<bool, UiError> {
        let Some(alert) = self.current_alert().await? else {
            warn!(button = label, "no alert to tap");
            return Ok(false);
        };
        if !alert.buttons().iter().any(|b| b == label) {
            warn!(button = label, title = %alert.title(), "button not found on alert");
            return Ok(false);
        }

        info!(button = label, title = %alert.title(), scope = %alert.scope, "tapping alert button");
        if self.dispatcher.tap(&alert.button(label)).await? == DispatchOutcome::NotFound {
            warn!(button = label, "alert went away before the tap");
            return Ok(false);
        }

        if wait_for_dismissal {
            let gone = self
                .waiter
                .wait_until_gone(&alert.descriptor(), Some(self.config.alert_dismiss()))
                .await?;
            if !gone {
                warn!(title = %alert.title(), "alert still present after tapping {label}");
            }
        }
        Ok(true)
    }

    pub async fn tap_ok(&self) -> Result<bool, UiError> {
        self.tap_button("OK", true).await
    }

    pub async fn tap_cancel(&self) -> Result<bool, UiError> {
        self.tap_button("Cancel", true).await
    }

    pub async fn tap_allow(&self) -> Result<bool, UiError> {
        self.tap_button("Allow", true).await
    }

    /// Taps "Don’t Allow", accepting either apostrophe.
    pub async fn tap_dont_allow(&self) -> Result<bool, UiError> {
        let buttons = self.buttons().await?;
        let label = DONT_ALLOW_LABELS
            .iter()
            .find(|l| buttons.iter().any(|b| b == *l))
            .copied()
            .unwrap_or(DONT_ALLOW_LABELS[0]);
        self.tap_button(label, true).await
    }

    /// Taps the first button of the current alert.
    pub async fn dismiss(&self) -> Result<bool, UiError> {
        let Some(first) = self.buttons().await?.into_iter().next() else {
            debug!("no alert button to dismiss with");
            return Ok(false);
        };
        self.tap_button(&first, true).await
    }

    /// Fails unless a matching alert appears within `timeout`.
    #[track_caller]
    pub fn verify_alert_exists<'s>(
        &'s self,
        query: &'s AlertQuery,
        timeout: Option<Duration>,
    ) -> Verification<'s, FoundAlert> {
        let location = Location::caller();
        Box::pin(async move {
            match self.wait_for_alert(query, timeout).await? {
                AlertWait::Found(alert) => Ok(alert),
                AlertWait::TimedOut => Err(UiError::assertion_at(format!("expected alert {query}"), location)),
            }
        })
    }

    /// Fails if any alert is on screen now.
    #[track_caller]
    pub fn verify_no_alert(&self) -> Verification<'_, ()> {
        let location = Location::caller();
        Box::pin(async move {
            match self.current_alert().await? {
                None => Ok(()),
                Some(alert) => Err(UiError::assertion_at(
                    format!("unexpected alert {:?} in {} scope", alert.title(), alert.scope),
                    location,
                )),
            }
        })
    }

    /// Human-readable summary of every alert in both scopes.
    pub async fn describe_alerts(&self) -> Result<String, UiError> {
        let any = AlertQuery::any();
        let mut out = String::new();
        for scope in [Scope::System, Scope::App] {
            let alerts = self.waiter.all(&any.descriptor(scope)).await?;
            out.push_str(&format!("{scope} alerts: {}\n", alerts.len()));
            for element in alerts {
                let alert = FoundAlert { scope, element };
                out.push_str(&format!("  title: {:?}\n", alert.title()));
                out.push_str(&format!("  buttons: {}\n", alert.buttons().join(", ")));
                for message in alert.messages() {
                    out.push_str(&format!("  text: {message}\n"));
                }
            }
        }
        Ok(out)
    }
}
