//! The wait engine.
//!
//! Every wait in the suite is a poll: take a fresh snapshot of the
//! descriptor's scope, check the condition, sleep, repeat until the deadline.
//! The sleep starts at the configured poll interval and grows geometrically up
//! to a cap, so short waits stay responsive and long ones do not hammer the
//! backend.
//!
//! Running out of time is an ordinary outcome ([`WaitOutcome::TimedOut`]).
//! Only a disconnected backend or a rejected descriptor is an error.
//! Transient query failures are logged and the poll continues.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info_span, warn, Instrument};

use crate::backend::AccessibilityBackend;
use crate::config::SuiteConfig;
use crate::descriptor::{Descriptor, Scope};
use crate::element::UIElement;
use crate::error::UiError;
use crate::interruption::{Interruption, InterruptionMonitor};

/// What a wait is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// The descriptor resolves.
    Exists,
    /// The descriptor resolves to an element that would receive a tap.
    Hittable,
    /// The descriptor no longer resolves.
    NotExists,
}

/// Result of [`Waiter::wait_for`].
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    /// `Exists`/`Hittable` held; the element as last seen.
    Found(UIElement),
    /// `NotExists` held.
    Gone,
    /// The deadline passed first.
    TimedOut,
}

impl WaitOutcome {
    /// True unless the wait timed out.
    pub fn is_satisfied(&self) -> bool {
        !matches!(self, WaitOutcome::TimedOut)
    }

    pub fn element(&self) -> Option<&UIElement> {
        match self {
            WaitOutcome::Found(element) => Some(element),
            _ => None,
        }
    }

    pub fn into_element(self) -> Option<UIElement> {
        match self {
            WaitOutcome::Found(element) => Some(element),
            _ => None,
        }
    }
}

/// Poll timing: first interval, growth factor and cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_interval: Duration,
    pub backoff: f64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&SuiteConfig::default())
    }
}

impl PollPolicy {
    pub fn from_config(config: &SuiteConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            max_interval: Duration::from_millis(config.max_poll_interval_ms.max(config.poll_interval_ms)),
            backoff: config.poll_backoff.max(1.0),
        }
    }

    /// Polls at a constant interval.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            max_interval: interval,
            backoff: 1.0,
        }
    }

    /// The interval to use after `current`.
    pub fn next(&self, current: Duration) -> Duration {
        current.mul_f64(self.backoff).min(self.max_interval)
    }
}

/// Polls `probe` until it yields a value or `timeout` elapses.
///
/// The probe always runs at least once, and once more at the deadline, so a
/// zero timeout is a single check. Errors from the probe end the poll.
pub async fn poll_until<T, F, Fut>(policy: &PollPolicy, timeout: Duration, mut probe: F) -> Result<Option<T>, UiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, UiError>>,
{
    let deadline = Instant::now() + timeout;
    let mut interval = policy.interval;
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        if let Some(value) = probe().await? {
            debug!(attempts, "poll satisfied");
            return Ok(Some(value));
        }
        let now = Instant::now();
        if now >= deadline {
            debug!(attempts, "poll timed out");
            return Ok(None);
        }
        sleep(interval.min(deadline - now)).await;
        interval = policy.next(interval);
    }
}

/// Descriptor-level waits against one backend.
///
/// When built with an [`InterruptionMonitor`], registered handlers are
/// serviced before every probe.
#[derive(Clone, Copy)]
pub struct Waiter<'a> {
    backend: &'a dyn AccessibilityBackend,
    monitor: Option<&'a InterruptionMonitor>,
    policy: PollPolicy,
    default_timeout: Duration,
}

impl<'a> Waiter<'a> {
    pub fn new(backend: &'a dyn AccessibilityBackend, config: &SuiteConfig) -> Self {
        Self {
            backend,
            monitor: None,
            policy: PollPolicy::from_config(config),
            default_timeout: config.default_timeout(),
        }
    }

    pub fn with_monitor(mut self, monitor: &'a InterruptionMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// The same waiter without interruption handling.
    pub fn without_monitor(mut self) -> Self {
        self.monitor = None;
        self
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn backend(&self) -> &'a dyn AccessibilityBackend {
        self.backend
    }

    /// Offers any system alert to the registered handlers.
    pub async fn service_interruptions(&self) -> Result<Interruption, UiError> {
        match self.monitor {
            Some(monitor) => monitor.service(self.backend).await,
            None => Ok(Interruption::None),
        }
    }

    /// Fresh roots for `scope`, or `None` after a transient failure.
    pub async fn snapshot(&self, scope: Scope) -> Result<Option<Vec<UIElement>>, UiError> {
        match self.backend.snapshot(scope).await {
            Ok(roots) => Ok(Some(roots)),
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                warn!(%scope, error = %e, "snapshot failed, retrying");
                Ok(None)
            }
        }
    }

    /// One probe: service interruptions, then resolve against a fresh snapshot.
    pub async fn resolve_now(&self, descriptor: &Descriptor) -> Result<Option<UIElement>, UiError> {
        self.service_interruptions().await?;
        Ok(self
            .snapshot(descriptor.scope())
            .await?
            .and_then(|roots| descriptor.resolve(&roots).cloned()))
    }

    /// Single non-waiting existence check.
    pub async fn exists_now(&self, descriptor: &Descriptor) -> Result<bool, UiError> {
        Ok(self.resolve_now(descriptor).await?.is_some())
    }

    /// Every element currently matching the descriptor, ignoring its index.
    pub async fn all(&self, descriptor: &Descriptor) -> Result<Vec<UIElement>, UiError> {
        self.service_interruptions().await?;
        Ok(self
            .snapshot(descriptor.scope())
            .await?
            .map(|roots| descriptor.resolve_all(&roots).into_iter().cloned().collect())
            .unwrap_or_default())
    }

    pub async fn count(&self, descriptor: &Descriptor) -> Result<usize, UiError> {
        Ok(self.all(descriptor).await?.len())
    }

    /// Polls until `condition` holds for `descriptor` or the timeout passes.
    ///
    /// `None` uses the context-wide default timeout.
    pub async fn wait_for(
        &self,
        descriptor: &Descriptor,
        condition: Condition,
        timeout: Option<Duration>,
    ) -> Result<WaitOutcome, UiError> {
        let timeout = timeout.unwrap_or(self.default_timeout);
        let span = info_span!(
            "wait_for",
            descriptor = %descriptor,
            ?condition,
            timeout_ms = timeout.as_millis() as u64
        );
        async move {
            let result = poll_until(&self.policy, timeout, || async move {
                self.service_interruptions().await?;
                let Some(roots) = self.snapshot(descriptor.scope()).await? else {
                    return Ok(None);
                };
                let found = descriptor.resolve(&roots);
                Ok(match (condition, found) {
                    (Condition::Exists, Some(element)) => Some(WaitOutcome::Found(element.clone())),
                    (Condition::Hittable, Some(element)) if element.is_hittable() => {
                        Some(WaitOutcome::Found(element.clone()))
                    }
                    (Condition::NotExists, None) => Some(WaitOutcome::Gone),
                    _ => None,
                })
            })
            .await?;

            let outcome = result.unwrap_or(WaitOutcome::TimedOut);
            if outcome == WaitOutcome::TimedOut {
                debug!("wait timed out");
            }
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    /// Waits for the element to exist and returns it.
    pub async fn wait_for_element(
        &self,
        descriptor: &Descriptor,
        timeout: Option<Duration>,
    ) -> Result<Option<UIElement>, UiError> {
        Ok(self.wait_for(descriptor, Condition::Exists, timeout).await?.into_element())
    }

    pub async fn wait_until_hittable(
        &self,
        descriptor: &Descriptor,
        timeout: Option<Duration>,
    ) -> Result<Option<UIElement>, UiError> {
        Ok(self.wait_for(descriptor, Condition::Hittable, timeout).await?.into_element())
    }

    /// True once the element is gone.
    pub async fn wait_until_gone(&self, descriptor: &Descriptor, timeout: Option<Duration>) -> Result<bool, UiError> {
        Ok(self.wait_for(descriptor, Condition::NotExists, timeout).await? == WaitOutcome::Gone)
    }
}
