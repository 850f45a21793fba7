//! Shared page plumbing.
//!
//! Every page object wraps a [`BasePage`], which turns descriptor lookups into
//! waits and dispatches against the borrowed [`TestContext`]. Actions wait for
//! their target first and report a missing target as
//! [`NavigationError::ElementMissing`] instead of tapping blind.

use std::panic::Location;
use std::time::Duration;

use findmy_ui_core::action::{Action, SwipeDirection};
use findmy_ui_core::context::TestContext;
use findmy_ui_core::descriptor::Descriptor;
use findmy_ui_core::dispatch::DispatchOutcome;
use findmy_ui_core::element::{kind, UIElement};
use findmy_ui_core::error::{UiError, Verification};
use findmy_ui_core::wait::Waiter;
use tracing::debug;

use crate::navigation::{NavResult, NavigationError};

/// A button by its exact label.
pub fn button(label: &str) -> Descriptor {
    Descriptor::label(label).of_type(kind::BUTTON)
}

/// A static text by its accessibility identifier.
pub fn static_text(identifier: &str) -> Descriptor {
    Descriptor::id(identifier).of_type(kind::STATIC_TEXT)
}

/// The first map on screen.
pub fn map() -> Descriptor {
    Descriptor::of_kind(kind::MAP)
}

/// A logical screen of the app.
pub trait Page<'c>: Sized {
    /// Name used in errors and logs.
    const NAME: &'static str;

    fn new(ctx: &'c TestContext) -> Self;

    /// Element whose presence means the app is showing this page.
    fn anchor() -> Descriptor;
}

/// Waits for `P`'s anchor and returns the page once it is showing.
pub async fn arrive<'c, P: Page<'c>>(ctx: &'c TestContext, timeout: Option<Duration>) -> NavResult<P> {
    let anchor = P::anchor();
    if ctx.waiter().wait_for_element(&anchor, timeout).await?.is_none() {
        return Err(NavigationError::missing(P::NAME, anchor));
    }
    debug!(page = P::NAME, "arrived");
    Ok(P::new(ctx))
}

/// Lookups, actions and verifications shared by all pages.
#[derive(Clone, Copy)]
pub struct BasePage<'c> {
    ctx: &'c TestContext,
    page: &'static str,
}

impl<'c> BasePage<'c> {
    pub fn new(ctx: &'c TestContext, page: &'static str) -> Self {
        Self { ctx, page }
    }

    pub fn ctx(&self) -> &'c TestContext {
        self.ctx
    }

    pub fn name(&self) -> &'static str {
        self.page
    }

    pub fn waiter(&self) -> Waiter<'c> {
        self.ctx.waiter()
    }

    pub fn default_timeout(&self) -> Duration {
        self.ctx.config().default_timeout()
    }

    pub async fn wait_for(&self, descriptor: &Descriptor, timeout: Option<Duration>) -> Result<Option<UIElement>, UiError> {
        self.waiter().wait_for_element(descriptor, timeout).await
    }

    pub async fn wait_until_hittable(
        &self,
        descriptor: &Descriptor,
        timeout: Option<Duration>,
    ) -> Result<Option<UIElement>, UiError> {
        self.waiter().wait_until_hittable(descriptor, timeout).await
    }

    pub async fn wait_until_gone(&self, descriptor: &Descriptor, timeout: Option<Duration>) -> Result<bool, UiError> {
        self.waiter().wait_until_gone(descriptor, timeout).await
    }

    /// Existence right now, without waiting.
    pub async fn exists(&self, descriptor: &Descriptor) -> Result<bool, UiError> {
        self.waiter().exists_now(descriptor).await
    }

    pub async fn count(&self, descriptor: &Descriptor) -> Result<usize, UiError> {
        self.waiter().count(descriptor).await
    }

    /// Waits for the element with the default timeout.
    pub async fn find(&self, descriptor: &Descriptor) -> NavResult<UIElement> {
        self.wait_for(descriptor, None)
            .await?
            .ok_or_else(|| NavigationError::missing(self.page, descriptor))
    }

    pub async fn label_of(&self, descriptor: &Descriptor) -> NavResult<String> {
        Ok(self.find(descriptor).await?.label_text().to_string())
    }

    pub async fn is_enabled(&self, descriptor: &Descriptor) -> NavResult<bool> {
        Ok(self.find(descriptor).await?.is_enabled())
    }

    pub async fn is_selected(&self, descriptor: &Descriptor) -> NavResult<bool> {
        Ok(self.find(descriptor).await?.is_selected())
    }

    /// Waits for the target, then performs `action` on it.
    pub async fn act(&self, descriptor: &Descriptor, action: Action) -> NavResult<()> {
        self.find(descriptor).await?;
        match self.ctx.dispatcher().perform(descriptor, action, None).await? {
            DispatchOutcome::Performed { .. } => Ok(()),
            DispatchOutcome::NotFound => Err(NavigationError::missing(self.page, descriptor)),
        }
    }

    pub async fn tap(&self, descriptor: &Descriptor) -> NavResult<()> {
        self.act(descriptor, Action::Tap).await
    }

    pub async fn double_tap(&self, descriptor: &Descriptor) -> NavResult<()> {
        self.act(descriptor, Action::DoubleTap).await
    }

    pub async fn long_press(&self, descriptor: &Descriptor) -> NavResult<()> {
        let duration_ms = self.ctx.config().long_press_ms;
        self.act(descriptor, Action::LongPress { duration_ms }).await
    }

    pub async fn swipe(&self, descriptor: &Descriptor, direction: SwipeDirection) -> NavResult<()> {
        self.act(descriptor, Action::Swipe { direction }).await
    }

    pub async fn type_text(&self, descriptor: &Descriptor, text: &str) -> NavResult<()> {
        let action = Action::TypeText { text: text.to_string() };
        self.act(descriptor, action).await
    }

    pub async fn clear_text(&self, descriptor: &Descriptor) -> NavResult<()> {
        self.act(descriptor, Action::ClearText).await
    }

    /// Fails unless the element appears within `timeout`.
    #[track_caller]
    pub fn verify_exists(&self, descriptor: Descriptor, timeout: Option<Duration>) -> Verification<'c, UIElement> {
        let location = Location::caller();
        let page = self.page;
        let waiter = self.waiter();
        Box::pin(async move {
            waiter.wait_for_element(&descriptor, timeout).await?.ok_or_else(|| {
                UiError::assertion_at(format!("{page}: expected {descriptor} to exist"), location)
            })
        })
    }

    /// Fails if the element is on screen now.
    #[track_caller]
    pub fn verify_not_exists(&self, descriptor: Descriptor) -> Verification<'c, ()> {
        let location = Location::caller();
        let page = self.page;
        let waiter = self.waiter();
        Box::pin(async move {
            if waiter.exists_now(&descriptor).await? {
                return Err(UiError::assertion_at(
                    format!("{page}: {descriptor} should not exist"),
                    location,
                ));
            }
            Ok(())
        })
    }

    #[track_caller]
    pub fn verify_hittable(&self, descriptor: Descriptor, timeout: Option<Duration>) -> Verification<'c, UIElement> {
        let location = Location::caller();
        let page = self.page;
        let waiter = self.waiter();
        Box::pin(async move {
            waiter.wait_until_hittable(&descriptor, timeout).await?.ok_or_else(|| {
                UiError::assertion_at(format!("{page}: {descriptor} is not hittable"), location)
            })
        })
    }

    #[track_caller]
    pub fn verify_label(&self, descriptor: Descriptor, expected: &'c str) -> Verification<'c, ()> {
        let location = Location::caller();
        let page = self.page;
        let waiter = self.waiter();
        Box::pin(async move {
            let element = waiter.wait_for_element(&descriptor, None).await?.ok_or_else(|| {
                UiError::assertion_at(format!("{page}: expected {descriptor} to exist"), location)
            })?;
            if element.label_text() != expected {
                return Err(UiError::assertion_at(
                    format!("{page}: {descriptor} has label {:?}, expected {expected:?}", element.label_text()),
                    location,
                ));
            }
            Ok(())
        })
    }

    /// Fails unless at least `minimum` elements match right now.
    #[track_caller]
    pub fn verify_count_at_least(&self, descriptor: Descriptor, minimum: usize) -> Verification<'c, usize> {
        let location = Location::caller();
        let page = self.page;
        let waiter = self.waiter();
        Box::pin(async move {
            let count = waiter.count(&descriptor).await?;
            if count < minimum {
                return Err(UiError::assertion_at(
                    format!("{page}: expected at least {minimum} of {descriptor}, found {count}"),
                    location,
                ));
            }
            Ok(count)
        })
    }

    /// Fails unless the element exists and is selected.
    #[track_caller]
    pub fn verify_selected(&self, descriptor: Descriptor) -> Verification<'c, ()> {
        let location = Location::caller();
        let page = self.page;
        let waiter = self.waiter();
        Box::pin(async move {
            match waiter.wait_for_element(&descriptor, None).await? {
                Some(element) if element.is_selected() => Ok(()),
                Some(_) => Err(UiError::assertion_at(format!("{page}: {descriptor} should be selected"), location)),
                None => Err(UiError::assertion_at(format!("{page}: expected {descriptor} to exist"), location)),
            }
        })
    }
}
