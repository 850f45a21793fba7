//! The Me tab: the user's own profile and settings.

use findmy_ui_core::context::TestContext;
use findmy_ui_core::descriptor::{Descriptor, Matcher};
use findmy_ui_core::element::UIElement;
use findmy_ui_core::error::Verification;
use tracing::debug;

use crate::base::{arrive, button, static_text, BasePage, Page};
use crate::main_page::{MainPage, Tab};
use crate::navigation::NavResult;

pub const TITLE_ID: &str = "PrimaryLabel";
pub const CLEAR_IGNORED_LABEL: &str = "Clear Ignored Items";
pub const CONFIRM_CLEAR_LABEL: &str = "Clear";
pub const CANCEL_LABEL: &str = "Cancel";

pub struct MePage<'c> {
    base: BasePage<'c>,
}

impl<'c> Page<'c> for MePage<'c> {
    const NAME: &'static str = "me";

    fn new(ctx: &'c TestContext) -> Self {
        Self {
            base: BasePage::new(ctx, Self::NAME),
        }
    }

    fn anchor() -> Descriptor {
        static_text(TITLE_ID).and(Matcher::LabelContains("me".into()))
    }
}

impl<'c> MePage<'c> {
    pub fn base(&self) -> &BasePage<'c> {
        &self.base
    }

    pub async fn is_displayed(&self) -> NavResult<bool> {
        Ok(self.base.exists(&Self::anchor()).await?)
    }

    #[track_caller]
    pub fn verify_displayed(&self) -> Verification<'c, UIElement> {
        self.base.verify_exists(Self::anchor(), None)
    }

    /// Taps "Clear Ignored Items"; the app asks for confirmation.
    pub async fn clear_ignored_items(self) -> NavResult<Self> {
        self.base.tap(&button(CLEAR_IGNORED_LABEL)).await?;
        Ok(self)
    }

    /// Answers the confirmation raised by [`MePage::clear_ignored_items`].
    pub async fn confirm_clear_ignored(self, confirm: bool) -> NavResult<Self> {
        let label = if confirm { CONFIRM_CLEAR_LABEL } else { CANCEL_LABEL };
        debug!(label, "answering clear ignored items");
        self.base.tap(&button(label)).await?;
        Ok(self)
    }

    /// Leaves the Me tab for one of the list tabs.
    pub async fn select_tab(self, tab: Tab) -> NavResult<MainPage<'c>> {
        self.base.tap(&tab.descriptor()).await?;
        arrive(self.base.ctx(), None).await
    }
}
