//! Detail card of one of the user's devices.

use findmy_ui_core::context::TestContext;
use findmy_ui_core::descriptor::Descriptor;
use findmy_ui_core::element::{kind, UIElement};
use findmy_ui_core::error::Verification;
use tracing::info;

use crate::base::{arrive, button, map, static_text, BasePage, Page};
use crate::main_page::MainPage;
use crate::navigation::NavResult;

pub const CLOSE_LABEL: &str = "Close";
pub const DONE_LABEL: &str = "Done";
pub const NAME_ID: &str = "PrimaryLabel";
pub const IMAGE_ID: &str = "DeviceImage";
pub const PLAY_SOUND_LABEL: &str = "Play Sound,Off";
/// The state after the comma changes while a sound plays.
pub const PLAY_SOUND_PATTERN: &str = "Play Sound,*";
pub const DIRECTIONS_LABEL: &str = "Directions,";
pub const LOST_MODE_LABEL: &str = "Lost Mode, Enable additional protection, Off";
pub const LOST_MODE_PATTERN: &str = "Lost Mode,*";
pub const ERASE_LABEL: &str = "Erase";
pub const REMOVE_LABEL: &str = "Remove";
pub const LOCATION_ID: &str = "LocationLabel";
pub const LAST_SEEN_ID: &str = "LastSeenLabel";
pub const ADDRESS_ID: &str = "AddressLabel";

pub struct DeviceDetailPage<'c> {
    base: BasePage<'c>,
}

impl<'c> Page<'c> for DeviceDetailPage<'c> {
    const NAME: &'static str = "device detail";

    fn new(ctx: &'c TestContext) -> Self {
        Self {
            base: BasePage::new(ctx, Self::NAME),
        }
    }

    fn anchor() -> Descriptor {
        map()
    }
}

impl<'c> DeviceDetailPage<'c> {
    pub fn base(&self) -> &BasePage<'c> {
        &self.base
    }

    pub fn name_label() -> Descriptor {
        static_text(NAME_ID)
    }

    pub fn play_sound_button() -> Descriptor {
        Descriptor::label_glob(PLAY_SOUND_PATTERN).of_type(kind::BUTTON)
    }

    pub fn directions_button() -> Descriptor {
        button(DIRECTIONS_LABEL)
    }

    pub fn lost_mode_button() -> Descriptor {
        Descriptor::label_glob(LOST_MODE_PATTERN).of_type(kind::BUTTON)
    }

    pub fn notify_button() -> Descriptor {
        Descriptor::label_contains("notify").of_type(kind::BUTTON)
    }

    pub async fn close(self) -> NavResult<MainPage<'c>> {
        self.base.tap(&button(CLOSE_LABEL)).await?;
        arrive(self.base.ctx(), None).await
    }

    pub async fn done(self) -> NavResult<MainPage<'c>> {
        self.base.tap(&button(DONE_LABEL)).await?;
        arrive(self.base.ctx(), None).await
    }

    /// Starts a sound on the device. The system may answer with an alert.
    pub async fn play_sound(self) -> NavResult<Self> {
        self.base.tap(&Self::play_sound_button()).await?;
        info!("play sound requested");
        Ok(self)
    }

    pub async fn get_directions(self) -> NavResult<Self> {
        self.base.tap(&Self::directions_button()).await?;
        Ok(self)
    }

    pub async fn mark_as_lost(self) -> NavResult<Self> {
        self.base.tap(&Self::lost_mode_button()).await?;
        Ok(self)
    }

    pub async fn erase(self) -> NavResult<Self> {
        self.base.tap(&button(ERASE_LABEL)).await?;
        Ok(self)
    }

    pub async fn remove(self) -> NavResult<Self> {
        self.base.tap(&button(REMOVE_LABEL)).await?;
        Ok(self)
    }

    pub async fn toggle_notify_when_found(self) -> NavResult<Self> {
        self.base.tap(&Self::notify_button()).await?;
        Ok(self)
    }

    pub async fn tap_map(self) -> NavResult<Self> {
        self.base.tap(&map()).await?;
        Ok(self)
    }

    #[track_caller]
    pub fn verify_displayed(&self) -> Verification<'c, UIElement> {
        self.base.verify_exists(Self::anchor(), None)
    }

    /// Fails unless a text containing `name`, ignoring case, is shown.
    #[track_caller]
    pub fn verify_device_name(&self, name: &str) -> Verification<'c, UIElement> {
        self.base
            .verify_exists(Descriptor::label_contains(name).of_type(kind::STATIC_TEXT), None)
    }

    #[track_caller]
    pub fn verify_location_displayed(&self) -> Verification<'c, usize> {
        self.base.verify_count_at_least(Descriptor::of_kind(kind::STATIC_TEXT), 1)
    }

    #[track_caller]
    pub fn verify_play_sound_visible(&self) -> Verification<'c, UIElement> {
        self.base.verify_exists(Self::play_sound_button(), None)
    }

    #[track_caller]
    pub fn verify_directions_visible(&self) -> Verification<'c, UIElement> {
        self.base.verify_exists(Self::directions_button(), None)
    }

    #[track_caller]
    pub fn verify_lost_mode_visible(&self) -> Verification<'c, UIElement> {
        self.base.verify_exists(Self::lost_mode_button(), None)
    }

    #[track_caller]
    pub fn verify_map_displayed(&self) -> Verification<'c, UIElement> {
        self.base.verify_exists(map(), None)
    }

    #[track_caller]
    pub fn verify_close_visible(&self) -> Verification<'c, UIElement> {
        self.base.verify_exists(button(CLOSE_LABEL), None)
    }

    pub async fn device_name(&self) -> NavResult<String> {
        self.base.label_of(&Self::name_label()).await
    }

    pub async fn location_text(&self) -> NavResult<String> {
        self.base.label_of(&static_text(LOCATION_ID)).await
    }

    pub async fn last_seen_text(&self) -> NavResult<String> {
        self.base.label_of(&static_text(LAST_SEEN_ID)).await
    }

    pub async fn address_text(&self) -> NavResult<String> {
        self.base.label_of(&static_text(ADDRESS_ID)).await
    }

    pub async fn is_play_sound_enabled(&self) -> NavResult<bool> {
        self.base.is_enabled(&Self::play_sound_button()).await
    }

    pub async fn is_directions_enabled(&self) -> NavResult<bool> {
        self.base.is_enabled(&Self::directions_button()).await
    }

    pub async fn is_lost_mode_enabled(&self) -> NavResult<bool> {
        self.base.is_enabled(&Self::lost_mode_button()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(buttons: &[&str]) -> Vec<UIElement> {
        vec![UIElement::new(kind::OTHER)
            .with_children(buttons.iter().map(|l| UIElement::new(kind::BUTTON).with_label(*l)).collect())]
    }

    #[test]
    fn test_play_sound_matches_any_state() {
        let play = DeviceDetailPage::play_sound_button();
        for label in [PLAY_SOUND_LABEL, "Play Sound,On", "Play Sound,Playing…"] {
            assert!(play.resolve(&card(&[label])).is_some(), "{label}");
        }
        // Items label the button without a state.
        assert!(play.resolve(&card(&["Play Sound"])).is_none());
    }

    #[test]
    fn test_lost_mode_matches_on_and_off() {
        let lost = DeviceDetailPage::lost_mode_button();
        assert!(lost.resolve(&card(&[LOST_MODE_LABEL])).is_some());
        assert!(lost.resolve(&card(&["Lost Mode, Enabled, On"])).is_some());
        assert!(lost.resolve(&card(&["Lost Modes"])).is_none());
    }
}
