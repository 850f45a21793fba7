//! Detail card of an item such as an AirTag.

use findmy_ui_core::context::TestContext;
use findmy_ui_core::descriptor::Descriptor;
use findmy_ui_core::element::{kind, UIElement};
use findmy_ui_core::error::Verification;

use crate::base::{arrive, button, map, static_text, BasePage, Page};
use crate::main_page::MainPage;
use crate::navigation::NavResult;

pub const CLOSE_LABEL: &str = "Close";
pub const DONE_LABEL: &str = "Done";
pub const NAME_ID: &str = "ItemName";
pub const IMAGE_ID: &str = "ItemImage";
pub const PLAY_SOUND_LABEL: &str = "Play Sound";
pub const DIRECTIONS_LABEL: &str = "Directions, ";
pub const FIND_NEARBY_LABEL: &str = "Find Nearby";
pub const LOST_MODE_LABEL: &str = "Lost Mode";
pub const REMOVE_LABEL: &str = "Remove Item";
pub const NOTIFY_LABEL: &str = "Notify When Found";
pub const IDENTIFY_LABEL: &str = "Identify Found Item";
pub const LOCATION_ID: &str = "LocationLabel";
pub const LAST_SEEN_ID: &str = "LastSeenLabel";
pub const BATTERY_ID: &str = "BatteryLabel";

pub struct ItemDetailPage<'c> {
    base: BasePage<'c>,
}

impl<'c> Page<'c> for ItemDetailPage<'c> {
    const NAME: &'static str = "item detail";

    fn new(ctx: &'c TestContext) -> Self {
        Self {
            base: BasePage::new(ctx, Self::NAME),
        }
    }

    fn anchor() -> Descriptor {
        map()
    }
}

impl<'c> ItemDetailPage<'c> {
    pub fn base(&self) -> &BasePage<'c> {
        &self.base
    }

    pub async fn close(self) -> NavResult<MainPage<'c>> {
        self.base.tap(&button(CLOSE_LABEL)).await?;
        arrive(self.base.ctx(), None).await
    }

    pub async fn done(self) -> NavResult<MainPage<'c>> {
        self.base.tap(&button(DONE_LABEL)).await?;
        arrive(self.base.ctx(), None).await
    }

    pub async fn play_sound(self) -> NavResult<Self> {
        self.tap(PLAY_SOUND_LABEL).await
    }

    pub async fn get_directions(self) -> NavResult<Self> {
        self.tap(DIRECTIONS_LABEL).await
    }

    pub async fn find_nearby(self) -> NavResult<Self> {
        self.tap(FIND_NEARBY_LABEL).await
    }

    pub async fn toggle_lost_mode(self) -> NavResult<Self> {
        self.tap(LOST_MODE_LABEL).await
    }

    pub async fn remove(self) -> NavResult<Self> {
        self.tap(REMOVE_LABEL).await
    }

    pub async fn toggle_notify_when_found(self) -> NavResult<Self> {
        self.tap(NOTIFY_LABEL).await
    }

    pub async fn identify_found_item(self) -> NavResult<Self> {
        self.tap(IDENTIFY_LABEL).await
    }

    pub async fn tap_map(self) -> NavResult<Self> {
        self.base.tap(&map()).await?;
        Ok(self)
    }

    async fn tap(self, label: &str) -> NavResult<Self> {
        self.base.tap(&button(label)).await?;
        Ok(self)
    }

    #[track_caller]
    pub fn verify_displayed(&self) -> Verification<'c, UIElement> {
        self.base.verify_exists(Self::anchor(), None)
    }

    #[track_caller]
    pub fn verify_item_name(&self, name: &str) -> Verification<'c, UIElement> {
        self.base
            .verify_exists(Descriptor::label_contains(name).of_type(kind::STATIC_TEXT), None)
    }

    #[track_caller]
    pub fn verify_location_displayed(&self) -> Verification<'c, usize> {
        self.base.verify_count_at_least(Descriptor::of_kind(kind::STATIC_TEXT), 1)
    }

    #[track_caller]
    pub fn verify_play_sound_visible(&self) -> Verification<'c, UIElement> {
        self.base.verify_exists(button(PLAY_SOUND_LABEL), None)
    }

    #[track_caller]
    pub fn verify_find_nearby_visible(&self) -> Verification<'c, UIElement> {
        self.base.verify_exists(button(FIND_NEARBY_LABEL), None)
    }

    #[track_caller]
    pub fn verify_directions_visible(&self) -> Verification<'c, UIElement> {
        self.base.verify_exists(button(DIRECTIONS_LABEL), None)
    }

    #[track_caller]
    pub fn verify_lost_mode_visible(&self) -> Verification<'c, UIElement> {
        self.base.verify_exists(button(LOST_MODE_LABEL), None)
    }

    #[track_caller]
    pub fn verify_map_displayed(&self) -> Verification<'c, UIElement> {
        self.base.verify_exists(map(), None)
    }

    #[track_caller]
    pub fn verify_close_visible(&self) -> Verification<'c, UIElement> {
        self.base.verify_exists(button(CLOSE_LABEL), None)
    }

    pub async fn item_name(&self) -> NavResult<String> {
        self.base.label_of(&static_text(NAME_ID)).await
    }

    pub async fn location_text(&self) -> NavResult<String> {
        self.base.label_of(&static_text(LOCATION_ID)).await
    }

    pub async fn last_seen_text(&self) -> NavResult<String> {
        self.base.label_of(&static_text(LAST_SEEN_ID)).await
    }

    pub async fn battery_level(&self) -> NavResult<String> {
        self.base.label_of(&static_text(BATTERY_ID)).await
    }

    pub async fn is_play_sound_enabled(&self) -> NavResult<bool> {
        self.base.is_enabled(&button(PLAY_SOUND_LABEL)).await
    }

    pub async fn is_find_nearby_enabled(&self) -> NavResult<bool> {
        self.base.is_enabled(&button(FIND_NEARBY_LABEL)).await
    }

    pub async fn is_directions_enabled(&self) -> NavResult<bool> {
        self.base.is_enabled(&button(DIRECTIONS_LABEL)).await
    }

    pub async fn is_lost_mode_enabled(&self) -> NavResult<bool> {
        self.base.is_enabled(&button(LOST_MODE_LABEL)).await
    }
}
