//! Detail card of a person sharing their location.

use findmy_ui_core::context::TestContext;
use findmy_ui_core::descriptor::Descriptor;
use findmy_ui_core::element::{kind, UIElement};
use findmy_ui_core::error::Verification;

use crate::base::{arrive, button, map, static_text, BasePage, Page};
use crate::main_page::MainPage;
use crate::navigation::NavResult;

pub const CLOSE_LABEL: &str = "Close";
pub const DONE_LABEL: &str = "Done";
pub const NAME_ID: &str = "PrimaryLabel";
pub const AVATAR_ID: &str = "PersonAvatar";
pub const CONTACT_LABEL: &str = "Contact,Info";
// The trailing space is part of the label.
pub const DIRECTIONS_LABEL: &str = "Directions, ";
pub const ADD_TO_FAVOURITES_LABEL: &str = "Add to Favourites";
pub const LABEL_LOCATION_LABEL: &str = "Label Current Location";
pub const STOP_SHARING_LABEL: &str = "Stop Sharing My Location";
pub const REMOVE_LABEL: &str = "Remove";
pub const LOCATION_ID: &str = "LocationLabel";
pub const LAST_SEEN_ID: &str = "LastSeenLabel";

pub struct PeopleDetailPage<'c> {
    base: BasePage<'c>,
}

impl<'c> Page<'c> for PeopleDetailPage<'c> {
    const NAME: &'static str = "people detail";

    fn new(ctx: &'c TestContext) -> Self {
        Self {
            base: BasePage::new(ctx, Self::NAME),
        }
    }

    fn anchor() -> Descriptor {
        map()
    }
}

impl<'c> PeopleDetailPage<'c> {
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

    pub async fn contact(self) -> NavResult<Self> {
        self.base.tap(&button(CONTACT_LABEL)).await?;
        Ok(self)
    }

    pub async fn get_directions(self) -> NavResult<Self> {
        self.base.tap(&button(DIRECTIONS_LABEL)).await?;
        Ok(self)
    }

    pub async fn add_to_favourites(self) -> NavResult<Self> {
        self.base.tap(&button(ADD_TO_FAVOURITES_LABEL)).await?;
        Ok(self)
    }

    pub async fn label_current_location(self) -> NavResult<Self> {
        self.base.tap(&button(LABEL_LOCATION_LABEL)).await?;
        Ok(self)
    }

    pub async fn stop_sharing_location(self) -> NavResult<Self> {
        self.base.tap(&button(STOP_SHARING_LABEL)).await?;
        Ok(self)
    }

    pub async fn remove(self) -> NavResult<Self> {
        self.base.tap(&button(REMOVE_LABEL)).await?;
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

    #[track_caller]
    pub fn verify_person_name(&self, name: &str) -> Verification<'c, UIElement> {
        self.base
            .verify_exists(Descriptor::label_contains(name).of_type(kind::STATIC_TEXT), None)
    }

    #[track_caller]
    pub fn verify_location_displayed(&self) -> Verification<'c, usize> {
        self.base.verify_count_at_least(Descriptor::of_kind(kind::STATIC_TEXT), 1)
    }

    #[track_caller]
    pub fn verify_contact_visible(&self) -> Verification<'c, UIElement> {
        self.base.verify_exists(button(CONTACT_LABEL), None)
    }

    #[track_caller]
    pub fn verify_directions_visible(&self) -> Verification<'c, UIElement> {
        self.base.verify_exists(button(DIRECTIONS_LABEL), None)
    }

    #[track_caller]
    pub fn verify_remove_visible(&self) -> Verification<'c, UIElement> {
        self.base.verify_exists(button(REMOVE_LABEL), None)
    }

    #[track_caller]
    pub fn verify_map_displayed(&self) -> Verification<'c, UIElement> {
        self.base.verify_exists(map(), None)
    }

    #[track_caller]
    pub fn verify_close_visible(&self) -> Verification<'c, UIElement> {
        self.base.verify_exists(button(CLOSE_LABEL), None)
    }

    pub async fn person_name(&self) -> NavResult<String> {
        self.base.label_of(&static_text(NAME_ID)).await
    }

    pub async fn location_text(&self) -> NavResult<String> {
        self.base.label_of(&static_text(LOCATION_ID)).await
    }

    pub async fn last_seen_text(&self) -> NavResult<String> {
        self.base.label_of(&static_text(LAST_SEEN_ID)).await
    }

    pub async fn is_contact_enabled(&self) -> NavResult<bool> {
        self.base.is_enabled(&button(CONTACT_LABEL)).await
    }

    pub async fn is_directions_enabled(&self) -> NavResult<bool> {
        self.base.is_enabled(&button(DIRECTIONS_LABEL)).await
    }

    pub async fn is_remove_enabled(&self) -> NavResult<bool> {
        self.base.is_enabled(&button(REMOVE_LABEL)).await
    }
}
