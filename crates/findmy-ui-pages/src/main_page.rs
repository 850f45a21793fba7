//! The Find My home screen: tab bar, card container and list of entries.

use std::fmt;

use findmy_ui_core::context::TestContext;
use findmy_ui_core::descriptor::{Descriptor, Matcher};
use findmy_ui_core::element::{kind, UIElement};
use findmy_ui_core::error::Verification;
use tracing::debug;

use crate::base::{arrive, BasePage, Page};
use crate::device_detail::DeviceDetailPage;
use crate::item_detail::ItemDetailPage;
use crate::me_page::MePage;
use crate::navigation::NavResult;
use crate::people_detail::PeopleDetailPage;

pub const LIST_TITLE_ID: &str = "FindMyListViewTitle";
pub const ADD_ACTION_ID: &str = "FindMyListViewAddAction";
pub const CARD_CONTAINER_ID: &str = "CardContainerView";
pub const LIST_ENTRIES_ID: &str = "FindMyListEntries";
pub const CELL_ID: &str = "HomeElementCell";
pub const CELL_TITLE_ID: &str = "HomeCellTitleLabel";
pub const CELL_SUBTITLE_ID: &str = "HomeCellSubtitleLabel";

/// The four tabs along the bottom of the home screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    People,
    Devices,
    Items,
    Me,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::People, Tab::Devices, Tab::Items, Tab::Me];

    pub fn label(self) -> &'static str {
        match self {
            Tab::People => "People",
            Tab::Devices => "Devices",
            Tab::Items => "Items",
            Tab::Me => "Me",
        }
    }

    pub fn descriptor(self) -> Descriptor {
        Descriptor::label(self.label()).of_type(kind::BUTTON)
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// First table on screen; the list of people, devices or items.
pub fn list_table() -> Descriptor {
    Descriptor::of_kind(kind::TABLE)
}

/// Every cell of the list.
pub fn list_cells() -> Descriptor {
    Descriptor::of_kind(kind::CELL).within(list_table())
}

/// The first cell whose label, or any label inside it, contains `name`
/// ignoring case.
pub fn list_cell_named(name: &str) -> Descriptor {
    let part = name.to_lowercase();
    list_cells().and(Matcher::Any(vec![
        Matcher::LabelContains(part.clone()),
        Matcher::HasDescendant(Box::new(Matcher::LabelContains(part))),
    ]))
}

pub struct MainPage<'c> {
    base: BasePage<'c>,
}

impl<'c> Page<'c> for MainPage<'c> {
    const NAME: &'static str = "main";

    fn new(ctx: &'c TestContext) -> Self {
        Self {
            base: BasePage::new(ctx, Self::NAME),
        }
    }

    fn anchor() -> Descriptor {
        Descriptor::id(CARD_CONTAINER_ID)
    }
}

impl<'c> MainPage<'c> {
    /// Waits for the home screen after launch.
    pub async fn wait(ctx: &'c TestContext) -> NavResult<Self> {
        arrive(ctx, None).await
    }

    pub fn base(&self) -> &BasePage<'c> {
        &self.base
    }

    pub async fn select_tab(self, tab: Tab) -> NavResult<Self> {
        debug!(%tab, "selecting tab");
        self.base.tap(&tab.descriptor()).await?;
        Ok(self)
    }

    pub async fn go_to_people(self) -> NavResult<Self> {
        self.select_tab(Tab::People).await
    }

    pub async fn go_to_devices(self) -> NavResult<Self> {
        self.select_tab(Tab::Devices).await
    }

    pub async fn go_to_items(self) -> NavResult<Self> {
        self.select_tab(Tab::Items).await
    }

    /// The Me tab replaces the list with the profile sheet.
    pub async fn open_me(self) -> NavResult<MePage<'c>> {
        self.base.tap(&Tab::Me.descriptor()).await?;
        arrive(self.base.ctx(), None).await
    }

    pub async fn tap_add(self) -> NavResult<Self> {
        self.base.tap(&Descriptor::id(ADD_ACTION_ID)).await?;
        Ok(self)
    }

    pub async fn is_tab_selected(&self, tab: Tab) -> NavResult<bool> {
        self.base.is_selected(&tab.descriptor()).await
    }

    /// Number of cells in the list right now.
    pub async fn list_item_count(&self) -> NavResult<usize> {
        Ok(self.base.count(&list_cells()).await?)
    }

    /// Visible names of the list entries, in order.
    pub async fn list_item_names(&self) -> NavResult<Vec<String>> {
        let cells = self.base.waiter().all(&list_cells()).await?;
        Ok(cells.iter().map(cell_title).collect())
    }

    #[track_caller]
    pub fn verify_displayed(&self) -> Verification<'c, UIElement> {
        self.base.verify_exists(Self::anchor(), None)
    }

    #[track_caller]
    pub fn verify_tab_selected(&self, tab: Tab) -> Verification<'c, ()> {
        self.base.verify_selected(tab.descriptor())
    }

    #[track_caller]
    pub fn verify_list_displayed(&self) -> Verification<'c, UIElement> {
        self.base.verify_exists(list_table(), None)
    }

    /// Fails unless every tab is on screen and hittable.
    #[track_caller]
    pub fn verify_all_tabs_visible(&self) -> Verification<'c, ()> {
        let mut checks = Vec::with_capacity(Tab::ALL.len());
        for tab in Tab::ALL {
            checks.push(self.base.verify_hittable(tab.descriptor(), None));
        }
        Box::pin(async move {
            for check in checks {
                check.await?;
            }
            Ok(())
        })
    }

    /// Fails unless the list has at least `minimum` entries.
    #[track_caller]
    pub fn verify_list_has_at_least(&self, minimum: usize) -> Verification<'c, usize> {
        self.base.verify_count_at_least(list_cells(), minimum)
    }

    pub async fn open_person(self, name: &str) -> NavResult<PeopleDetailPage<'c>> {
        self.open(list_cell_named(name)).await
    }

    pub async fn open_person_at(self, index: usize) -> NavResult<PeopleDetailPage<'c>> {
        self.open(list_cells().nth(index)).await
    }

    pub async fn open_first_person(self) -> NavResult<PeopleDetailPage<'c>> {
        self.go_to_people().await?.open_person_at(0).await
    }

    pub async fn open_device(self, name: &str) -> NavResult<DeviceDetailPage<'c>> {
        self.open(list_cell_named(name)).await
    }

    pub async fn open_device_at(self, index: usize) -> NavResult<DeviceDetailPage<'c>> {
        self.open(list_cells().nth(index)).await
    }

    pub async fn open_first_device(self) -> NavResult<DeviceDetailPage<'c>> {
        self.go_to_devices().await?.open_device_at(0).await
    }

    pub async fn open_item(self, name: &str) -> NavResult<ItemDetailPage<'c>> {
        self.open(list_cell_named(name)).await
    }

    pub async fn open_item_at(self, index: usize) -> NavResult<ItemDetailPage<'c>> {
        self.open(list_cells().nth(index)).await
    }

    pub async fn open_first_item(self) -> NavResult<ItemDetailPage<'c>> {
        self.go_to_items().await?.open_item_at(0).await
    }

    async fn open<P: Page<'c>>(self, cell: Descriptor) -> NavResult<P> {
        debug!(cell = %cell, page = P::NAME, "opening entry");
        self.base.tap(&cell).await?;
        arrive(self.base.ctx(), None).await
    }
}

/// The title label of a list cell. Cells without one fall back to their
/// own label, then to the first labelled descendant.
fn cell_title(cell: &UIElement) -> String {
    let title = Descriptor::id(CELL_TITLE_ID);
    if let Some(label) = cell.descendants().find(|e| title.matcher().matches(e)) {
        return label.label_text().to_string();
    }
    if !cell.label_text().is_empty() {
        return cell.label_text().to_string();
    }
    cell.descendants()
        .skip(1)
        .map(UIElement::label_text)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_labels() {
        let labels: Vec<_> = Tab::ALL.iter().map(|t| t.label()).collect();
        assert_eq!(labels, ["People", "Devices", "Items", "Me"]);
        assert_eq!(Tab::Devices.to_string(), "Devices");
    }

    #[test]
    fn test_cell_named_matches_descendant_label() {
        let roots = vec![UIElement::new(kind::TABLE).with_children(vec![
            UIElement::new(kind::CELL)
                .with_id(CELL_ID)
                .with_child(UIElement::new(kind::STATIC_TEXT).with_label("iPhone")),
            UIElement::new(kind::CELL)
                .with_id(CELL_ID)
                .with_child(UIElement::new(kind::STATIC_TEXT).with_label("Chi’s Laptop")),
        ])];
        let found = list_cell_named("laptop").resolve(&roots).unwrap();
        assert_eq!(cell_title(found), "Chi’s Laptop");
    }

    #[test]
    fn test_cell_title_prefers_title_label() {
        let cell = UIElement::new(kind::CELL).with_label("AirTag, 2 km").with_children(vec![
            UIElement::new(kind::STATIC_TEXT).with_id(CELL_TITLE_ID).with_label("AirTag"),
            UIElement::new(kind::STATIC_TEXT).with_id(CELL_SUBTITLE_ID).with_label("2 km"),
        ]);
        assert_eq!(cell_title(&cell), "AirTag");
        assert_eq!(cell_title(&UIElement::new(kind::CELL).with_label("Keys")), "Keys");
    }

    #[test]
    fn test_unlabelled_cell_uses_first_labelled_descendant() {
        let cell = UIElement::new(kind::CELL).with_id(CELL_ID).with_children(vec![
            UIElement::new(kind::IMAGE),
            UIElement::new(kind::OTHER).with_child(UIElement::new(kind::STATIC_TEXT).with_label("Backpack")),
            UIElement::new(kind::STATIC_TEXT).with_label("Home, Now"),
        ]);
        assert_eq!(cell_title(&cell), "Backpack");
        assert_eq!(cell_title(&UIElement::new(kind::CELL)), "");
    }
}
