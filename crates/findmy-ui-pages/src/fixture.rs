//! Simulated Find My.
//!
//! A [`MemoryBackend`] scripted to behave like the parts of Find My the
//! scenarios touch: the tab lists, the detail cards, the Me sheet, the alert
//! raised by Play Sound and a notification centre. The CLI runs scenarios
//! against it with `--simulate`, and the integration tests use it as their
//! app.
//!
//! Layout follows a 390x844 point screen. Notifications stay in the system
//! tree while the centre is closed but are moved off screen, so they can be
//! counted but not tapped.

use findmy_ui_core::descriptor::{Descriptor, Scope};
use findmy_ui_core::element::{kind, ElementFrame, UIElement};
use findmy_ui_core::memory::{MemoryBackend, Screen};
use findmy_ui_core::notifications::{CLEAR_ALL_LABEL, CLEAR_LABEL, NOTIFICATION_ID};

use crate::base::{button, static_text};
use crate::main_page::{
    list_cell_named, Tab, ADD_ACTION_ID, CARD_CONTAINER_ID, CELL_ID, CELL_SUBTITLE_ID, CELL_TITLE_ID,
    LIST_ENTRIES_ID, LIST_TITLE_ID,
};
use crate::{device_detail, item_detail, me_page, people_detail};

pub const WIDTH: f64 = 390.0;
pub const HEIGHT: f64 = 844.0;

/// Name the app posts notifications under.
pub const APP_NAME: &str = "FindMy";

pub const DEVICE_CARD_ID: &str = "DeviceDetailCard";
pub const PERSON_CARD_ID: &str = "PersonDetailCard";
pub const ITEM_CARD_ID: &str = "ItemDetailCard";
pub const ME_SHEET_ID: &str = "MeSheet";
pub const NOTIFICATION_LIST_ID: &str = "NotificationList";
const BACKDROP_ID: &str = "NotificationBackdrop";

pub const PLAY_SOUND_ALERT_TITLE: &str = "Play Sound";
pub const CLEAR_IGNORED_ALERT_TITLE: &str = "Clear Ignored Items?";

/// Name and subtitle of every list entry, per tab.
pub const PEOPLE: &[(&str, &str)] = &[("Alex Rivera", "Cupertino, Now"), ("Sam Lee", "San Jose, 5 min. ago")];
pub const DEVICES: &[(&str, &str)] = &[("Chi’s Laptop", "Home, Now"), ("Chi’s iPhone", "With You")];
pub const ITEMS: &[(&str, &str)] = &[("Keys", "Home, 2 min. ago"), ("Backpack", "Office, 1 hr. ago")];

/// Notifications waiting in the centre at launch.
pub const INITIAL_NOTIFICATIONS: &[&str] = &["Keys was found near Home", "Backpack located at Office"];

const MAX_NOTIFICATIONS: usize = 4;
const OFFSCREEN: f64 = -2000.0;

/// A connected backend showing the home screen after every launch.
pub fn backend() -> MemoryBackend {
    let backend = MemoryBackend::new(Screen::new(Vec::new(), system_roots()));
    backend.set_launch_screen(launch_screen());
    install_reactions(&backend);
    backend
}

/// What the simulator shows right after Find My launches.
pub fn launch_screen() -> Screen {
    Screen::new(vec![tab_screen(Tab::People)], system_roots())
}

pub fn entries(tab: Tab) -> &'static [(&'static str, &'static str)] {
    match tab {
        Tab::People => PEOPLE,
        Tab::Devices => DEVICES,
        Tab::Items => ITEMS,
        Tab::Me => &[],
    }
}

fn install_reactions(backend: &MemoryBackend) {
    for tab in Tab::ALL {
        backend.on_tap(tab.descriptor(), move |s| s.app = vec![tab_screen(tab)]);
    }

    for tab in [Tab::People, Tab::Devices, Tab::Items] {
        for &(name, _) in entries(tab) {
            backend.on_tap(list_cell_named(name), move |s| s.app = vec![detail_screen(tab, name)]);
        }
    }

    for (card, tab) in [
        (DEVICE_CARD_ID, Tab::Devices),
        (PERSON_CARD_ID, Tab::People),
        (ITEM_CARD_ID, Tab::Items),
    ] {
        let close = button(device_detail::CLOSE_LABEL).within(Descriptor::id(card));
        backend.on_tap(close, move |s| s.app = vec![tab_screen(tab)]);
    }

    let play_on_device = button(device_detail::PLAY_SOUND_LABEL).within(Descriptor::id(DEVICE_CARD_ID));
    backend.on_tap(play_on_device, |s| {
        let name = shown_label(s, device_detail::NAME_ID);
        let message = format!("A sound is playing on “{name}”.");
        s.push_root(Scope::System, alert(PLAY_SOUND_ALERT_TITLE, &message, &["OK"]));
        post_notification(s, &format!("Sound playing on {name}"));
    });
    let play_on_item = button(item_detail::PLAY_SOUND_LABEL).within(Descriptor::id(ITEM_CARD_ID));
    backend.on_tap(play_on_item, |s| {
        let name = shown_label(s, item_detail::NAME_ID);
        post_notification(s, &format!("Sound playing on {name}"));
    });

    // Any button of a system alert dismisses it.
    let system_alert = Descriptor::of_kind(kind::ALERT).system();
    backend.on_tap(
        Descriptor::of_kind(kind::BUTTON).within(Descriptor::of_kind(kind::ALERT)).system(),
        move |s| {
            s.remove(&system_alert);
        },
    );

    backend.on_tap(button(me_page::CLEAR_IGNORED_LABEL), |s| {
        let buttons = [me_page::CANCEL_LABEL, me_page::CONFIRM_CLEAR_LABEL];
        s.app.push(alert(CLEAR_IGNORED_ALERT_TITLE, "Ignored items will notify you again.", &buttons));
    });
    for label in [me_page::CANCEL_LABEL, me_page::CONFIRM_CLEAR_LABEL] {
        backend.on_tap(button(label).within(Descriptor::of_kind(kind::ALERT)), |s| {
            s.remove(&Descriptor::of_kind(kind::ALERT));
        });
    }

    backend.on_swipe(Descriptor::of_kind(kind::STATUS_BAR).system(), |s| set_centre_open(s, true));
    backend.on_swipe(Descriptor::id(BACKDROP_ID).system(), |s| set_centre_open(s, false));
    backend.on_tap(button(CLEAR_LABEL).system(), |s| {
        s.update(&button(CLEAR_LABEL).system(), |b| b.label = Some(CLEAR_ALL_LABEL.to_string()));
    });
    backend.on_tap(button(CLEAR_ALL_LABEL).system(), |s| {
        s.update(&notification_list(), |list| {
            list.children.retain(|c| c.identifier.as_deref() == Some(BACKDROP_ID));
        });
    });
}

fn shown_label(screen: &Screen, identifier: &str) -> String {
    static_text(identifier)
        .resolve(&screen.app)
        .map(|e| e.label_text().to_string())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// App screens
// ---------------------------------------------------------------------------

fn app_root(children: Vec<UIElement>) -> UIElement {
    UIElement::new(kind::APPLICATION)
        .with_label("Find My")
        .with_frame(0.0, 0.0, WIDTH, HEIGHT)
        .with_hittable(false)
        .with_children(children)
}

fn container(identifier: &str, y: f64, height: f64, children: Vec<UIElement>) -> UIElement {
    UIElement::new(kind::OTHER)
        .with_id(identifier)
        .with_frame(0.0, y, WIDTH, height)
        .with_hittable(false)
        .with_children(children)
}

fn text(identifier: &str, label: &str, y: f64) -> UIElement {
    UIElement::new(kind::STATIC_TEXT)
        .with_id(identifier)
        .with_label(label)
        .with_frame(20.0, y, 280.0, 22.0)
}

fn button_at(label: &str, x: f64, y: f64, width: f64, height: f64) -> UIElement {
    UIElement::new(kind::BUTTON)
        .with_label(label)
        .with_frame(x, y, width, height)
}

fn tab_bar(selected: Tab) -> UIElement {
    let width = WIDTH / Tab::ALL.len() as f64;
    let tabs = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, &tab)| button_at(tab.label(), width * i as f64, 780.0, width, 49.0).with_selected(tab == selected))
        .collect();
    UIElement::new(kind::TAB_BAR)
        .with_frame(0.0, 780.0, WIDTH, 64.0)
        .with_hittable(false)
        .with_children(tabs)
}

/// The home screen with `tab` selected.
pub fn tab_screen(tab: Tab) -> UIElement {
    if tab == Tab::Me {
        return me_screen();
    }
    let cells = entries(tab)
        .iter()
        .enumerate()
        .map(|(i, &(name, subtitle))| {
            let y = 110.0 + 64.0 * i as f64;
            UIElement::new(kind::CELL)
                .with_id(CELL_ID)
                .with_label(name)
                .with_frame(0.0, y, WIDTH, 64.0)
                .with_children(vec![
                    text(CELL_TITLE_ID, name, y + 8.0),
                    text(CELL_SUBTITLE_ID, subtitle, y + 34.0),
                ])
        })
        .collect();
    app_root(vec![
        container(
            CARD_CONTAINER_ID,
            60.0,
            710.0,
            vec![
                text(LIST_TITLE_ID, tab.label(), 70.0),
                button_at("Add", 330.0, 66.0, 44.0, 34.0).with_id(ADD_ACTION_ID),
                UIElement::new(kind::TABLE)
                    .with_id(LIST_ENTRIES_ID)
                    .with_frame(0.0, 110.0, WIDTH, 600.0)
                    .with_hittable(false)
                    .with_children(cells),
            ],
        ),
        tab_bar(tab),
    ])
}

fn me_screen() -> UIElement {
    app_root(vec![
        container(
            ME_SHEET_ID,
            60.0,
            710.0,
            vec![
                text(me_page::TITLE_ID, "Me", 70.0),
                text("ShareLocationLabel", "Share My Location", 120.0),
                button_at(me_page::CLEAR_IGNORED_LABEL, 20.0, 400.0, 350.0, 44.0),
            ],
        ),
        tab_bar(Tab::Me),
    ])
}

/// Rows of action buttons stacked under the card header.
fn action_rows(labels: &[&str]) -> Vec<UIElement> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| button_at(label, 20.0, 516.0 + 44.0 * i as f64, 350.0, 40.0))
        .collect()
}

fn card_screen(card_id: &str, mut children: Vec<UIElement>) -> UIElement {
    children.insert(0, button_at(device_detail::CLOSE_LABEL, 330.0, 410.0, 44.0, 30.0));
    app_root(vec![
        UIElement::new(kind::MAP).with_id("MapView").with_frame(0.0, 0.0, WIDTH, 400.0),
        container(card_id, 400.0, HEIGHT - 400.0, children),
    ])
}

/// The detail card opened from `tab`'s list entry `name`.
pub fn detail_screen(tab: Tab, name: &str) -> UIElement {
    match tab {
        Tab::Devices => {
            let mut children = vec![
                text(device_detail::NAME_ID, name, 410.0),
                text(device_detail::LOCATION_ID, "Home", 445.0),
                text(device_detail::LAST_SEEN_ID, "Now", 468.0),
                text(device_detail::ADDRESS_ID, "1 Apple Park Way, Cupertino", 490.0),
            ];
            children.extend(action_rows(&[
                device_detail::PLAY_SOUND_LABEL,
                device_detail::DIRECTIONS_LABEL,
                "Notify When Found, Off",
                device_detail::LOST_MODE_LABEL,
                device_detail::ERASE_LABEL,
                device_detail::REMOVE_LABEL,
            ]));
            card_screen(DEVICE_CARD_ID, children)
        }
        Tab::People => {
            let mut children = vec![
                text(people_detail::NAME_ID, name, 410.0),
                text(people_detail::LOCATION_ID, "Cupertino", 445.0),
                text(people_detail::LAST_SEEN_ID, "Now", 468.0),
            ];
            children.extend(action_rows(&[
                people_detail::CONTACT_LABEL,
                people_detail::DIRECTIONS_LABEL,
                people_detail::ADD_TO_FAVOURITES_LABEL,
                people_detail::LABEL_LOCATION_LABEL,
                people_detail::STOP_SHARING_LABEL,
                people_detail::REMOVE_LABEL,
            ]));
            card_screen(PERSON_CARD_ID, children)
        }
        Tab::Items | Tab::Me => {
            let mut children = vec![
                text(item_detail::NAME_ID, name, 410.0),
                text(item_detail::LOCATION_ID, "Home", 445.0),
                text(item_detail::LAST_SEEN_ID, "2 min. ago", 468.0),
                text(item_detail::BATTERY_ID, "Battery: Full", 490.0),
            ];
            children.extend(action_rows(&[
                item_detail::PLAY_SOUND_LABEL,
                item_detail::DIRECTIONS_LABEL,
                item_detail::FIND_NEARBY_LABEL,
                item_detail::LOST_MODE_LABEL,
                item_detail::NOTIFY_LABEL,
                item_detail::IDENTIFY_LABEL,
                item_detail::REMOVE_LABEL,
            ]));
            card_screen(ITEM_CARD_ID, children)
        }
    }
}

/// An alert box in the middle of the screen, one button per row.
pub fn alert(title: &str, message: &str, buttons: &[&str]) -> UIElement {
    let mut children = vec![
        UIElement::new(kind::STATIC_TEXT)
            .with_label(title)
            .with_frame(50.0, 310.0, 290.0, 20.0),
        UIElement::new(kind::STATIC_TEXT)
            .with_label(message)
            .with_frame(50.0, 332.0, 290.0, 20.0),
    ];
    for (i, label) in buttons.iter().enumerate() {
        children.push(button_at(label, 50.0, 360.0 + 50.0 * i as f64, 290.0, 44.0));
    }
    UIElement::new(kind::ALERT)
        .with_label(title)
        .with_frame(40.0, 300.0, 310.0, 60.0 + 50.0 * buttons.len() as f64)
        .with_children(children)
}

// ---------------------------------------------------------------------------
// Notification centre
// ---------------------------------------------------------------------------

pub fn notification_list() -> Descriptor {
    Descriptor::id(NOTIFICATION_LIST_ID).system()
}

fn system_roots() -> Vec<UIElement> {
    let list = UIElement::new(kind::OTHER)
        .with_id(NOTIFICATION_LIST_ID)
        .with_frame(0.0, 0.0, WIDTH, HEIGHT)
        .with_hittable(false)
        .with_value("closed")
        .with_child(UIElement::new(kind::OTHER).with_id(BACKDROP_ID));
    let status_bar = UIElement::new(kind::STATUS_BAR).with_frame(0.0, 0.0, WIDTH, 47.0);
    let mut screen = Screen::new(Vec::new(), vec![list, status_bar]);
    for text in INITIAL_NOTIFICATIONS {
        post_notification(&mut screen, text);
    }
    screen.system
}

fn notification(text: &str) -> UIElement {
    UIElement::new(kind::OTHER)
        .with_id(NOTIFICATION_ID)
        .with_label(format!("{APP_NAME}, {text}"))
        .with_children(vec![
            UIElement::new(kind::STATIC_TEXT).with_label(APP_NAME),
            UIElement::new(kind::STATIC_TEXT).with_label(text),
        ])
}

fn is_notification(element: &UIElement) -> bool {
    element.identifier.as_deref() == Some(NOTIFICATION_ID)
}

/// Adds a notification from the app, dropping the oldest past the limit.
pub fn post_notification(screen: &mut Screen, text: &str) {
    screen.update(&notification_list(), |list| {
        if list.children.iter().filter(|c| is_notification(c)).count() >= MAX_NOTIFICATIONS {
            if let Some(oldest) = list.children.iter().position(is_notification) {
                list.children.remove(oldest);
            }
        }
        match list.children.iter().position(|c| c.is_type(kind::BUTTON)) {
            Some(at) => list.children.insert(at, notification(text)),
            None => {
                list.children.push(notification(text));
                list.children.push(UIElement::new(kind::BUTTON).with_label(CLEAR_LABEL));
            }
        }
        layout_centre(list);
    });
}

fn set_centre_open(screen: &mut Screen, open: bool) {
    screen.update(&notification_list(), |list| {
        list.value = Some(if open { "open" } else { "closed" }.to_string());
        layout_centre(list);
    });
}

fn layout_centre(list: &mut UIElement) {
    let shift = if list.value.as_deref() == Some("open") { 0.0 } else { OFFSCREEN };
    let mut row = 0.0;
    for child in &mut list.children {
        let (x, y, width, height) = if child.identifier.as_deref() == Some(BACKDROP_ID) {
            (0.0, 0.0, WIDTH, HEIGHT)
        } else if child.is_type(kind::BUTTON) {
            (330.0, 60.0, 44.0, 30.0)
        } else {
            row += 1.0;
            (20.0, 20.0 + 80.0 * row, 350.0, 70.0)
        };
        child.frame = Some(ElementFrame::new(x, y + shift, width, height));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use findmy_ui_core::notifications::NotificationQuery;

    #[test]
    fn test_launch_screen_shows_people() {
        let screen = launch_screen();
        assert!(screen.contains(&Descriptor::id(CARD_CONTAINER_ID)));
        assert!(screen.contains(&Tab::People.descriptor().selected(true)));
        assert!(screen.contains(&list_cell_named("Alex")));
        assert!(!screen.contains(&Descriptor::of_kind(kind::MAP)));
    }

    #[test]
    fn test_initial_notifications_are_off_screen() {
        let screen = launch_screen();
        let all = NotificationQuery::any().descriptor().resolve_all(&screen.system).len();
        assert_eq!(all, INITIAL_NOTIFICATIONS.len());
        let first = NotificationQuery::any().descriptor().resolve(&screen.system).unwrap();
        assert!(first.frame.unwrap().y < 0.0);
        assert!(screen.contains(&button(CLEAR_LABEL).system()));
    }

    #[test]
    fn test_post_notification_keeps_clear_button_last() {
        let mut screen = launch_screen();
        for i in 0..6 {
            post_notification(&mut screen, &format!("Sound playing on device {i}"));
        }
        let list = notification_list().resolve(&screen.system).unwrap().clone();
        assert!(list.children.last().unwrap().is_type(kind::BUTTON));
        assert_eq!(list.children.iter().filter(|c| is_notification(c)).count(), MAX_NOTIFICATIONS);
    }

    #[test]
    fn test_open_centre_moves_notifications_on_screen() {
        let mut screen = launch_screen();
        set_centre_open(&mut screen, true);
        let first = NotificationQuery::any().descriptor().resolve(&screen.system).unwrap();
        assert_eq!(first.frame.unwrap().y, 100.0);
        let clear = button(CLEAR_LABEL).system().resolve(&screen.system).unwrap();
        assert_eq!(clear.frame.unwrap().center(), (352, 75));
    }

    #[test]
    fn test_detail_cards_carry_their_actions() {
        let device = detail_screen(Tab::Devices, "Chi’s Laptop");
        let roots = [device];
        assert!(device_detail::DeviceDetailPage::play_sound_button().resolve(&roots).is_some());
        assert!(button(device_detail::CLOSE_LABEL)
            .within(Descriptor::id(DEVICE_CARD_ID))
            .resolve(&roots)
            .is_some());

        let item = [detail_screen(Tab::Items, "Keys")];
        assert!(button(item_detail::FIND_NEARBY_LABEL).resolve(&item).is_some());
    }
}
