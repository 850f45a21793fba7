//! Page objects against the simulated app, outside of any scenario.

mod common;

use common::{launched, taps};

use findmy_ui_pages::fixture;
use findmy_ui_pages::inspect;
use findmy_ui_pages::main_page::{MainPage, Tab};

// ---------------------------------------------------------------------------
// Main page
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_home_starts_on_people() {
    let (_backend, ctx) = launched().await;
    let main = MainPage::wait(&ctx).await.unwrap();
    main.verify_displayed().await.unwrap();
    main.verify_all_tabs_visible().await.unwrap();
    assert!(main.is_tab_selected(Tab::People).await.unwrap());
    assert_eq!(main.list_item_count().await.unwrap(), fixture::PEOPLE.len());
}

#[tokio::test(start_paused = true)]
async fn test_switching_tabs_lists_that_tab() {
    let (_backend, ctx) = launched().await;
    let main = MainPage::wait(&ctx).await.unwrap().go_to_items().await.unwrap();
    assert!(main.is_tab_selected(Tab::Items).await.unwrap());
    let names = main.list_item_names().await.unwrap();
    let expected: Vec<_> = fixture::ITEMS.iter().map(|(name, _)| name.to_string()).collect();
    assert_eq!(names, expected);
}

#[tokio::test(start_paused = true)]
async fn test_verify_tab_selected_fails_for_other_tab() {
    let (_backend, ctx) = launched().await;
    let main = MainPage::wait(&ctx).await.unwrap();
    let err = main.verify_tab_selected(Tab::Devices).await.unwrap_err();
    assert!(!err.is_environment(), "{err}");
    assert!(err.to_string().contains("Devices"), "{err}");
}

// ---------------------------------------------------------------------------
// Detail cards
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_device_card_reads_name_and_location() {
    let (backend, ctx) = launched().await;
    let detail = MainPage::wait(&ctx)
        .await
        .unwrap()
        .go_to_devices()
        .await
        .unwrap()
        .open_device("iPhone")
        .await
        .unwrap();

    assert_eq!(detail.device_name().await.unwrap(), "Chi’s iPhone");
    assert!(!detail.location_text().await.unwrap().is_empty());
    detail.verify_device_name("iphone").await.unwrap();

    let main = detail.close().await.unwrap();
    main.verify_list_displayed().await.unwrap();
    // Devices tab, second cell, Close.
    assert_eq!(taps(&backend), vec![(146, 805), (195, 206), (352, 425)]);
}

#[tokio::test(start_paused = true)]
async fn test_person_card_offers_contact_and_directions() {
    let (_backend, ctx) = launched().await;
    let detail = MainPage::wait(&ctx).await.unwrap().open_first_person().await.unwrap();
    assert_eq!(detail.person_name().await.unwrap(), fixture::PEOPLE[0].0);
    detail.verify_contact_visible().await.unwrap();
    detail.verify_directions_visible().await.unwrap();
    assert!(detail.is_remove_enabled().await.unwrap());
    detail.close().await.unwrap();
}

// ---------------------------------------------------------------------------
// Inspect
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_describe_screen_lists_tabs_and_notifications() {
    let (_backend, ctx) = launched().await;
    let dump = inspect::describe_screen(&ctx).await.unwrap();
    assert!(dump.contains("TAB BARS (1)"), "{dump}");
    assert!(dump.contains("\"Devices\""), "{dump}");
    assert!(dump.contains("TABLES (1)"), "{dump}");
    assert!(dump.contains(fixture::INITIAL_NOTIFICATIONS[0]), "{dump}");
}

#[tokio::test(start_paused = true)]
async fn test_tree_json_has_both_scopes() {
    let (_backend, ctx) = launched().await;
    let tree = inspect::tree_json(&ctx).await.unwrap();
    assert!(!tree["app"].as_array().unwrap().is_empty());
    assert!(!tree["system"].as_array().unwrap().is_empty());
}
