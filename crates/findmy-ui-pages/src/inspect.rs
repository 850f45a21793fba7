//! Screen dumps for updating page objects.
//!
//! [`describe_screen`] lists what a page object author usually needs: the
//! buttons with their labels and identifiers, the static texts, tab bars and
//! tables, followed by any alerts and notifications.

use findmy_ui_core::context::TestContext;
use findmy_ui_core::descriptor::{Descriptor, Scope};
use findmy_ui_core::element::{kind, UIElement};
use findmy_ui_core::error::UiError;
use serde_json::json;

const RULE: &str = "--------------------------------------------------------------------------------";

fn describe_element(element: &UIElement) -> String {
    let mut line = format!("label: {:?}", element.label_text());
    if let Some(id) = &element.identifier {
        line.push_str(&format!(", id: {id:?}"));
    }
    if let Some(value) = &element.value {
        line.push_str(&format!(", value: {value:?}"));
    }
    if element.is_selected() {
        line.push_str(", selected");
    }
    if !element.is_enabled() {
        line.push_str(", disabled");
    }
    line
}

fn section(out: &mut String, title: &str, elements: &[UIElement]) {
    out.push_str(&format!("{title} ({})\n{RULE}\n", elements.len()));
    for (i, element) in elements.iter().enumerate() {
        out.push_str(&format!("{i:>3}  {}\n", describe_element(element)));
    }
    out.push('\n');
}

/// Human-readable summary of the current screen in both scopes.
pub async fn describe_screen(ctx: &TestContext) -> Result<String, UiError> {
    let waiter = ctx.waiter();
    let mut out = String::new();

    for (title, element_type) in [("BUTTONS", kind::BUTTON), ("STATIC TEXTS", kind::STATIC_TEXT)] {
        let elements = waiter.all(&Descriptor::of_kind(element_type)).await?;
        section(&mut out, title, &elements);
    }

    let tab_bars = waiter.all(&Descriptor::of_kind(kind::TAB_BAR)).await?;
    out.push_str(&format!("TAB BARS ({})\n{RULE}\n", tab_bars.len()));
    for bar in &tab_bars {
        for tab in bar.descendants().filter(|e| e.is_type(kind::BUTTON)) {
            out.push_str(&format!("     {}\n", describe_element(tab)));
        }
    }
    out.push('\n');

    let tables = waiter.all(&Descriptor::of_kind(kind::TABLE)).await?;
    out.push_str(&format!("TABLES ({})\n{RULE}\n", tables.len()));
    for (i, table) in tables.iter().enumerate() {
        let cells = table.descendants().filter(|e| e.is_type(kind::CELL)).count();
        out.push_str(&format!("{i:>3}  {}, cells: {cells}\n", describe_element(table)));
    }
    out.push('\n');

    out.push_str(&format!("ALERTS\n{RULE}\n"));
    out.push_str(&ctx.alerts().describe_alerts().await?);
    out.push('\n');
    out.push_str(&format!("NOTIFICATIONS\n{RULE}\n"));
    out.push_str(&ctx.notifications().describe_notifications().await?);
    Ok(out)
}

/// The raw trees of both scopes, as the backend reported them.
pub async fn tree_json(ctx: &TestContext) -> Result<serde_json::Value, UiError> {
    let waiter = ctx.waiter();
    let app = waiter.snapshot(Scope::App).await?.unwrap_or_default();
    let system = waiter.snapshot(Scope::System).await?.unwrap_or_default();
    Ok(json!({ "app": app, "system": system }))
}
