//! Accessibility element snapshots.
//!
//! A [`UIElement`] is a value copied out of the live accessibility tree at the
//! moment of a query. It is never refreshed in place: the tree can change
//! between two polls, so consumers re-query through a
//! [`Descriptor`](crate::descriptor::Descriptor) instead of holding on to an
//! element.

use serde::{Deserialize, Serialize};

/// Well-known values of [`UIElement::element_type`].
pub mod kind {
    pub const ALERT: &str = "Alert";
    pub const APPLICATION: &str = "Application";
    pub const BUTTON: &str = "Button";
    pub const CELL: &str = "Cell";
    pub const IMAGE: &str = "Image";
    pub const MAP: &str = "Map";
    pub const NAVIGATION_BAR: &str = "NavigationBar";
    pub const OTHER: &str = "Other";
    pub const STATIC_TEXT: &str = "StaticText";
    pub const STATUS_BAR: &str = "StatusBar";
    pub const TAB_BAR: &str = "TabBar";
    pub const TABLE: &str = "Table";
    pub const TEXT_FIELD: &str = "TextField";
}

/// A node of the accessibility hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UIElement {
    /// The accessibility identifier (AXUniqueId).
    #[serde(rename = "AXUniqueId", default)]
    pub identifier: Option<String>,

    /// The accessibility label (AXLabel), usually the visible text.
    #[serde(rename = "AXLabel", default)]
    pub label: Option<String>,

    /// The current value (AXValue), e.g. text field contents.
    #[serde(rename = "AXValue", default)]
    pub value: Option<String>,

    /// The element type (e.g. "Button", "StaticText", "Alert").
    #[serde(rename = "type", default)]
    pub element_type: Option<String>,

    /// Position and size in screen points.
    #[serde(default)]
    pub frame: Option<ElementFrame>,

    /// Nested elements.
    #[serde(default)]
    pub children: Vec<UIElement>,

    /// The accessibility role.
    #[serde(default)]
    pub role: Option<String>,

    /// Whether the element can receive a tap right now.
    ///
    /// `None` when the backend does not report hittability; see
    /// [`UIElement::is_hittable`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hittable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
}

/// The frame (position and dimensions) of a UI element.
///
/// Coordinates are in screen points, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementFrame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementFrame {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// The centre point, rounded to whole screen points.
    pub fn center(&self) -> (i32, i32) {
        (
            (self.x + self.width / 2.0).round() as i32,
            (self.y + self.height / 2.0).round() as i32,
        )
    }

    /// A point at a normalized offset inside the frame (`0.0..=1.0` on each axis).
    pub fn point_at(&self, dx: f64, dy: f64) -> (i32, i32) {
        (
            (self.x + self.width * dx).round() as i32,
            (self.y + self.height * dy).round() as i32,
        )
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        let (x, y) = (f64::from(x), f64::from(y));
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

impl UIElement {
    /// Creates an element of the given type with no attributes.
    pub fn new(element_type: impl Into<String>) -> Self {
        Self {
            element_type: Some(element_type.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_frame(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.frame = Some(ElementFrame::new(x, y, width, height));
        self
    }

    pub fn with_children(mut self, children: Vec<UIElement>) -> Self {
        self.children = children;
        self
    }

    pub fn with_child(mut self, child: UIElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_hittable(mut self, hittable: bool) -> Self {
        self.hittable = Some(hittable);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = Some(selected);
        self
    }

    /// True when the element type equals `element_type`.
    pub fn is_type(&self, element_type: &str) -> bool {
        self.element_type.as_deref() == Some(element_type)
    }

    /// Whether the element would receive a tap.
    ///
    /// Uses the backend's hittable flag when reported; otherwise an element is
    /// considered hittable when it has an on-screen frame with non-zero area.
    pub fn is_hittable(&self) -> bool {
        match self.hittable {
            Some(hittable) => hittable,
            None => self.frame.map_or(false, |f| f.has_area()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn is_selected(&self) -> bool {
        self.selected.unwrap_or(false)
    }

    /// The label, or an empty string when the element has none.
    pub fn label_text(&self) -> &str {
        self.label.as_deref().unwrap_or("")
    }

    /// Depth-first, pre-order iterator over this element and its descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

/// Iterator returned by [`UIElement::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a UIElement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a UIElement;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

/// Depth-first, pre-order walk over a forest of root elements.
pub fn walk(roots: &[UIElement]) -> impl Iterator<Item = &UIElement> {
    roots.iter().flat_map(UIElement::descendants)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_axe_style_json() {
        let json = r#"{
            "AXUniqueId": "FMPlatterButton",
            "AXLabel": "Play Sound,Off",
            "type": "Button",
            "frame": {"x": 10, "y": 20, "width": 100, "height": 44},
            "children": []
        }"#;
        let element: UIElement = serde_json::from_str(json).unwrap();
        assert_eq!(element.identifier.as_deref(), Some("FMPlatterButton"));
        assert_eq!(element.label.as_deref(), Some("Play Sound,Off"));
        assert!(element.is_type(kind::BUTTON));
        assert!(element.is_hittable());
        assert!(element.is_enabled());
        assert!(!element.is_selected());
    }

    #[test]
    fn frame_center_and_contains() {
        let frame = ElementFrame::new(10.0, 20.0, 100.0, 40.0);
        assert_eq!(frame.center(), (60, 40));
        assert!(frame.contains(10, 20));
        assert!(frame.contains(110, 60));
        assert!(!frame.contains(111, 60));
        assert_eq!(frame.point_at(0.5, 0.0), (60, 20));
    }

    #[test]
    fn hittable_falls_back_to_frame() {
        assert!(!UIElement::new(kind::BUTTON).is_hittable());
        assert!(UIElement::new(kind::BUTTON).with_frame(0.0, 0.0, 1.0, 1.0).is_hittable());
        assert!(!UIElement::new(kind::BUTTON)
            .with_frame(0.0, 0.0, 1.0, 1.0)
            .with_hittable(false)
            .is_hittable());
    }

    #[test]
    fn descendants_are_pre_order() {
        let tree = UIElement::new(kind::OTHER).with_id("root").with_children(vec![
            UIElement::new(kind::OTHER)
                .with_id("a")
                .with_child(UIElement::new(kind::BUTTON).with_id("a1")),
            UIElement::new(kind::BUTTON).with_id("b"),
        ]);
        let ids: Vec<_> = tree
            .descendants()
            .filter_map(|e| e.identifier.as_deref())
            .collect();
        assert_eq!(ids, vec!["root", "a", "a1", "b"]);
    }
}
