//! Shared fixtures for findmy-ui-core integration tests.
//!
//! Builders for small accessibility trees and a context over an in-memory
//! backend. Frames are laid out on a 390x844 portrait screen.

#![allow(dead_code)]

use std::sync::Arc;

use findmy_ui_core::config::SuiteConfig;
use findmy_ui_core::context::TestContext;
use findmy_ui_core::element::{kind, UIElement};
use findmy_ui_core::memory::{MemoryBackend, Screen};

pub const SCREEN_WIDTH: f64 = 390.0;
pub const SCREEN_HEIGHT: f64 = 844.0;

/// Application root covering the screen.
pub fn app_root(children: Vec<UIElement>) -> UIElement {
    UIElement::new(kind::APPLICATION)
        .with_label("Find My")
        .with_frame(0.0, 0.0, SCREEN_WIDTH, SCREEN_HEIGHT)
        .with_hittable(false)
        .with_children(children)
}

pub fn button(label: &str, y: f64) -> UIElement {
    UIElement::new(kind::BUTTON)
        .with_label(label)
        .with_frame(20.0, y, 350.0, 44.0)
}

pub fn text(label: &str) -> UIElement {
    UIElement::new(kind::STATIC_TEXT).with_label(label)
}

/// A centred alert with a title, a message and one row per button.
pub fn alert(title: &str, message: &str, buttons: &[&str]) -> UIElement {
    let mut alert = UIElement::new(kind::ALERT)
        .with_label(title)
        .with_frame(40.0, 300.0, 310.0, 60.0 + 50.0 * buttons.len() as f64)
        .with_child(text(title))
        .with_child(text(message));
    for (i, label) in buttons.iter().enumerate() {
        alert = alert.with_child(
            UIElement::new(kind::BUTTON)
                .with_label(*label)
                .with_frame(50.0, 360.0 + 50.0 * i as f64, 290.0, 44.0),
        );
    }
    alert
}

/// Screen with the given app children and nothing in the system layer.
pub fn app_screen(children: Vec<UIElement>) -> Screen {
    Screen::new(vec![app_root(children)], Vec::new())
}

/// A context over `backend` with no launch pause.
pub fn context(backend: &Arc<MemoryBackend>) -> TestContext {
    TestContext::create(backend.clone(), SuiteConfig::simulated()).expect("memory backend is connected")
}
