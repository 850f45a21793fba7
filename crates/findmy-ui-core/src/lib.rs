//! # findmy-ui-core
//!
//! Accessibility-tree UI automation engine for iOS simulators.
//!
//! This crate resolves elements in a live accessibility tree, waits for them
//! by polling, performs gestures on them, and deals with system alerts and
//! notifications that get in the way. It knows nothing about Find My itself;
//! page objects and scenarios live in `findmy-ui-pages`.
//!
//! ## Modules
//!
//! - [`element`] - Snapshot types for accessibility tree nodes
//! - [`descriptor`] - Element references that are re-resolved on every access
//! - [`backend`] - The [`AccessibilityBackend`](backend::AccessibilityBackend) trait
//! - [`axe`] / [`simctl`] - Backend over the `axe` CLI and `xcrun simctl`
//! - [`memory`] - Scriptable in-memory backend for tests and dry runs
//! - [`wait`] - Polling waits with backoff
//! - [`dispatch`] - Action dispatch with settle delays and post-conditions
//! - [`interruption`] - Handlers for unexpected system alerts
//! - [`alerts`] / [`notifications`] - Alert and notification centre helpers
//! - [`context`] - The per-scenario [`TestContext`](context::TestContext)
//! - [`report`] - Action log with JSON Lines output
//!
//! ## External Dependencies
//!
//! Driving a real simulator requires:
//!
//! - **Xcode** (for `xcrun simctl`)
//! - **axe** (`brew install cameroncooke/axe/axe`)
//!
//! ## Example
//!
//! ```no_run
//! use findmy_ui_core::config::SuiteConfig;
//! use findmy_ui_core::descriptor::Descriptor;
//! use findmy_ui_core::memory::MemoryBackend;
//! use findmy_ui_core::element::{kind, UIElement};
//! use findmy_ui_core::wait::Waiter;
//!
//! # async fn demo() -> Result<(), findmy_ui_core::error::UiError> {
//! let backend = MemoryBackend::with_app(vec![
//!     UIElement::new(kind::BUTTON).with_label("Devices").with_frame(0.0, 780.0, 97.0, 49.0),
//! ]);
//! let config = SuiteConfig::simulated();
//! let waiter = Waiter::new(&backend, &config);
//! let tab = waiter.wait_for_element(&Descriptor::label("Devices"), None).await?;
//! assert!(tab.is_some());
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod alerts;
pub mod axe;
pub mod backend;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod dispatch;
pub mod element;
pub mod error;
pub mod interruption;
pub mod memory;
pub mod notifications;
pub mod report;
pub mod simctl;
pub mod wait;
