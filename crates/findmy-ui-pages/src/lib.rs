//! # findmy-ui-pages
//!
//! Page objects and scenarios for the Find My app, built on `findmy-ui-core`.
//!
//! Page objects borrow a [`TestContext`](findmy_ui_core::context::TestContext)
//! and hold nothing else. Actions that stay on a page take `self` and hand it
//! back; actions that leave a page wait for the next one and return it, so a
//! flow reads as a chain of `?`s.
//!
//! ## Modules
//!
//! - [`base`] - Shared waits, actions and verifications, and the [`Page`](base::Page) trait
//! - [`main_page`] - Home screen with the People, Devices, Items and Me tabs
//! - [`device_detail`] / [`people_detail`] / [`item_detail`] - Detail cards
//! - [`me_page`] - The Me tab
//! - [`scenarios`] - Named test flows and the runner used by the CLI
//! - [`fixture`] - Simulated Find My on the in-memory backend
//! - [`inspect`] - Screen dumps
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use findmy_ui_core::config::SuiteConfig;
//! use findmy_ui_core::context::TestContext;
//! use findmy_ui_pages::main_page::MainPage;
//! use findmy_ui_pages::{fixture, navigation::NavigationError};
//!
//! # async fn demo() -> Result<(), NavigationError> {
//! let mut ctx = TestContext::create(Arc::new(fixture::backend()), SuiteConfig::simulated())?;
//! ctx.launch_app().await?;
//! let detail = MainPage::wait(&ctx).await?.go_to_devices().await?.open_device("Laptop").await?;
//! detail.verify_play_sound_visible().await?;
//! detail.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod base;
pub mod device_detail;
pub mod fixture;
pub mod inspect;
pub mod item_detail;
pub mod main_page;
pub mod me_page;
pub mod navigation;
pub mod people_detail;
pub mod scenarios;
