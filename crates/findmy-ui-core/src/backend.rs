//! Accessibility backend trait for platform-agnostic UI automation.
//!
//! This module defines the [`AccessibilityBackend`] trait, the boundary between
//! the engine and whatever actually talks to the device: querying the
//! accessibility tree per [`Scope`], coordinate gestures, text input,
//! screenshots, and the application lifecycle.
//!
//! Two implementations ship with the crate:
//!
//! - [`AxeBackend`](crate::axe::AxeBackend) drives a booted iOS Simulator
//!   through the `axe` and `xcrun simctl` command-line tools.
//! - [`MemoryBackend`](crate::memory::MemoryBackend) keeps a scriptable tree in
//!   memory, for tests and dry runs.
//!
//! Element search is deliberately *not* part of the trait: backends only hand
//! out snapshots, and [`Descriptor`](crate::descriptor::Descriptor)s are
//! evaluated locally so every backend resolves elements the same way.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::descriptor::Scope;
use crate::element::UIElement;

/// Failure of a backend call, whichever backend produced it.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The tool ran but reported failure; holds its message.
    #[error("backend command failed: {0}")]
    CommandFailed(String),

    /// Called before [`AccessibilityBackend::connect`] succeeded.
    #[error("backend is not connected")]
    NotConnected,

    /// The device or simulator went away mid-session.
    #[error("lost the device: {0}")]
    ConnectionLost(String),

    /// A required command-line tool is missing.
    #[error("{0} not found - is it installed and on PATH?")]
    NotInstalled(String),

    #[error("backend i/o: {0}")]
    Io(#[from] std::io::Error),

    /// The tool printed a tree or payload we could not decode.
    #[error("malformed backend output: {0}")]
    JsonParse(String),
}

impl BackendError {
    /// Whether the error means the session itself is unusable.
    ///
    /// Fatal errors abort waits and scenarios; anything else is treated as a
    /// transient query failure and retried on the next poll.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BackendError::NotConnected
                | BackendError::ConnectionLost(_)
                | BackendError::NotInstalled(_)
                | BackendError::Io(_)
        )
    }
}

/// Everything needed to launch the application under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRequest {
    /// Bundle identifier, e.g. `com.apple.findmy`.
    pub bundle_id: String,
    /// Launch arguments passed to the process.
    #[serde(default)]
    pub arguments: Vec<String>,
    /// Environment variables for the launched process.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

impl LaunchRequest {
    pub fn new(bundle_id: impl Into<String>) -> Self {
        Self {
            bundle_id: bundle_id.into(),
            arguments: Vec::new(),
            environment: BTreeMap::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<String>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = environment;
        self
    }
}

/// Trait for backend-agnostic accessibility automation.
///
/// Implementors expose snapshots of the accessibility tree and the raw
/// gestures needed to act on it. All coordinates are screen points.
///
/// All methods that touch the device are async so that blocking command-line
/// tools (wrapped in `spawn_blocking`) and in-memory fakes share one
/// interface.
///
/// Only [`double_tap`](AccessibilityBackend::double_tap) has a default.
#[async_trait]
pub trait AccessibilityBackend: Send + Sync {
    /// Verifies the backend is available before first use.
    async fn connect(&mut self) -> Result<(), BackendError>;

    /// Whether [`connect`](Self::connect) succeeded and the device is still there.
    fn is_connected(&self) -> bool;

    /// Returns the root elements currently visible in `scope`.
    async fn snapshot(&self, scope: Scope) -> Result<Vec<UIElement>, BackendError>;

    /// Single tap at a screen point.
    async fn tap(&self, x: i32, y: i32) -> Result<(), BackendError>;

    /// Two taps in quick succession.
    ///
    /// The default implementation issues two [`tap`](Self::tap) calls.
    async fn double_tap(&self, x: i32, y: i32) -> Result<(), BackendError> {
        self.tap(x, y).await?;
        self.tap(x, y).await
    }

    /// Press and hold at specific screen coordinates.
    async fn long_press(&self, x: i32, y: i32, duration: Duration) -> Result<(), BackendError>;

    /// Drag from one point to another.
    ///
    /// # Arguments
    ///
    /// * `from` - Starting point
    /// * `to` - Ending point
    /// * `duration` - Optional gesture duration
    async fn swipe(
        &self,
        from: (i32, i32),
        to: (i32, i32),
        duration: Option<Duration>,
    ) -> Result<(), BackendError>;

    /// Sends `text` to whatever has keyboard focus.
    ///
    /// The backspace character (`\u{8}`) deletes one character.
    async fn type_text(&self, text: &str) -> Result<(), BackendError>;

    /// Capture a screenshot of the device screen as PNG bytes.
    async fn screenshot(&self) -> Result<Vec<u8>, BackendError>;

    /// Launch (or relaunch) the application under test.
    async fn launch(&self, request: &LaunchRequest) -> Result<(), BackendError>;

    /// Terminate the application with the given bundle identifier.
    async fn terminate(&self, bundle_id: &str) -> Result<(), BackendError>;
}
