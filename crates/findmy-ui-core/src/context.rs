//! Test context: the state one scenario runs against.
//!
//! A [`TestContext`] owns the backend handle, the suite configuration, the
//! run report and the registered interruption handlers, plus whatever the
//! scenario stashes along the way (test data, metadata, screenshots). Waits,
//! dispatch and the alert and notification helpers are short-lived views that
//! borrow it.
//!
//! # Lifecycle
//!
//! - [`TestContext::create`] checks the backend is connected and opens the report
//! - [`TestContext::launch_app`] starts the application under test
//! - [`TestContext::reset`] terminates the app and forgets scenario state
//! - [`TestContext::dispose`] terminates the app and consumes the context
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use findmy_ui_core::axe::AxeBackend;
//! use findmy_ui_core::backend::AccessibilityBackend;
//! use findmy_ui_core::config::SuiteConfig;
//! use findmy_ui_core::context::TestContext;
//! use findmy_ui_core::descriptor::Descriptor;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut backend = AxeBackend::booted()?;
//!     backend.connect().await?;
//!
//!     let mut ctx = TestContext::create(Arc::new(backend), SuiteConfig::load())?;
//!     ctx.launch_app().await?;
//!     ctx.dispatcher().tap(&Descriptor::label("Devices")).await?;
//!     ctx.dispose().await?;
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::alerts::Alerts;
use crate::backend::{AccessibilityBackend, BackendError, LaunchRequest};
use crate::config::SuiteConfig;
use crate::dispatch::Dispatcher;
use crate::error::UiError;
use crate::interruption::{DefaultAlertHandler, HandlerId, InterruptionHandler, InterruptionMonitor};
use crate::notifications::Notifications;
use crate::report::Report;
use crate::wait::Waiter;

/// The launched application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppHandle {
    pub bundle_id: String,
    pub arguments: Vec<String>,
    pub environment: BTreeMap<String, String>,
    pub launched_at: DateTime<Utc>,
}

/// Everything a scenario needs, passed by reference.
pub struct TestContext {
    backend: Arc<dyn AccessibilityBackend>,
    config: SuiteConfig,
    report: Arc<Report>,
    monitor: InterruptionMonitor,
    app: Option<AppHandle>,
    test_data: BTreeMap<String, serde_json::Value>,
    metadata: BTreeMap<String, String>,
    screenshots: BTreeMap<String, Arc<String>>,
}

impl TestContext {
    /// Creates a context over a connected backend.
    ///
    /// The report is mirrored to `config.log_dir` when one is set.
    pub fn create(backend: Arc<dyn AccessibilityBackend>, config: SuiteConfig) -> Result<Self, UiError> {
        if !backend.is_connected() {
            return Err(BackendError::NotConnected.into());
        }
        let report = match &config.log_dir {
            Some(dir) => Report::with_log_file(dir, "run"),
            None => Report::in_memory(),
        };
        let monitor = InterruptionMonitor::from_config(&config);
        debug!(report = %report.id, bundle_id = %config.bundle_id, "test context created");
        Ok(Self {
            backend,
            config,
            report,
            monitor,
            app: None,
            test_data: BTreeMap::new(),
            metadata: BTreeMap::new(),
            screenshots: BTreeMap::new(),
        })
    }

    /// Launches the configured app and waits out the launch pause.
    pub async fn launch_app(&mut self) -> Result<&AppHandle, UiError> {
        let request = LaunchRequest::new(self.config.bundle_id.clone())
            .with_arguments(self.config.launch_arguments.clone())
            .with_environment(self.config.launch_environment.clone());
        self.launch_with(request).await
    }

    /// Launches with an explicit request, e.g. extra arguments for one scenario.
    pub async fn launch_with(&mut self, request: LaunchRequest) -> Result<&AppHandle, UiError> {
        self.backend.launch(&request).await?;
        info!(bundle_id = %request.bundle_id, "app launched");
        self.report.note(format!("launched {}", request.bundle_id)).await;
        sleep(self.config.launch_wait()).await;
        let handle = AppHandle {
            bundle_id: request.bundle_id,
            arguments: request.arguments,
            environment: request.environment,
            launched_at: Utc::now(),
        };
        Ok(&*self.app.insert(handle))
    }

    /// Terminates the app if one was launched.
    pub async fn terminate_app(&mut self) -> Result<(), UiError> {
        if let Some(app) = self.app.take() {
            self.backend.terminate(&app.bundle_id).await?;
            info!(bundle_id = %app.bundle_id, "app terminated");
        }
        Ok(())
    }

    pub fn app(&self) -> Result<&AppHandle, UiError> {
        self.app.as_ref().ok_or(UiError::NoApplication)
    }

    /// Terminates the app and clears test data, metadata and screenshots.
    /// Interruption handlers stay registered.
    pub async fn reset(&mut self) -> Result<(), UiError> {
        self.terminate_app().await?;
        self.test_data.clear();
        self.metadata.clear();
        self.screenshots.clear();
        debug!("test context reset");
        Ok(())
    }

    /// Terminates the app and drops the context.
    pub async fn dispose(mut self) -> Result<(), UiError> {
        self.terminate_app().await?;
        self.monitor.clear();
        debug!(entries = self.report.len().await, "test context disposed");
        Ok(())
    }

    pub fn backend(&self) -> &dyn AccessibilityBackend {
        self.backend.as_ref()
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    pub fn report(&self) -> &Arc<Report> {
        &self.report
    }

    /// A waiter that services interruption handlers before every probe.
    pub fn waiter(&self) -> Waiter<'_> {
        Waiter::new(self.backend.as_ref(), &self.config).with_monitor(&self.monitor)
    }

    /// A dispatcher recording into this context's report.
    pub fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(self.waiter(), &self.config).with_report(&self.report)
    }

    pub fn alerts(&self) -> Alerts<'_> {
        Alerts::new(self.waiter(), &self.config, Some(&*self.report))
    }

    pub fn notifications(&self) -> Notifications<'_> {
        Notifications::new(self.waiter(), &self.config, Some(&*self.report))
    }

    pub fn add_interruption_handler(&mut self, handler: impl InterruptionHandler + 'static) -> HandlerId {
        self.monitor.add(Box::new(handler))
    }

    /// Registers the handler that taps "OK", or the first button.
    pub fn add_default_interruption_handler(&mut self) -> HandlerId {
        self.add_interruption_handler(DefaultAlertHandler)
    }

    pub fn remove_interruption_handler(&mut self, id: HandlerId) -> bool {
        self.monitor.remove(id)
    }

    pub fn set_test_data(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.test_data.insert(key.into(), value.into());
    }

    pub fn test_data(&self, key: &str) -> Option<&serde_json::Value> {
        self.test_data.get(key)
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Captures a screenshot, keeps it under `name` and adds it to the report.
    pub async fn capture_screenshot(&mut self, name: &str) -> Result<Arc<String>, UiError> {
        let png = self.backend.screenshot().await?;
        let data = Arc::new(base64::engine::general_purpose::STANDARD.encode(&png));
        self.screenshots.insert(name.to_string(), Arc::clone(&data));
        self.report.screenshot(name, Arc::clone(&data)).await;
        debug!(name, bytes = png.len(), "screenshot captured");
        Ok(data)
    }

    pub fn screenshot(&self, name: &str) -> Option<&Arc<String>> {
        self.screenshots.get(name)
    }

    /// Names of the screenshots captured since the last reset.
    pub fn screenshot_names(&self) -> impl Iterator<Item = &str> {
        self.screenshots.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for TestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestContext")
            .field("config", &self.config)
            .field("report", &self.report)
            .field("handlers", &self.monitor.len())
            .field("app", &self.app)
            .finish_non_exhaustive()
    }
}
