//! Simulator backend over the `axe` accessibility CLI.
//!
//! `axe` reads the simulator's accessibility tree (`describe-ui`) and
//! synthesizes HID input (`tap`, `swipe`, `touch`, `type`, `key`). App
//! lifecycle and screenshots go through [`Simctl`].
//!
//! `describe-ui` reports a single merged tree for the whole screen. The
//! backend splits it into the two [`Scope`]s so that every element lands in
//! exactly one of them. A root application labelled `SpringBoard` belongs to
//! the system layer whole. Notification subtrees found under any other root
//! are detached into the system layer too. Everything else, alerts
//! presented by the app included, stays in the app layer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use std::process::Command;
use tracing::debug;

use crate::backend::{AccessibilityBackend, BackendError, LaunchRequest};
use crate::descriptor::Scope;
use crate::element::{kind, UIElement};
use crate::simctl::{Simctl, SimctlError};

/// Label of the root application element owned by the system shell.
pub const SPRINGBOARD_LABEL: &str = "SpringBoard";

/// HID usage code for the delete (backspace) key.
const HID_BACKSPACE: &str = "42";

impl From<SimctlError> for BackendError {
    fn from(err: SimctlError) -> Self {
        match err {
            SimctlError::NoBootedSimulator => BackendError::NotConnected,
            SimctlError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                BackendError::NotInstalled("xcrun".to_string())
            }
            SimctlError::Io(e) => BackendError::Io(e),
            SimctlError::JsonParse(e) => BackendError::JsonParse(e.to_string()),
            SimctlError::CommandFailed(msg) => BackendError::CommandFailed(msg),
        }
    }
}

/// Thin synchronous wrapper over the `axe` binary.
pub struct Axe;

impl Axe {
    /// Check if axe is installed
    pub fn is_installed() -> bool {
        Command::new("which")
            .arg("axe")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Dump UI hierarchy as JSON
    pub fn describe_ui(udid: &str) -> Result<Vec<UIElement>, BackendError> {
        let stdout = Self::run(&["describe-ui"], udid)?;
        Self::parse_hierarchy(&stdout)
    }

    pub fn parse_hierarchy(json: &[u8]) -> Result<Vec<UIElement>, BackendError> {
        serde_json::from_slice(json).map_err(|e| BackendError::JsonParse(e.to_string()))
    }

    /// Tap at x,y coordinates
    pub fn tap(udid: &str, x: i32, y: i32) -> Result<(), BackendError> {
        Self::run(&["tap", "-x", &x.to_string(), "-y", &y.to_string()], udid).map(drop)
    }

    /// Touch down, hold for `hold`, touch up.
    pub fn touch(udid: &str, x: i32, y: i32, hold: Duration) -> Result<(), BackendError> {
        let delay = format!("{:.2}", hold.as_secs_f64());
        Self::run(
            &["touch", "-x", &x.to_string(), "-y", &y.to_string(), "--down", "--up", "--delay", &delay],
            udid,
        )
        .map(drop)
    }

    pub fn swipe(
        udid: &str,
        from: (i32, i32),
        to: (i32, i32),
        duration: Option<Duration>,
    ) -> Result<(), BackendError> {
        let coords = [
            from.0.to_string(),
            from.1.to_string(),
            to.0.to_string(),
            to.1.to_string(),
        ];
        let mut args = vec![
            "swipe",
            "--start-x",
            coords[0].as_str(),
            "--start-y",
            coords[1].as_str(),
            "--end-x",
            coords[2].as_str(),
            "--end-y",
            coords[3].as_str(),
        ];
        let secs = duration.map(|d| format!("{:.2}", d.as_secs_f64()));
        if let Some(secs) = &secs {
            args.extend(["--duration", secs.as_str()]);
        }
        Self::run(&args, udid).map(drop)
    }

    /// Types text, turning each `\u{8}` into a backspace key press.
    pub fn type_text(udid: &str, text: &str) -> Result<(), BackendError> {
        for chunk in split_backspaces(text) {
            match chunk {
                TextChunk::Text(s) => Self::run(&["type", s], udid)?,
                TextChunk::Backspace => Self::run(&["key", HID_BACKSPACE], udid)?,
            };
        }
        Ok(())
    }

    fn run(args: &[&str], udid: &str) -> Result<Vec<u8>, BackendError> {
        if !Self::is_installed() {
            return Err(BackendError::NotInstalled("axe".to_string()));
        }
        debug!(?args, udid, "axe");

        let output = Command::new("axe").args(args).args(["--udid", udid]).output()?;

        if !output.status.success() {
            return Err(BackendError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(output.stdout)
    }
}

#[derive(Debug, PartialEq)]
enum TextChunk<'a> {
    Text(&'a str),
    Backspace,
}

fn split_backspaces(text: &str) -> Vec<TextChunk<'_>> {
    let mut chunks = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if c == '\u{8}' {
            if start < i {
                chunks.push(TextChunk::Text(&text[start..i]));
            }
            chunks.push(TextChunk::Backspace);
            start = i + c.len_utf8();
        }
    }
    if start < text.len() {
        chunks.push(TextChunk::Text(&text[start..]));
    }
    chunks
}

fn is_springboard(root: &UIElement) -> bool {
    root.is_type(kind::APPLICATION) && root.label.as_deref() == Some(SPRINGBOARD_LABEL)
}

fn is_notification(element: &UIElement) -> bool {
    element
        .identifier
        .as_deref()
        .map_or(false, |id| id.contains("Notification"))
}

/// Splits a merged `describe-ui` tree into the roots visible in `scope`.
pub fn split_scope(roots: Vec<UIElement>, scope: Scope) -> Vec<UIElement> {
    let mut app = Vec::new();
    let mut system = Vec::new();
    for root in roots {
        if is_springboard(&root) {
            system.push(root);
        } else {
            app.push(detach_notifications(root, &mut system));
        }
    }
    match scope {
        Scope::App => app,
        Scope::System => system,
    }
}

fn detach_notifications(mut element: UIElement, detached: &mut Vec<UIElement>) -> UIElement {
    for child in std::mem::take(&mut element.children) {
        if is_notification(&child) {
            detached.push(child);
        } else {
            element.children.push(detach_notifications(child, detached));
        }
    }
    element
}

async fn blocking<T, F>(f: F) -> Result<T, BackendError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, BackendError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BackendError::CommandFailed(format!("blocking task failed: {e}")))?
}

/// [`AccessibilityBackend`] for a booted iOS Simulator.
pub struct AxeBackend {
    udid: String,
    connected: AtomicBool,
}

impl AxeBackend {
    pub fn new(udid: impl Into<String>) -> Self {
        Self {
            udid: udid.into(),
            connected: AtomicBool::new(false),
        }
    }

    /// Targets the first booted simulator.
    pub fn booted() -> Result<Self, BackendError> {
        Ok(Self::new(Simctl::get_booted_udid()?))
    }

    pub fn udid(&self) -> &str {
        &self.udid
    }

    fn ensure_connected(&self) -> Result<(), BackendError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::NotConnected)
        }
    }
}

#[async_trait]
impl AccessibilityBackend for AxeBackend {
    async fn connect(&mut self) -> Result<(), BackendError> {
        let udid = self.udid.clone();
        blocking(move || {
            if !Axe::is_installed() {
                return Err(BackendError::NotInstalled("axe".to_string()));
            }
            let devices = Simctl::list_devices()?;
            match devices.iter().find(|d| d.udid == udid) {
                Some(d) if d.is_booted() => Ok(()),
                Some(d) => Err(BackendError::ConnectionLost(format!(
                    "simulator {} is {}",
                    d.name, d.state
                ))),
                None => Err(BackendError::CommandFailed(format!("unknown simulator {udid}"))),
            }
        })
        .await?;
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn snapshot(&self, scope: Scope) -> Result<Vec<UIElement>, BackendError> {
        self.ensure_connected()?;
        let udid = self.udid.clone();
        let roots = blocking(move || Axe::describe_ui(&udid)).await?;
        Ok(split_scope(roots, scope))
    }

    async fn tap(&self, x: i32, y: i32) -> Result<(), BackendError> {
        self.ensure_connected()?;
        let udid = self.udid.clone();
        blocking(move || Axe::tap(&udid, x, y)).await
    }

    async fn long_press(&self, x: i32, y: i32, duration: Duration) -> Result<(), BackendError> {
        self.ensure_connected()?;
        let udid = self.udid.clone();
        blocking(move || Axe::touch(&udid, x, y, duration)).await
    }

    async fn swipe(
        &self,
        from: (i32, i32),
        to: (i32, i32),
        duration: Option<Duration>,
    ) -> Result<(), BackendError> {
        self.ensure_connected()?;
        let udid = self.udid.clone();
        blocking(move || Axe::swipe(&udid, from, to, duration)).await
    }

    async fn type_text(&self, text: &str) -> Result<(), BackendError> {
        self.ensure_connected()?;
        let udid = self.udid.clone();
        let text = text.to_string();
        blocking(move || Axe::type_text(&udid, &text)).await
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BackendError> {
        self.ensure_connected()?;
        let udid = self.udid.clone();
        blocking(move || Ok(Simctl::screenshot(&udid)?)).await
    }

    async fn launch(&self, request: &LaunchRequest) -> Result<(), BackendError> {
        self.ensure_connected()?;
        let udid = self.udid.clone();
        let request = request.clone();
        blocking(move || {
            Ok(Simctl::launch(
                &udid,
                &request.bundle_id,
                &request.arguments,
                &request.environment,
            )?)
        })
        .await
    }

    async fn terminate(&self, bundle_id: &str) -> Result<(), BackendError> {
        self.ensure_connected()?;
        let udid = self.udid.clone();
        let bundle_id = bundle_id.to_string();
        blocking(move || Ok(Simctl::terminate(&udid, &bundle_id)?)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merged_screen() -> Vec<UIElement> {
        vec![
            UIElement::new(kind::APPLICATION).with_label("Find My").with_children(vec![
                UIElement::new(kind::BUTTON).with_label("Devices"),
                UIElement::new(kind::ALERT)
                    .with_label("Play Sound")
                    .with_child(UIElement::new(kind::BUTTON).with_label("OK")),
                UIElement::new(kind::OTHER)
                    .with_id("NotificationShortLookView")
                    .with_label("Find My, AirTag Found"),
            ]),
            UIElement::new(kind::APPLICATION)
                .with_label(SPRINGBOARD_LABEL)
                .with_child(UIElement::new(kind::STATUS_BAR)),
        ]
    }

    #[test]
    fn parse_hierarchy_from_axe_json() {
        let json = br#"[{"type":"Application","AXLabel":"Find My","children":[
            {"type":"Button","AXLabel":"Devices","frame":{"x":0,"y":800,"width":90,"height":49}}
        ]}]"#;
        let roots = Axe::parse_hierarchy(json).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].children[0].label_text(), "Devices");

        match Axe::parse_hierarchy(b"{not json") {
            Err(BackendError::JsonParse(_)) => {}
            other => panic!("expected JsonParse, got {:?}", other),
        }
    }

    #[test]
    fn app_scope_keeps_its_alerts_and_drops_notifications() {
        let app = split_scope(merged_screen(), Scope::App);
        assert_eq!(app.len(), 1);
        assert_eq!(app[0].label_text(), "Find My");
        let kids: Vec<_> = app[0].children.iter().map(|c| c.label_text()).collect();
        assert_eq!(kids, ["Devices", "Play Sound"]);
    }

    #[test]
    fn system_scope_has_springboard_and_detached_notifications() {
        let system = split_scope(merged_screen(), Scope::System);
        assert_eq!(system.len(), 2);
        assert_eq!(system[0].label_text(), SPRINGBOARD_LABEL);
        assert_eq!(system[1].identifier.as_deref(), Some("NotificationShortLookView"));
        assert!(!system.iter().any(|r| r.is_type(kind::ALERT)));
    }

    #[tokio::test(start_paused = true)]
    async fn app_alert_is_counted_once() {
        use crate::alerts::Alerts;
        use crate::config::SuiteConfig;
        use crate::memory::{MemoryBackend, Screen};
        use crate::wait::Waiter;

        let backend = MemoryBackend::new(Screen::new(
            split_scope(merged_screen(), Scope::App),
            split_scope(merged_screen(), Scope::System),
        ));
        let config = SuiteConfig::default();
        let alerts = Alerts::new(Waiter::new(&backend, &config), &config, None);

        assert_eq!(alerts.alert_count().await.unwrap(), 1);
        let dump = alerts.describe_alerts().await.unwrap();
        assert!(dump.contains("system alerts: 0"), "{dump}");
        assert!(dump.contains("app alerts: 1"), "{dump}");
    }

    #[test]
    fn backspaces_become_key_presses() {
        assert_eq!(
            split_backspaces("ab\u{8}\u{8}c"),
            vec![
                TextChunk::Text("ab"),
                TextChunk::Backspace,
                TextChunk::Backspace,
                TextChunk::Text("c"),
            ]
        );
        assert!(split_backspaces("").is_empty());
    }

    #[test]
    fn simctl_errors_map_onto_backend_errors() {
        assert!(matches!(
            BackendError::from(SimctlError::NoBootedSimulator),
            BackendError::NotConnected
        ));
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "xcrun");
        assert!(matches!(
            BackendError::from(SimctlError::Io(missing)),
            BackendError::NotInstalled(_)
        ));
    }

    #[tokio::test]
    async fn commands_require_connect() {
        let backend = AxeBackend::new("A1B2C3D4");
        assert!(!backend.is_connected());
        assert!(matches!(backend.tap(1, 1).await, Err(BackendError::NotConnected)));
        assert!(matches!(
            backend.snapshot(Scope::App).await,
            Err(BackendError::NotConnected)
        ));
    }
}
