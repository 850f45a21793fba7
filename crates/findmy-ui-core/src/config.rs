//! Suite configuration.
//!
//! Stores timeouts, settle delays and launch settings in
//! `~/.findmy-ui/config.json`. Every field has a default, so a missing or
//! partial file is fine.
//!
//! # Example
//!
//! ```no_run
//! use findmy_ui_core::config::SuiteConfig;
//!
//! // Load (returns defaults if file doesn't exist)
//! let config = SuiteConfig::load();
//! println!("default timeout: {:?}", config.default_timeout());
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_FILENAME: &str = "config.json";

/// Bundle identifier of the Find My app.
pub const FIND_MY_BUNDLE_ID: &str = "com.apple.findmy";

/// Returns `~/.findmy-ui/`, creating it if needed.
///
/// Falls back to the system temp directory when no home directory is known.
pub fn findmy_dir() -> PathBuf {
    let dir = dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".findmy-ui");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Returns `~/.findmy-ui/logs/`, creating it if needed.
pub fn logs_dir() -> PathBuf {
    let dir = findmy_dir().join("logs");
    std::fs::create_dir_all(&dir).ok();
    dir
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Delay applied after each kind of action, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleDelays {
    pub tap_ms: u64,
    pub double_tap_ms: u64,
    pub long_press_ms: u64,
    pub swipe_ms: u64,
    pub type_text_ms: u64,
    pub clear_text_ms: u64,
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            tap_ms: 500,
            double_tap_ms: 500,
            long_press_ms: 1000,
            swipe_ms: 1000,
            type_text_ms: 500,
            clear_text_ms: 500,
        }
    }
}

/// Persistent suite configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Bundle identifier of the application under test.
    pub bundle_id: String,

    /// Simulator to target. `None` means the first booted one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udid: Option<String>,

    pub launch_arguments: Vec<String>,
    pub launch_environment: BTreeMap<String, String>,

    /// Timeout used when a wait does not name one.
    pub default_timeout_ms: u64,
    /// Pause after launching the app before the first query.
    pub launch_wait_ms: u64,
    /// How long to wait for the alert raised by "Play Sound".
    pub sound_alert_timeout_ms: u64,
    /// Short wait for things expected to settle quickly, e.g. cleared notifications.
    pub soft_settle_ms: u64,

    /// First delay between polls.
    pub poll_interval_ms: u64,
    /// Upper bound for the poll delay after backoff.
    pub max_poll_interval_ms: u64,
    /// Growth factor applied to the poll delay after each miss.
    pub poll_backoff: f64,

    pub settle: SettleDelays,
    /// Hold time for a long press.
    pub long_press_ms: u64,
    /// Wait after tapping an alert button before checking it went away.
    pub alert_dismiss_ms: u64,
    /// Pause after opening the notification centre.
    pub notification_open_ms: u64,
    /// Pause after closing the notification centre.
    pub notification_close_ms: u64,

    /// Where report files go. `None` keeps the report in memory only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            bundle_id: FIND_MY_BUNDLE_ID.to_string(),
            udid: None,
            launch_arguments: Vec::new(),
            launch_environment: BTreeMap::new(),
            default_timeout_ms: 10_000,
            launch_wait_ms: 5_000,
            sound_alert_timeout_ms: 15_000,
            soft_settle_ms: 2_000,
            poll_interval_ms: 100,
            max_poll_interval_ms: 1_000,
            poll_backoff: 2.0,
            settle: SettleDelays::default(),
            long_press_ms: 1_000,
            alert_dismiss_ms: 1_000,
            notification_open_ms: 1_500,
            notification_close_ms: 800,
            log_dir: None,
        }
    }
}

impl SuiteConfig {
    /// Default location of the config file.
    pub fn default_path() -> PathBuf {
        findmy_dir().join(CONFIG_FILENAME)
    }

    /// Load config from `~/.findmy-ui/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::default_path()).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "using default config");
            Self::default()
        })
    }

    /// Load config from an explicit path. Unlike [`load`](Self::load), errors
    /// are reported.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save config to `~/.findmy-ui/config.json`.
    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&Self::default_path())
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }

    /// Config tuned for the in-memory backend: no launch pause.
    pub fn simulated() -> Self {
        Self {
            launch_wait_ms: 0,
            ..Self::default()
        }
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn launch_wait(&self) -> Duration {
        Duration::from_millis(self.launch_wait_ms)
    }

    pub fn sound_alert_timeout(&self) -> Duration {
        Duration::from_millis(self.sound_alert_timeout_ms)
    }

    pub fn soft_settle(&self) -> Duration {
        Duration::from_millis(self.soft_settle_ms)
    }

    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    pub fn alert_dismiss(&self) -> Duration {
        Duration::from_millis(self.alert_dismiss_ms)
    }

    pub fn notification_open(&self) -> Duration {
        Duration::from_millis(self.notification_open_ms)
    }

    pub fn notification_close(&self) -> Duration {
        Duration::from_millis(self.notification_close_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_suite_timings() {
        let config = SuiteConfig::default();
        assert_eq!(config.bundle_id, "com.apple.findmy");
        assert_eq!(config.default_timeout(), Duration::from_secs(10));
        assert_eq!(config.launch_wait(), Duration::from_secs(5));
        assert_eq!(config.sound_alert_timeout(), Duration::from_secs(15));
        assert_eq!(config.soft_settle(), Duration::from_secs(2));
        assert_eq!(config.settle.long_press_ms, 1000);
        assert_eq!(config.settle.tap_ms, 500);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let loaded: SuiteConfig =
            serde_json::from_str(r#"{"default_timeout_ms": 3000, "settle": {"tap_ms": 0}}"#).unwrap();
        assert_eq!(loaded.default_timeout_ms, 3000);
        assert_eq!(loaded.settle.tap_ms, 0);
        assert_eq!(loaded.settle.swipe_ms, 1000);
        assert_eq!(loaded.poll_interval_ms, 100);
    }

    #[test]
    fn roundtrip_through_file() {
        let path = std::env::temp_dir().join(format!("findmy-ui-config-{}.json", uuid::Uuid::new_v4()));
        let mut config = SuiteConfig::default();
        config.udid = Some("A1B2C3D4".to_string());
        config.launch_environment.insert("UITEST".into(), "1".into());
        config.save_to(&path).unwrap();

        let loaded = SuiteConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn load_from_reports_errors() {
        let missing = std::env::temp_dir().join("findmy-ui-definitely-missing.json");
        assert!(matches!(SuiteConfig::load_from(&missing), Err(ConfigError::Io { .. })));

        let bad = std::env::temp_dir().join(format!("findmy-ui-bad-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&bad, "{ nope").unwrap();
        assert!(matches!(SuiteConfig::load_from(&bad), Err(ConfigError::Parse { .. })));
        let _ = std::fs::remove_file(&bad);
    }

    #[test]
    fn simulated_skips_launch_wait() {
        assert_eq!(SuiteConfig::simulated().launch_wait(), Duration::ZERO);
    }
}
