//! Simulator lifecycle through `xcrun simctl`.
//!
//! The suite needs four things from the simulator itself:
//! - it lists simulators and boots them;
//! - it grabs screenshots for failure reports;
//! - it starts the app under test with its environment;
//! - it stops the app again.
//!
//! Taps, swipes and the accessibility tree go through [`axe`](crate::axe).
//!
//! Needs a full Xcode install; the command line tools alone ship no `simctl`.
//!
//! ```no_run
//! use findmy_ui_core::simctl::Simctl;
//!
//! let udid = Simctl::get_booted_udid()?;
//! Simctl::launch(&udid, "com.apple.findmy", &[], &Default::default())?;
//! let png = Simctl::screenshot(&udid)?;
//! # let _ = png;
//! # Ok::<(), findmy_ui_core::simctl::SimctlError>(())
//! ```

use std::collections::{BTreeMap, HashMap};
use std::process::{Command, Output};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// simctl removes this prefix and hands the rest of the variable to the app.
pub const CHILD_ENV_PREFIX: &str = "SIMCTL_CHILD_";

#[derive(Error, Debug)]
pub enum SimctlError {
    /// simctl ran and exited non-zero; holds its trimmed stderr.
    #[error("simctl failed: {0}")]
    CommandFailed(String),

    #[error("no simulator is booted")]
    NoBootedSimulator,

    /// `list devices -j` printed something other than the expected JSON.
    #[error("unreadable simctl output: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Spawning `xcrun` or handling the screenshot file failed.
    #[error("simctl i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// One entry of `simctl list devices -j`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorDevice {
    pub udid: String,
    /// Name shown in Xcode, such as "iPhone 16".
    pub name: String,
    /// "Booted", "Shutdown", "Creating" and so on.
    pub state: String,
    /// Missing for some older runtimes.
    #[serde(rename = "deviceTypeIdentifier")]
    pub device_type: Option<String>,
}

impl SimulatorDevice {
    pub fn is_booted(&self) -> bool {
        self.state == "Booted"
    }
}

/// Devices keyed by runtime identifier.
#[derive(Debug, Deserialize)]
struct DeviceList {
    devices: HashMap<String, Vec<SimulatorDevice>>,
}

/// Stateless `xcrun simctl` calls.
///
/// Every call blocks on a child process. Async code wraps them in
/// `tokio::task::spawn_blocking`.
pub struct Simctl;

impl Simctl {
    /// Every simulator of every installed runtime, in no particular order.
    pub fn list_devices() -> Result<Vec<SimulatorDevice>, SimctlError> {
        let output = run(&["list", "devices", "-j"], &BTreeMap::new())?;
        Self::parse_device_list(&output.stdout)
    }

    /// UDID of a booted simulator. If several are booted, which one is
    /// returned is unspecified.
    pub fn get_booted_udid() -> Result<String, SimctlError> {
        let devices = Self::list_devices()?;
        Self::find_booted_device(&devices)
            .map(|d| d.udid.clone())
            .ok_or(SimctlError::NoBootedSimulator)
    }

    /// PNG of the current screen.
    pub fn screenshot(udid: &str) -> Result<Vec<u8>, SimctlError> {
        // simctl only writes to a path, so go through a scratch file.
        let scratch = std::env::temp_dir()
            .join(format!("findmy_ui_screenshot_{}.png", uuid::Uuid::new_v4()));
        let scratch_arg = scratch.to_string_lossy().into_owned();

        run(&["io", udid, "screenshot", scratch_arg.as_str()], &BTreeMap::new())?;

        let png = std::fs::read(&scratch)?;
        let _ = std::fs::remove_file(&scratch);
        Ok(png)
    }

    /// Boots `udid`. Does nothing if it is already booted.
    pub fn boot(udid: &str) -> Result<(), SimctlError> {
        match run(&["boot", udid], &BTreeMap::new()) {
            Err(SimctlError::CommandFailed(stderr)) if stderr.contains("current state: Booted") => Ok(()),
            other => other.map(|_| ()),
        }
    }

    /// Starts `bundle_id` fresh, killing a running copy first.
    ///
    /// The app sees `environment` unprefixed; see [`Self::child_environment`].
    pub fn launch(
        udid: &str,
        bundle_id: &str,
        arguments: &[String],
        environment: &BTreeMap<String, String>,
    ) -> Result<(), SimctlError> {
        let mut args = vec!["launch", "--terminate-running-process", udid, bundle_id];
        args.extend(arguments.iter().map(String::as_str));
        run(&args, &Self::child_environment(environment))?;
        Ok(())
    }

    /// Stops `bundle_id`. Does nothing if it is not running.
    pub fn terminate(udid: &str, bundle_id: &str) -> Result<(), SimctlError> {
        match run(&["terminate", udid, bundle_id], &BTreeMap::new()) {
            Err(SimctlError::CommandFailed(stderr)) if stderr.contains("found nothing to terminate") => Ok(()),
            other => other.map(|_| ()),
        }
    }

    /// Environment for the `xcrun` process: each key is prefixed with
    /// [`CHILD_ENV_PREFIX`].
    pub fn child_environment(environment: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        environment
            .iter()
            .map(|(k, v)| (format!("{CHILD_ENV_PREFIX}{k}"), v.clone()))
            .collect()
    }

    /// Flattens the per-runtime lists of `list devices -j`.
    pub fn parse_device_list(json: &[u8]) -> Result<Vec<SimulatorDevice>, SimctlError> {
        let by_runtime: DeviceList = serde_json::from_slice(json)?;
        Ok(by_runtime.devices.into_values().flatten().collect())
    }

    pub fn find_booted_device(devices: &[SimulatorDevice]) -> Option<&SimulatorDevice> {
        devices.iter().find(|d| d.is_booted())
    }
}

fn run(args: &[&str], envs: &BTreeMap<String, String>) -> Result<Output, SimctlError> {
    tracing::debug!(?args, "xcrun simctl");
    let output = Command::new("xcrun")
        .arg("simctl")
        .args(args)
        .envs(envs)
        .output()?;

    if !output.status.success() {
        return Err(SimctlError::CommandFailed(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOTED_UDID: &str = "5E1F0C2A-7D44-4B19-9A3E-2C8B61F0D7A9";

    // Trimmed output of `xcrun simctl list devices -j` with two runtimes.
    const TWO_RUNTIMES: &str = r#"{
        "devices": {
            "com.apple.CoreSimulator.SimRuntime.iOS-18-2": [
                {
                    "udid": "5E1F0C2A-7D44-4B19-9A3E-2C8B61F0D7A9",
                    "name": "iPhone 16",
                    "state": "Booted",
                    "isAvailable": true,
                    "deviceTypeIdentifier": "com.apple.CoreSimulator.SimDeviceType.iPhone-16"
                },
                {
                    "udid": "0B93D6E1-18C2-4F70-8E5D-A4C7E29B3F60",
                    "name": "iPad mini (A17 Pro)",
                    "state": "Shutdown",
                    "isAvailable": true,
                    "deviceTypeIdentifier": "com.apple.CoreSimulator.SimDeviceType.iPad-mini-A17-Pro"
                }
            ],
            "com.apple.CoreSimulator.SimRuntime.iOS-17-5": [
                {
                    "udid": "D27A4F88-3E61-4C05-B1F9-6E0A93C58B12",
                    "name": "iPhone SE (3rd generation)",
                    "state": "Shutdown"
                }
            ]
        }
    }"#;

    #[test]
    fn test_devices_from_all_runtimes() {
        let devices = Simctl::parse_device_list(TWO_RUNTIMES.as_bytes()).unwrap();

        assert_eq!(devices.len(), 3);
        assert!(devices.iter().any(|d| d.name == "iPad mini (A17 Pro)"));
        let se = devices.iter().find(|d| d.name.starts_with("iPhone SE")).unwrap();
        assert!(se.device_type.is_none());
        assert!(!se.is_booted());
    }

    #[test]
    fn test_no_runtimes_means_no_devices() {
        let devices = Simctl::parse_device_list(br#"{"devices": {}}"#).unwrap();
        assert!(devices.is_empty());
    }

    #[test]
    fn test_garbage_output_is_a_parse_error() {
        assert!(matches!(
            Simctl::parse_device_list(b"xcrun: error: unable to find utility"),
            Err(SimctlError::JsonParse(_))
        ));
        // Runtimes listing, not devices.
        assert!(Simctl::parse_device_list(br#"{"runtimes": []}"#).is_err());
    }

    #[test]
    fn test_picks_the_booted_device() {
        let devices = Simctl::parse_device_list(TWO_RUNTIMES.as_bytes()).unwrap();
        assert_eq!(Simctl::find_booted_device(&devices).unwrap().udid, BOOTED_UDID);

        let shutdown: Vec<_> = devices.into_iter().filter(|d| !d.is_booted()).collect();
        assert!(Simctl::find_booted_device(&shutdown).is_none());
    }

    #[test]
    fn test_child_environment_is_prefixed() {
        let env = BTreeMap::from([
            ("UITEST_DISABLE_ANIMATIONS".to_string(), "1".to_string()),
            ("FINDMY_FIXTURE".to_string(), "demo".to_string()),
        ]);
        let child = Simctl::child_environment(&env);
        assert_eq!(child.len(), 2);
        assert_eq!(
            child.get("SIMCTL_CHILD_UITEST_DISABLE_ANIMATIONS").map(String::as_str),
            Some("1")
        );
        assert!(child.contains_key("SIMCTL_CHILD_FINDMY_FIXTURE"));
    }

    #[test]
    fn test_error_messages() {
        let failed = SimctlError::CommandFailed("Invalid device: nope".into());
        assert_eq!(failed.to_string(), "simctl failed: Invalid device: nope");
        assert_eq!(SimctlError::NoBootedSimulator.to_string(), "no simulator is booted");
    }

    #[test]
    fn test_unknown_udid_cannot_boot() {
        // Fails with CommandFailed on a Mac and with Io where xcrun is missing.
        assert!(Simctl::boot("00000000-0000-0000-0000-000000000000").is_err());
    }
}
