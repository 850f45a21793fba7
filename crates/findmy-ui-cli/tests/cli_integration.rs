use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// `findmy-ui --simulate` with settle delays turned off.
fn simulated() -> Command {
    let mut cmd = Command::cargo_bin("findmy-ui").unwrap();
    cmd.env_remove("FINDMY_UI_UDID")
        .arg("--simulate")
        .arg("--config")
        .arg(fixture_path("fast.json"));
    cmd
}

#[test]
fn test_help_exits_zero() {
    Command::cargo_bin("findmy-ui")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("findmy-ui"));
}

#[test]
fn test_list_shows_every_scenario() {
    Command::cargo_bin("findmy-ui")
        .unwrap()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("device-play-sound"))
        .stdout(predicate::str::contains("clear-notifications"))
        .stdout(predicate::str::contains("navigate-tabs"));
}

#[test]
fn test_run_single_scenario_passes() {
    simulated()
        .args(["run", "device-play-sound"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PASS  device-play-sound"))
        .stdout(predicate::str::contains("1 passed, 0 failed"));
}

#[test]
fn test_run_all_scenarios_on_simulated_app() {
    let assert = simulated().arg("run").assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();

    assert!(!stdout.contains("FAIL"), "{stdout}");
    assert!(stdout.contains("PASS  play-sound-notification"));
    assert!(stdout.contains("0 failed"));
}

#[test]
fn test_run_writes_report() {
    let report = std::env::temp_dir().join(format!("findmy-ui-report-{}.jsonl", std::process::id()));

    simulated()
        .args(["run", "clear-notifications", "--report"])
        .arg(&report)
        .assert()
        .success();

    let text = std::fs::read_to_string(&report).unwrap();
    let _ = std::fs::remove_file(&report);
    let lines: Vec<_> = text.lines().collect();
    assert!(!lines.is_empty());
    for line in lines {
        serde_json::from_str::<serde_json::Value>(line).unwrap();
    }
    assert!(text.contains("cleared notifications") || text.contains("notification centre"));
}

#[test]
fn test_unknown_scenario_is_usage_error() {
    simulated()
        .args(["run", "no-such-scenario"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("unknown scenario 'no-such-scenario'"));
}

#[test]
fn test_invalid_config_is_usage_error() {
    Command::cargo_bin("findmy-ui")
        .unwrap()
        .args(["--simulate", "--config"])
        .arg(fixture_path("invalid.json"))
        .arg("run")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("invalid config"));
}

#[test]
fn test_inspect_describes_home_screen() {
    simulated()
        .arg("inspect")
        .assert()
        .success()
        .stdout(predicate::str::contains("TAB BARS (1)"))
        .stdout(predicate::str::contains("NOTIFICATIONS"));
}

#[test]
fn test_inspect_json_is_a_tree() {
    let assert = simulated().args(["inspect", "--json"]).assert().success();
    let tree: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert!(tree["app"].is_array());
    assert!(tree["system"].is_array());
}

#[test]
fn test_completions_for_bash() {
    Command::cargo_bin("findmy-ui")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("findmy-ui"));
}

#[test]
fn test_unknown_subcommand() {
    Command::cargo_bin("findmy-ui")
        .unwrap()
        .arg("totally-fake-command")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("error"));
}
