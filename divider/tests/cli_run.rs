//! CLI tests for `divider run`, `divider check`, and `divider init-config`.
//!
//! Spawns the divider binary and verifies exit codes and output.

use std::process::Command;

use divider::exit_codes;
use divider::test_support::{scenario_file, scenario_toml};

const STAIRCASE: &[&[f64]] = &[
    &[1.0, 1.0, 1.0, 1.0],
    &[3.0, 4.0, 2.0, 1.0],
    &[2.0, 3.0, 4.0, 1.0],
    &[1.0, 2.0, 3.0, 4.0],
];

#[test]
fn run_prints_shares_and_exits_ok() {
    let (_temp, path) = scenario_file(&scenario_toml(STAIRCASE));
    let output = Command::new(env!("CARGO_BIN_EXE_divider"))
        .arg("run")
        .arg(&path)
        .output()
        .expect("divider run");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("agent-4"));
    assert!(stdout.contains("[3.000000, 4.000000)"));
}

#[test]
fn run_json_emits_report() {
    let (_temp, path) = scenario_file(&scenario_toml(STAIRCASE));
    let output = Command::new(env!("CARGO_BIN_EXE_divider"))
        .args(["run", "--json"])
        .arg(&path)
        .output()
        .expect("divider run --json");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(report["rounds"].as_array().map(Vec::len), Some(1));
    assert_eq!(report["allocation"]["shares"].as_array().map(Vec::len), Some(4));
}

#[test]
fn check_rejects_three_agents() {
    let (_temp, path) = scenario_file(&scenario_toml(&STAIRCASE[..3]));
    let status = Command::new(env!("CARGO_BIN_EXE_divider"))
        .arg("check")
        .arg(&path)
        .status()
        .expect("divider check");

    assert_eq!(status.code(), Some(exit_codes::INVALID));
}

#[test]
fn run_missing_scenario_is_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    let status = Command::new(env!("CARGO_BIN_EXE_divider"))
        .arg("run")
        .arg(temp.path().join("missing.toml"))
        .status()
        .expect("divider run");

    assert_eq!(status.code(), Some(exit_codes::INVALID));
}

#[test]
fn init_config_writes_defaults_once() {
    let (temp, scenario) = scenario_file(&scenario_toml(STAIRCASE));
    let config = temp.path().join("conf").join("divider.toml");
    let init = || {
        Command::new(env!("CARGO_BIN_EXE_divider"))
            .arg("init-config")
            .arg(&config)
            .status()
            .expect("divider init-config")
    };

    assert_eq!(init().code(), Some(exit_codes::OK));
    let written = std::fs::read_to_string(&config).expect("read config");
    assert!(written.contains("settle_rounds = 12"));
    assert_eq!(init().code(), Some(exit_codes::INVALID));

    let status = Command::new(env!("CARGO_BIN_EXE_divider"))
        .arg("run")
        .arg(&scenario)
        .arg("--config")
        .arg(&config)
        .status()
        .expect("divider run --config");
    assert_eq!(status.code(), Some(exit_codes::OK));
}

#[test]
fn run_rejects_invalid_config_file() {
    let (temp, scenario) = scenario_file(&scenario_toml(STAIRCASE));
    let config = temp.path().join("divider.toml");
    std::fs::write(&config, "tolerance = 0.0\n").expect("write config");
    let status = Command::new(env!("CARGO_BIN_EXE_divider"))
        .arg("run")
        .arg(&scenario)
        .arg("--config")
        .arg(&config)
        .status()
        .expect("divider run --config");

    assert_eq!(status.code(), Some(exit_codes::INVALID));
}
