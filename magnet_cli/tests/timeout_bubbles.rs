use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

fn config(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, "[heater]\nsettle_ms = 0\n[ramp]\nsample_interval_ms = 1\n").unwrap();
    cfg
}

#[rstest]
fn supply_timeout_bubbles_to_cli() {
    let dir = tempdir().unwrap();
    let cfg = config(&dir);

    let mut cmd = Command::cargo_bin("magnet").unwrap();
    cmd.env("MAGNET_SIM_TIMEOUT", "1");
    cmd.arg("--sim").arg("--config").arg(&cfg).arg("status");
    cmd.assert().code(2).stderr(predicate::str::contains(
        "What happened: The supply did not answer",
    ));
}

#[rstest]
fn supply_timeout_is_json_with_reason() {
    let dir = tempdir().unwrap();
    let cfg = config(&dir);

    let mut cmd = Command::cargo_bin("magnet").unwrap();
    cmd.env("MAGNET_SIM_TIMEOUT", "1");
    cmd.arg("--json")
        .arg("--sim")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("heater")
        .arg("on");

    let out = cmd.assert().code(2).get_output().stdout.clone();
    let stdout = String::from_utf8_lossy(&out);
    let line = stdout
        .lines()
        .find(|l| l.contains("\"reason\""))
        .unwrap_or_else(|| panic!("no error line; stdout was: {stdout}"));
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["reason"], "TransportTimeout");
    assert!(v["message"].as_str().unwrap().contains("did not answer"));
}

#[rstest]
fn persistent_garbage_exits_with_protocol_code() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, "[protocol]\nretry_max = 2\nretry_backoff_ms = 1\n").unwrap();

    let mut cmd = Command::cargo_bin("magnet").unwrap();
    cmd.env("MAGNET_SIM_GARBLE", "1000");
    cmd.arg("--sim").arg("--config").arg(&cfg).arg("status");
    cmd.assert()
        .code(3)
        .stderr(predicate::str::contains("no well-formed reply"));
}
