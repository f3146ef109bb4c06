//! Integration tests for the `medevac` CLI binary.
//!
//! Every test runs against its own temporary data directory and a config
//! path that does not exist, so nothing touches the user's real files.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `medevac` binary with env isolation.
fn medevac_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("medevac");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("MEDEVAC_CONFIG", home.join("config.toml"))
        .env("MEDEVAC_DATA_DIR", home.join("timelines"))
        .env("NO_COLOR", "1")
        .env_remove("MEDEVAC_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn json_of(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

fn load(home: &Path, id: &str, initial: Option<&str>) {
    let mut cmd = medevac_cmd(home);
    cmd.args(["load", id, "-q"]);
    if let Some(status) = initial {
        cmd.args(["--initial", status]);
    }
    cmd.assert().success();
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = TempDir::new().unwrap();
    let output = medevac_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    medevac_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("transition")
            .and(predicate::str::contains("allowed"))
            .and(predicate::str::contains("proximity")),
    );
}

#[test]
fn test_completions_zsh() {
    let home = TempDir::new().unwrap();
    medevac_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Load / status ───────────────────────────────────────────────────

#[test]
fn test_load_seeds_pending_timeline() {
    let home = TempDir::new().unwrap();
    medevac_cmd(home.path())
        .args(["load", "E1", "-o", "plain"])
        .assert()
        .success()
        .stdout("PENDING\n");

    let stored = home.path().join("timelines").join("emergency_E1_timeline.json");
    assert!(stored.exists(), "missing {}", stored.display());
}

#[test]
fn test_stored_status_wins_over_initial() {
    let home = TempDir::new().unwrap();
    load(home.path(), "E1", Some("in-progress"));

    medevac_cmd(home.path())
        .args(["load", "E1", "--initial", "cancelled", "-o", "plain"])
        .assert()
        .success()
        .stdout("IN_PROGRESS\n");
}

#[test]
fn test_status_of_unknown_emergency() {
    let home = TempDir::new().unwrap();
    medevac_cmd(home.path())
        .args(["status", "E404"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("medevac load E404"));
}

#[test]
fn test_unwritable_store_exits_with_storage_code() {
    let home = TempDir::new().unwrap();
    let not_a_dir = home.path().join("file");
    std::fs::write(&not_a_dir, "").unwrap();

    medevac_cmd(home.path())
        .args(["load", "E1", "--data-dir"])
        .arg(&not_a_dir)
        .assert()
        .code(7);
}

// ── Transitions ─────────────────────────────────────────────────────

#[test]
fn test_transition_appends_history() {
    let home = TempDir::new().unwrap();
    load(home.path(), "E1", None);

    medevac_cmd(home.path())
        .args(["transition", "E1", "accepted", "--notes", "crew 7", "-o", "plain"])
        .assert()
        .success()
        .stdout("ACCEPTED\n");

    let output = medevac_cmd(home.path())
        .args(["history", "E1", "-o", "json"])
        .output()
        .unwrap();
    let history = json_of(&output);
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1]["status"], "ACCEPTED");
    assert_eq!(entries[1]["notes"], "crew 7");
}

#[test]
fn test_rejected_transition_exit_code() {
    let home = TempDir::new().unwrap();
    load(home.path(), "E1", None);

    medevac_cmd(home.path())
        .args(["transition", "E1", "on-site"])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("not allowed"));

    medevac_cmd(home.path())
        .args(["history", "E1", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PENDING").and(predicate::str::contains("ON_SITE").not()));
}

#[test]
fn test_same_state_transition_is_a_no_op() {
    let home = TempDir::new().unwrap();
    load(home.path(), "E1", None);

    medevac_cmd(home.path())
        .args(["transition", "E1", "pending", "-o", "plain"])
        .assert()
        .success()
        .stdout("PENDING\n")
        .stderr(predicate::str::contains("already"));

    let output = medevac_cmd(home.path())
        .args(["history", "E1", "-o", "json"])
        .output()
        .unwrap();
    assert_eq!(json_of(&output).as_array().unwrap().len(), 1);
}

#[test]
fn test_unknown_status_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    medevac_cmd(home.path())
        .args(["transition", "E1", "teleported"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("expected one of"));
}

// ── Transition table ────────────────────────────────────────────────

#[test]
fn test_allowed_successors() {
    let home = TempDir::new().unwrap();
    let output = medevac_cmd(home.path())
        .args(["allowed", "accepted", "-o", "plain"])
        .output()
        .unwrap();
    assert!(output.status.success());
    insta::assert_snapshot!(stdout_of(&output).trim_end(), @r"
    IN_PROGRESS
    CANCELLED
    ");
}

#[test]
fn test_allowed_edge_check() {
    let home = TempDir::new().unwrap();
    medevac_cmd(home.path())
        .args(["allowed", "pending", "--to", "active", "-o", "plain"])
        .assert()
        .success()
        .stdout("yes\n");

    medevac_cmd(home.path())
        .args(["allowed", "completed", "--to", "cancelled"])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("terminal"));
}

#[test]
fn test_allowed_table_as_json() {
    let home = TempDir::new().unwrap();
    let output = medevac_cmd(home.path())
        .args(["allowed", "-o", "json"])
        .output()
        .unwrap();
    let table = json_of(&output);
    let rows = table.as_array().unwrap();
    assert_eq!(rows.len(), 8);
    assert_eq!(rows[0]["from"], "PENDING");
    assert_eq!(rows[6]["to"].as_array().unwrap().len(), 0);
}

// ── Proximity ───────────────────────────────────────────────────────

#[test]
fn test_proximity_distance_advances_to_arriving() {
    let home = TempDir::new().unwrap();
    load(home.path(), "E1", Some("in-progress"));

    let far = medevac_cmd(home.path())
        .args(["proximity", "E1", "--distance", "2.0", "-o", "json"])
        .output()
        .unwrap();
    assert_eq!(json_of(&far)["advanced"], false);

    let near = medevac_cmd(home.path())
        .args(["proximity", "E1", "--distance", "0.5", "-o", "json"])
        .output()
        .unwrap();
    let view = json_of(&near);
    assert_eq!(view["advanced"], true);
    assert_eq!(view["status"], "ARRIVING");
}

#[test]
fn test_proximity_from_coordinates() {
    let home = TempDir::new().unwrap();
    load(home.path(), "E1", Some("in-progress"));

    medevac_cmd(home.path())
        .args([
            "proximity",
            "E1",
            "--from",
            "19.4326,-99.1332",
            "--to",
            "19.4340,-99.1340",
            "-o",
            "plain",
        ])
        .assert()
        .success()
        .stdout("ARRIVING\n");
}

#[test]
fn test_watch_feeds_stdin_distances() {
    let home = TempDir::new().unwrap();
    load(home.path(), "E1", Some("in-progress"));

    medevac_cmd(home.path())
        .args(["watch", "E1", "--stdin", "--for", "2s", "-o", "plain"])
        .write_stdin("4.2\n1.1\n0.3\n")
        .assert()
        .success()
        .stdout("IN_PROGRESS\nARRIVING\n");
}

#[test]
fn test_elapsed_json() {
    let home = TempDir::new().unwrap();
    load(home.path(), "E1", None);

    let output = medevac_cmd(home.path())
        .args(["elapsed", "E1", "-o", "json"])
        .output()
        .unwrap();
    let view = json_of(&output);
    assert_eq!(view["status"], "PENDING");
    assert!(view["elapsed_secs"].as_u64().unwrap() < 60);
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_init_and_show() {
    let home = TempDir::new().unwrap();
    medevac_cmd(home.path())
        .args(["config", "init"])
        .assert()
        .success();
    assert!(home.path().join("config.toml").exists());

    medevac_cmd(home.path())
        .args(["config", "init"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--force"));

    let output = medevac_cmd(home.path())
        .args(["config", "show", "-o", "json"])
        .output()
        .unwrap();
    let cfg = json_of(&output);
    assert_eq!(cfg["proximity"]["threshold_km"], 0.5);
    assert_eq!(cfg["storage"]["retry_attempts"], 3);
}

#[test]
fn test_invalid_config_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    medevac_cmd(home.path())
        .env("MEDEVAC_PROXIMITY__THRESHOLD_KM", "-1")
        .args(["load", "E1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("threshold_km"));
}
