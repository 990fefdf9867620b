//! Integration tests for the `bmsdash` CLI binary.
//!
//! Argument parsing, help output, shell completions, config handling and
//! error exit codes, all without a live backend or keyring.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// `bmsdash` with env isolation: no `BMSDASH_*` leakage and config
/// directories pointed at `home`.
fn bmsdash_cmd(home: &std::path::Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("bmsdash");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("BMSDASH_PROFILE")
        .env_remove("BMSDASH_API_URL")
        .env_remove("BMSDASH_OUTPUT")
        .env_remove("BMSDASH_INSECURE")
        .env_remove("BMSDASH_TIMEOUT")
        .env_remove("BMSDASH_USERNAME")
        .env_remove("BMSDASH_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = bmsdash_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    bmsdash_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("machines")
            .and(predicate::str::contains("login"))
            .and(predicate::str::contains("trend"))
            .and(predicate::str::contains("logs")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    bmsdash_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bmsdash"));
}

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    bmsdash_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn test_unknown_domain_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    bmsdash_cmd(home.path())
        .args(["machines", "plumbing"])
        .assert()
        .code(2);
}

#[test]
fn test_trend_requires_machine_and_parameter() {
    let home = tempfile::tempdir().unwrap();
    bmsdash_cmd(home.path())
        .args(["trend", "electrical"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("required"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_missing_config_reports_no_config() {
    let home = tempfile::tempdir().unwrap();
    bmsdash_cmd(home.path())
        .args(["machines", "electrical"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("No API URL configured"));
}

#[test]
fn test_unknown_profile_is_not_found() {
    let home = tempfile::tempdir().unwrap();
    bmsdash_cmd(home.path())
        .args(["--profile", "lab", "summary", "electrical"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("'lab'"));
}

#[test]
fn test_config_path_points_into_config_home() {
    let home = tempfile::tempdir().unwrap();
    bmsdash_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_defaults_as_json() {
    let home = tempfile::tempdir().unwrap();
    let output = bmsdash_cmd(home.path())
        .args(["config", "show", "--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["default_profile"], "default");
    assert_eq!(value["defaults"]["timeout"], 30);
}

#[test]
fn test_config_use_rejects_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    bmsdash_cmd(home.path())
        .args(["config", "use", "ghost"])
        .assert()
        .code(4);
}
