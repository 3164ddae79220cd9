//! Smoke tests for the widget-probe CLI
//!
//! Everything here runs without a browser: argument handling, configuration
//! resolution and the listing commands.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command for the widget-probe binary
fn widget_probe() -> Command {
    let mut cmd = Command::cargo_bin("widget-probe").expect("widget-probe binary should exist");
    cmd.env_remove("WIDGET_PROBE_BASE_URL")
        .env_remove("CHROMIUM_PATH")
        .env_remove("RUST_LOG");
    cmd
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    widget_probe()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_flag() {
    widget_probe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_no_args_fails() {
    widget_probe().assert().failure();
}

#[test]
fn test_run_help_lists_flags() {
    widget_probe()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--fail-fast"))
        .stdout(predicate::str::contains("--jobs"))
        .stdout(predicate::str::contains("WIDGET_PROBE_BASE_URL"));
}

// ============================================================================
// list
// ============================================================================

#[test]
fn test_list_text() {
    widget_probe()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("widget_opens"))
        .stdout(predicate::str::contains("popular_articles_have_valid_content"))
        .stdout(predicate::str::contains("contact_form_shows_support_title"));
}

#[test]
fn test_list_json() {
    let output = widget_probe()
        .args(["list", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 3);
    assert_eq!(entries[0]["name"], "widget_opens");
}

// ============================================================================
// config
// ============================================================================

#[test]
fn test_config_defaults() {
    widget_probe()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url: https://uchi.ru/"))
        .stdout(predicate::str::contains("content_load_ms: 8000"));
}

#[test]
fn test_config_env_override() {
    widget_probe()
        .env("WIDGET_PROBE_BASE_URL", "http://localhost:9000/")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url: http://localhost:9000/"));
}

#[test]
fn test_config_file_and_flag() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("suite.yaml");
    fs::write(&path, "min_articles: 4\ntimeouts:\n  navigation_ms: 30000\n").unwrap();
    widget_probe()
        .args(["config", "--config"])
        .arg(&path)
        .arg("--no-sandbox")
        .assert()
        .success()
        .stdout(predicate::str::contains("min_articles: 4"))
        .stdout(predicate::str::contains("navigation_ms: 30000"))
        .stdout(predicate::str::contains("sandbox: false"));
}

#[test]
fn test_config_rejects_zero_budget() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("suite.yaml");
    fs::write(&path, "timeouts:\n  element_visible_ms: 0\n").unwrap();
    widget_probe()
        .args(["config", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("element_visible_ms"));
}

#[test]
fn test_config_missing_file() {
    widget_probe()
        .args(["config", "--config", "/nonexistent/suite.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot load"));
}

// ============================================================================
// run argument validation (fails before any browser launch)
// ============================================================================

#[test]
fn test_run_rejects_zero_jobs() {
    widget_probe()
        .args(["run", "--jobs", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--jobs"));
}

#[test]
fn test_run_rejects_unknown_filter() {
    widget_probe()
        .args(["run", "--filter", "does_not_exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no scenario matches"));
}
