//! Smoke tests for the shopflow CLI
//!
//! Nothing here starts a browser: runs are made to fail at the store reset or
//! at engine selection, before chromium would be launched.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get a command for the shopflow binary, isolated from the caller's env
fn shopflow() -> Command {
    let mut cmd = Command::cargo_bin("shopflow").expect("shopflow binary should exist");
    for var in [
        "DB_FULL_PATH",
        "SHOPFLOW_BASE_URL",
        "SHOPFLOW_ADMIN_EMAIL",
        "SHOPFLOW_ADMIN_PASSWORD",
        "CHROMIUM_PATH",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn shop_db(dir: &Path) -> PathBuf {
    let path = dir.join("shop.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE person (id INTEGER PRIMARY KEY, email TEXT);
         CREATE TABLE subscription (id INTEGER PRIMARY KEY);
         CREATE TABLE transactions (id INTEGER PRIMARY KEY);
         CREATE TABLE plan (id INTEGER PRIMARY KEY, title TEXT);
         INSERT INTO person (email) VALUES ('john@example.com'), ('jane@example.com');
         INSERT INTO subscription DEFAULT VALUES;
         INSERT INTO transactions DEFAULT VALUES;
         INSERT INTO plan (title) VALUES ('Soap Subscription');",
    )
    .unwrap();
    path
}

fn count(db: &Path, table: &str) -> i64 {
    let conn = Connection::open(db).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    shopflow()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_flag() {
    shopflow()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("reset"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_no_args_shows_usage() {
    shopflow()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_run_help_lists_flags() {
    shopflow()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--db-path"))
        .stdout(predicate::str::contains("--engine"))
        .stdout(predicate::str::contains("--fail-fast"));
}

#[test]
fn test_admin_password_default_hidden_from_help() {
    shopflow()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: password]").not());
}

// ============================================================================
// Scenario listing
// ============================================================================

#[test]
fn test_list_builtin_scenarios() {
    shopflow()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("subscription_and_upfront"))
        .stdout(predicate::str::contains("upfront_only"))
        .stdout(predicate::str::contains("recurring_only"))
        .stdout(predicate::str::contains("admin_login_rejects_bad_password"));
}

#[test]
fn test_show_prints_loadable_yaml() {
    let output = shopflow()
        .args(["show", "recurring_only"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let yaml = String::from_utf8(output).unwrap();
    let value: serde_yaml_ng::Value = serde_yaml_ng::from_str(&yaml).unwrap();
    assert_eq!(value["scenarios"][0]["id"], "recurring_only");
    assert!(yaml.contains("(No up-front fee)"));

    let dir = TempDir::new().unwrap();
    let file = dir.path().join("one.yaml");
    fs::write(&file, &yaml).unwrap();
    shopflow()
        .args(["list", "--scenarios-file"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("recurring_only"))
        .stdout(predicate::str::contains("upfront_only").not());
}

#[test]
fn test_show_unknown_scenario_fails() {
    shopflow()
        .args(["show", "lifetime_plan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown scenario 'lifetime_plan'"));
}

#[test]
fn test_invalid_scenarios_file_fails() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("bad.yaml");
    fs::write(&file, "scenarios:\n  - id: ''\n    steps: []\n").unwrap();
    shopflow()
        .args(["list", "--scenarios-file"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad.yaml"));
}

// ============================================================================
// Reset
// ============================================================================

#[test]
fn test_reset_clears_order_tables_only() {
    let dir = TempDir::new().unwrap();
    let db = shop_db(dir.path());

    shopflow()
        .args(["reset", "--color", "never", "--db-path"])
        .arg(&db)
        .assert()
        .success()
        .stderr(predicate::str::contains("4 rows removed"));

    assert_eq!(count(&db, "person"), 0);
    assert_eq!(count(&db, "subscription"), 0);
    assert_eq!(count(&db, "transactions"), 0);
    assert_eq!(count(&db, "plan"), 1);
}

#[test]
fn test_reset_reads_db_path_from_env() {
    let dir = TempDir::new().unwrap();
    let db = shop_db(dir.path());

    shopflow()
        .arg("reset")
        .env("DB_FULL_PATH", &db)
        .assert()
        .success();
    assert_eq!(count(&db, "person"), 0);
}

#[test]
fn test_reset_missing_database_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.db");

    shopflow()
        .args(["reset", "--db-path"])
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open store"));
    assert!(!missing.exists());
}

// ============================================================================
// Run
// ============================================================================

#[test]
fn test_run_requires_db_path() {
    shopflow()
        .args(["run", "--scenario", "upfront_only"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--db-path"));
}

#[test]
fn test_run_unknown_scenario_fails() {
    let dir = TempDir::new().unwrap();
    let db = shop_db(dir.path());
    shopflow()
        .args(["run", "--scenario", "gift_card", "--db-path"])
        .arg(&db)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown scenario 'gift_card'"));
    assert_eq!(count(&db, "person"), 2);
}

#[test]
fn test_run_reports_reset_failure_without_browser() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("out/report.json");

    shopflow()
        .args(["run", "--color", "never", "--scenario", "upfront_only"])
        .arg("--db-path")
        .arg(dir.path().join("missing.db"))
        .arg("--report")
        .arg(&report)
        .assert()
        .failure()
        .stderr(predicate::str::contains("FAIL upfront_only [chromium]"))
        .stderr(predicate::str::contains("[reset]"))
        .stderr(predicate::str::contains("1 of 1 scenario runs failed"));

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(report).unwrap()).unwrap();
    let outcome = &value["outcomes"][0];
    assert_eq!(outcome["scenario_id"], "upfront_only");
    assert_eq!(outcome["passed"], false);
    assert_eq!(outcome["failure"]["stage"], "reset");
    assert_eq!(outcome["failure"]["kind"], "store_connection");
}

#[test]
fn test_run_fail_fast_skips_remaining() {
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("report.json");

    shopflow()
        .args(["run", "--color", "never", "--fail-fast"])
        .args(["--scenario", "upfront_only", "--scenario", "recurring_only"])
        .arg("--db-path")
        .arg(dir.path().join("missing.db"))
        .arg("--report")
        .arg(&report)
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 skipped"));

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(report).unwrap()).unwrap();
    assert_eq!(value["outcomes"].as_array().unwrap().len(), 1);
}

#[cfg(feature = "browser")]
#[test]
fn test_run_on_unsupported_engine_fails_at_launch() {
    let dir = TempDir::new().unwrap();
    let db = shop_db(dir.path());
    let report = dir.path().join("report.json");

    shopflow()
        .args(["run", "--engine", "webkit", "--scenario", "recurring_only"])
        .arg("--db-path")
        .arg(&db)
        .arg("--report")
        .arg(&report)
        .assert()
        .failure();

    // the store is still reset before the launch is attempted
    assert_eq!(count(&db, "person"), 0);
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(report).unwrap()).unwrap();
    assert_eq!(value["outcomes"][0]["engine"], "webkit");
    assert_eq!(value["outcomes"][0]["failure"]["stage"], "launch");
}
