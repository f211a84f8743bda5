//! CLI integration tests for the dagway command-line interface.
//!
//! None of these start a server; they cover argument parsing, the operation
//! listing and config file handling.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A dagway command isolated from the user's configuration.
fn dagway(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("dagway").unwrap();
    cmd.current_dir(config_dir.path())
        .env("DAGWAY_CONFIG_DIR", config_dir.path())
        .env_remove("DAGWAY_HTTP_TOKEN")
        .env_remove("DAGWAY_BIND");
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    dagway(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("apis"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    dagway(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dagway"));
}

#[test]
fn test_start_help_mentions_token_env() {
    let dir = TempDir::new().unwrap();
    dagway(&dir)
        .args(["start", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DAGWAY_HTTP_TOKEN"))
        .stdout(predicate::str::contains("--init-metadata"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Apis Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_apis_lists_operations() {
    let dir = TempDir::new().unwrap();
    dagway(&dir)
        .arg("apis")
        .assert()
        .success()
        .stdout(predicate::str::contains("list_tasks"))
        .stdout(predicate::str::contains("deploy_dag"))
        .stdout(predicate::str::contains("refresh_dag"));
}

#[test]
fn test_apis_json() {
    let dir = TempDir::new().unwrap();
    let output = dagway(&dir).args(["--json", "apis"]).output().unwrap();
    assert!(output.status.success());

    let apis: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = apis
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|a| a["name"].as_str())
        .collect();
    assert!(names.contains(&"version"));
    assert!(names.contains(&"trigger_dag"));
}

#[test]
fn test_apis_show_command() {
    let dir = TempDir::new().unwrap();
    dagway(&dir)
        .args(["apis", "clear", "--show-command"])
        .assert()
        .success()
        .stdout(predicate::str::contains("airflow clear"))
        .stdout(predicate::str::contains("--no_confirm"));
}

#[test]
fn test_apis_unknown_operation_fails() {
    let dir = TempDir::new().unwrap();
    dagway(&dir)
        .args(["apis", "no_such_api"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API 'no_such_api' was not found"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_path_uses_config_dir() {
    let dir = TempDir::new().unwrap();
    dagway(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_then_which() {
    let dir = TempDir::new().unwrap();
    dagway(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));
    assert!(dir.path().join("config.toml").is_file());

    dagway(&dir)
        .args(["config", "which"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ loaded"));
}

#[test]
fn test_config_show_redacts_token() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[auth]\nexpected_token = \"hunter2\"\n",
    )
    .unwrap();

    dagway(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<redacted>"))
        .stdout(predicate::str::contains("hunter2").not());
}

// ─────────────────────────────────────────────────────────────────────────────
// Start Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_start_rejects_invalid_bind() {
    let dir = TempDir::new().unwrap();
    dagway(&dir)
        .args(["start", "--bind", "not-an-address"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}
