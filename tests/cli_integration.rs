//! Integration tests for the gitops-guard binary.
//!
//! These run the built binary; nothing here needs a cluster or network.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for running gitops-guard with an isolated config.
fn gitops_guard(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("gitops-guard").unwrap();
    cmd.env("GITOPS_GUARD_CONFIG", config_dir.path().join("missing.toml"));
    cmd.env("XDG_CONFIG_HOME", config_dir.path());
    cmd.env("HOME", config_dir.path());
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn version_flag_works() {
    let dir = TempDir::new().unwrap();
    gitops_guard(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gitops-guard"));
}

#[test]
fn help_lists_commands() {
    let dir = TempDir::new().unwrap();
    gitops_guard(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("revert"))
        .stdout(predicate::str::contains("wait"))
        .stdout(predicate::str::contains("completion"));
}

#[test]
fn completion_bash_emits_script() {
    let dir = TempDir::new().unwrap();
    gitops_guard(&dir)
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gitops-guard"));
}

#[test]
fn invalid_config_fails_with_message() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[poll]\ninterval_ms = 0\n").unwrap();

    Command::cargo_bin("gitops-guard")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .args(["completion", "bash"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration"));
}

#[test]
fn revert_with_unset_token_env_is_configuration_error() {
    let dir = TempDir::new().unwrap();
    gitops_guard(&dir)
        .args([
            "revert",
            "--uri",
            "https://github.com/acme/templates",
            "--token-env",
            "GITOPS_GUARD_TEST_TOKEN_UNSET",
        ])
        .env_remove("GITOPS_GUARD_TEST_TOKEN_UNSET")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration error"));
}

#[test]
fn revert_with_bad_uri_is_configuration_error() {
    let dir = TempDir::new().unwrap();
    gitops_guard(&dir)
        .args(["revert", "--uri", "templates", "--token-env", "GITOPS_GUARD_TEST_TOKEN"])
        .env("GITOPS_GUARD_TEST_TOKEN", "ghp_unused")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid repository uri"));
}

#[test]
fn wait_rejects_interval_longer_than_timeout() {
    let dir = TempDir::new().unwrap();
    gitops_guard(&dir)
        .args(["wait", "pod", "web-0", "--interval", "5", "--timeout", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("longer than timeout"));
}
