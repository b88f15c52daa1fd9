// Binary-level checks that need no network access

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("delivery-metrics").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env_remove("DELIVERY_METRICS__WINDOW_DAYS")
        .env_remove("DELIVERY_METRICS__REPOS");
    cmd
}

#[test]
fn test_help_lists_report_families() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("dora"))
        .stdout(predicate::str::contains("testing"))
        .stdout(predicate::str::contains("--window-days"))
        .stdout(predicate::str::contains("--repos-file"));
}

#[test]
fn test_missing_subcommand_fails() {
    let dir = TempDir::new().unwrap();
    cmd(&dir).assert().failure();
}

#[test]
fn test_zero_window_is_rejected_before_any_request() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["dora", "--window-days", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("window_days must be at least 1"));
}

#[test]
fn test_malformed_repository_is_rejected() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["testing", "--repos", "not-a-repo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not-a-repo"));
}

#[test]
fn test_explicit_config_file_must_exist() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["all", "--config", "absent.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}
