//! Binary tests for the `focus-timer` command.
//!
//! Every invocation gets its own data directory, so no daemon is found and
//! the controller runs standalone.

use assert_cmd::Command;
use predicates::prelude::*;

fn focus_timer(data_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("focus-timer").unwrap();
    cmd.arg("--data-dir").arg(data_dir).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("focus-timer")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("daemon"))
        .stdout(predicate::str::contains("check-url"));
}

#[test]
fn test_completions_bash() {
    Command::cargo_bin("focus-timer")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("focus-timer"));
}

#[test]
fn test_status_without_daemon_is_standalone() {
    let dir = tempfile::tempdir().unwrap();

    focus_timer(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Stopped"))
        .stdout(predicate::str::contains("25:00"))
        .stdout(predicate::str::contains("Standalone"));
}

#[test]
fn test_start_pause_stop_across_invocations() {
    let dir = tempfile::tempdir().unwrap();

    focus_timer(dir.path())
        .args(["start", "--work", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Timer started"))
        .stdout(predicate::str::contains("10:00").or(predicate::str::contains("09:59")));

    focus_timer(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Working"));

    focus_timer(dir.path())
        .arg("pause")
        .assert()
        .success()
        .stdout(predicate::str::contains("paused"));

    focus_timer(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Stopped"));

    focus_timer(dir.path())
        .arg("stop")
        .assert()
        .success()
        .stdout(predicate::str::contains("Timer stopped"));

    assert!(dir.path().join("controller-state.json").exists());
}

#[test]
fn test_start_rejects_out_of_range_work() {
    let dir = tempfile::tempdir().unwrap();

    focus_timer(dir.path())
        .args(["start", "--work", "0"])
        .assert()
        .failure();
}

#[test]
fn test_check_url_without_daemon_is_ignored() {
    let dir = tempfile::tempdir().unwrap();

    focus_timer(dir.path())
        .args(["check-url", "https://www.reddit.com/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ignored"));
}

#[test]
fn test_corrupt_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.json"), "{ not json").unwrap();

    focus_timer(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("25:00"));
}

#[test]
fn test_user_facing_output_is_english() {
    let dir = tempfile::tempdir().unwrap();

    for args in [
        vec!["--help"],
        vec!["status"],
        vec!["check-url", "https://github.com/"],
    ] {
        let output = focus_timer(dir.path()).args(&args).output().unwrap();
        assert!(output.status.success());
        let stdout = String::from_utf8(output.stdout).unwrap();
        assert!(stdout.is_ascii(), "non-English output for {:?}: {}", args, stdout);
    }

    focus_timer(dir.path())
        .arg("status")
        .assert()
        .stdout(predicate::str::contains("State: Stopped"))
        .stdout(predicate::str::contains("Mode: Standalone"));
}
