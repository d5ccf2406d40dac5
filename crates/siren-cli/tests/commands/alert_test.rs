//! Tests for the `alert` and `events` commands.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn register_tenant(dir: &TempDir, key: &str) {
    Command::cargo_bin("siren")
        .unwrap()
        .arg("--data-dir")
        .arg(dir.path())
        .arg("tenant")
        .arg("add")
        .arg(key)
        .assert()
        .success();
}

/// Opening an alert for an unregistered tenant is refused.
#[test]
fn test_alert_open_requires_known_tenant() {
    let dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("alert")
        .arg("open")
        .arg("--tenant")
        .arg("ghost")
        .arg("disk full");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Unknown tenant"));
}

/// Binding an alert to a policy the tenant does not have is refused.
#[test]
fn test_alert_open_unknown_policy() {
    let dir = TempDir::new().unwrap();
    register_tenant(&dir, "acme");

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("alert")
        .arg("open")
        .arg("--tenant")
        .arg("acme")
        .arg("disk full")
        .arg("--policy")
        .arg("11111111-2222-4333-8444-555555555555");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Policy not found"));
}

/// Open, list, acknowledge: the whole alert lifecycle from the CLI.
#[test]
fn test_alert_open_ack_flow() {
    let dir = TempDir::new().unwrap();
    register_tenant(&dir, "acme");

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("alert")
        .arg("open")
        .arg("--tenant")
        .arg("acme")
        .arg("disk full on db-1");
    let assert = cmd
        .assert()
        .success()
        .stdout(predicate::str::contains("Opened alert"));
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let alert_id = stdout
        .lines()
        .next()
        .and_then(|line| line.strip_prefix("Opened alert "))
        .unwrap()
        .trim()
        .to_string();

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("alert")
        .arg("list")
        .arg("--tenant")
        .arg("acme");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("[open]"))
        .stdout(predicate::str::contains("disk full on db-1"));

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("alert")
        .arg("ack")
        .arg("--tenant")
        .arg("acme")
        .arg(&alert_id)
        .arg("--by")
        .arg("casey");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Acknowledged 'disk full on db-1'"));

    // Acknowledged alerts drop out of the escalatable set.
    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("alert")
        .arg("list")
        .arg("--tenant")
        .arg("acme")
        .arg("--escalatable");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No alerts."));

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("alert")
        .arg("list")
        .arg("--tenant")
        .arg("acme");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("[acknowledged]"));
}

/// Acknowledging an unknown alert id fails cleanly.
#[test]
fn test_alert_ack_unknown_id() {
    let dir = TempDir::new().unwrap();
    register_tenant(&dir, "acme");

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("alert")
        .arg("ack")
        .arg("--tenant")
        .arg("acme")
        .arg("11111111-2222-4333-8444-555555555555");
    cmd.assert().failure();
}

/// A tenant with no history has no events.
#[test]
fn test_events_empty() {
    let dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("events")
        .arg("--tenant")
        .arg("acme");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No events."));
}
