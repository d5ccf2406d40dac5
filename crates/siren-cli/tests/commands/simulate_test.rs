//! Tests for the `simulate` command.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_policy_file(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("policy.json");
    std::fs::write(&path, contents).unwrap();
    path
}

const TWO_TIER: &str = r#"{
    "name": "standard",
    "tiers": [
        {"tier_number": 1, "timeout_minutes": 5, "notify_via": ["chat_dm"], "targets": ["oncall_primary"]},
        {"tier_number": 2, "timeout_minutes": 10, "notify_via": ["voice"], "targets": ["team_lead"]}
    ]
}"#;

/// The timeline shows cumulative offsets, not per-tier timeouts.
#[test]
fn test_simulate_prints_cumulative_timeline() {
    let dir = TempDir::new().unwrap();
    let path = write_policy_file(dir.path(), TWO_TIER);

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("simulate").arg("--policy").arg(&path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Escalation timeline: standard"))
        .stdout(predicate::str::contains("5m  tier 1  via chat_dm  -> oncall_primary"))
        .stdout(predicate::str::contains("15m  tier 2  via voice  -> team_lead"));
}

/// JSON output carries the machine-readable report.
#[test]
fn test_simulate_json_output() {
    let dir = TempDir::new().unwrap();
    let path = write_policy_file(dir.path(), TWO_TIER);

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("simulate").arg("--policy").arg(&path).arg("--json");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"fires_after_minutes\": 15"))
        .stdout(predicate::str::contains("\"policy_name\": \"standard\""));
}

/// A repeating policy is called out below the timeline.
#[test]
fn test_simulate_notes_repeat_cycle() {
    let dir = TempDir::new().unwrap();
    let path = write_policy_file(
        dir.path(),
        r#"{
            "name": "repeating",
            "repeat_count": 2,
            "tiers": [
                {"tier_number": 1, "timeout_minutes": 5, "notify_via": ["sms"], "targets": ["oncall"]}
            ]
        }"#,
    );

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("simulate").arg("--policy").arg(&path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("repeats from tier 1"))
        .stdout(predicate::str::contains("2 repeat(s)"));
}

/// A policy with no tiers simulates to an empty timeline.
#[test]
fn test_simulate_empty_policy() {
    let dir = TempDir::new().unwrap();
    let path = write_policy_file(dir.path(), r#"{"name": "no-op", "tiers": []}"#);

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("simulate").arg("--policy").arg(&path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("never escalates"));
}

/// An invalid policy is refused rather than simulated.
#[test]
fn test_simulate_rejects_invalid_policy() {
    let dir = TempDir::new().unwrap();
    let path = write_policy_file(
        dir.path(),
        r#"{"name": "bad", "tiers": [{"tier_number": 1, "timeout_minutes": 5, "notify_via": [], "targets": ["x"]}]}"#,
    );

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("simulate").arg("--policy").arg(&path);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid policy"));
}

/// The policy flag is required.
#[test]
fn test_simulate_requires_policy_flag() {
    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("simulate");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--policy"));
}

/// A missing file is a read error, not a panic.
#[test]
fn test_simulate_missing_file() {
    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("simulate").arg("--policy").arg("/nonexistent/policy.json");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}
