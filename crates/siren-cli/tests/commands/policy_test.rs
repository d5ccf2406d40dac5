//! Tests for the `policy` command and its subcommands.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const POLICY_ID: &str = "11111111-2222-4333-8444-555555555555";

fn write_policy_file(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("policy.json");
    std::fs::write(&path, contents).unwrap();
    path
}

fn two_tier_policy_json() -> String {
    format!(
        r#"{{
            "id": "{}",
            "name": "standard",
            "tiers": [
                {{"tier_number": 1, "timeout_minutes": 5, "notify_via": ["chat_dm"], "targets": ["oncall_primary"]}},
                {{"tier_number": 2, "timeout_minutes": 10, "notify_via": ["voice"], "targets": ["team_lead"]}}
            ]
        }}"#,
        POLICY_ID
    )
}

/// A well-formed policy file validates.
#[test]
fn test_policy_validate_accepts_valid_file() {
    let dir = TempDir::new().unwrap();
    let path = write_policy_file(dir.path(), &two_tier_policy_json());

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("policy").arg("validate").arg(&path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("is valid"))
        .stdout(predicate::str::contains("2 tier(s)"));
}

/// A zero timeout fails validation.
#[test]
fn test_policy_validate_rejects_zero_timeout() {
    let dir = TempDir::new().unwrap();
    let path = write_policy_file(
        dir.path(),
        r#"{"name": "bad", "tiers": [{"tier_number": 1, "timeout_minutes": 0, "notify_via": ["sms"], "targets": ["x"]}]}"#,
    );

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("policy").arg("validate").arg(&path);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid policy"))
        .stderr(predicate::str::contains("timeout"));
}

/// Malformed JSON is reported as a parse failure, not a panic.
#[test]
fn test_policy_validate_rejects_bad_json() {
    let dir = TempDir::new().unwrap();
    let path = write_policy_file(dir.path(), "{not json");

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("policy").arg("validate").arg(&path);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse"));
}

/// The id field may be omitted from hand-written files.
#[test]
fn test_policy_validate_generates_missing_id() {
    let dir = TempDir::new().unwrap();
    let path = write_policy_file(
        dir.path(),
        r#"{"name": "no-id", "tiers": [{"tier_number": 1, "timeout_minutes": 5, "notify_via": ["sms"], "targets": ["x"]}]}"#,
    );

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("policy").arg("validate").arg(&path);

    cmd.assert().success();
}

/// Adding a policy makes it listable.
#[test]
fn test_policy_add_and_list() {
    let dir = TempDir::new().unwrap();
    let path = write_policy_file(dir.path(), &two_tier_policy_json());

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("policy")
        .arg("add")
        .arg("--tenant")
        .arg("acme")
        .arg(&path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Stored policy 'standard'"));

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("policy")
        .arg("list")
        .arg("--tenant")
        .arg("acme");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("standard"))
        .stdout(predicate::str::contains("2 tier(s)"));
}

/// An invalid policy is rejected before it reaches the store.
#[test]
fn test_policy_add_rejects_invalid() {
    let dir = TempDir::new().unwrap();
    let path = write_policy_file(
        dir.path(),
        r#"{"name": "", "tiers": []}"#,
    );

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("policy")
        .arg("add")
        .arg("--tenant")
        .arg("acme")
        .arg(&path);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid policy"));

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("policy")
        .arg("list")
        .arg("--tenant")
        .arg("acme");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No policies."));
}

/// Show prints the stored policy as JSON.
#[test]
fn test_policy_show() {
    let dir = TempDir::new().unwrap();
    let path = write_policy_file(dir.path(), &two_tier_policy_json());

    Command::cargo_bin("siren")
        .unwrap()
        .arg("--data-dir")
        .arg(dir.path())
        .arg("policy")
        .arg("add")
        .arg("--tenant")
        .arg("acme")
        .arg(&path)
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("policy")
        .arg("show")
        .arg("--tenant")
        .arg("acme")
        .arg(POLICY_ID);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"standard\""))
        .stdout(predicate::str::contains("\"tier_number\": 2"));
}

/// Show on an unknown id fails.
#[test]
fn test_policy_show_unknown_id() {
    let dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("policy")
        .arg("show")
        .arg("--tenant")
        .arg("acme")
        .arg(POLICY_ID);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Policy not found"));
}

/// Delete removes the policy; a second delete reports not found.
#[test]
fn test_policy_delete() {
    let dir = TempDir::new().unwrap();
    let path = write_policy_file(dir.path(), &two_tier_policy_json());

    Command::cargo_bin("siren")
        .unwrap()
        .arg("--data-dir")
        .arg(dir.path())
        .arg("policy")
        .arg("add")
        .arg("--tenant")
        .arg("acme")
        .arg(&path)
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("policy")
        .arg("delete")
        .arg("--tenant")
        .arg("acme")
        .arg(POLICY_ID);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Deleted policy"));

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("policy")
        .arg("delete")
        .arg("--tenant")
        .arg("acme")
        .arg(POLICY_ID);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Policy not found"));
}
