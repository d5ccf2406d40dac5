//! Tests for the `tenant` command.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Registering a tenant makes it listable.
#[test]
fn test_tenant_add_and_list() {
    let dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("tenant")
        .arg("add")
        .arg("acme");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Registered tenant 'acme'"));

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("--data-dir").arg(dir.path()).arg("tenant").arg("list");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("acme"));
}

/// Registering the same tenant twice is reported, not an error.
#[test]
fn test_tenant_add_is_idempotent() {
    let dir = TempDir::new().unwrap();

    for _ in 0..2 {
        Command::cargo_bin("siren")
            .unwrap()
            .arg("--data-dir")
            .arg(dir.path())
            .arg("tenant")
            .arg("add")
            .arg("acme")
            .assert()
            .success();
    }

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("tenant")
        .arg("add")
        .arg("acme");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("already registered"));
}

/// An empty directory lists no tenants.
#[test]
fn test_tenant_list_empty() {
    let dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("siren").unwrap();
    cmd.arg("--data-dir").arg(dir.path()).arg("tenant").arg("list");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No tenants registered."));
}
