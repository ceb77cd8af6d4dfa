use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let mut cmd = Command::new(cargo_bin!("bnpl-engine"));
    cmd.args([
        "simulate",
        "tests/fixtures/plans.csv",
        "tests/fixtures/events.csv",
        "--db-path",
        "some_db",
    ]);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains(
            "the 'storage-rocksdb' feature is not enabled; falling back to in-memory storage",
        ))
        .stdout(predicate::str::contains("2,3,2025-04-30,33.34,33.34,0.00,paid"));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_no_fallback_warning() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let mut cmd = Command::new(cargo_bin!("bnpl-engine"));
    cmd.args(["simulate", "tests/fixtures/plans.csv", "tests/fixtures/events.csv"])
        .arg("--db-path")
        .arg(&db_path);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("falling back").not());
}
