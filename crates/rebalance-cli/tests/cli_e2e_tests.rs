//! CLI end-to-end tests that invoke the compiled `rebalance` binary.
#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use rebalance_test_utils::TestPool;
use std::path::PathBuf;

fn rebalance() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rebalance"));
    for var in [
        "REBALANCE_CHECKSUM",
        "REBALANCE_PASSES",
        "REBALANCE_SKIP_HARDLINKS",
        "REBALANCE_LEDGER",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Run against `pool` with its ledger and the given extra flags.
fn rebalance_pool(pool: &TestPool, args: &[&str]) -> Command {
    let mut cmd = rebalance();
    cmd.arg("--ledger").arg(pool.ledger_path());
    cmd.args(args);
    cmd.arg(pool.root());
    cmd
}

fn canonical(pool: &TestPool, name: &str) -> PathBuf {
    std::fs::canonicalize(pool.path(name)).unwrap()
}

#[test]
fn test_no_arguments_prints_usage_and_exits_zero() {
    rebalance()
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("--passes"));
}

#[test]
fn test_help_mentions_concurrent_runs() {
    rebalance()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("same time"));
}

#[test]
fn test_missing_root_exits_one() {
    let pool = TestPool::new();
    rebalance()
        .arg("--ledger")
        .arg(pool.ledger_path())
        .arg(pool.path("absent"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Root path not found"));
    assert!(pool.ledger_contents().is_none());
}

#[test]
fn test_scenario_single_pass_then_idempotent() {
    let pool = TestPool::new();
    pool.write("a", b"alpha");
    pool.write("b", b"bravo");
    pool.write("c", b"charlie");

    rebalance_pool(&pool, &["--passes", "1", "--checksum", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Progress 100.00%"));

    let ledger_after_first = pool.ledger_contents().unwrap();
    for name in ["a", "b", "c"] {
        let record = format!("{}\n1\n", canonical(&pool, name).display());
        assert!(ledger_after_first.contains(&record), "{ledger_after_first}");
    }

    rebalance_pool(&pool, &["--passes", "1", "--checksum", "true"])
        .assert()
        .success()
        .stderr(predicate::str::contains("pass limit reached"));

    assert_eq!(pool.ledger_contents().unwrap(), ledger_after_first);
    assert_eq!(pool.read("b"), b"bravo");
}

#[test]
fn test_scenario_untracked_never_writes_ledger() {
    let pool = TestPool::with_files(3);

    for _ in 0..2 {
        rebalance_pool(&pool, &["-p", "0", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"rebalanced\": 3"));
    }
    assert!(pool.ledger_contents().is_none());
}

#[test]
fn test_scenario_unverified_still_records() {
    let pool = TestPool::new();
    pool.write("data.bin", b"payload");

    rebalance_pool(&pool, &["--checksum", "false"])
        .assert()
        .success();

    let record = format!("{}\n1\n", canonical(&pool, "data.bin").display());
    assert_eq!(pool.ledger_contents().unwrap(), record);
    assert_eq!(pool.read("data.bin"), b"payload");
}

#[test]
fn test_json_summary_is_valid_json() {
    let pool = TestPool::with_files(2);

    let output = rebalance_pool(&pool, &["--json"]).output().unwrap();

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["summary"]["file_count"], 2);
    assert_eq!(value["summary"]["rebalanced"], 2);
    assert_eq!(value["config"]["checksum_enabled"], true);
}

#[test]
fn test_environment_supplies_defaults() {
    let pool = TestPool::with_files(1);

    rebalance()
        .env("REBALANCE_PASSES", "0")
        .env("REBALANCE_LEDGER", pool.ledger_path())
        .arg(pool.root())
        .assert()
        .success();

    assert!(pool.ledger_contents().is_none());
}

#[test]
fn test_corrupt_ledger_exits_one_without_touching_files() {
    let pool = TestPool::new();
    pool.write("a", b"alpha");
    std::fs::write(pool.ledger_path(), "/pool/a\nnot-a-number\n").unwrap();

    rebalance_pool(&pool, &[])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Corrupt ledger"));

    assert_eq!(pool.read("a"), b"alpha");
    pool.assert_no_temp_files();
}

#[test]
fn test_orphans_are_reported() {
    let pool = TestPool::new();
    pool.write("a", b"alpha");
    pool.write("a.balance", b"stale");
    pool.write("lost.balance", b"only copy");

    rebalance_pool(&pool, &["-p", "0"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Possible leftover temporary copy"))
        .stderr(predicate::str::contains("only copy of its data"))
        .stdout(predicate::str::contains("3 files"));

    // The stale copy of `a` is replaced by this run's copy
    assert_eq!(pool.read("a"), b"alpha");
    assert!(!pool.path("a.balance").exists());
    assert_eq!(pool.read("lost.balance"), b"only copy");
    assert!(!pool.path("lost.balance.balance").exists());
}
