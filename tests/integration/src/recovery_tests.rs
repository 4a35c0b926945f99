//! Aborted and interrupted runs
//!
//! A fatal error stops the run with the pool and ledger consistent, so the
//! next run picks up where the last one stopped.
#![cfg(unix)]

use pretty_assertions::assert_eq;
use rebalance_core::{Error, Ledger, Orchestrator, RunContext, Severity};
use rebalance_fs::NativeCapabilities;
use rebalance_test_utils::{
    CountingCapabilities, Fault, FaultyCapabilities, RecordingReporter, TestPool,
};

#[test]
fn test_resume_after_mismatch_finishes_remaining_files() {
    let pool = TestPool::new();
    for name in ["a", "b", "c", "d"] {
        pool.write(name, name.as_bytes());
    }

    let faulty = FaultyCapabilities::new("c", Fault::CorruptCopy);
    let mut context = RunContext::new(pool.config(true, 1)).unwrap();
    let result = Orchestrator::new(&faulty, &mut RecordingReporter::new())
        .run(&mut context, &pool.root());
    assert!(matches!(result, Err(Error::VerificationMismatch { .. })));
    assert_eq!(context.current_index(), 3);

    let counting = CountingCapabilities::new();
    let mut context = RunContext::new(pool.config(true, 1)).unwrap();
    let summary = Orchestrator::new(&counting, &mut RecordingReporter::new())
        .run(&mut context, &pool.root())
        .unwrap();

    assert_eq!(counting.copied(), vec![pool.path("c"), pool.path("d")]);
    assert_eq!(summary.skipped_pass_limit, 2);
    assert_eq!(summary.rebalanced, 2);

    let ledger = Ledger::open(pool.ledger_path()).unwrap();
    for name in ["a", "b", "c", "d"] {
        assert_eq!(ledger.get_count(&pool.path(name)), 1, "{name}");
        assert_eq!(pool.read(name), name.as_bytes());
    }
}

#[test]
fn test_interrupted_copy_is_reported_then_superseded() {
    let pool = TestPool::new();
    pool.write("a", b"complete original");
    // What a run killed during COPY leaves behind
    pool.write("a.balance", b"compl");

    let mut reporter = RecordingReporter::new();
    let mut context = RunContext::new(pool.config(true, 1)).unwrap();
    let summary = Orchestrator::new(&NativeCapabilities, &mut reporter)
        .run(&mut context, &pool.root())
        .unwrap();

    assert_eq!(summary.orphaned_temp_files, 1);
    assert_eq!(summary.rebalanced, 1);
    // `a` sorts first; its COPY overwrites the leftover and REPLACE consumes it
    assert_eq!(summary.skipped_missing, 1);
    assert_eq!(pool.read("a"), b"complete original");
    pool.assert_no_temp_files();
    assert_eq!(reporter.at(Severity::Warn).len(), 2);
}

#[test]
fn test_copy_left_after_delete_keeps_its_data() {
    let pool = TestPool::new();
    // What a run killed between DELETE and RENAME leaves behind
    pool.write("movie.mkv.balance", b"the only copy");
    pool.write("other", b"x");

    let mut reporter = RecordingReporter::new();
    let mut context = RunContext::new(pool.config(true, 1)).unwrap();
    let summary = Orchestrator::new(&NativeCapabilities, &mut reporter)
        .run(&mut context, &pool.root())
        .unwrap();

    assert_eq!(summary.file_count, 2);
    assert_eq!(summary.rebalanced, 2);
    assert_eq!(pool.read("movie.mkv.balance"), b"the only copy");
    assert!(!pool.path("movie.mkv").exists());
    assert!(!pool.path("movie.mkv.balance.balance").exists());

    assert!(reporter.at(Severity::Error).is_empty());
    let warnings = reporter.at(Severity::Warn);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("movie.mkv.balance has no original"));
}

#[test]
fn test_failed_copy_leaves_pool_unchanged() {
    let pool = TestPool::new();
    pool.write("a", b"alpha");

    let faulty = FaultyCapabilities::new("a", Fault::CopyFails);
    let mut context = RunContext::new(pool.config(true, 1)).unwrap();
    let result = Orchestrator::new(&faulty, &mut RecordingReporter::new())
        .run(&mut context, &pool.root());

    assert!(matches!(result, Err(Error::CopyFailed { .. })));
    assert_eq!(pool.read("a"), b"alpha");
    pool.assert_no_temp_files();
    assert!(pool.ledger_contents().is_none());
}
