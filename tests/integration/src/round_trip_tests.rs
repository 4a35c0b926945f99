//! End-to-end round trips over a whole pool
//!
//! A completed run must leave every file with the content and metadata it
//! had before: only block placement may change.
#![cfg(unix)]

use pretty_assertions::assert_eq;
use rebalance_core::{Ledger, Orchestrator, RunContext};
use rebalance_fs::{FileCapabilities, Fingerprint, NativeCapabilities};
use rebalance_test_utils::{RecordingReporter, TestPool};
use rstest::rstest;
use std::collections::BTreeMap;
use std::fs::{self, FileTimes};
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// Fingerprint of every regular file in the pool, keyed by path.
fn snapshot(pool: &TestPool) -> BTreeMap<PathBuf, String> {
    NativeCapabilities
        .enumerate_files(&pool.root())
        .unwrap()
        .into_iter()
        .map(|path| {
            let fingerprint = Fingerprint::capture(&path).unwrap();
            (path, fingerprint.to_string())
        })
        .collect()
}

fn populate(pool: &TestPool) {
    pool.write("docs/readme.txt", b"read me");
    pool.write("docs/nested/deep/notes.md", b"# notes\n");
    pool.write("media/clip.bin", &vec![0xA5; 3 * 1024 * 1024 + 17]);
    pool.write("empty", b"");

    let script = pool.write("bin/run.sh", b"#!/bin/sh\necho hi\n");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o750)).unwrap();
    let secret = pool.write("secret.key", b"hunter2");
    fs::set_permissions(&secret, fs::Permissions::from_mode(0o600)).unwrap();

    let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_500_000_000);
    fs::File::options()
        .write(true)
        .open(pool.path("docs/readme.txt"))
        .unwrap()
        .set_times(FileTimes::new().set_accessed(old).set_modified(old))
        .unwrap();
}

#[rstest]
#[case::verified(true)]
#[case::unverified(false)]
fn test_full_run_preserves_content_and_metadata(#[case] checksum: bool) {
    let pool = TestPool::new();
    populate(&pool);
    let before = snapshot(&pool);

    let mut context = RunContext::new(pool.config(checksum, 1)).unwrap();
    let mut reporter = RecordingReporter::new();
    let summary = Orchestrator::new(&NativeCapabilities, &mut reporter)
        .run(&mut context, &pool.root())
        .unwrap();

    assert_eq!(summary.rebalanced, before.len());
    assert_eq!(snapshot(&pool), before);
    pool.assert_no_temp_files();
    assert_eq!(
        fs::metadata(pool.path("bin/run.sh")).unwrap().mode() & 0o7777,
        0o750
    );
}

#[test]
fn test_rebalanced_file_gets_a_new_inode() {
    let pool = TestPool::new();
    let path = pool.write("data.bin", b"payload");
    let inode_before = fs::metadata(&path).unwrap().ino();

    let mut context = RunContext::new(pool.config(true, 1)).unwrap();
    Orchestrator::new(&NativeCapabilities, &mut RecordingReporter::new())
        .run(&mut context, &pool.root())
        .unwrap();

    assert_ne!(fs::metadata(&path).unwrap().ino(), inode_before);
    assert_eq!(pool.read("data.bin"), b"payload");
}

#[test]
fn test_symlinks_are_not_followed() {
    let pool = TestPool::new();
    pool.write("target.txt", b"target");
    std::os::unix::fs::symlink("target.txt", pool.path("link")).unwrap();

    let mut context = RunContext::new(pool.config(true, 1)).unwrap();
    let summary = Orchestrator::new(&NativeCapabilities, &mut RecordingReporter::new())
        .run(&mut context, &pool.root())
        .unwrap();

    assert_eq!(summary.file_count, 1);
    let link_meta = fs::symlink_metadata(pool.path("link")).unwrap();
    assert!(link_meta.file_type().is_symlink());
    assert_eq!(
        fs::read_link(pool.path("link")).unwrap(),
        PathBuf::from("target.txt")
    );
}

#[test]
fn test_single_file_root() {
    let pool = TestPool::new();
    let path = pool.write("only.bin", b"one");
    pool.write("other.bin", b"two");

    let mut context = RunContext::new(pool.config(true, 1)).unwrap();
    let summary = Orchestrator::new(&NativeCapabilities, &mut RecordingReporter::new())
        .run(&mut context, &path)
        .unwrap();

    assert_eq!(summary.rebalanced, 1);
    let ledger = Ledger::open(pool.ledger_path()).unwrap();
    assert_eq!(ledger.get_count(&path), 1);
    assert_eq!(ledger.get_count(&pool.path("other.bin")), 0);
}

#[test]
fn test_hard_links_keep_sharing_an_inode_when_skipped() {
    let pool = TestPool::new();
    let first = pool.write("first", b"shared");
    fs::hard_link(&first, pool.path("second")).unwrap();
    pool.write("single", b"alone");

    let mut config = pool.config(true, 1);
    config.skip_hardlinks = true;
    let mut context = RunContext::new(config).unwrap();
    let summary = Orchestrator::new(&NativeCapabilities, &mut RecordingReporter::new())
        .run(&mut context, &pool.root())
        .unwrap();

    assert_eq!(summary.rebalanced, 1);
    assert_eq!(summary.skipped_hardlinked, 2);
    assert_eq!(
        fs::metadata(&first).unwrap().ino(),
        fs::metadata(pool.path("second")).unwrap().ino()
    );
    let ledger = Ledger::open(pool.ledger_path()).unwrap();
    assert_eq!(ledger.len(), 1);
}
