//! [`TestPool`] builder for rebalance test scenarios.

use rebalance_core::RunConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory holding a pool root (`pool/`) and, beside it, the
/// ledger store (`rebalance_db.txt`), so the ledger is never enumerated as
/// part of the pool.
///
/// # Example
///
/// ```rust,no_run
/// use rebalance_test_utils::TestPool;
///
/// let pool = TestPool::new();
/// pool.write("a.bin", b"alpha");
/// let config = pool.config(true, 1);
/// ```
pub struct TestPool {
    temp_dir: TempDir,
}

impl Default for TestPool {
    fn default() -> Self {
        Self::new()
    }
}

impl TestPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("pool")).unwrap();
        Self { temp_dir }
    }

    /// Create a pool holding `count` files named `file-<n>.bin`.
    pub fn with_files(count: usize) -> Self {
        let pool = Self::new();
        for n in 0..count {
            pool.write(&format!("file-{n}.bin"), format!("content of file {n}").as_bytes());
        }
        pool
    }

    /// Root directory to rebalance.
    pub fn root(&self) -> PathBuf {
        self.temp_dir.path().join("pool")
    }

    /// Location of the ledger store.
    pub fn ledger_path(&self) -> PathBuf {
        self.temp_dir.path().join("rebalance_db.txt")
    }

    /// Absolute path of `relative` inside the pool.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Write a file inside the pool, creating parent directories.
    pub fn write(&self, relative: &str, content: &[u8]) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Read a file inside the pool.
    pub fn read(&self, relative: &str) -> Vec<u8> {
        fs::read(self.path(relative))
            .unwrap_or_else(|e| panic!("TestPool::read: {relative}: {e}"))
    }

    /// Run configuration pointing at this pool's ledger.
    pub fn config(&self, checksum_enabled: bool, max_passes: u64) -> RunConfig {
        RunConfig {
            checksum_enabled,
            max_passes,
            skip_hardlinks: false,
            ledger_path: self.ledger_path(),
        }
    }

    /// Raw ledger store contents, or `None` if it was never written.
    pub fn ledger_contents(&self) -> Option<String> {
        fs::read_to_string(self.ledger_path()).ok()
    }

    /// Assert that `relative` exists inside the pool.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, relative: &str) {
        let full_path = self.path(relative);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that no `*.balance` temporary copy remains anywhere in the pool.
    pub fn assert_no_temp_files(&self) {
        let leftovers = collect_temp_files(&self.root());
        assert!(
            leftovers.is_empty(),
            "Expected no temporary copies, found: {leftovers:?}"
        );
    }
}

fn collect_temp_files(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            found.extend(collect_temp_files(&path));
        } else if path.to_string_lossy().ends_with(".balance") {
            found.push(path);
        }
    }
    found
}
