//! Run configuration

use serde::Serialize;
use std::path::PathBuf;

/// File name of the pass ledger, relative to the working directory.
pub const DEFAULT_LEDGER_FILE: &str = "rebalance_db.txt";

/// Settings for one rebalance run. Built once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    /// Compare fingerprints of original and copy before replacing.
    pub checksum_enabled: bool,
    /// Passes after which a file is skipped. `0` disables pass tracking.
    pub max_passes: u64,
    /// Skip files with more than one hard link.
    pub skip_hardlinks: bool,
    /// Location of the pass ledger store.
    pub ledger_path: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            checksum_enabled: true,
            max_passes: 1,
            skip_hardlinks: false,
            ledger_path: PathBuf::from(DEFAULT_LEDGER_FILE),
        }
    }
}

impl RunConfig {
    /// Whether the ledger is consulted and updated during this run.
    pub fn tracks_passes(&self) -> bool {
        self.max_passes >= 1
    }
}

/// Interpret a boolean command-line value.
///
/// `1`, `on`, `true` and `yes` (any case) are true; everything else is false.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "on" | "true" | "yes"
    )
}
