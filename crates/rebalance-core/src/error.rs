//! Error types for rebalance-core
//!
//! Every variant is fatal to a run. Files that are skipped are reported as
//! [`crate::FileOutcome::Skipped`], never as errors.

use rebalance_fs::Fingerprint;
use std::fmt;
use std::path::PathBuf;

/// Result type for rebalance-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Which half of the replace step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceStage {
    /// Removing the original file
    DeleteOriginal,
    /// Renaming the temporary copy over the original path
    RenameCopy,
}

impl fmt::Display for ReplaceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteOriginal => write!(f, "deleting the original"),
            Self::RenameCopy => write!(f, "renaming the temporary copy"),
        }
    }
}

/// Errors that abort a rebalance run
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Creating the temporary copy failed
    #[error("Copy failed for {path}: {source}")]
    CopyFailed {
        path: PathBuf,
        #[source]
        source: rebalance_fs::Error,
    },

    /// Fingerprinting the original or the copy failed
    #[error("Fingerprint failed for {path}: {source}")]
    FingerprintFailed {
        path: PathBuf,
        #[source]
        source: rebalance_fs::Error,
    },

    /// Original and copy fingerprints differ; the original was not touched
    #[error(
        "Verification failed for {path}: original [{original}] does not match copy [{copy}]"
    )]
    VerificationMismatch {
        path: PathBuf,
        original: Box<Fingerprint>,
        copy: Box<Fingerprint>,
    },

    /// Delete or rename failed; the file may exist only as its temporary copy
    #[error(
        "Replace failed while {stage} of {path}: {source}. Manual intervention required, the data may only exist at {temp_path}"
    )]
    ReplaceFailed {
        path: PathBuf,
        temp_path: PathBuf,
        stage: ReplaceStage,
        #[source]
        source: std::io::Error,
    },

    /// The ledger store could not be read or written
    #[error("Ledger I/O failed for {path}: {source}")]
    LedgerIo {
        path: PathBuf,
        #[source]
        source: rebalance_fs::Error,
    },

    /// The ledger store is not a sequence of path/count line pairs
    #[error("Corrupt ledger {path} at line {line}: {message}")]
    LedgerCorrupt {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// The path contains a newline and cannot be stored in the ledger
    #[error("Path cannot be recorded in the ledger (contains a newline): {path}")]
    UnrecordablePath { path: PathBuf },

    /// Checking a file before processing failed for a reason other than absence
    #[error("Cannot inspect {path}: {source}")]
    Inspect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem error from rebalance-fs (enumeration, platform selection)
    #[error(transparent)]
    Fs(#[from] rebalance_fs::Error),
}
