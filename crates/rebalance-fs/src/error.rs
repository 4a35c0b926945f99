//! Error types for rebalance-fs

use std::path::PathBuf;

/// Result type for rebalance-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in rebalance-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Root path not found: {path}")]
    RootNotFound { path: PathBuf },

    #[error("Unsupported file type at {path}: only regular files and symlinks can be copied")]
    UnsupportedFileType { path: PathBuf },

    #[error("Copy of {src} would cross a filesystem boundary into {dest}")]
    CrossDevice { src: PathBuf, dest: PathBuf },

    #[error("Path contains an interior NUL byte: {path}")]
    InvalidPath { path: PathBuf },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },

    #[error("Unsupported platform: {os}")]
    UnsupportedPlatform { os: &'static str },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
