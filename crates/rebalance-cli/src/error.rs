//! Error types for rebalance-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that end the process with a non-zero exit code
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from rebalance-core
    #[error(transparent)]
    Core(#[from] rebalance_core::Error),

    /// Error from rebalance-fs
    #[error(transparent)]
    Fs(#[from] rebalance_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Summary serialization failed
    #[error("Failed to serialize run summary: {0}")]
    Json(#[from] serde_json::Error),
}
