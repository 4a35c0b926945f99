//! In-place rebalancing for pooled filesystems
//!
//! Rewriting a file makes the filesystem allocate fresh blocks for it, and a
//! pool's allocator spreads new blocks over all member devices. This crate
//! rewrites every file under a root that way:
//!
//! - **Ledger**: persisted pass count per path, so runs can resume and stop
//!   after a configured number of passes
//! - **FileRebalancer**: copy, verify, replace and record one file
//! - **Orchestrator**: enumerate the pool and drive the rebalancer in order,
//!   reporting progress and stopping at the first fatal error
//!
//! # Architecture
//!
//! ```text
//!              rebalance-cli
//!                    |
//!             rebalance-core
//!     Orchestrator -> FileRebalancer -> Ledger
//!                    |
//!              rebalance-fs
//!   (enumerate, copy, fingerprint, atomic I/O)
//! ```
//!
//! Runs are single-threaded and process one file at a time. Two runs must
//! not target the same pool or share a ledger concurrently: the ledger store
//! is read once and rewritten without coordination.

pub mod config;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod rebalancer;
pub mod report;

pub use config::{DEFAULT_LEDGER_FILE, RunConfig, parse_flag};
pub use error::{Error, ReplaceStage, Result};
pub use ledger::{Ledger, LedgerEntry};
pub use orchestrator::{
    OrphanedTempFile, Orchestrator, Progress, RunContext, RunSummary, find_orphans,
};
pub use rebalancer::{FileOutcome, FileRebalancer, FileRecord, SkipReason, TEMP_SUFFIX};
pub use report::{NullReporter, Reporter, RunEvent, Severity};
