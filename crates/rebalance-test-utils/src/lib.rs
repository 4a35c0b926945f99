//! Shared test utilities for the rebalance workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`pool`]: [`TestPool`] builder for a temporary pool root plus ledger
//! - [`capabilities`]: fault-injecting and call-counting [`rebalance_fs::FileCapabilities`]
//! - [`reporter`]: [`RecordingReporter`] that keeps every run event

pub mod capabilities;
pub mod pool;
pub mod reporter;

pub use capabilities::{CountingCapabilities, Fault, FaultyCapabilities};
pub use pool::TestPool;
pub use reporter::{RecordedEvent, RecordingReporter};
