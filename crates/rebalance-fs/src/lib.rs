//! Filesystem capabilities for the in-place pool rebalancer
//!
//! Provides file enumeration, metadata-preserving copies, fingerprints and
//! the atomic I/O the pass ledger is persisted with.

pub mod checksum;
#[cfg(unix)]
pub mod copy;
pub mod error;
pub mod fingerprint;
pub mod io;
pub mod platform;
pub mod walk;

pub use error::{Error, Result};
pub use fingerprint::Fingerprint;
pub use platform::{FileCapabilities, detect};
#[cfg(unix)]
pub use platform::NativeCapabilities;
pub use walk::enumerate_files;
