//! Status reporting
//!
//! The orchestrator and the file rebalancer describe what they do as
//! [`RunEvent`]s. Each event is logged through `tracing` and handed to a
//! [`Reporter`], which owns presentation. Reporting never affects control
//! flow.

use crate::orchestrator::{Progress, RunSummary};
use crate::rebalancer::SkipReason;
use chrono::{DateTime, Local};
use std::fmt;
use std::path::Path;

/// How prominently an event should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// Something that happened during a run
#[derive(Debug, Clone, Copy)]
pub enum RunEvent<'a> {
    Started {
        root: &'a Path,
        file_count: usize,
        at: DateTime<Local>,
    },
    /// A file named like a leftover temporary copy from an interrupted run
    OrphanedTempFile {
        temp_path: &'a Path,
        original_exists: bool,
    },
    Progress {
        progress: Progress,
        path: &'a Path,
    },
    Skipped {
        path: &'a Path,
        reason: &'a SkipReason,
    },
    Copying {
        path: &'a Path,
        temp_path: &'a Path,
    },
    Verifying {
        path: &'a Path,
    },
    VerificationMismatch {
        path: &'a Path,
    },
    Replacing {
        path: &'a Path,
    },
    Recorded {
        path: &'a Path,
        count: u64,
    },
    Rebalanced {
        path: &'a Path,
    },
    Aborted {
        path: &'a Path,
    },
    Finished {
        summary: &'a RunSummary,
    },
}

impl RunEvent<'_> {
    pub fn severity(&self) -> Severity {
        match self {
            Self::VerificationMismatch { .. } | Self::Aborted { .. } => Severity::Error,
            Self::OrphanedTempFile { .. } | Self::Skipped { .. } => Severity::Warn,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for RunEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started {
                root,
                file_count,
                at,
            } => write!(
                f,
                "Start rebalancing {} at {}: {} files",
                root.display(),
                at.format("%Y-%m-%d %H:%M:%S"),
                file_count
            ),
            Self::OrphanedTempFile {
                temp_path,
                original_exists: true,
            } => write!(
                f,
                "Possible leftover temporary copy {}; it is replaced if its original is rebalanced",
                temp_path.display()
            ),
            Self::OrphanedTempFile {
                temp_path,
                original_exists: false,
            } => write!(
                f,
                "Possible leftover temporary copy {} has no original and may hold the only copy of its data",
                temp_path.display()
            ),
            Self::Progress { progress, path } => {
                write!(f, "Progress {}: {}", progress, path.display())
            }
            Self::Skipped { path, reason } => {
                write!(f, "Skipping {}: {}", path.display(), reason)
            }
            Self::Copying { path, temp_path } => write!(
                f,
                "Copying {} to {}",
                path.display(),
                temp_path.display()
            ),
            Self::Verifying { path } => {
                write!(f, "Comparing fingerprints of {} and its copy", path.display())
            }
            Self::VerificationMismatch { path } => write!(
                f,
                "Fingerprint mismatch for {}; original left untouched",
                path.display()
            ),
            Self::Replacing { path } => {
                write!(f, "Replacing {} with its copy", path.display())
            }
            Self::Recorded { path, count } => {
                write!(f, "Recorded pass {} for {}", count, path.display())
            }
            Self::Rebalanced { path } => write!(f, "Rebalanced {}", path.display()),
            Self::Aborted { path } => write!(f, "Aborting run at {}", path.display()),
            Self::Finished { summary } => write!(
                f,
                "Done: {} rebalanced, {} skipped",
                summary.rebalanced,
                summary.skipped()
            ),
        }
    }
}

/// Presentation of run events
pub trait Reporter {
    fn report(&mut self, event: &RunEvent<'_>);
}

/// Reporter that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&mut self, _event: &RunEvent<'_>) {}
}

/// Log `event` and pass it to `reporter`.
pub(crate) fn emit(reporter: &mut dyn Reporter, event: RunEvent<'_>) {
    match event.severity() {
        Severity::Info => tracing::debug!("{event}"),
        Severity::Warn => tracing::warn!("{event}"),
        Severity::Error => tracing::error!("{event}"),
    }
    reporter.report(&event);
}
