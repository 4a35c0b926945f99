//! Run orchestration
//!
//! Enumerates the pool, reports names that look like leftover temporary
//! copies, then drives the [`FileRebalancer`] over every file in order. The first fatal error stops
//! the run; nothing after it is processed.

use crate::config::RunConfig;
use crate::ledger::Ledger;
use crate::rebalancer::{FileOutcome, FileRebalancer, SkipReason, TEMP_SUFFIX};
use crate::report::{Reporter, RunEvent, emit};
use crate::Result;
use rebalance_fs::FileCapabilities;
use serde::Serialize;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Position of the run within the file list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(current: usize, total: usize) -> Self {
        Self { current, total }
    }

    /// `current * 100 / total`; 0 for an empty run.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.current as f64 * 100.0 / self.total as f64
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.percent())
    }
}

/// Counts for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Files returned by enumeration
    pub file_count: usize,
    pub rebalanced: usize,
    pub skipped_missing: usize,
    pub skipped_pass_limit: usize,
    pub skipped_hardlinked: usize,
    pub skipped_unrecordable: usize,
    /// Files named like a leftover temporary copy
    pub orphaned_temp_files: usize,
}

impl RunSummary {
    pub fn skipped(&self) -> usize {
        self.skipped_missing
            + self.skipped_pass_limit
            + self.skipped_hardlinked
            + self.skipped_unrecordable
    }

    fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Rebalanced { .. } => self.rebalanced += 1,
            FileOutcome::Skipped(SkipReason::Missing) => self.skipped_missing += 1,
            FileOutcome::Skipped(SkipReason::PassLimitReached { .. }) => {
                self.skipped_pass_limit += 1
            }
            FileOutcome::Skipped(SkipReason::HardLinked { .. }) => self.skipped_hardlinked += 1,
            FileOutcome::Skipped(SkipReason::Unrecordable) => self.skipped_unrecordable += 1,
        }
    }
}

/// State of one run: configuration, counters and the ledger
#[derive(Debug)]
pub struct RunContext {
    config: RunConfig,
    /// Opened only when the run tracks passes
    ledger: Option<Ledger>,
    current_index: usize,
    file_count: usize,
}

impl RunContext {
    /// Build the context for `config`, opening its ledger if passes are
    /// tracked.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger store exists but cannot be read.
    pub fn new(config: RunConfig) -> Result<Self> {
        let ledger = if config.tracks_passes() {
            Some(Ledger::open(&config.ledger_path)?)
        } else {
            tracing::debug!("Pass tracking disabled; ledger not opened");
            None
        };
        Ok(Self {
            config,
            ledger,
            current_index: 0,
            file_count: 0,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn ledger(&self) -> Option<&Ledger> {
        self.ledger.as_ref()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }

    pub fn progress(&self) -> Progress {
        Progress::new(self.current_index, self.file_count)
    }
}

/// Drives a whole run over a pool root
pub struct Orchestrator<'a> {
    capabilities: &'a dyn FileCapabilities,
    reporter: &'a mut dyn Reporter,
}

impl<'a> Orchestrator<'a> {
    pub fn new(capabilities: &'a dyn FileCapabilities, reporter: &'a mut dyn Reporter) -> Self {
        Self {
            capabilities,
            reporter,
        }
    }

    /// Rebalance every regular file under `root`.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; files after it are not processed.
    pub fn run(&mut self, context: &mut RunContext, root: &Path) -> Result<RunSummary> {
        let files = self.capabilities.enumerate_files(root)?;
        let orphans = find_orphans(&files);

        context.current_index = 0;
        context.file_count = files.len();
        let mut summary = RunSummary {
            file_count: files.len(),
            orphaned_temp_files: orphans.len(),
            ..RunSummary::default()
        };

        tracing::info!(
            root = %root.display(),
            files = files.len(),
            checksum = context.config.checksum_enabled,
            passes = context.config.max_passes,
            "Starting rebalance run"
        );
        emit(
            self.reporter,
            RunEvent::Started {
                root,
                file_count: files.len(),
                at: chrono::Local::now(),
            },
        );

        for orphan in &orphans {
            emit(
                self.reporter,
                RunEvent::OrphanedTempFile {
                    temp_path: &orphan.temp_path,
                    original_exists: orphan.original.exists(),
                },
            );
        }

        let rebalancer = FileRebalancer::new(&context.config, self.capabilities);
        for path in &files {
            context.current_index += 1;
            emit(
                self.reporter,
                RunEvent::Progress {
                    progress: Progress::new(context.current_index, context.file_count),
                    path,
                },
            );

            match rebalancer.rebalance(path, context.ledger.as_mut(), self.reporter) {
                Ok(outcome) => summary.record(&outcome),
                Err(e) => {
                    emit(self.reporter, RunEvent::Aborted { path });
                    return Err(e);
                }
            }
        }

        tracing::info!(
            rebalanced = summary.rebalanced,
            skipped = summary.skipped(),
            "Rebalance run finished"
        );
        emit(self.reporter, RunEvent::Finished { summary: &summary });
        Ok(summary)
    }
}

/// A `<name>.balance` file left behind by an interrupted run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanedTempFile {
    pub temp_path: PathBuf,
    /// The path the temporary copy was made from
    pub original: PathBuf,
}

/// Files among `files` whose name ends in the temporary suffix.
///
/// These are only reported. They stay in the work list: when the original
/// exists it sorts first and its COPY replaces the leftover, which is then
/// skipped as missing; otherwise the file is rebalanced like any other.
pub fn find_orphans(files: &[PathBuf]) -> Vec<OrphanedTempFile> {
    files
        .iter()
        .filter_map(|path| {
            original_of(path).map(|original| OrphanedTempFile {
                temp_path: path.clone(),
                original,
            })
        })
        .collect()
}

fn original_of(temp_path: &Path) -> Option<PathBuf> {
    let name = temp_path.file_name()?.to_str()?;
    let stem = name.strip_suffix(TEMP_SUFFIX)?;
    if stem.is_empty() {
        return None;
    }
    Some(temp_path.with_file_name(OsString::from(stem)))
}
