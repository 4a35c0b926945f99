//! Per-file rebalance protocol
//!
//! One attempt walks `CHECK_EXISTS -> CHECK_PASS_LIMIT -> COPY -> VERIFY ->
//! REPLACE -> RECORD`. The two checks may end the attempt with a skip; every
//! later failure is a fatal [`Error`]. The original is only removed after the
//! copy exists and, when enabled, has been verified.

use crate::config::RunConfig;
use crate::ledger::Ledger;
use crate::report::{Reporter, RunEvent, emit};
use crate::{Error, ReplaceStage, Result};
use rebalance_fs::FileCapabilities;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Suffix appended to a file's path to name its temporary copy.
pub const TEMP_SUFFIX: &str = ".balance";

/// Paths involved in one rebalance attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub temp_path: PathBuf,
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut temp = OsString::from(path.as_os_str());
        temp.push(TEMP_SUFFIX);
        Self {
            path,
            temp_path: PathBuf::from(temp),
        }
    }
}

/// Why a file was not rebalanced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The file disappeared after enumeration
    Missing,
    /// The ledger already holds `max_passes` or more passes
    PassLimitReached { count: u64, max_passes: u64 },
    /// The file has several names and hard links are being skipped
    HardLinked { links: u64 },
    /// Passes are tracked but the path contains a newline
    Unrecordable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "file no longer exists"),
            Self::PassLimitReached { count, max_passes } => {
                write!(f, "pass limit reached ({count}/{max_passes})")
            }
            Self::HardLinked { links } => write!(f, "file has {links} hard links"),
            Self::Unrecordable => write!(f, "name contains a newline; passes cannot be recorded"),
        }
    }
}

/// Result of one completed attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// The file was rewritten. `passes` is the new ledger count, or `None`
    /// when pass tracking is disabled.
    Rebalanced { passes: Option<u64> },
    Skipped(SkipReason),
}

/// Executes the rebalance protocol for single files
pub struct FileRebalancer<'a> {
    config: &'a RunConfig,
    capabilities: &'a dyn FileCapabilities,
}

impl<'a> FileRebalancer<'a> {
    pub fn new(config: &'a RunConfig, capabilities: &'a dyn FileCapabilities) -> Self {
        Self {
            config,
            capabilities,
        }
    }

    /// Rebalance `path`.
    ///
    /// `ledger` is consulted and updated only when the configuration tracks
    /// passes; pass `None` when it does not.
    ///
    /// # Errors
    ///
    /// Every error is fatal to the run. Errors before REPLACE leave the
    /// original untouched.
    pub fn rebalance(
        &self,
        path: &Path,
        ledger: Option<&mut Ledger>,
        reporter: &mut dyn Reporter,
    ) -> Result<FileOutcome> {
        let record = FileRecord::new(path);
        let ledger = ledger.filter(|_| self.config.tracks_passes());

        if let Some(reason) = self.check_exists(&record)? {
            return Ok(self.skip(&record, reason, reporter));
        }

        if let Some(ledger) = ledger.as_deref() {
            if !Ledger::is_recordable(&record.path) {
                return Ok(self.skip(&record, SkipReason::Unrecordable, reporter));
            }
            let count = ledger.get_count(&record.path);
            if count >= self.config.max_passes {
                let reason = SkipReason::PassLimitReached {
                    count,
                    max_passes: self.config.max_passes,
                };
                return Ok(self.skip(&record, reason, reporter));
            }
        }

        self.copy(&record, reporter)?;

        if self.config.checksum_enabled {
            self.verify(&record, reporter)?;
        }

        self.replace(&record, reporter)?;

        let passes = match ledger {
            Some(ledger) => {
                let count = ledger.increment(&record.path)?;
                emit(
                    reporter,
                    RunEvent::Recorded {
                        path: &record.path,
                        count,
                    },
                );
                Some(count)
            }
            None => None,
        };

        emit(reporter, RunEvent::Rebalanced { path: &record.path });
        Ok(FileOutcome::Rebalanced { passes })
    }

    fn check_exists(&self, record: &FileRecord) -> Result<Option<SkipReason>> {
        let metadata = match fs::symlink_metadata(&record.path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Some(SkipReason::Missing)),
            Err(source) => {
                return Err(Error::Inspect {
                    path: record.path.clone(),
                    source,
                });
            }
        };

        if self.config.skip_hardlinks {
            let links = link_count(&metadata);
            if links > 1 {
                return Ok(Some(SkipReason::HardLinked { links }));
            }
        }
        Ok(None)
    }

    fn skip(
        &self,
        record: &FileRecord,
        reason: SkipReason,
        reporter: &mut dyn Reporter,
    ) -> FileOutcome {
        emit(
            reporter,
            RunEvent::Skipped {
                path: &record.path,
                reason: &reason,
            },
        );
        FileOutcome::Skipped(reason)
    }

    fn copy(&self, record: &FileRecord, reporter: &mut dyn Reporter) -> Result<()> {
        emit(
            reporter,
            RunEvent::Copying {
                path: &record.path,
                temp_path: &record.temp_path,
            },
        );
        self.capabilities
            .copy_preserving_metadata(&record.path, &record.temp_path)
            .map_err(|source| {
                discard_temp(record);
                Error::CopyFailed {
                    path: record.path.clone(),
                    source,
                }
            })
    }

    fn verify(&self, record: &FileRecord, reporter: &mut dyn Reporter) -> Result<()> {
        emit(reporter, RunEvent::Verifying { path: &record.path });

        let fingerprint = |path: &Path| {
            self.capabilities
                .fingerprint(path)
                .map_err(|source| Error::FingerprintFailed {
                    path: path.to_path_buf(),
                    source,
                })
        };
        let original = fingerprint(&record.path)?;
        let copy = fingerprint(&record.temp_path)?;

        if original.to_string() != copy.to_string() {
            emit(reporter, RunEvent::VerificationMismatch { path: &record.path });
            discard_temp(record);
            return Err(Error::VerificationMismatch {
                path: record.path.clone(),
                original: Box::new(original),
                copy: Box::new(copy),
            });
        }
        tracing::debug!(path = %record.path.display(), fingerprint = %original, "Copy verified");
        Ok(())
    }

    fn replace(&self, record: &FileRecord, reporter: &mut dyn Reporter) -> Result<()> {
        emit(reporter, RunEvent::Replacing { path: &record.path });

        fs::remove_file(&record.path).map_err(|source| Error::ReplaceFailed {
            path: record.path.clone(),
            temp_path: record.temp_path.clone(),
            stage: ReplaceStage::DeleteOriginal,
            source,
        })?;
        fs::rename(&record.temp_path, &record.path).map_err(|source| Error::ReplaceFailed {
            path: record.path.clone(),
            temp_path: record.temp_path.clone(),
            stage: ReplaceStage::RenameCopy,
            source,
        })
    }
}

/// Remove a temporary copy that will not be used. Failure only warrants a
/// warning: the original is still intact.
fn discard_temp(record: &FileRecord) {
    match fs::remove_file(&record.temp_path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %record.temp_path.display(),
            error = %e,
            "Could not remove unused temporary copy"
        ),
    }
}

#[cfg(unix)]
fn link_count(metadata: &fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.nlink()
}

#[cfg(not(unix))]
fn link_count(_metadata: &fs::Metadata) -> u64 {
    1
}
