//! Pass ledger
//!
//! The ledger records how many completed rebalance passes each file has
//! had. It is persisted as a flat text store of two-line records (`path`,
//! then `count`) so an interrupted run can resume and files already at the
//! pass limit are skipped.
//!
//! The store is read once when the ledger is opened and is written on every
//! [`Ledger::increment`]. It is not coordinated between processes: two runs
//! sharing a store will lose each other's updates.

mod entry;

pub use entry::LedgerEntry;

use crate::{Error, Result};
use rebalance_fs::io;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Persistent mapping from file path to completed pass count
#[derive(Debug)]
pub struct Ledger {
    /// Location of the backing store
    store: PathBuf,
    /// Entries in store order; duplicates from hand edits are kept
    entries: Vec<LedgerEntry>,
    /// Path to the position of its first entry
    index: HashMap<PathBuf, usize>,
    /// The store exists but its last record is not newline-terminated
    needs_separator: bool,
}

impl Ledger {
    /// Open the ledger persisted at `store`.
    ///
    /// A missing store is an empty ledger; the file is only created by the
    /// first [`increment`](Self::increment).
    ///
    /// # Errors
    ///
    /// Returns an error if the store exists but cannot be read or parsed.
    pub fn open(store: impl Into<PathBuf>) -> Result<Self> {
        let store = store.into();
        let content = io::read_if_exists(&store).map_err(|source| Error::LedgerIo {
            path: store.clone(),
            source,
        })?;

        let (entries, needs_separator) = match content {
            Some(content) => (
                entry::parse_records(&store, &content)?,
                content.last().is_some_and(|&b| b != b'\n'),
            ),
            None => (Vec::new(), false),
        };

        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            index.entry(entry.path.clone()).or_insert(position);
        }

        tracing::debug!(
            store = %store.display(),
            entries = entries.len(),
            "Opened pass ledger"
        );

        Ok(Self {
            store,
            entries,
            index,
            needs_separator,
        })
    }

    /// Location of the backing store
    pub fn store_path(&self) -> &Path {
        &self.store
    }

    /// All entries in store order
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Completed passes recorded for `path`, or 0 if it has no entry.
    pub fn get_count(&self, path: &Path) -> u64 {
        self.index
            .get(path)
            .map_or(0, |&position| self.entries[position].count)
    }

    /// Whether `path` can be stored. Only a path containing a newline
    /// cannot, since the store keeps one path per line.
    pub fn is_recordable(path: &Path) -> bool {
        entry::is_recordable(path)
    }

    /// Record one more completed pass for `path` and persist it.
    ///
    /// New paths are appended to the store; an existing path's count is
    /// rewritten by replacing the store atomically. The in-memory state only
    /// changes once the store write succeeded.
    ///
    /// Returns the new count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnrecordablePath`] for a path containing a newline,
    /// and [`Error::LedgerIo`] if the store cannot be written.
    pub fn increment(&mut self, path: &Path) -> Result<u64> {
        if !entry::is_recordable(path) {
            return Err(Error::UnrecordablePath {
                path: path.to_path_buf(),
            });
        }

        match self.index.get(path).copied() {
            Some(position) => {
                let count = self.entries[position].count + 1;
                let mut content = Vec::new();
                for (i, entry) in self.entries.iter().enumerate() {
                    if i == position {
                        LedgerEntry::new(entry.path.as_path(), count).write_record(&mut content);
                    } else {
                        entry.write_record(&mut content);
                    }
                }
                io::write_atomic(&self.store, &content).map_err(|source| {
                    Error::LedgerIo {
                        path: self.store.clone(),
                        source,
                    }
                })?;

                self.entries[position].count = count;
                self.needs_separator = false;
                Ok(count)
            }
            None => {
                let entry = LedgerEntry::new(path, 1);
                let mut record = Vec::new();
                if self.needs_separator {
                    record.push(b'\n');
                }
                entry.write_record(&mut record);
                io::append_synced(&self.store, &record).map_err(|source| {
                    Error::LedgerIo {
                        path: self.store.clone(),
                        source,
                    }
                })?;

                self.index.insert(entry.path.clone(), self.entries.len());
                self.entries.push(entry);
                self.needs_separator = false;
                Ok(1)
            }
        }
    }
}
