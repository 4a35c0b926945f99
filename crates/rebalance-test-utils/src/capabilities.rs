//! Test doubles for [`FileCapabilities`].
//!
//! Both wrap [`NativeCapabilities`] so the real copy and fingerprint code
//! still runs; they only add bookkeeping or a single injected fault.

use rebalance_fs::{Error, FileCapabilities, Fingerprint, NativeCapabilities, Result};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

/// Counts copy and fingerprint calls.
#[derive(Debug, Default)]
pub struct CountingCapabilities {
    copies: Cell<usize>,
    fingerprints: Cell<usize>,
    copied: RefCell<Vec<PathBuf>>,
}

impl CountingCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn copies(&self) -> usize {
        self.copies.get()
    }

    pub fn fingerprints(&self) -> usize {
        self.fingerprints.get()
    }

    /// Sources passed to `copy_preserving_metadata`, in call order.
    pub fn copied(&self) -> Vec<PathBuf> {
        self.copied.borrow().clone()
    }
}

impl FileCapabilities for CountingCapabilities {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn copy_preserving_metadata(&self, src: &Path, dest: &Path) -> Result<()> {
        self.copies.set(self.copies.get() + 1);
        self.copied.borrow_mut().push(src.to_path_buf());
        NativeCapabilities.copy_preserving_metadata(src, dest)
    }

    fn fingerprint(&self, path: &Path) -> Result<Fingerprint> {
        self.fingerprints.set(self.fingerprints.get() + 1);
        NativeCapabilities.fingerprint(path)
    }
}

/// Fault to inject into one file's processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The copy step fails outright
    CopyFails,
    /// The copy succeeds but its content is altered afterwards
    CorruptCopy,
    /// Fingerprinting the copy reports a different owner
    FingerprintDrift,
    /// The copy succeeds, then the source's directory is made read-only so
    /// the original cannot be deleted
    ReadOnlyParent,
}

/// Injects `fault` when processing files whose name equals `target`.
#[derive(Debug)]
pub struct FaultyCapabilities {
    target: String,
    fault: Fault,
}

impl FaultyCapabilities {
    pub fn new(target: impl Into<String>, fault: Fault) -> Self {
        Self {
            target: target.into(),
            fault,
        }
    }

    fn is_target(&self, path: &Path) -> bool {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        match name {
            Some(name) => {
                name == self.target || name.strip_suffix(".balance") == Some(self.target.as_str())
            }
            None => false,
        }
    }
}

impl FileCapabilities for FaultyCapabilities {
    fn name(&self) -> &'static str {
        "faulty"
    }

    fn copy_preserving_metadata(&self, src: &Path, dest: &Path) -> Result<()> {
        if self.is_target(src) {
            match self.fault {
                Fault::CopyFails => {
                    return Err(Error::io(
                        dest,
                        std::io::Error::new(std::io::ErrorKind::Other, "injected copy failure"),
                    ));
                }
                Fault::CorruptCopy => {
                    NativeCapabilities.copy_preserving_metadata(src, dest)?;
                    let mut content = std::fs::read(dest).map_err(|e| Error::io(dest, e))?;
                    match content.first_mut() {
                        Some(byte) => *byte ^= 0xff,
                        None => content.push(0),
                    }
                    let modified = std::fs::metadata(src)
                        .and_then(|m| m.modified())
                        .map_err(|e| Error::io(src, e))?;
                    std::fs::write(dest, &content).map_err(|e| Error::io(dest, e))?;
                    std::fs::File::options()
                        .write(true)
                        .open(dest)
                        .and_then(|f| f.set_modified(modified))
                        .map_err(|e| Error::io(dest, e))?;
                    return Ok(());
                }
                Fault::ReadOnlyParent => {
                    NativeCapabilities.copy_preserving_metadata(src, dest)?;
                    let parent = src.parent().unwrap_or(Path::new("."));
                    let mut permissions = std::fs::metadata(parent)
                        .map_err(|e| Error::io(parent, e))?
                        .permissions();
                    permissions.set_readonly(true);
                    std::fs::set_permissions(parent, permissions)
                        .map_err(|e| Error::io(parent, e))?;
                    return Ok(());
                }
                Fault::FingerprintDrift => {}
            }
        }
        NativeCapabilities.copy_preserving_metadata(src, dest)
    }

    fn fingerprint(&self, path: &Path) -> Result<Fingerprint> {
        let mut fingerprint = NativeCapabilities.fingerprint(path)?;
        let is_copy = path.to_string_lossy().ends_with(".balance");
        if self.fault == Fault::FingerprintDrift && is_copy && self.is_target(path) {
            fingerprint.uid = fingerprint.uid.wrapping_add(1);
        }
        Ok(fingerprint)
    }
}
