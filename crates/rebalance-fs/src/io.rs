//! Atomic and append-only I/O with file locking
//!
//! The ledger store is written through these helpers: appends for new
//! records, whole-file atomic replacement when an existing record changes.

use crate::{Error, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

/// Replace `path` with `content` in one step.
///
/// The content is written and synced to a sibling `.<name>.<pid>.tmp` under
/// an exclusive lock, then renamed over `path`, so readers see either the
/// old store or the new one. A failed write removes the temporary file.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // Same directory keeps the rename on one filesystem
    let temp_path = path.with_file_name(format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    ));

    if let Err(e) = write_synced(&temp_path, path, content) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        Error::io(path, e)
    })?;

    // Persist the rename itself
    #[cfg(unix)]
    {
        if let Ok(dir) = File::open(parent.unwrap_or(Path::new("."))) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}

fn write_synced(temp_path: &Path, target: &Path, content: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)
        .map_err(|e| Error::io(temp_path, e))?;

    file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: target.to_path_buf(),
    })?;
    file.write_all(content).map_err(|e| Error::io(temp_path, e))?;
    file.sync_all().map_err(|e| Error::io(temp_path, e))?;
    file.unlock().map_err(|_| Error::LockFailed {
        path: target.to_path_buf(),
    })
}

/// Append content to a file under an exclusive lock and flush it to disk.
///
/// The file is created if it does not exist yet.
pub fn append_synced(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;

    file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;

    file.write_all(content).map_err(|e| Error::io(path, e))?;
    file.sync_data().map_err(|e| Error::io(path, e))?;

    file.unlock().map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;

    Ok(())
}

/// Read a file's bytes, returning `None` if it does not exist.
///
/// Holds a shared lock while reading.
pub fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io(path, e)),
    };
    file.lock_shared().map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;

    let mut content = Vec::new();
    (&file)
        .read_to_end(&mut content)
        .map_err(|e| Error::io(path, e))?;

    Ok(Some(content))
}
