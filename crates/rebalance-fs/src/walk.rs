//! Regular-file enumeration under a pool root

use crate::{Error, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// List every regular file under `root`.
///
/// Symlinks are not followed and the walk never leaves the filesystem that
/// holds `root`. Entries are visited in file-name order so repeated runs see
/// the same sequence. Unreadable entries are logged and skipped; a missing
/// root is an error. If `root` is itself a regular file it is the only entry.
pub fn enumerate_files(root: &Path) -> Result<Vec<PathBuf>> {
    let metadata = std::fs::metadata(root).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::RootNotFound {
            path: root.to_path_buf(),
        },
        _ => Error::io(root, e),
    })?;

    if metadata.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry_result in WalkDir::new(root)
        .follow_links(false)
        .same_file_system(true)
        .sort_by_file_name()
    {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!("Skipping unreadable entry: {err}");
                continue;
            }
        };

        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    tracing::debug!(root = %root.display(), count = files.len(), "Enumerated files");
    Ok(files)
}
