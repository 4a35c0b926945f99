//! Metadata-preserving single-file copy
//!
//! Produces the temporary copy a rebalance replaces the original with. The
//! copy keeps ownership, permissions, extended attributes and timestamps,
//! recreates symlinks as symlinks, and refuses to cross a filesystem
//! boundary.

use crate::{Error, Result, platform};
use std::fs::{self, File, FileTimes, Metadata, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::path::Path;

const COPY_BUFFER_SIZE: usize = 1024 * 1024;

/// Copy `src` to `dest`, preserving metadata.
///
/// An existing `dest` is replaced. Ownership changes the process is not
/// permitted to make are skipped, as are extended attributes it may not
/// set; callers that need those guarantees verify the result with a
/// fingerprint.
pub fn copy_preserving_metadata(src: &Path, dest: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(src).map_err(|e| Error::io(src, e))?;
    let file_type = metadata.file_type();

    remove_if_exists(dest)?;

    if file_type.is_symlink() {
        return copy_symlink(src, dest, &metadata);
    }
    if !file_type.is_file() {
        return Err(Error::UnsupportedFileType {
            path: src.to_path_buf(),
        });
    }

    let mut reader = File::open(src).map_err(|e| Error::io(src, e))?;
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(dest)
        .map_err(|e| Error::io(dest, e))?;

    let dest_metadata = writer.metadata().map_err(|e| Error::io(dest, e))?;
    if dest_metadata.dev() != metadata.dev() {
        drop(writer);
        let _ = fs::remove_file(dest);
        return Err(Error::CrossDevice {
            src: src.to_path_buf(),
            dest: dest.to_path_buf(),
        });
    }

    copy_contents(&mut reader, &mut writer, src, dest)?;
    platform::copy_extended_attributes(src, dest)?;

    // chown may clear setuid/setgid, so permissions go on afterwards
    match std::os::unix::fs::fchown(&writer, Some(metadata.uid()), Some(metadata.gid())) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            tracing::debug!(path = %dest.display(), "Not permitted to preserve ownership");
        }
        Err(e) => return Err(Error::io(dest, e)),
    }
    writer
        .set_permissions(metadata.permissions())
        .map_err(|e| Error::io(dest, e))?;

    let times = FileTimes::new()
        .set_accessed(metadata.accessed().map_err(|e| Error::io(src, e))?)
        .set_modified(metadata.modified().map_err(|e| Error::io(src, e))?);
    writer.set_times(times).map_err(|e| Error::io(dest, e))?;

    writer.sync_all().map_err(|e| Error::io(dest, e))?;
    Ok(())
}

/// Move the bytes with plain reads and writes. Kernel copy offload
/// (`copy_file_range`, reflinks) may share the source blocks instead of
/// allocating new ones, which would defeat the rewrite.
fn copy_contents(reader: &mut File, writer: &mut File, src: &Path, dest: &Path) -> Result<()> {
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::io(src, e)),
        };
        writer
            .write_all(&buffer[..read])
            .map_err(|e| Error::io(dest, e))?;
    }
}

fn copy_symlink(src: &Path, dest: &Path, metadata: &Metadata) -> Result<()> {
    let target = fs::read_link(src).map_err(|e| Error::io(src, e))?;
    std::os::unix::fs::symlink(&target, dest).map_err(|e| Error::io(dest, e))?;

    match std::os::unix::fs::lchown(dest, Some(metadata.uid()), Some(metadata.gid())) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            tracing::debug!(path = %dest.display(), "Not permitted to preserve symlink ownership");
        }
        Err(e) => return Err(Error::io(dest, e)),
    }

    platform::set_symlink_times(dest, metadata)
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Replaced stale copy target");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}
