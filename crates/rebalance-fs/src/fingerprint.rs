//! Composite file fingerprints
//!
//! A [`Fingerprint`] combines attribute flags, core metadata and a content
//! digest. Two files with equal fingerprints are treated as faithful copies
//! of each other.

use std::fmt;

/// Comparable summary of a file's attributes and content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    /// Filesystem attribute flags (`chattr`/`chflags`), if the platform and
    /// filesystem expose them.
    pub attribute_flags: Option<u64>,
    /// File type and permission bits.
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    /// Modification time, whole seconds since the epoch.
    pub modified_secs: i64,
    /// Content digest in `sha256:<hex>` form. For symlinks this covers the
    /// link target rather than the file it points to.
    pub content_digest: String,
}

impl Fingerprint {
    /// Capture the fingerprint of `path` without following symlinks.
    #[cfg(unix)]
    pub fn capture(path: &std::path::Path) -> crate::Result<Self> {
        use crate::{Error, checksum, platform};
        use std::os::unix::ffi::OsStrExt;
        use std::os::unix::fs::MetadataExt;

        let metadata = std::fs::symlink_metadata(path).map_err(|e| Error::io(path, e))?;

        let (attribute_flags, content_digest) = if metadata.file_type().is_symlink() {
            let target = std::fs::read_link(path).map_err(|e| Error::io(path, e))?;
            (
                None,
                checksum::compute_content_checksum(target.as_os_str().as_bytes()),
            )
        } else {
            (
                platform::attribute_flags(path, &metadata)?,
                checksum::compute_file_checksum(path).map_err(|e| Error::io(path, e))?,
            )
        };

        Ok(Self {
            attribute_flags,
            mode: metadata.mode(),
            uid: metadata.uid(),
            gid: metadata.gid(),
            size: metadata.size(),
            modified_secs: metadata.mtime(),
            content_digest,
        })
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.attribute_flags {
            Some(flags) => write!(f, "{:#010x}", flags)?,
            None => write!(f, "-")?,
        }
        write!(
            f,
            " {:o} {}:{} {} {} {}",
            self.mode, self.uid, self.gid, self.size, self.modified_secs, self.content_digest
        )
    }
}
