//! Platform capability selection
//!
//! The rebalance core only talks to [`FileCapabilities`]. [`detect`] picks
//! the implementation for the running platform once, at startup.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(all(unix, not(target_os = "linux")))]
mod unix;

#[cfg(target_os = "linux")]
pub(crate) use linux::{attribute_flags, copy_extended_attributes};
#[cfg(all(unix, not(target_os = "linux")))]
pub(crate) use unix::{attribute_flags, copy_extended_attributes};

use crate::{Fingerprint, Result, walk};
use std::path::{Path, PathBuf};

/// Filesystem operations the rebalancer consumes.
///
/// `enumerate_files` has a portable default; platforms supply copy and
/// fingerprint.
pub trait FileCapabilities {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// List the regular files under `root`.
    fn enumerate_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        walk::enumerate_files(root)
    }

    /// Copy `src` to `dest` keeping metadata, within one filesystem.
    fn copy_preserving_metadata(&self, src: &Path, dest: &Path) -> Result<()>;

    /// Compute the comparable fingerprint of `path`.
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint>;
}

/// Native capabilities for Unix-like systems.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeCapabilities;

#[cfg(unix)]
impl FileCapabilities for NativeCapabilities {
    fn name(&self) -> &'static str {
        std::env::consts::OS
    }

    fn copy_preserving_metadata(&self, src: &Path, dest: &Path) -> Result<()> {
        crate::copy::copy_preserving_metadata(src, dest)
    }

    fn fingerprint(&self, path: &Path) -> Result<Fingerprint> {
        Fingerprint::capture(path)
    }
}

/// Select the capabilities for the running platform.
///
/// # Errors
///
/// Returns [`crate::Error::UnsupportedPlatform`] where no implementation
/// exists, including Unix systems other than Linux and macOS whose extended
/// attributes cannot be copied.
pub fn detect() -> Result<Box<dyn FileCapabilities>> {
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    {
        tracing::debug!(os = std::env::consts::OS, "Using native file capabilities");
        Ok(Box::new(NativeCapabilities))
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        Err(crate::Error::UnsupportedPlatform {
            os: std::env::consts::OS,
        })
    }
}

#[cfg(unix)]
pub(crate) fn c_path(path: &Path) -> Result<std::ffi::CString> {
    use std::os::unix::ffi::OsStrExt;
    std::ffi::CString::new(path.as_os_str().as_bytes()).map_err(|_| crate::Error::InvalidPath {
        path: path.to_path_buf(),
    })
}

/// Set access and modification times on a symlink itself.
#[cfg(unix)]
pub(crate) fn set_symlink_times(path: &Path, metadata: &std::fs::Metadata) -> Result<()> {
    use std::os::unix::fs::MetadataExt;

    let c_path = c_path(path)?;
    // SAFETY: timespec is plain data; zeroing covers any padding fields
    let mut times: [libc::timespec; 2] = unsafe { std::mem::zeroed() };
    times[0].tv_sec = metadata.atime() as libc::time_t;
    times[0].tv_nsec = metadata.atime_nsec() as _;
    times[1].tv_sec = metadata.mtime() as libc::time_t;
    times[1].tv_nsec = metadata.mtime_nsec() as _;

    // SAFETY: c_path is NUL-terminated and times has the two entries utimensat reads
    let rc = unsafe {
        libc::utimensat(
            libc::AT_FDCWD,
            c_path.as_ptr(),
            times.as_ptr(),
            libc::AT_SYMLINK_NOFOLLOW,
        )
    };
    if rc != 0 {
        return Err(crate::Error::io(path, std::io::Error::last_os_error()));
    }
    Ok(())
}
