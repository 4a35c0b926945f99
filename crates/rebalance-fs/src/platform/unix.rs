//! Attribute flags and extended attributes on non-Linux Unix systems
//!
//! macOS is supported: `st_flags` is read from the metadata, and xattrs are
//! copied with the Darwin calls that take an options argument. The BSDs
//! keep xattrs behind a different API (`extattr_*`) that is not
//! implemented, so they are reported as unsupported rather than silently
//! losing attributes.

use crate::Result;
use std::fs::Metadata;
use std::path::Path;

#[cfg(target_os = "macos")]
pub(crate) use macos::copy_extended_attributes;

/// File flags (`chflags`) from `st_flags` where the platform exposes them.
#[cfg(target_os = "macos")]
pub(crate) fn attribute_flags(_path: &Path, metadata: &Metadata) -> Result<Option<u64>> {
    use std::os::macos::fs::MetadataExt;
    Ok(Some(u64::from(metadata.st_flags())))
}

#[cfg(not(target_os = "macos"))]
pub(crate) fn attribute_flags(_path: &Path, _metadata: &Metadata) -> Result<Option<u64>> {
    Ok(None)
}

#[cfg(not(target_os = "macos"))]
pub(crate) fn copy_extended_attributes(_src: &Path, _dest: &Path) -> Result<()> {
    Err(crate::Error::UnsupportedPlatform {
        os: std::env::consts::OS,
    })
}

#[cfg(target_os = "macos")]
mod macos {
    use super::super::c_path;
    use crate::{Error, Result};
    use std::ffi::{CStr, CString};
    use std::path::Path;

    /// Copy every extended attribute of `src` onto `dest`, without
    /// following symlinks.
    ///
    /// Attributes the process may not read or set (`com.apple.system.*`,
    /// some quarantine data) are skipped.
    pub(crate) fn copy_extended_attributes(src: &Path, dest: &Path) -> Result<()> {
        let src_c = c_path(src)?;
        let dest_c = c_path(dest)?;

        let names = match list_xattrs(&src_c) {
            Ok(names) => names,
            Err(e) if is_tolerated(&e) => return Ok(()),
            Err(e) => return Err(Error::io(src, e)),
        };

        for name in names.split(|b| *b == 0).filter(|n| !n.is_empty()) {
            let Ok(name) = CString::new(name) else {
                continue;
            };
            let value = match get_xattr(&src_c, &name) {
                Ok(value) => value,
                Err(e) if is_tolerated(&e) => {
                    tracing::debug!(
                        path = %src.display(),
                        attr = ?name,
                        "Skipping unreadable xattr"
                    );
                    continue;
                }
                Err(e) => return Err(Error::io(src, e)),
            };

            // SAFETY: both strings are NUL-terminated and value is valid for its length
            let rc = unsafe {
                libc::setxattr(
                    dest_c.as_ptr(),
                    name.as_ptr(),
                    value.as_ptr().cast(),
                    value.len(),
                    0,
                    libc::XATTR_NOFOLLOW,
                )
            };
            if rc != 0 {
                let e = std::io::Error::last_os_error();
                if !is_tolerated(&e) {
                    return Err(Error::io(dest, e));
                }
                tracing::debug!(
                    path = %dest.display(),
                    attr = ?name,
                    "Not permitted to set xattr"
                );
            }
        }
        Ok(())
    }

    fn is_tolerated(e: &std::io::Error) -> bool {
        matches!(
            e.raw_os_error(),
            Some(libc::EPERM | libc::EACCES | libc::ENOTSUP | libc::ENOATTR)
        )
    }

    fn list_xattrs(path: &CStr) -> std::io::Result<Vec<u8>> {
        // SAFETY: a null buffer with size 0 only queries the required length
        let len = unsafe {
            libc::listxattr(path.as_ptr(), std::ptr::null_mut(), 0, libc::XATTR_NOFOLLOW)
        };
        if len < 0 {
            return Err(std::io::Error::last_os_error());
        }
        let mut buffer = vec![0u8; len as usize];
        if buffer.is_empty() {
            return Ok(buffer);
        }
        // SAFETY: buffer is writable for buffer.len() bytes
        let len = unsafe {
            libc::listxattr(
                path.as_ptr(),
                buffer.as_mut_ptr().cast(),
                buffer.len(),
                libc::XATTR_NOFOLLOW,
            )
        };
        if len < 0 {
            return Err(std::io::Error::last_os_error());
        }
        buffer.truncate(len as usize);
        Ok(buffer)
    }

    pub(super) fn get_xattr(path: &CStr, name: &CStr) -> std::io::Result<Vec<u8>> {
        // SAFETY: a null buffer with size 0 only queries the required length
        let len = unsafe {
            libc::getxattr(
                path.as_ptr(),
                name.as_ptr(),
                std::ptr::null_mut(),
                0,
                0,
                libc::XATTR_NOFOLLOW,
            )
        };
        if len < 0 {
            return Err(std::io::Error::last_os_error());
        }
        let mut buffer = vec![0u8; len as usize];
        if buffer.is_empty() {
            return Ok(buffer);
        }
        // SAFETY: buffer is writable for buffer.len() bytes
        let len = unsafe {
            libc::getxattr(
                path.as_ptr(),
                name.as_ptr(),
                buffer.as_mut_ptr().cast(),
                buffer.len(),
                0,
                libc::XATTR_NOFOLLOW,
            )
        };
        if len < 0 {
            return Err(std::io::Error::last_os_error());
        }
        buffer.truncate(len as usize);
        Ok(buffer)
    }
}
