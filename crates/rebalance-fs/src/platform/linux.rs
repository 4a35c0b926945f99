//! Linux attribute flags and extended attributes

use super::c_path;
use crate::{Error, Result};
use nix::errno::Errno;
use std::ffi::{CStr, CString};
use std::fs::{File, Metadata};
use std::os::fd::AsRawFd;
use std::path::Path;

nix::ioctl_read!(fs_ioc_getflags, b'f', 1, libc::c_long);

/// Read the inode attribute flags (`lsattr`) of a regular file.
///
/// Returns `None` when the filesystem does not support them.
pub(crate) fn attribute_flags(path: &Path, metadata: &Metadata) -> Result<Option<u64>> {
    if !metadata.is_file() {
        return Ok(None);
    }
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut flags: libc::c_long = 0;

    // SAFETY: the descriptor stays open for the call and flags outlives it
    match unsafe { fs_ioc_getflags(file.as_raw_fd(), &mut flags) } {
        Ok(_) => Ok(Some(flags as u64)),
        Err(Errno::ENOTTY | Errno::EOPNOTSUPP | Errno::EINVAL | Errno::ENOSYS) => Ok(None),
        Err(errno) => Err(Error::io(path, std::io::Error::from(errno))),
    }
}

/// Copy every extended attribute of `src` onto `dest`.
///
/// Attributes the process may not read or set (e.g. `trusted.*` without
/// privilege) are skipped, as are filesystems without xattr support.
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
                tracing::debug!(path = %src.display(), attr = ?name, "Skipping unreadable xattr");
                continue;
            }
            Err(e) => return Err(Error::io(src, e)),
        };

        // SAFETY: both strings are NUL-terminated and value is valid for its length
        let rc = unsafe {
            libc::lsetxattr(
                dest_c.as_ptr(),
                name.as_ptr(),
                value.as_ptr().cast(),
                value.len(),
                0,
            )
        };
        if rc != 0 {
            let e = std::io::Error::last_os_error();
            if !is_tolerated(&e) {
                return Err(Error::io(dest, e));
            }
            tracing::debug!(path = %dest.display(), attr = ?name, "Not permitted to set xattr");
        }
    }
    Ok(())
}

fn is_tolerated(e: &std::io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(libc::EPERM | libc::EACCES | libc::ENOTSUP | libc::ENODATA)
    )
}

fn list_xattrs(path: &CStr) -> std::io::Result<Vec<u8>> {
    // SAFETY: a null buffer with size 0 only queries the required length
    let len = unsafe { libc::llistxattr(path.as_ptr(), std::ptr::null_mut(), 0) };
    if len < 0 {
        return Err(std::io::Error::last_os_error());
    }
    let mut buffer = vec![0u8; len as usize];
    if buffer.is_empty() {
        return Ok(buffer);
    }
    // SAFETY: buffer is writable for buffer.len() bytes
    let len = unsafe { libc::llistxattr(path.as_ptr(), buffer.as_mut_ptr().cast(), buffer.len()) };
    if len < 0 {
        return Err(std::io::Error::last_os_error());
    }
    buffer.truncate(len as usize);
    Ok(buffer)
}

fn get_xattr(path: &CStr, name: &CStr) -> std::io::Result<Vec<u8>> {
    // SAFETY: a null buffer with size 0 only queries the required length
    let len = unsafe { libc::lgetxattr(path.as_ptr(), name.as_ptr(), std::ptr::null_mut(), 0) };
    if len < 0 {
        return Err(std::io::Error::last_os_error());
    }
    let mut buffer = vec![0u8; len as usize];
    if buffer.is_empty() {
        return Ok(buffer);
    }
    // SAFETY: buffer is writable for buffer.len() bytes
    let len = unsafe {
        libc::lgetxattr(
            path.as_ptr(),
            name.as_ptr(),
            buffer.as_mut_ptr().cast(),
            buffer.len(),
        )
    };
    if len < 0 {
        return Err(std::io::Error::last_os_error());
    }
    buffer.truncate(len as usize);
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_xattrs_are_copied_when_supported() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        std::fs::write(&src, "x").unwrap();
        std::fs::write(&dest, "x").unwrap();

        let src_c = c_path(&src).unwrap();
        let name = CString::new("user.rebalance.test").unwrap();
        // SAFETY: valid C strings and a 5-byte value
        let rc = unsafe {
            libc::lsetxattr(src_c.as_ptr(), name.as_ptr(), b"hello".as_ptr().cast(), 5, 0)
        };
        if rc != 0 {
            // Filesystem without user xattrs; nothing to verify
            return;
        }

        copy_extended_attributes(&src, &dest).unwrap();
        let value = get_xattr(&c_path(&dest).unwrap(), &name).unwrap();
        assert_eq!(value, b"hello");
    }

    #[test]
    fn flags_are_none_for_directories() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = std::fs::metadata(dir.path()).unwrap();
        assert_eq!(attribute_flags(dir.path(), &metadata).unwrap(), None);
    }
}
