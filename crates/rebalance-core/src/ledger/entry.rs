//! Ledger records and their two-line form
//!
//! Paths are stored as their raw bytes, so any name the filesystem accepts
//! can be recorded except one containing a newline.

use crate::{Error, Result};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Completed pass count for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub path: PathBuf,
    pub count: u64,
}

impl LedgerEntry {
    pub fn new(path: impl Into<PathBuf>, count: u64) -> Self {
        Self {
            path: path.into(),
            count,
        }
    }

    /// Append this entry's record (`path` line, then `count` line).
    pub(crate) fn write_record(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&path_bytes(&self.path));
        out.push(b'\n');
        out.extend_from_slice(self.count.to_string().as_bytes());
        out.push(b'\n');
    }
}

/// Whether `path` fits on a single line of the store.
pub(crate) fn is_recordable(path: &Path) -> bool {
    !path_bytes(path).contains(&b'\n')
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    match path.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

/// Parse a store's contents into entries, in file order.
///
/// Path lines are taken byte for byte. Count lines may carry surrounding
/// whitespace, including the `\r` of a store edited on Windows.
pub(crate) fn parse_records(store: &Path, content: &[u8]) -> Result<Vec<LedgerEntry>> {
    let body = content.strip_suffix(b"\n").unwrap_or(content);
    let lines: Vec<&[u8]> = if content.is_empty() {
        Vec::new()
    } else {
        body.split(|&b| b == b'\n').collect()
    };
    if lines.len() % 2 != 0 {
        return Err(Error::LedgerCorrupt {
            path: store.to_path_buf(),
            line: lines.len(),
            message: "path has no count line".to_string(),
        });
    }

    lines
        .chunks_exact(2)
        .enumerate()
        .map(|(i, pair)| {
            let raw = String::from_utf8_lossy(pair[1]);
            let count = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| Error::LedgerCorrupt {
                    path: store.to_path_buf(),
                    line: i * 2 + 2,
                    message: format!("invalid count {raw:?}: {e}"),
                })?;
            Ok(LedgerEntry::new(path_from_bytes(pair[0]), count))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_pairs_in_order() {
        let entries = parse_records(Path::new("db"), b"/a\n1\n/b\n3\n").unwrap();
        assert_eq!(
            entries,
            vec![LedgerEntry::new("/a", 1), LedgerEntry::new("/b", 3)]
        );
    }

    #[test]
    fn tolerates_missing_final_newline() {
        let entries = parse_records(Path::new("db"), b"/a\n2").unwrap();
        assert_eq!(entries, vec![LedgerEntry::new("/a", 2)]);
    }

    #[test]
    fn empty_content_has_no_records() {
        assert_eq!(parse_records(Path::new("db"), b"").unwrap(), vec![]);
    }

    #[test]
    fn lone_newline_is_corrupt() {
        let err = parse_records(Path::new("db"), b"\n").unwrap_err();
        assert!(matches!(err, Error::LedgerCorrupt { line: 1, .. }), "{err}");
    }

    #[test]
    fn odd_line_count_is_corrupt() {
        let err = parse_records(Path::new("db"), b"/a\n1\n/b\n").unwrap_err();
        assert!(matches!(err, Error::LedgerCorrupt { line: 3, .. }), "{err}");
    }

    #[test]
    fn non_numeric_count_is_corrupt() {
        let err = parse_records(Path::new("db"), b"/a\nmany\n").unwrap_err();
        assert!(matches!(err, Error::LedgerCorrupt { line: 2, .. }), "{err}");
    }

    #[test]
    fn negative_count_is_corrupt() {
        assert!(parse_records(Path::new("db"), b"/a\n-1\n").is_err());
    }

    #[test]
    fn only_newlines_make_a_path_unrecordable() {
        assert!(is_recordable(Path::new("/pool/a b")));
        assert!(is_recordable(Path::new("/pool/a\rb")));
        assert!(!is_recordable(Path::new("/pool/a\nb")));
    }

    #[test]
    fn write_record_is_two_lines() {
        let mut out = Vec::new();
        LedgerEntry::new("/pool/x", 4).write_record(&mut out);
        assert_eq!(out, b"/pool/x\n4\n");
    }

    #[cfg(unix)]
    #[test]
    fn raw_bytes_survive_a_round_trip() {
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new(std::ffi::OsStr::from_bytes(b"/pool/a\xff.bin"));
        let mut out = Vec::new();
        LedgerEntry::new(path, 2).write_record(&mut out);
        assert_eq!(out, b"/pool/a\xff.bin\n2\n");

        let entries = parse_records(Path::new("db"), &out).unwrap();
        assert_eq!(entries, vec![LedgerEntry::new(path, 2)]);
    }
}
