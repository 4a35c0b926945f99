//! SHA-256 content digests
//!
//! Provides a single canonical digest format (`sha256:<hex>`) used by
//! fingerprints to compare an original file against its rebalanced copy.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::path::Path;

/// Prefix for all checksums produced by this module
const PREFIX: &str = "sha256:";

/// Compute the SHA-256 checksum of in-memory bytes.
///
/// Returns a string in the canonical format `"sha256:<hex>"`.
pub fn compute_content_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Compute the SHA-256 checksum of a file's contents.
///
/// The file is streamed through the hasher, so memory use does not grow
/// with file size.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn compute_file_checksum(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(format!("{}{:x}", PREFIX, hasher.finalize()))
}
