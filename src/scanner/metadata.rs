//! On-demand file size measurement.
//!
//! Sizes are read after traversal, so a file may vanish or become unreadable
//! in between. That race surfaces as a per-file [`ScanError`], never a panic.

use std::path::Path;

use super::ScanError;

/// Return the byte length of the file at `path`.
///
/// Symlinks are followed, so a link to a regular file reports the target size.
///
/// # Errors
///
/// Returns [`ScanError`] if the file cannot be stat'ed or is no longer a
/// regular file.
pub fn file_size(path: &Path) -> Result<u64, ScanError> {
    let metadata = std::fs::metadata(path).map_err(|e| ScanError::from_io(path, e))?;

    if !metadata.is_file() {
        return Err(ScanError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::other("not a regular file"),
        });
    }

    Ok(metadata.len())
}
