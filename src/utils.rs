//! Utility functions for driftlog
//!
//! File listing for flat directories, atomic writes and hashing helpers
//! shared by the snapshot store, the detector and replay.

use crate::error::{DriftError, Result};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{trace, warn};
use walkdir::WalkDir;

/// Hash arbitrary data using SHA-256
///
/// Returns the hash as a 64-character lowercase hexadecimal string.
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// List regular files directly under `dir`
///
/// No recursion: subdirectories are skipped, symlinks are followed so a link
/// to a regular file counts as one. Entries are sorted by file name. Names
/// that are not valid UTF-8 are skipped with a warning.
///
/// # Errors
///
/// - [`DriftError::DirectoryNotFound`] if `dir` is not an existing directory
/// - [`DriftError::WalkDir`] if the directory cannot be read
pub fn list_flat_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !dir.is_dir() {
        return Err(DriftError::DirectoryNotFound(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.file_name().to_str() {
            Some(name) => {
                trace!("Listed {}", name);
                files.push((name.to_string(), entry.path().to_path_buf()));
            }
            None => warn!("Skipping file with non UTF-8 name: {:?}", entry.path()),
        }
    }

    Ok(files)
}

/// Atomic file write (write to temp file then rename)
///
/// The temporary file is created in the target's directory so the final
/// rename never crosses file systems. On failure the temporary file is
/// removed when it is dropped.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

/// Final component of a path as a string, if it has one
pub fn file_name_of(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}
