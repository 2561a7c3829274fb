//! Snapshot store: the "last known state" of a directory
//!
//! A [`Snapshot`] maps each file name directly under a directory to its full
//! text content. It is the baseline the batch detector compares against and
//! is persisted after every batch run.
//!
//! ## Storage format
//!
//! Snapshots are stored as a JSON document:
//!
//! ```text
//! {
//!   "format_version": 1,
//!   "created_at": "2024-05-01T12:00:00Z",
//!   "digest": "<sha-256 of the file mapping>",
//!   "files": { "a.txt": "hello\nworld\n" }
//! }
//! ```
//!
//! JSON escapes round-trip any text exactly, control characters included. The
//! digest is checked on load so a truncated or hand-edited snapshot is
//! reported as corrupt instead of being silently treated as a first run.
//!
//! Saving writes to a temporary file next to the target and renames it into
//! place, so a crash never leaves a half-written snapshot behind.

use crate::encoding::read_text;
use crate::error::{DriftError, Result};
use crate::utils::{atomic_write, hash_data, list_flat_files};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Current on-disk format version
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Point-in-time content of a flat directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    files: BTreeMap<String, String>,
}

/// Persisted form of a snapshot
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    format_version: u32,
    created_at: DateTime<Utc>,
    digest: String,
    files: BTreeMap<String, String>,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture every regular file directly under `directory`
    ///
    /// Files are read in parallel through the encoding-safe reader.
    ///
    /// # Errors
    ///
    /// - [`DriftError::DirectoryNotFound`] if `directory` does not exist
    /// - [`DriftError::WalkDir`] if the directory cannot be listed
    /// - [`DriftError::Io`] if any file cannot be read; nothing is returned
    ///   in that case
    #[instrument]
    pub fn initialize(directory: &Path) -> Result<Self> {
        let listing = list_flat_files(directory)?;

        let files = listing
            .into_par_iter()
            .map(|(name, path)| Ok((name, read_text(&path)?)))
            .collect::<Result<BTreeMap<String, String>>>()?;

        info!("Captured snapshot of {} files in {:?}", files.len(), directory);
        Ok(Self { files })
    }

    /// Load a snapshot previously written with [`Snapshot::save`]
    ///
    /// # Errors
    ///
    /// - [`DriftError::Io`] if the file cannot be read
    /// - [`DriftError::CorruptState`] if it does not parse, has an unknown
    ///   format version or fails its digest check
    #[instrument]
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;

        let stored: SnapshotFile = serde_json::from_slice(&bytes)
            .map_err(|e| DriftError::corrupt_state(path, e.to_string()))?;

        if stored.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(DriftError::corrupt_state(
                path,
                format!("unsupported format version {}", stored.format_version),
            ));
        }

        let digest = files_digest(&stored.files)?;
        if digest != stored.digest {
            return Err(DriftError::corrupt_state(
                path,
                format!("digest mismatch (expected {}, found {})", stored.digest, digest),
            ));
        }

        debug!("Loaded snapshot of {} files from {:?}", stored.files.len(), path);
        Ok(Self { files: stored.files })
    }

    /// Persist the snapshot, replacing any file at `path` atomically
    #[instrument(skip(self), fields(files = self.files.len()))]
    pub fn save(&self, path: &Path) -> Result<()> {
        let stored = SnapshotFile {
            format_version: SNAPSHOT_FORMAT_VERSION,
            created_at: Utc::now(),
            digest: self.digest()?,
            files: self.files.clone(),
        };

        let json = serde_json::to_vec_pretty(&stored)?;
        atomic_write(path, &json)?;

        debug!("Saved snapshot to {:?}", path);
        Ok(())
    }

    /// Load the snapshot at `path`, or capture and save one if none exists
    ///
    /// Returns the snapshot and whether it was freshly created. An existing
    /// file that cannot be parsed is still an error.
    pub fn load_or_initialize(directory: &Path, path: &Path) -> Result<(Self, bool)> {
        if path.exists() {
            return Ok((Self::load(path)?, false));
        }

        info!("No snapshot at {:?}, capturing a baseline", path);
        let snapshot = Self::initialize(directory)?;
        snapshot.save(path)?;
        Ok((snapshot, true))
    }

    /// Content recorded for `filename`
    pub fn get(&self, filename: &str) -> Option<&str> {
        self.files.get(filename).map(String::as_str)
    }

    /// Whether `filename` is recorded
    pub fn contains(&self, filename: &str) -> bool {
        self.files.contains_key(filename)
    }

    /// Record content for `filename`, returning the previous content
    pub fn insert(&mut self, filename: impl Into<String>, content: impl Into<String>) -> Option<String> {
        self.files.insert(filename.into(), content.into())
    }

    /// Number of recorded files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True when no files are recorded
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Recorded file names in sorted order
    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// SHA-256 over the file mapping
    pub fn digest(&self) -> Result<String> {
        files_digest(&self.files)
    }
}

impl FromIterator<(String, String)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

fn files_digest(files: &BTreeMap<String, String>) -> Result<String> {
    Ok(hash_data(&serde_json::to_vec(files)?))
}
