//! Error types for the driftlog library
//!
//! This module defines all error types that can occur while snapshotting,
//! detecting, monitoring and replaying changes. Errors carry the path or
//! block they refer to so callers can report them without extra context.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the driftlog library
pub type Result<T> = std::result::Result<T, DriftError>;

/// Main error type for all driftlog operations
#[derive(Debug, Error)]
pub enum DriftError {
    /// The directory to scan or watch does not exist
    #[error("Directory not found: {0:?}")]
    DirectoryNotFound(PathBuf),

    /// File content could not be decoded
    #[error("Encoding error in {path:?}: {reason}")]
    Encoding {
        /// File that failed to decode
        path: PathBuf,
        /// Decoder message
        reason: String,
    },

    /// Persisted snapshot could not be parsed or failed its digest check
    #[error("Corrupt snapshot at {path:?}: {reason}")]
    CorruptState {
        /// Snapshot file
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// A change-log block did not start with a recognized header
    #[error("Malformed log block {block}: {reason}")]
    MalformedLog {
        /// 1-based index of the block in the log
        block: usize,
        /// What was wrong with it
        reason: String,
    },

    /// A file named in the change log is absent from the replay target
    #[error("Target file missing: {0:?}")]
    TargetFileMissing(PathBuf),

    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Walk directory error from walkdir crate
    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// File system watcher error
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    /// Watch pattern parsing error
    #[error("Invalid watch pattern: {0}")]
    InvalidPattern(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<globset::Error> for DriftError {
    fn from(err: globset::Error) -> Self {
        DriftError::InvalidPattern(err.to_string())
    }
}

impl DriftError {
    /// Create an encoding error for a path
    pub fn encoding(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        DriftError::Encoding {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a corrupt-state error for a snapshot path
    pub fn corrupt_state(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        DriftError::CorruptState {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed-log error for a block index
    pub fn malformed_log(block: usize, reason: impl Into<String>) -> Self {
        DriftError::MalformedLog {
            block,
            reason: reason.into(),
        }
    }

    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        DriftError::Internal(msg.into())
    }

    /// Check if this error should abort a multi-file pass
    ///
    /// Malformed log blocks and missing replay targets are collected and
    /// reported at the end of a replay; everything else stops the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            DriftError::MalformedLog { .. } | DriftError::TargetFileMissing(_)
        )
    }

    /// Check if this error indicates a damaged snapshot
    pub fn is_corruption(&self) -> bool {
        matches!(self, DriftError::CorruptState { .. })
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            DriftError::DirectoryNotFound(path) => {
                format!("The folder {} does not exist.", path.display())
            }
            DriftError::CorruptState { path, reason } => {
                format!(
                    "Snapshot {} is unreadable ({}). Move it aside and run 'driftlog snapshot' \
                     to capture a fresh baseline.",
                    path.display(),
                    reason
                )
            }
            DriftError::TargetFileMissing(path) => {
                format!("{} is not present in the replay target.", path.display())
            }
            _ => self.to_string(),
        }
    }
}
