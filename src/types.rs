//! Core data types used throughout the driftlog library
//!
//! ## Overview
//!
//! The types in this module represent:
//! - **Diffs**: `LineDiff`, `DiffHunk`, `LineChange` - line-level differences
//! - **Detection**: `ChangeRecord`, `FileChange` - per-file results of a batch run
//! - **Replay**: `ReplacementRule`, `ReplayReport` - rules recovered from a log
//!   and the outcome of applying them
//! - **Monitoring**: `ModificationEvent`, `EventOutcome`, `MonitorStats`

use crate::error::DriftError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One line-level discrepancy between an old and a new version of a file
///
/// An empty `old_text` denotes an appended line, an empty `new_text` a
/// removed line.
///
/// # Examples
///
/// ```rust
/// # use driftlog::types::LineDiff;
/// let diff = LineDiff::new(2, "world", "there");
/// assert_eq!(diff.mirrored(), LineDiff::new(2, "there", "world"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineDiff {
    /// 1-based line number
    pub line_number: usize,
    /// Text before the change
    pub old_text: String,
    /// Text after the change
    pub new_text: String,
}

impl LineDiff {
    /// Create a line diff
    pub fn new(line_number: usize, old_text: impl Into<String>, new_text: impl Into<String>) -> Self {
        Self {
            line_number,
            old_text: old_text.into(),
            new_text: new_text.into(),
        }
    }

    /// The same difference seen from the other side
    pub fn mirrored(&self) -> Self {
        Self {
            line_number: self.line_number,
            old_text: self.new_text.clone(),
            new_text: self.old_text.clone(),
        }
    }

    /// Derive a replacement rule when both sides are non-empty and differ
    ///
    /// Line terminators and surrounding whitespace are trimmed first.
    pub fn replacement_rule(&self) -> Option<ReplacementRule> {
        let old = self.old_text.trim();
        let new = self.new_text.trim();
        if old.is_empty() || new.is_empty() || old == new {
            return None;
        }
        Some(ReplacementRule {
            line_number: self.line_number,
            old_text: old.to_string(),
            new_text: new.to_string(),
        })
    }
}

/// Individual line inside a diff hunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineChange {
    /// Unchanged line (old line number, text)
    Context(usize, String),
    /// Removed line (old line number, text)
    Deleted(usize, String),
    /// Inserted line (new line number, text)
    Added(usize, String),
}

impl LineChange {
    /// Text of the line including its terminator, if any
    pub fn text(&self) -> &str {
        match self {
            LineChange::Context(_, text) | LineChange::Deleted(_, text) | LineChange::Added(_, text) => {
                text
            }
        }
    }
}

/// A contiguous region of changes with surrounding context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    /// First old line covered (1-based, 0 when the old range is empty)
    pub from_line: usize,
    /// Number of old lines covered
    pub from_count: usize,
    /// First new line covered (1-based, 0 when the new range is empty)
    pub to_line: usize,
    /// Number of new lines covered
    pub to_count: usize,
    /// Lines in order
    pub changes: Vec<LineChange>,
}

/// Per-file detail of a modified file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Aligned diff hunks
    pub hunks: Vec<DiffHunk>,
    /// Line diffs derived from the hunks
    pub line_diffs: Vec<LineDiff>,
}

/// What changed for one file in a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeRecord {
    /// The file was not in the snapshot
    NewFile,
    /// The file content differs from the snapshot
    Modified(FileChange),
}

impl ChangeRecord {
    /// Line diffs of a modified file, empty for a new file
    pub fn line_diffs(&self) -> &[LineDiff] {
        match self {
            ChangeRecord::NewFile => &[],
            ChangeRecord::Modified(change) => &change.line_diffs,
        }
    }
}

/// A substitution recovered from a change log
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplacementRule {
    /// Line the change was recorded at (1-based)
    pub line_number: usize,
    /// Text to look for
    pub old_text: String,
    /// Text to put in its place
    pub new_text: String,
}

/// A file system notification delivered to the live monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModificationEvent {
    /// Path of the modified entry
    pub path: PathBuf,
    /// Whether the entry is a directory
    pub is_directory: bool,
}

impl ModificationEvent {
    /// Event for a modified file
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_directory: false,
        }
    }
}

/// Result of handling one modification event
#[derive(Debug)]
pub enum EventOutcome {
    /// Directory event or a file name outside the watch patterns
    Ignored,
    /// Content equal to the cached version
    Unchanged,
    /// An entry with this many line diffs was appended to the log
    Logged {
        /// Number of line diffs written
        lines: usize,
    },
    /// The stop sentinel was present, nothing was written
    Suppressed {
        /// Number of line diffs that would have been written
        lines: usize,
    },
    /// The file could not be read, the cache was left untouched
    Skipped(DriftError),
}

/// Counters kept by the live monitor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStats {
    /// Events received
    pub events_seen: u64,
    /// Entries appended to the log
    pub entries_logged: u64,
    /// Entries suppressed by the stop sentinel
    pub entries_suppressed: u64,
    /// Events skipped because of read errors
    pub events_skipped: u64,
}

/// Outcome of applying a change log
#[derive(Debug, Default)]
pub struct ReplayReport {
    /// Files rewritten
    pub files_patched: usize,
    /// Rules that changed a file
    pub rules_applied: usize,
    /// Rules whose old text was not found
    pub rules_skipped: usize,
    /// Per-block and per-file errors that did not stop the run
    pub errors: Vec<DriftError>,
}

impl ReplayReport {
    /// True when every block and file was processed without error
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
