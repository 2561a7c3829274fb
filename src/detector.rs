//! Batch change detection
//!
//! The [`ChangeDetector`] compares the files currently in a directory against
//! a [`Snapshot`] and reports, per file, either that it is new or the aligned
//! line diff since the snapshot. [`ChangeDetector::detect_and_log`] also
//! regenerates the batch log.
//!
//! ## Behavior
//!
//! - Only regular files directly under the directory are considered.
//! - A file absent from the snapshot is reported as new.
//! - A file whose content is unchanged is not reported.
//! - A file present in the snapshot but gone from disk is **not** reported.
//! - The returned snapshot holds every file currently on disk; callers
//!   persist it with [`Snapshot::save`].
//!
//! [`ChangeDetector::detect_with_snapshot`] runs the whole cycle against a
//! snapshot file. When that file does not exist yet the run compares against
//! an empty snapshot, so every file is logged as new, and then saves the
//! first snapshot.
//!
//! File reads and diffs run in parallel. Results are ordered by file name,
//! and the log is only written after every diff has been computed.
//!
//! ## Example
//!
//! ```rust,no_run
//! use driftlog::{ChangeDetector, Snapshot, TrackerConfig};
//! use std::path::Path;
//!
//! # fn main() -> driftlog::Result<()> {
//! let snapshot_path = Path::new("snapshot.json");
//! let detector = ChangeDetector::new(TrackerConfig::default());
//!
//! // Everything is new on the first run
//! let (report, _first_run) =
//!     detector.detect_with_snapshot(Path::new("notes"), Path::new("changes.log"), snapshot_path)?;
//! println!("{} files changed", report.changes.len());
//!
//! // Or drive the steps by hand
//! let baseline = Snapshot::load(snapshot_path)?;
//! let report = detector.detect_and_log(Path::new("notes"), Path::new("changes.log"), &baseline)?;
//! report.snapshot.save(snapshot_path)?;
//! # Ok(())
//! # }
//! ```

use crate::config::TrackerConfig;
use crate::diff::{compute_aligned_diff, line_diffs_from_hunks};
use crate::encoding::{read_text, split_lines_inclusive};
use crate::error::Result;
use crate::log::render_batch_entry;
use crate::snapshot::Snapshot;
use crate::types::{ChangeRecord, FileChange};
use crate::utils::{atomic_write, list_flat_files};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, instrument, trace};

/// Result of a batch detection run
#[derive(Debug, Clone)]
pub struct DetectionReport {
    /// Changed files by name
    pub changes: BTreeMap<String, ChangeRecord>,
    /// Snapshot of the directory as it is now
    pub snapshot: Snapshot,
}

impl DetectionReport {
    /// True when nothing changed since the snapshot
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of files reported as new
    pub fn new_files(&self) -> usize {
        self.changes
            .values()
            .filter(|record| matches!(record, ChangeRecord::NewFile))
            .count()
    }

    /// Number of files reported as modified
    pub fn modified_files(&self) -> usize {
        self.changes.len() - self.new_files()
    }

    /// Render the batch log for this run
    pub fn render_log(&self) -> String {
        self.changes
            .iter()
            .map(|(filename, record)| render_batch_entry(filename, record))
            .collect()
    }
}

/// Batch change detector
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    config: TrackerConfig,
}

impl ChangeDetector {
    /// Create a detector with the given configuration
    pub fn new(config: TrackerConfig) -> Self {
        Self { config }
    }

    /// Compare `directory` against `snapshot` without writing a log
    ///
    /// # Errors
    ///
    /// - [`crate::DriftError::DirectoryNotFound`] if `directory` does not exist
    /// - [`crate::DriftError::Io`] if a file cannot be read
    #[instrument(skip(self, snapshot), fields(baseline = snapshot.len()))]
    pub fn detect(&self, directory: &Path, snapshot: &Snapshot) -> Result<DetectionReport> {
        let listing = list_flat_files(directory)?;
        debug!("Comparing {} files against snapshot", listing.len());

        let context_lines = self.config.context_lines;
        let scanned = listing
            .into_par_iter()
            .map(|(filename, path)| {
                let content = read_text(&path)?;
                let record = match snapshot.get(&filename) {
                    None => Some(ChangeRecord::NewFile),
                    Some(old_content) => diff_contents(old_content, &content, context_lines),
                };
                trace!("{}: {}", filename, if record.is_some() { "changed" } else { "unchanged" });
                Ok((filename, content, record))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut changes = BTreeMap::new();
        let mut current = Snapshot::new();
        for (filename, content, record) in scanned {
            if let Some(record) = record {
                changes.insert(filename.clone(), record);
            }
            current.insert(filename, content);
        }

        info!("Detected {} changed files in {:?}", changes.len(), directory);
        Ok(DetectionReport {
            changes,
            snapshot: current,
        })
    }

    /// Compare `directory` against `snapshot` and regenerate the log at `log_path`
    ///
    /// The previous log content is replaced. When nothing changed the log is
    /// left empty.
    #[instrument(skip(self, snapshot))]
    pub fn detect_and_log(&self, directory: &Path, log_path: &Path, snapshot: &Snapshot) -> Result<DetectionReport> {
        let report = self.detect(directory, snapshot)?;
        atomic_write(log_path, report.render_log().as_bytes())?;
        debug!("Wrote {} log entries to {:?}", report.changes.len(), log_path);
        Ok(report)
    }

    /// Detect, log and persist against the snapshot stored at `snapshot_path`
    ///
    /// Returns the report and whether this was the first run. On the first
    /// run there is no stored snapshot: every file is reported as new and the
    /// current contents become the stored snapshot.
    ///
    /// # Errors
    ///
    /// - [`crate::DriftError::CorruptState`] if the stored snapshot is damaged
    /// - [`crate::DriftError::DirectoryNotFound`] if `directory` does not
    ///   exist; neither the log nor the snapshot is written
    #[instrument(skip(self))]
    pub fn detect_with_snapshot(
        &self,
        directory: &Path,
        log_path: &Path,
        snapshot_path: &Path,
    ) -> Result<(DetectionReport, bool)> {
        let (baseline, first_run) = if snapshot_path.exists() {
            (Snapshot::load(snapshot_path)?, false)
        } else {
            info!("No snapshot at {:?}, reporting every file as new", snapshot_path);
            (Snapshot::new(), true)
        };

        let report = self.detect_and_log(directory, log_path, &baseline)?;
        report.snapshot.save(snapshot_path)?;
        Ok((report, first_run))
    }
}

/// Aligned diff of two file contents, `None` when they are identical
fn diff_contents(old_content: &str, new_content: &str, context_lines: usize) -> Option<ChangeRecord> {
    if old_content == new_content {
        return None;
    }

    let old_lines = split_lines_inclusive(old_content);
    let new_lines = split_lines_inclusive(new_content);
    let hunks = compute_aligned_diff(&old_lines, &new_lines, context_lines);
    if hunks.is_empty() {
        return None;
    }

    let line_diffs = line_diffs_from_hunks(&hunks);
    Some(ChangeRecord::Modified(FileChange { hunks, line_diffs }))
}

/// Run a batch detection with the default configuration
pub fn detect_and_log(directory: &Path, log_path: &Path, snapshot: &Snapshot) -> Result<DetectionReport> {
    ChangeDetector::default().detect_and_log(directory, log_path, snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriftError;
    use crate::types::LineDiff;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_unchanged_directory_reports_nothing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "one\ntwo\n").unwrap();
        fs::write(dir.path().join("b.txt"), "three\n").unwrap();

        let snapshot = Snapshot::initialize(dir.path()).unwrap();
        let report = ChangeDetector::default().detect(dir.path(), &snapshot).unwrap();

        assert!(report.is_empty());
        assert_eq!(report.snapshot, snapshot);
    }

    #[test]
    fn test_new_file_is_reported_once() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "one\n").unwrap();
        let snapshot = Snapshot::initialize(dir.path()).unwrap();

        fs::write(dir.path().join("b.txt"), "fresh\n").unwrap();
        let report = ChangeDetector::default().detect(dir.path(), &snapshot).unwrap();

        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.changes.get("b.txt"), Some(&ChangeRecord::NewFile));
        assert_eq!(report.new_files(), 1);
        assert_eq!(report.modified_files(), 0);
    }

    #[test]
    fn test_single_line_change() {
        let dir = TempDir::new().unwrap();
        let log_dir = TempDir::new().unwrap();
        let log_path = log_dir.path().join("changes.log");
        fs::write(dir.path().join("a.txt"), "hello\nworld\n").unwrap();
        let snapshot = Snapshot::initialize(dir.path()).unwrap();

        fs::write(dir.path().join("a.txt"), "hello\nthere\n").unwrap();
        let report = detect_and_log(dir.path(), &log_path, &snapshot).unwrap();

        let record = report.changes.get("a.txt").unwrap();
        assert_eq!(record.line_diffs(), &[LineDiff::new(2, "world", "there")]);
        assert_eq!(report.snapshot.get("a.txt"), Some("hello\nthere\n"));

        let log = fs::read_to_string(&log_path).unwrap();
        assert!(log.starts_with("Changes for a.txt:\n"));
        assert!(log.contains("-world\n+there\n"));
        assert!(log.ends_with("\n\n"));
    }

    #[test]
    fn test_change_is_isolated_by_alignment() {
        let dir = TempDir::new().unwrap();
        let body: String = (1..=20).map(|i| format!("line {}\n", i)).collect();
        fs::write(dir.path().join("a.txt"), &body).unwrap();
        let snapshot = Snapshot::initialize(dir.path()).unwrap();

        fs::write(dir.path().join("a.txt"), format!("inserted\n{}", body)).unwrap();
        let report = ChangeDetector::default().detect(dir.path(), &snapshot).unwrap();

        let ChangeRecord::Modified(change) = report.changes.get("a.txt").unwrap() else {
            panic!("expected a modification");
        };
        assert_eq!(change.hunks.len(), 1);
        assert_eq!(change.line_diffs, vec![LineDiff::new(1, "", "inserted")]);
    }

    #[test]
    fn test_deleted_file_is_not_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a\n").unwrap();
        fs::write(dir.path().join("gone.txt"), "bye\n").unwrap();
        let snapshot = Snapshot::initialize(dir.path()).unwrap();

        fs::remove_file(dir.path().join("gone.txt")).unwrap();
        let report = ChangeDetector::default().detect(dir.path(), &snapshot).unwrap();

        assert!(report.is_empty());
        assert!(!report.snapshot.contains("gone.txt"));
    }

    #[test]
    fn test_log_is_regenerated_each_run() {
        let dir = TempDir::new().unwrap();
        let log_dir = TempDir::new().unwrap();
        let log_path = log_dir.path().join("changes.log");
        fs::write(&log_path, "stale content from an earlier run\n").unwrap();

        let report = detect_and_log(dir.path(), &log_path, &Snapshot::new()).unwrap();

        assert!(report.is_empty());
        assert_eq!(fs::read_to_string(&log_path).unwrap(), "");
    }

    #[test]
    fn test_missing_directory_writes_no_log() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("changes.log");

        let result = detect_and_log(&dir.path().join("missing"), &log_path, &Snapshot::new());

        assert!(matches!(result, Err(DriftError::DirectoryNotFound(_))));
        assert!(!log_path.exists());
    }

    #[test]
    fn test_first_run_reports_every_file_as_new() {
        let dir = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        let log_path = state.path().join("changes.log");
        let snapshot_path = state.path().join("snapshot.json");
        fs::write(dir.path().join("a.txt"), "one\n").unwrap();
        fs::write(dir.path().join("b.txt"), "two\n").unwrap();

        let detector = ChangeDetector::default();
        let (report, first_run) = detector
            .detect_with_snapshot(dir.path(), &log_path, &snapshot_path)
            .unwrap();

        assert!(first_run);
        assert_eq!(report.new_files(), 2);
        assert_eq!(
            fs::read_to_string(&log_path).unwrap(),
            "Changes for a.txt:\nNew file added\n\nChanges for b.txt:\nNew file added\n\n"
        );
        assert_eq!(Snapshot::load(&snapshot_path).unwrap(), report.snapshot);

        let (report, first_run) = detector
            .detect_with_snapshot(dir.path(), &log_path, &snapshot_path)
            .unwrap();
        assert!(!first_run);
        assert!(report.is_empty());
        assert_eq!(fs::read_to_string(&log_path).unwrap(), "");
    }

    #[test]
    fn test_first_run_on_missing_directory_writes_nothing() {
        let state = TempDir::new().unwrap();
        let log_path = state.path().join("changes.log");
        let snapshot_path = state.path().join("snapshot.json");

        let result = ChangeDetector::default().detect_with_snapshot(
            &state.path().join("missing"),
            &log_path,
            &snapshot_path,
        );

        assert!(matches!(result, Err(DriftError::DirectoryNotFound(_))));
        assert!(!log_path.exists());
        assert!(!snapshot_path.exists());
    }

    #[test]
    fn test_context_lines_setting() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "1\n2\n3\n4\n5\n").unwrap();
        let snapshot = Snapshot::initialize(dir.path()).unwrap();
        fs::write(dir.path().join("a.txt"), "1\n2\nX\n4\n5\n").unwrap();

        let config = crate::TrackerBuilder::new().context_lines(0).build().unwrap();
        let report = ChangeDetector::new(config).detect(dir.path(), &snapshot).unwrap();

        assert_eq!(
            report.render_log(),
            "Changes for a.txt:\n--- a.txt\n+++ a.txt\n@@ -3 +3 @@\n-3\n+X\n\n"
        );
    }
}
