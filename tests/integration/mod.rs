//! End-to-end scenarios for driftlog
//!
//! Drives the batch detector, the live monitor and replay together against
//! real directories, the way the CLI strings them.

use ::driftlog::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A tracked directory, a mirror copy and a place for state files
pub struct TrackerHarness {
    pub tracked: TempDir,
    pub mirror: TempDir,
    pub state: TempDir,
}

impl TrackerHarness {
    /// Create the harness with the same files in `tracked` and `mirror`
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let harness = Self {
            tracked: TempDir::new().unwrap(),
            mirror: TempDir::new().unwrap(),
            state: TempDir::new().unwrap(),
        };
        for (name, content) in files {
            fs::write(harness.tracked.path().join(name), content).unwrap();
            fs::write(harness.mirror.path().join(name), content).unwrap();
        }
        harness
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.state.path().join("snapshot.json")
    }

    pub fn log_path(&self) -> PathBuf {
        self.state.path().join("changes.log")
    }

    pub fn edit(&self, name: &str, content: &str) -> PathBuf {
        let path = self.tracked.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    /// One CLI-style detect run against the stored snapshot
    pub fn detect_run(&self) -> (DetectionReport, bool) {
        ChangeDetector::default()
            .detect_with_snapshot(self.tracked.path(), &self.log_path(), &self.snapshot_path())
            .unwrap()
    }

    pub fn mirror_content(&self, name: &str) -> String {
        fs::read_to_string(self.mirror.path().join(name)).unwrap()
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

#[test]
fn test_first_detect_run_reports_every_file_as_new() {
    let harness = TrackerHarness::with_files(&[("a.txt", "one\n"), ("b.txt", "two\n")]);

    let (report, first_run) = harness.detect_run();

    assert!(first_run);
    assert_eq!(report.new_files(), 2);
    assert_eq!(report.modified_files(), 0);
    assert!(harness.snapshot_path().exists());
    let log = read(&harness.log_path());
    assert_eq!(log.matches("New file added").count(), 2);

    // Replaying the first log changes nothing in the mirror
    let replayed = replay::apply_log(&harness.log_path(), harness.mirror.path()).unwrap();
    assert!(replayed.is_clean());
    assert_eq!(replayed.files_patched, 0);
}

#[test]
fn test_detect_runs_chain_through_saved_snapshots() {
    let harness = TrackerHarness::with_files(&[("a.txt", "hello\nworld\n")]);
    harness.detect_run();

    harness.edit("a.txt", "hello\nthere\n");
    let (report, first_run) = harness.detect_run();
    assert!(!first_run);
    assert_eq!(report.changes.len(), 1);
    assert!(read(&harness.log_path()).contains("-world\n+there\n"));

    // Nothing changed since the last run: the log is emptied
    let (report, _) = harness.detect_run();
    assert!(report.is_empty());
    assert_eq!(read(&harness.log_path()), "");
}

#[test]
fn test_batch_log_replays_onto_mirror() {
    let original = "fn main() {\n    let x = 1;\n    println!(\"{}\", x);\n}\n";
    let harness = TrackerHarness::with_files(&[("main.txt", original), ("other.txt", "untouched\n")]);
    harness.detect_run();

    harness.edit("main.txt", "fn main() {\n    let x = 2;\n    println!(\"{}\", x);\n}\n");
    harness.detect_run();

    let report = replay::apply_log(&harness.log_path(), harness.mirror.path()).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.files_patched, 1);
    assert_eq!(harness.mirror_content("main.txt"), read(&harness.tracked.path().join("main.txt")));
    assert_eq!(harness.mirror_content("other.txt"), "untouched\n");
}

#[test]
fn test_replay_reports_missing_mirror_file() {
    let harness = TrackerHarness::with_files(&[("a.txt", "old\n")]);
    harness.detect_run();
    harness.edit("a.txt", "new\n");
    harness.detect_run();
    fs::remove_file(harness.mirror.path().join("a.txt")).unwrap();

    let report = replay::apply_log(&harness.log_path(), harness.mirror.path()).unwrap();

    assert_eq!(report.errors.len(), 1);
    assert!(matches!(report.errors[0], DriftError::TargetFileMissing(_)));
}

#[test]
fn test_corrupt_snapshot_stops_detection() {
    let harness = TrackerHarness::with_files(&[("a.txt", "one\n")]);
    fs::write(harness.snapshot_path(), "{ not json").unwrap();

    let err = Snapshot::load_or_initialize(harness.tracked.path(), &harness.snapshot_path()).unwrap_err();

    assert!(err.is_corruption());
    assert!(err.user_message().contains("driftlog snapshot"));
}

#[test]
fn test_legacy_encoded_file_round_trips() {
    let harness = TrackerHarness::with_files(&[]);
    let latin1 = [b'c', b'a', b'f', 0xE9, b'\n'];
    fs::write(harness.tracked.path().join("menu.txt"), latin1).unwrap();
    harness.detect_run();

    let snapshot = Snapshot::load(&harness.snapshot_path()).unwrap();
    assert_eq!(snapshot.get("menu.txt"), Some("café\n"));
}

#[test]
fn test_live_insertion_shifts_positional_diff() {
    let harness = TrackerHarness::with_files(&[]);
    let log_path = harness.state.path().join("live.log");
    let monitor = LiveMonitor::new(harness.tracked.path(), &log_path, &TrackerConfig::default()).unwrap();

    let path = harness.edit("a.txt", "b\nc\n");
    monitor.handle_event(&ModificationEvent::file(&path));
    let before = read(&log_path).len();

    harness.edit("a.txt", "a\nb\nc\n");
    let outcome = monitor.handle_event(&ModificationEvent::file(&path));

    // Every line after the insertion is reported as changed
    assert!(matches!(outcome, EventOutcome::Logged { lines: 3 }));
    let entry = read(&log_path)[before..].to_string();
    assert!(entry.contains("Line 1: Old: b | New: a\n"));
    assert!(entry.contains("Line 2: Old: c | New: b\n"));
    assert!(entry.contains("Line 3: Old:  | New: c\n"));
}

#[test]
fn test_live_revert_mirrors_previous_entry() {
    let harness = TrackerHarness::with_files(&[]);
    let log_path = harness.state.path().join("live.log");
    let monitor = LiveMonitor::new(harness.tracked.path(), &log_path, &TrackerConfig::default()).unwrap();
    let parser = log::LogParser::new().unwrap();

    let path = harness.edit("a.txt", "x\ny\n");
    monitor.handle_event(&ModificationEvent::file(&path));
    harness.edit("a.txt", "x\nz\n");
    monitor.handle_event(&ModificationEvent::file(&path));
    harness.edit("a.txt", "x\ny\n");
    monitor.handle_event(&ModificationEvent::file(&path));

    let blocks: Vec<_> = parser
        .parse(&read(&log_path))
        .into_iter()
        .map(|block| block.unwrap())
        .collect();
    assert_eq!(blocks.len(), 3);
    let forward = &blocks[1].line_diffs;
    let backward = &blocks[2].line_diffs;
    assert_eq!(
        backward,
        &forward.iter().map(LineDiff::mirrored).collect::<Vec<_>>()
    );
}

#[test]
fn test_live_log_replays_onto_mirror() {
    let harness = TrackerHarness::with_files(&[("draft.txt", "Dear sir\nregards\n")]);
    let log_path = harness.state.path().join("live.log");
    let monitor = LiveMonitor::new(harness.tracked.path(), &log_path, &TrackerConfig::default()).unwrap();
    let path = harness.tracked.path().join("draft.txt");

    monitor.handle_event(&ModificationEvent::file(&path));
    harness.edit("draft.txt", "Dear madam\nregards\n");
    monitor.handle_event(&ModificationEvent::file(&path));

    let report = replay::apply_log(&log_path, harness.mirror.path()).unwrap();

    assert!(report.is_clean());
    assert_eq!(harness.mirror_content("draft.txt"), "Dear madam\nregards\n");
}

#[test]
fn test_stop_file_pauses_live_log() {
    let harness = TrackerHarness::with_files(&[]);
    let log_path = harness.state.path().join("live.log");
    let config = TrackerBuilder::new().stop_file_name("PAUSE").build().unwrap();
    let monitor = LiveMonitor::new(harness.tracked.path(), &log_path, &config).unwrap();

    fs::write(harness.tracked.path().join("PAUSE"), "").unwrap();
    let path = harness.edit("a.txt", "quiet\n");
    let outcome = monitor.handle_event(&ModificationEvent::file(&path));

    assert!(matches!(outcome, EventOutcome::Suppressed { .. }));
    assert_eq!(read(&log_path), "");
}
