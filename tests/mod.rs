//! Main test module for driftlog
//!
//! This module includes all test suites:
//! - Integration tests for end-to-end detection, monitoring and replay
//! - Property-based tests for invariants

pub mod integration;
pub mod property;

#[cfg(test)]
mod edge_cases {
    use ::driftlog::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let snapshot = Snapshot::initialize(temp_dir.path()).unwrap();
        assert!(snapshot.is_empty());

        fs::write(temp_dir.path().join("file.txt"), "content\n").unwrap();
        let report = ChangeDetector::default().detect(temp_dir.path(), &snapshot).unwrap();
        assert_eq!(report.changes.get("file.txt"), Some(&ChangeRecord::NewFile));
    }

    #[test]
    fn test_special_filenames() {
        let temp_dir = TempDir::new().unwrap();
        let state_dir = TempDir::new().unwrap();
        let log_path = state_dir.path().join("changes.log");

        let special_names = vec![
            "file with spaces.txt",
            "file-with-dashes.txt",
            "file.with.dots.txt",
            "file(with)parens.txt",
            "file: colon.txt",
        ];

        let mut written = Vec::new();
        for name in &special_names {
            // Skip if OS doesn't support this filename
            if fs::write(temp_dir.path().join(name), "before\n").is_ok() {
                written.push(*name);
            }
        }

        let snapshot = Snapshot::initialize(temp_dir.path()).unwrap();
        for name in &written {
            fs::write(temp_dir.path().join(name), "after\n").unwrap();
        }
        ChangeDetector::default()
            .detect_and_log(temp_dir.path(), &log_path, &snapshot)
            .unwrap();

        // Reset the files and replay the log onto them
        for name in &written {
            fs::write(temp_dir.path().join(name), "before\n").unwrap();
        }
        let report = replay::apply_log(&log_path, temp_dir.path()).unwrap();

        assert!(report.is_clean(), "errors: {:?}", report.errors);
        assert_eq!(report.files_patched, written.len());
        for name in &written {
            assert_eq!(fs::read_to_string(temp_dir.path().join(name)).unwrap(), "after\n");
        }
    }

    #[test]
    fn test_file_without_trailing_newline() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "one\ntwo").unwrap();
        let snapshot = Snapshot::initialize(temp_dir.path()).unwrap();

        fs::write(temp_dir.path().join("a.txt"), "one\ntwo\n").unwrap();
        let report = ChangeDetector::default().detect(temp_dir.path(), &snapshot).unwrap();

        // Only the terminator changed; the recorded texts are identical
        let record = report.changes.get("a.txt").unwrap();
        assert_eq!(record.line_diffs(), &[LineDiff::new(2, "two", "two")]);
        assert!(report.render_log().contains("\\ No newline at end of file"));
    }

    #[test]
    fn test_subdirectories_are_not_descended() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        fs::write(temp_dir.path().join("nested").join("inner.txt"), "x\n").unwrap();
        fs::write(temp_dir.path().join("top.txt"), "y\n").unwrap();

        let snapshot = Snapshot::initialize(temp_dir.path()).unwrap();
        assert_eq!(snapshot.filenames().collect::<Vec<_>>(), vec!["top.txt"]);
    }
}
