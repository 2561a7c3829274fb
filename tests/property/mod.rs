//! Property-based testing for driftlog
//!
//! Uses proptest to verify invariants of detection, the positional diff and
//! replay across randomly generated directories and edits.

use ::driftlog::diff::positional_diff;
use ::driftlog::encoding::split_lines_inclusive;
use ::driftlog::*;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

/// Generate file names that are valid on every platform
fn filename_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "file[0-9]{1,3}\\.txt".prop_map(|s| s),
        "[a-z]{1,8}\\.(txt|md|log)".prop_map(|s| s),
        "[a-z]{3,10}".prop_map(|s| s),
    ]
}

/// Generate text content, including empty files and missing final newlines
fn content_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 \n]{0,400}".prop_map(|s| s),
        prop::collection::vec("[a-z ]{0,20}", 0..30).prop_map(|lines| lines.join("\n")),
        Just(String::new()),
    ]
}

/// A directory listing: file name to content
fn directory_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map(filename_strategy(), content_strategy(), 0..12)
}

/// How one line of a document is edited
#[derive(Debug, Clone)]
enum LineEdit {
    Keep,
    /// Replace the whole line
    Replace(String),
    /// Keep the line and append to it, so the new text contains the old
    Extend(String),
}

fn line_edit_strategy() -> impl Strategy<Value = LineEdit> {
    prop_oneof![
        Just(LineEdit::Keep),
        "[n-z]{1,8}".prop_map(LineEdit::Replace),
        "[a-z]{1,8}".prop_map(LineEdit::Extend),
    ]
}

/// A file as unique lines plus an edit per line
///
/// Original lines are numbered so no two are equal, and whole-line
/// replacements come from a disjoint alphabet. Extensions append a word,
/// which leaves the original text inside the new line.
fn edited_file_strategy() -> impl Strategy<Value = (Vec<String>, Vec<String>)> {
    prop::collection::vec(("[a-m]{1,8}", line_edit_strategy()), 1..40).prop_map(|lines| {
        lines
            .into_iter()
            .enumerate()
            .map(|(i, (word, edit))| {
                let line = format!("l{} {}", i, word);
                let edited = match edit {
                    LineEdit::Keep => line.clone(),
                    LineEdit::Replace(text) => text,
                    LineEdit::Extend(suffix) => format!("{} {}", line, suffix),
                };
                (line, edited)
            })
            .unzip()
    })
}

fn join_lines(lines: &[String]) -> String {
    lines.iter().map(|line| format!("{}\n", line)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Detection against a snapshot of the same directory finds nothing
    #[test]
    fn identical_snapshot_reports_nothing(files in directory_strategy()) {
        let temp_dir = TempDir::new().unwrap();
        for (name, content) in &files {
            fs::write(temp_dir.path().join(name), content).unwrap();
        }

        let snapshot = Snapshot::initialize(temp_dir.path()).unwrap();
        let report = ChangeDetector::default().detect(temp_dir.path(), &snapshot).unwrap();

        prop_assert!(report.is_empty());
        prop_assert_eq!(report.snapshot, snapshot);
    }

    /// Reverting a live edit yields the mirrored line diffs
    #[test]
    fn positional_revert_is_mirrored(
        before in content_strategy(),
        after in content_strategy(),
    ) {
        let before = split_lines_inclusive(&before);
        let after = split_lines_inclusive(&after);

        let forward = positional_diff(&before, &after);
        let backward = positional_diff(&after, &before);

        prop_assert_eq!(backward, forward.iter().map(LineDiff::mirrored).collect::<Vec<_>>());
    }

    /// Replaying a batch log reproduces the edits, and replaying it again changes nothing
    #[test]
    fn batch_replay_is_idempotent(
        (original, edited) in edited_file_strategy(),
        context in 0usize..4,
    ) {
        let tracked = TempDir::new().unwrap();
        let mirror = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        let log_path = state.path().join("changes.log");

        fs::write(tracked.path().join("doc.txt"), join_lines(&original)).unwrap();
        fs::write(mirror.path().join("doc.txt"), join_lines(&original)).unwrap();
        let snapshot = Snapshot::initialize(tracked.path()).unwrap();

        fs::write(tracked.path().join("doc.txt"), join_lines(&edited)).unwrap();
        let config = TrackerBuilder::new().context_lines(context).build().unwrap();
        ChangeDetector::new(config)
            .detect_and_log(tracked.path(), &log_path, &snapshot)
            .unwrap();

        let first = replay::apply_log(&log_path, mirror.path()).unwrap();
        prop_assert!(first.is_clean());
        let once = fs::read_to_string(mirror.path().join("doc.txt")).unwrap();
        prop_assert_eq!(&once, &join_lines(&edited));

        let second = replay::apply_log(&log_path, mirror.path()).unwrap();
        prop_assert_eq!(second.files_patched, 0);
        prop_assert_eq!(second.rules_applied, 0);
        let twice = fs::read_to_string(mirror.path().join("doc.txt")).unwrap();
        prop_assert_eq!(once, twice);
    }
}
