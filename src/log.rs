//! Change-log format
//!
//! Both detectors write plain-text logs made of blocks separated by blank
//! lines. This module renders those blocks and parses them back into
//! [`LogBlock`]s for replay.
//!
//! ## Batch blocks
//!
//! Regenerated on every batch run, one block per changed file:
//!
//! ```text
//! Changes for notes.txt:
//! --- notes.txt
//! +++ notes.txt
//! @@ -1,2 +1,2 @@
//!  hello
//! -world
//! +there
//!
//! Changes for new.txt:
//! New file added
//! ```
//!
//! ## Live blocks
//!
//! Appended by the monitor, one block per modification event:
//!
//! ```text
//! Modified file: /watched/notes.txt at Thu Oct 16 09:12:44 2026
//! Line 2: Old: world | New: there
//! Replace: "world" -> "there"
//! ```
//!
//! `Replace:` lines are hints for humans; replay recovers its rules from the
//! `Line` records.

use crate::diff::{line_diffs_from_hunks, strip_terminator};
use crate::error::{DriftError, Result};
use crate::types::{ChangeRecord, DiffHunk, LineChange, LineDiff, ReplacementRule};
use regex::Regex;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::Path;

/// Body line written for a file missing from the snapshot
pub const NEW_FILE_MARKER: &str = "New file added";

const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// Render the batch log block for one file, including the blank separator
pub fn render_batch_entry(filename: &str, record: &ChangeRecord) -> String {
    let mut out = format!("Changes for {}:\n", filename);

    match record {
        ChangeRecord::NewFile => {
            out.push_str(NEW_FILE_MARKER);
            out.push('\n');
        }
        ChangeRecord::Modified(change) => {
            let _ = writeln!(out, "--- {}", filename);
            let _ = writeln!(out, "+++ {}", filename);
            for hunk in &change.hunks {
                render_hunk(&mut out, hunk);
            }
        }
    }

    out.push('\n');
    out
}

fn render_hunk(out: &mut String, hunk: &DiffHunk) {
    let _ = writeln!(
        out,
        "@@ -{} +{} @@",
        format_range(hunk.from_line, hunk.from_count),
        format_range(hunk.to_line, hunk.to_count)
    );

    for change in &hunk.changes {
        let prefix = match change {
            LineChange::Context(_, _) => ' ',
            LineChange::Deleted(_, _) => '-',
            LineChange::Added(_, _) => '+',
        };
        let text = change.text();
        out.push(prefix);
        out.push_str(strip_terminator(text));
        out.push('\n');
        if !text.ends_with('\n') {
            out.push_str(NO_NEWLINE_MARKER);
            out.push('\n');
        }
    }
}

fn format_range(start: usize, count: usize) -> String {
    if count == 1 {
        start.to_string()
    } else {
        format!("{},{}", start, count)
    }
}

/// Render a live log block, starting with the blank separator
///
/// One `Replace:` hint is written per distinct (old, new) pair, in line
/// order. An old text rewritten two different ways gets two hints.
pub fn render_live_entry(path: &Path, timestamp: &str, diffs: &[LineDiff]) -> String {
    let mut out = format!("\nModified file: {} at {}\n", path.display(), timestamp);

    for diff in diffs {
        let _ = writeln!(
            out,
            "Line {}: Old: {} | New: {}",
            diff.line_number,
            diff.old_text.trim(),
            diff.new_text.trim()
        );
    }

    let mut seen = HashSet::new();
    for rule in diffs.iter().filter_map(LineDiff::replacement_rule) {
        if seen.insert((rule.old_text.clone(), rule.new_text.clone())) {
            let _ = writeln!(out, "Replace: {:?} -> {:?}", rule.old_text, rule.new_text);
        }
    }

    out
}

/// Which detector produced a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// `Changes for <filename>:`
    Batch,
    /// `Modified file: <path> at <timestamp>`
    Live,
}

/// A parsed log block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogBlock {
    /// 1-based position of the block in the log
    pub index: usize,
    /// Producer of the block
    pub kind: BlockKind,
    /// File the block refers to (final path component)
    pub filename: String,
    /// Whether the block records a new file
    pub new_file: bool,
    /// Line diffs recorded in the block
    pub line_diffs: Vec<LineDiff>,
}

impl LogBlock {
    /// Replacement rules recoverable from the block
    pub fn rules(&self) -> Vec<ReplacementRule> {
        self.line_diffs
            .iter()
            .filter_map(LineDiff::replacement_rule)
            .collect()
    }
}

/// Parser for batch and live change logs
pub struct LogParser {
    batch_header: Regex,
    live_header: Regex,
    live_line: Regex,
    hunk_header: Regex,
}

impl LogParser {
    /// Compile the log grammar
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| DriftError::internal(format!("log grammar: {}", e)))
        };
        Ok(Self {
            batch_header: compile(r"^Changes for (.+):$")?,
            live_header: compile(r"^Modified file: (.+) at (.+)$")?,
            live_line: compile(r"^Line (\d+): Old: (.*?) \| New: ?(.*)$")?,
            hunk_header: compile(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@")?,
        })
    }

    /// Split a log into blocks and parse each one
    ///
    /// A block that cannot be parsed yields a [`DriftError::MalformedLog`]
    /// in its slot; the remaining blocks are still parsed.
    pub fn parse(&self, text: &str) -> Vec<Result<LogBlock>> {
        split_blocks(text)
            .into_iter()
            .enumerate()
            .map(|(i, lines)| self.parse_block(i + 1, &lines))
            .collect()
    }

    fn parse_block(&self, index: usize, lines: &[&str]) -> Result<LogBlock> {
        let (header, body) = lines
            .split_first()
            .ok_or_else(|| DriftError::malformed_log(index, "empty block"))?;

        if let Some(caps) = self.batch_header.captures(header) {
            let filename = caps[1].to_string();
            if body.first() == Some(&NEW_FILE_MARKER) {
                return Ok(LogBlock {
                    index,
                    kind: BlockKind::Batch,
                    filename,
                    new_file: true,
                    line_diffs: Vec::new(),
                });
            }
            let hunks = self.parse_hunks(index, body)?;
            return Ok(LogBlock {
                index,
                kind: BlockKind::Batch,
                filename,
                new_file: false,
                line_diffs: line_diffs_from_hunks(&hunks),
            });
        }

        if let Some(caps) = self.live_header.captures(header) {
            let filename = Path::new(&caps[1])
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string)
                .ok_or_else(|| DriftError::malformed_log(index, format!("no file name in {:?}", &caps[1])))?;
            let line_diffs = self.parse_live_lines(index, body)?;
            return Ok(LogBlock {
                index,
                kind: BlockKind::Live,
                filename,
                new_file: false,
                line_diffs,
            });
        }

        Err(DriftError::malformed_log(
            index,
            format!("unrecognized header {:?}", header),
        ))
    }

    fn parse_hunks(&self, index: usize, body: &[&str]) -> Result<Vec<DiffHunk>> {
        let mut hunks: Vec<DiffHunk> = Vec::new();
        let mut old_line = 0;
        let mut new_line = 0;

        for line in body {
            if let Some(caps) = self.hunk_header.captures(line) {
                let number = |i: usize, default: usize| {
                    caps.get(i)
                        .map_or(Ok(default), |m| m.as_str().parse::<usize>())
                        .map_err(|e| DriftError::malformed_log(index, format!("bad hunk header: {}", e)))
                };
                let from_line = number(1, 0)?;
                let from_count = number(2, 1)?;
                let to_line = number(3, 0)?;
                let to_count = number(4, 1)?;
                old_line = if from_count == 0 { from_line + 1 } else { from_line };
                new_line = if to_count == 0 { to_line + 1 } else { to_line };
                hunks.push(DiffHunk {
                    from_line,
                    from_count,
                    to_line,
                    to_count,
                    changes: Vec::new(),
                });
                continue;
            }

            let Some(hunk) = hunks.last_mut() else {
                // File headers precede the first hunk
                if line.starts_with("--- ") || line.starts_with("+++ ") {
                    continue;
                }
                return Err(DriftError::malformed_log(
                    index,
                    format!("diff line before first hunk: {:?}", line),
                ));
            };

            let text = line.get(1..).unwrap_or("").to_string();
            match line.chars().next() {
                Some(' ') => {
                    hunk.changes.push(LineChange::Context(old_line, text));
                    old_line += 1;
                    new_line += 1;
                }
                Some('-') => {
                    hunk.changes.push(LineChange::Deleted(old_line, text));
                    old_line += 1;
                }
                Some('+') => {
                    hunk.changes.push(LineChange::Added(new_line, text));
                    new_line += 1;
                }
                Some('\\') => {}
                _ => {
                    return Err(DriftError::malformed_log(
                        index,
                        format!("unexpected diff line {:?}", line),
                    ))
                }
            }
        }

        Ok(hunks)
    }

    fn parse_live_lines(&self, index: usize, body: &[&str]) -> Result<Vec<LineDiff>> {
        let mut diffs = Vec::new();

        for line in body {
            if line.starts_with("Replace: ") {
                continue;
            }
            let caps = self.live_line.captures(line).ok_or_else(|| {
                DriftError::malformed_log(index, format!("unexpected line {:?}", line))
            })?;
            let line_number = caps[1]
                .parse::<usize>()
                .map_err(|e| DriftError::malformed_log(index, format!("bad line number: {}", e)))?;
            diffs.push(LineDiff::new(line_number, &caps[2], &caps[3]));
        }

        Ok(diffs)
    }
}

/// Group lines into blocks separated by one or more blank lines
fn split_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in text.lines() {
        if line.trim_end_matches('\r').is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line.trim_end_matches('\r'));
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}
