//! Line-level diff computation for text files
//!
//! Two engines live here and they are deliberately different:
//!
//! - [`compute_aligned_diff`] finds the Longest Common Subsequence (LCS) of
//!   the two line sequences and groups the differences into unified-diff
//!   hunks with configurable context. A line inserted at the top of a file
//!   shows up as a single insertion. The batch detector uses it.
//! - [`positional_diff`] compares lines strictly by index after padding the
//!   shorter side with empty lines. A line inserted at the top reports every
//!   following line as changed. The live monitor uses it.
//!
//! Lines are compared with their terminators, so a missing final newline is a
//! difference. [`LineDiff`] texts are reported without the terminator.
//!
//! ## Resource use
//!
//! After the common prefix and suffix are trimmed, the LCS table holds one
//! `u32` per pair of differing lines. Past [`LCS_CELL_LIMIT`] cells (64 MiB)
//! the differing region is reported as a block replacement instead: every
//! old line deleted, then every new line inserted. Replay still pairs those
//! lines by index.
//!
//! ## Examples
//!
//! ```rust
//! use driftlog::diff::{compute_aligned_diff, line_diffs_from_hunks};
//! use driftlog::encoding::split_lines_inclusive;
//! use driftlog::types::LineDiff;
//!
//! let old = split_lines_inclusive("hello\nworld\n");
//! let new = split_lines_inclusive("hello\nthere\n");
//!
//! let hunks = compute_aligned_diff(&old, &new, 3);
//! assert_eq!(line_diffs_from_hunks(&hunks), vec![LineDiff::new(2, "world", "there")]);
//! ```

use crate::types::{DiffHunk, LineChange, LineDiff};
use tracing::debug;

/// Largest LCS table, in cells, built for one differing region
pub const LCS_CELL_LIMIT: usize = 16 * 1024 * 1024;

/// Represents a change operation in the diff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeOp {
    Keep(usize, usize), // (old_line_idx, new_line_idx)
    Delete(usize),      // old_line_idx
    Insert(usize),      // new_line_idx
}

impl ChangeOp {
    fn is_change(&self) -> bool {
        !matches!(self, ChangeOp::Keep(_, _))
    }
}

/// Compute the aligned diff between two line sequences
///
/// Returns hunks in file order. Identical inputs produce no hunks.
pub fn compute_aligned_diff(old_lines: &[String], new_lines: &[String], context_lines: usize) -> Vec<DiffHunk> {
    let changes = compute_changes(old_lines, new_lines);
    create_hunks(&changes, old_lines, new_lines, context_lines)
}

/// Compute the sequence of change operations
///
/// The common prefix and suffix are matched directly so the quadratic LCS
/// table only covers the region that actually differs.
fn compute_changes(old_lines: &[String], new_lines: &[String]) -> Vec<ChangeOp> {
    compute_changes_within(old_lines, new_lines, LCS_CELL_LIMIT)
}

fn compute_changes_within(old_lines: &[String], new_lines: &[String], cell_limit: usize) -> Vec<ChangeOp> {
    let prefix = old_lines
        .iter()
        .zip(new_lines)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old_lines[prefix..]
        .iter()
        .rev()
        .zip(new_lines[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old_lines[prefix..old_lines.len() - suffix];
    let new_mid = &new_lines[prefix..new_lines.len() - suffix];

    let mut changes: Vec<ChangeOp> = (0..prefix).map(|i| ChangeOp::Keep(i, i)).collect();

    let cells = old_mid.len().saturating_mul(new_mid.len());
    let lcs = if cells > cell_limit {
        debug!(
            "Differing region is {}x{} lines, reporting it as a block replacement",
            old_mid.len(),
            new_mid.len()
        );
        Vec::new()
    } else {
        compute_lcs(old_mid, new_mid)
    };
    changes.extend(
        lcs_to_changes(&lcs, old_mid.len(), new_mid.len())
            .into_iter()
            .map(|op| match op {
                ChangeOp::Keep(o, n) => ChangeOp::Keep(o + prefix, n + prefix),
                ChangeOp::Delete(o) => ChangeOp::Delete(o + prefix),
                ChangeOp::Insert(n) => ChangeOp::Insert(n + prefix),
            }),
    );

    let old_tail = old_lines.len() - suffix;
    let new_tail = new_lines.len() - suffix;
    changes.extend((0..suffix).map(|i| ChangeOp::Keep(old_tail + i, new_tail + i)));

    changes
}

/// Compute longest common subsequence using dynamic programming
fn compute_lcs(old_lines: &[String], new_lines: &[String]) -> Vec<(usize, usize)> {
    let m = old_lines.len();
    let n = new_lines.len();
    if m == 0 || n == 0 {
        return Vec::new();
    }

    // Build DP table
    let mut dp = vec![vec![0u32; n + 1]; m + 1];

    for i in 1..=m {
        for j in 1..=n {
            if old_lines[i - 1] == new_lines[j - 1] {
                dp[i][j] = dp[i - 1][j - 1] + 1;
            } else {
                dp[i][j] = dp[i - 1][j].max(dp[i][j - 1]);
            }
        }
    }

    // Backtrack to find LCS
    let mut lcs = Vec::new();
    let mut i = m;
    let mut j = n;

    while i > 0 && j > 0 {
        if old_lines[i - 1] == new_lines[j - 1] {
            lcs.push((i - 1, j - 1));
            i -= 1;
            j -= 1;
        } else if dp[i - 1][j] > dp[i][j - 1] {
            i -= 1;
        } else {
            j -= 1;
        }
    }

    lcs.reverse();
    lcs
}

/// Convert LCS to a sequence of change operations
///
/// Deletions are emitted before insertions inside each changed region.
fn lcs_to_changes(lcs: &[(usize, usize)], old_len: usize, new_len: usize) -> Vec<ChangeOp> {
    let mut changes = Vec::with_capacity(old_len.max(new_len));
    let mut old_idx = 0;
    let mut new_idx = 0;

    for &(lcs_old, lcs_new) in lcs {
        while old_idx < lcs_old {
            changes.push(ChangeOp::Delete(old_idx));
            old_idx += 1;
        }
        while new_idx < lcs_new {
            changes.push(ChangeOp::Insert(new_idx));
            new_idx += 1;
        }
        changes.push(ChangeOp::Keep(old_idx, new_idx));
        old_idx += 1;
        new_idx += 1;
    }

    while old_idx < old_len {
        changes.push(ChangeOp::Delete(old_idx));
        old_idx += 1;
    }
    while new_idx < new_len {
        changes.push(ChangeOp::Insert(new_idx));
        new_idx += 1;
    }

    changes
}

/// Group change operations into hunks
///
/// Two changes end up in the same hunk when at most `2 * context_lines`
/// unchanged lines separate them.
fn create_hunks(
    changes: &[ChangeOp],
    old_lines: &[String],
    new_lines: &[String],
    context_lines: usize,
) -> Vec<DiffHunk> {
    let change_positions: Vec<usize> = changes
        .iter()
        .enumerate()
        .filter(|(_, op)| op.is_change())
        .map(|(i, _)| i)
        .collect();

    let Some(&first) = change_positions.first() else {
        return Vec::new();
    };

    // Ranges of op indices (inclusive) covered by each hunk
    let mut groups = Vec::new();
    let mut group_start = first;
    let mut group_end = first;
    for &pos in &change_positions[1..] {
        if pos - group_end - 1 > 2 * context_lines {
            groups.push((group_start, group_end));
            group_start = pos;
        }
        group_end = pos;
    }
    groups.push((group_start, group_end));

    // Old and new lines consumed before each op
    let mut consumed = Vec::with_capacity(changes.len());
    let (mut old_seen, mut new_seen) = (0usize, 0usize);
    for op in changes {
        consumed.push((old_seen, new_seen));
        match op {
            ChangeOp::Keep(_, _) => {
                old_seen += 1;
                new_seen += 1;
            }
            ChangeOp::Delete(_) => old_seen += 1,
            ChangeOp::Insert(_) => new_seen += 1,
        }
    }

    groups
        .into_iter()
        .map(|(start, end)| {
            let start = start.saturating_sub(context_lines);
            let end = (end + context_lines).min(changes.len() - 1);
            let (old_before, new_before) = consumed[start];

            let mut hunk = HunkBuilder::new(old_before, new_before);
            for op in &changes[start..=end] {
                match *op {
                    ChangeOp::Keep(o, _) => hunk.add_context(o, &old_lines[o]),
                    ChangeOp::Delete(o) => hunk.add_deletion(o, &old_lines[o]),
                    ChangeOp::Insert(n) => hunk.add_insertion(n, &new_lines[n]),
                }
            }
            hunk.build()
        })
        .collect()
}

/// Helper for building diff hunks
struct HunkBuilder {
    old_before: usize,
    new_before: usize,
    from_count: usize,
    to_count: usize,
    changes: Vec<LineChange>,
}

impl HunkBuilder {
    fn new(old_before: usize, new_before: usize) -> Self {
        Self {
            old_before,
            new_before,
            from_count: 0,
            to_count: 0,
            changes: Vec::new(),
        }
    }

    fn add_context(&mut self, old_idx: usize, content: &str) {
        self.from_count += 1;
        self.to_count += 1;
        self.changes.push(LineChange::Context(old_idx + 1, content.to_string()));
    }

    fn add_deletion(&mut self, old_idx: usize, content: &str) {
        self.from_count += 1;
        self.changes.push(LineChange::Deleted(old_idx + 1, content.to_string()));
    }

    fn add_insertion(&mut self, new_idx: usize, content: &str) {
        self.to_count += 1;
        self.changes.push(LineChange::Added(new_idx + 1, content.to_string()));
    }

    fn build(self) -> DiffHunk {
        // An empty range starts at the line before it, as in unified diffs
        let start = |before: usize, count: usize| if count == 0 { before } else { before + 1 };
        DiffHunk {
            from_line: start(self.old_before, self.from_count),
            from_count: self.from_count,
            to_line: start(self.new_before, self.to_count),
            to_count: self.to_count,
            changes: self.changes,
        }
    }
}

/// Derive line diffs from aligned hunks
///
/// Each run of deleted lines is paired index by index with the run of added
/// lines that follows it. Paired and deleted lines carry their old line
/// number, unpaired additions their new line number.
pub fn line_diffs_from_hunks(hunks: &[DiffHunk]) -> Vec<LineDiff> {
    let mut diffs = Vec::new();

    for hunk in hunks {
        let mut deleted: Vec<(usize, &str)> = Vec::new();
        let mut added: Vec<(usize, &str)> = Vec::new();

        for change in &hunk.changes {
            match change {
                LineChange::Deleted(line, text) => {
                    if !added.is_empty() {
                        flush_run(&mut diffs, &mut deleted, &mut added);
                    }
                    deleted.push((*line, text.as_str()));
                }
                LineChange::Added(line, text) => added.push((*line, text.as_str())),
                LineChange::Context(_, _) => flush_run(&mut diffs, &mut deleted, &mut added),
            }
        }
        flush_run(&mut diffs, &mut deleted, &mut added);
    }

    diffs
}

fn flush_run(diffs: &mut Vec<LineDiff>, deleted: &mut Vec<(usize, &str)>, added: &mut Vec<(usize, &str)>) {
    for k in 0..deleted.len().max(added.len()) {
        let old = deleted.get(k);
        let new = added.get(k);
        let line_number = old.or(new).map(|(line, _)| *line).unwrap_or_default();
        diffs.push(LineDiff::new(
            line_number,
            old.map(|(_, text)| strip_terminator(text)).unwrap_or(""),
            new.map(|(_, text)| strip_terminator(text)).unwrap_or(""),
        ));
    }
    deleted.clear();
    added.clear();
}

/// Compare two line sequences index by index
///
/// The shorter sequence is padded with empty lines. Every index where the
/// lines differ yields a [`LineDiff`] at `index + 1`.
pub fn positional_diff(old_lines: &[String], new_lines: &[String]) -> Vec<LineDiff> {
    let len = old_lines.len().max(new_lines.len());

    (0..len)
        .filter_map(|i| {
            let old = old_lines.get(i).map(String::as_str).unwrap_or("");
            let new = new_lines.get(i).map(String::as_str).unwrap_or("");
            (old != new).then(|| LineDiff::new(i + 1, strip_terminator(old), strip_terminator(new)))
        })
        .collect()
}

/// Remove a trailing `\n` or `\r\n`
pub fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
