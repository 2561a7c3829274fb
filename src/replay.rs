//! Change-log replay
//!
//! Replay reads a log written by either detector and re-applies the recorded
//! `old_text -> new_text` pairs to files with the same names in a target
//! directory, typically a second copy of the originally tracked files.
//!
//! ## Rules
//!
//! Each recorded line diff whose sides are both non-empty (after trimming)
//! and different becomes a [`ReplacementRule`]. Appended and removed lines
//! carry no substitution and are not replayed. Where a rule applies is set by
//! [`ReplacePolicy`]:
//!
//! | Policy           | Replaces                                               |
//! |------------------|--------------------------------------------------------|
//! | `AtRecordedLine` | the recorded line, when its trimmed text is the old text (default) |
//! | `FirstMatch`     | first substring occurrence anywhere in the file        |
//! | `AllMatches`     | every substring occurrence in the file                 |
//!
//! A rule that finds nothing to replace is skipped. With `AtRecordedLine` a
//! rule matches whole lines only, so replaying a log onto files it was
//! already applied to is a no-op. The substring policies are not idempotent:
//! when a new text contains its old text (`world` to `world peace`) every
//! replay applies the rule again.
//!
//! ## Errors
//!
//! An unreadable log or a missing target directory stops the replay. A block
//! with an unknown header, a block naming something other than a bare file
//! name and a block whose file is missing from the target are recorded in
//! [`ReplayReport::errors`] and the replay moves on.

use crate::config::{ReplacePolicy, TrackerConfig};
use crate::encoding::{read_text, split_lines_inclusive, write_text_atomic};
use crate::error::{DriftError, Result};
use crate::log::{LogBlock, LogParser};
use crate::types::{ReplacementRule, ReplayReport};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Applies change logs to a target directory
pub struct LogReplayer {
    parser: LogParser,
    policy: ReplacePolicy,
}

impl LogReplayer {
    /// Create a replayer using `policy`
    pub fn new(policy: ReplacePolicy) -> Result<Self> {
        Ok(Self {
            parser: LogParser::new()?,
            policy,
        })
    }

    /// Create a replayer using the configured replacement policy
    pub fn from_config(config: &TrackerConfig) -> Result<Self> {
        Self::new(config.replace_policy)
    }

    /// Replay the log at `log_path` onto `target_directory`
    ///
    /// # Errors
    ///
    /// - [`DriftError::Io`] if the log cannot be read
    /// - [`DriftError::DirectoryNotFound`] if the target directory is missing
    #[instrument(skip(self))]
    pub fn apply_log(&self, log_path: &Path, target_directory: &Path) -> Result<ReplayReport> {
        let log = read_text(log_path)?;
        self.apply_text(&log, target_directory)
    }

    /// Replay log text onto `target_directory`
    pub fn apply_text(&self, log: &str, target_directory: &Path) -> Result<ReplayReport> {
        if !target_directory.is_dir() {
            return Err(DriftError::DirectoryNotFound(target_directory.to_path_buf()));
        }

        let mut report = ReplayReport::default();

        for block in self.parser.parse(log) {
            let outcome = block.and_then(|block| self.apply_block(&block, target_directory, &mut report));
            if let Err(e) = outcome {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!("{}", e);
                report.errors.push(e);
            }
        }

        info!(
            "Replay patched {} files ({} rules applied, {} skipped, {} errors)",
            report.files_patched,
            report.rules_applied,
            report.rules_skipped,
            report.errors.len()
        );
        Ok(report)
    }

    fn apply_block(&self, block: &LogBlock, target_directory: &Path, report: &mut ReplayReport) -> Result<()> {
        if Path::new(&block.filename).file_name() != Some(OsStr::new(&block.filename)) {
            return Err(DriftError::malformed_log(
                block.index,
                format!("{:?} is not a bare file name", block.filename),
            ));
        }
        if block.new_file {
            debug!("Block {}: {} was added, nothing to replay", block.index, block.filename);
            return Ok(());
        }

        let rules = block.rules();
        if rules.is_empty() {
            return Ok(());
        }

        let path = target_directory.join(&block.filename);
        if !path.is_file() {
            return Err(DriftError::TargetFileMissing(path));
        }

        let content = read_text(&path)?;
        let applied = apply_rules(&content, &rules, self.policy);
        report.rules_applied += applied.applied;
        report.rules_skipped += applied.skipped;

        if applied.content != content {
            write_text_atomic(&path, &applied.content)?;
            report.files_patched += 1;
            debug!("Patched {} with {} rules", path.display(), applied.applied);
        }

        Ok(())
    }
}

/// Content after applying rules, with counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedRules {
    /// Rewritten content
    pub content: String,
    /// Rules that replaced something
    pub applied: usize,
    /// Rules whose old text was not found
    pub skipped: usize,
}

/// Apply replacement rules to `content` in order
pub fn apply_rules(content: &str, rules: &[ReplacementRule], policy: ReplacePolicy) -> AppliedRules {
    let mut lines = split_lines_inclusive(content);
    let mut text = content.to_string();
    let mut applied = 0;
    let mut skipped = 0;

    for rule in rules {
        let hit = match policy {
            ReplacePolicy::AtRecordedLine => rule
                .line_number
                .checked_sub(1)
                .and_then(|idx| lines.get_mut(idx))
                .filter(|line| line.trim() == rule.old_text)
                .map(|line| *line = line.replacen(&rule.old_text, &rule.new_text, 1))
                .is_some(),
            ReplacePolicy::FirstMatch if text.contains(&rule.old_text) => {
                text = text.replacen(&rule.old_text, &rule.new_text, 1);
                true
            }
            ReplacePolicy::AllMatches if text.contains(&rule.old_text) => {
                text = text.replace(&rule.old_text, &rule.new_text);
                true
            }
            _ => false,
        };

        if hit {
            applied += 1;
        } else {
            skipped += 1;
        }
    }

    let content = match policy {
        ReplacePolicy::AtRecordedLine => lines.concat(),
        _ => text,
    };
    AppliedRules {
        content,
        applied,
        skipped,
    }
}

/// Replay a change log with the default replacement policy
pub fn apply_log(log_path: &Path, target_directory: &Path) -> Result<ReplayReport> {
    LogReplayer::new(ReplacePolicy::default())?.apply_log(log_path, target_directory)
}
