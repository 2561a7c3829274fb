//! Configuration for detection, monitoring and replay
//!
//! [`TrackerConfig`] holds every tunable shared by the pipelines and is
//! produced by [`TrackerBuilder`], which validates the settings once so the
//! components can trust them.
//!
//! ```rust
//! use driftlog::{ReplacePolicy, TrackerBuilder};
//!
//! let config = TrackerBuilder::new()
//!     .context_lines(1)
//!     .watch_patterns(vec!["*.txt".to_string(), "*.md".to_string()])
//!     .replace_policy(ReplacePolicy::AllMatches)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.context_lines, 1);
//! ```

use crate::error::{DriftError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default name of the file whose presence suppresses live logging
pub const DEFAULT_STOP_FILE: &str = "stop_file.txt";

/// Default number of unchanged lines shown around each batch hunk
pub const DEFAULT_CONTEXT_LINES: usize = 3;

/// How replay applies an `old_text -> new_text` rule to a target file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReplacePolicy {
    /// Rewrite the line the change was recorded at when its trimmed text
    /// equals the old text; replaying twice is a no-op
    #[default]
    AtRecordedLine,
    /// Replace the first substring occurrence anywhere in the file
    FirstMatch,
    /// Replace every substring occurrence in the file
    AllMatches,
}

/// Settings shared by the detector, the monitor and replay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Unchanged lines of context around each batch hunk
    pub context_lines: usize,
    /// File name globs the live monitor reacts to
    pub watch_patterns: Vec<String>,
    /// Name of the sentinel file inside the watched directory
    pub stop_file_name: String,
    /// Whether the live monitor may fall back to Latin-1 decoding
    pub allow_fallback_encoding: bool,
    /// Replacement policy used by replay
    pub replace_policy: ReplacePolicy,
    /// How often the watcher loop wakes up to check for shutdown
    pub poll_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            context_lines: DEFAULT_CONTEXT_LINES,
            watch_patterns: vec!["*.txt".to_string()],
            stop_file_name: DEFAULT_STOP_FILE.to_string(),
            allow_fallback_encoding: true,
            replace_policy: ReplacePolicy::default(),
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl TrackerConfig {
    /// Compile the watch patterns into a matcher
    pub fn watch_matcher(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.watch_patterns {
            builder.add(Glob::new(pattern)?);
        }
        Ok(builder.build()?)
    }

    /// Check that the settings are usable
    pub fn validate(&self) -> Result<()> {
        if self.watch_patterns.is_empty() {
            return Err(DriftError::InvalidConfiguration(
                "at least one watch pattern is required".to_string(),
            ));
        }
        self.watch_matcher()?;

        let stop = Path::new(&self.stop_file_name);
        if self.stop_file_name.is_empty() || stop.file_name() != Some(stop.as_os_str()) {
            return Err(DriftError::InvalidConfiguration(format!(
                "stop file must be a bare file name, got {:?}",
                self.stop_file_name
            )));
        }

        if self.poll_interval.is_zero() {
            return Err(DriftError::InvalidConfiguration(
                "poll interval must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`TrackerConfig`]
#[derive(Debug, Clone, Default)]
pub struct TrackerBuilder {
    config: TrackerConfig,
}

impl TrackerBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of context lines around batch hunks
    pub fn context_lines(mut self, lines: usize) -> Self {
        self.config.context_lines = lines;
        self
    }

    /// Set the file name globs the live monitor reacts to
    ///
    /// Patterns match the file name only, e.g. `*.txt`.
    pub fn watch_patterns(mut self, patterns: Vec<String>) -> Self {
        self.config.watch_patterns = patterns;
        self
    }

    /// Set the sentinel file name
    pub fn stop_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.stop_file_name = name.into();
        self
    }

    /// Allow or forbid the Latin-1 fallback in the live monitor
    ///
    /// When forbidden, files that are not valid UTF-8 are skipped with a
    /// warning instead of being diffed.
    pub fn allow_fallback_encoding(mut self, allow: bool) -> Self {
        self.config.allow_fallback_encoding = allow;
        self
    }

    /// Set the replay replacement policy
    pub fn replace_policy(mut self, policy: ReplacePolicy) -> Self {
        self.config.replace_policy = policy;
        self
    }

    /// Set the watcher wake-up interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Validate and return the configuration
    ///
    /// # Errors
    ///
    /// - [`DriftError::InvalidPattern`] if a watch pattern does not compile
    /// - [`DriftError::InvalidConfiguration`] for an empty pattern list, a stop
    ///   file name containing a path separator or a zero poll interval
    pub fn build(self) -> Result<TrackerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
