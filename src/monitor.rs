//! Live change monitoring
//!
//! A [`LiveMonitor`] reacts to modification events for files in one watched
//! directory. It keeps the last seen lines of every file in a session cache,
//! computes a positional line diff on each event and appends a timestamped
//! entry to the live log.
//!
//! ## Per-file states
//!
//! ```text
//! Idle --(first event)--> Tracked --(every later event)--> Tracked
//! ```
//!
//! The first event for a file diffs against an empty baseline, so its whole
//! content is logged as appended lines.
//!
//! ## Stop sentinel
//!
//! While a file named `stop_file.txt` (configurable) exists in the watched
//! directory, nothing is written to the log. Monitoring itself continues and
//! the session cache still follows every change, so removing the sentinel
//! resumes diffing from the current content.
//!
//! ## Own log file
//!
//! The log may live inside the watched directory. Events for the log file
//! itself are ignored, otherwise every append would be diffed and logged
//! again.
//!
//! ## Ordering
//!
//! All per-event work, from reading the file to appending the log entry and
//! updating the cache, runs under one lock. Events are therefore handled
//! strictly one at a time even if several threads share a monitor, and log
//! entries never interleave. The cache is never pruned: it grows with the
//! number of distinct files seen during the process lifetime.

use crate::config::TrackerConfig;
use crate::diff::positional_diff;
use crate::encoding::{read_text_with, split_lines_inclusive};
use crate::error::{DriftError, Result};
use crate::log::render_live_entry;
use crate::types::{EventOutcome, LineDiff, ModificationEvent, MonitorStats};
use crate::utils::file_name_of;
use crate::watcher::{EventSource, ShutdownSignal};
use chrono::Local;
use globset::GlobSet;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Mutable state guarded by the monitor lock
#[derive(Debug, Default)]
struct MonitorState {
    cache: HashMap<PathBuf, Vec<String>>,
    stats: MonitorStats,
}

/// Event-driven change logger for one directory
#[derive(Debug)]
pub struct LiveMonitor {
    directory: PathBuf,
    log_path: PathBuf,
    log_identity: PathBuf,
    stop_file: PathBuf,
    matcher: GlobSet,
    allow_fallback: bool,
    state: Mutex<MonitorState>,
}

impl LiveMonitor {
    /// Create a monitor for `directory` logging to `log_path`
    ///
    /// # Errors
    ///
    /// - [`DriftError::DirectoryNotFound`] if `directory` does not exist
    /// - [`DriftError::InvalidPattern`] if a watch pattern does not compile
    pub fn new(directory: impl Into<PathBuf>, log_path: impl Into<PathBuf>, config: &TrackerConfig) -> Result<Self> {
        let directory = directory.into();
        if !directory.is_dir() {
            return Err(DriftError::DirectoryNotFound(directory));
        }
        config.validate()?;
        let log_path = log_path.into();

        Ok(Self {
            log_identity: resolve_path(&log_path),
            log_path,
            stop_file: directory.join(&config.stop_file_name),
            matcher: config.watch_matcher()?,
            allow_fallback: config.allow_fallback_encoding,
            directory,
            state: Mutex::new(MonitorState::default()),
        })
    }

    /// Watched directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the sentinel stop file
    pub fn stop_file(&self) -> &Path {
        &self.stop_file
    }

    /// Whether the sentinel currently suppresses logging
    pub fn is_suppressed(&self) -> bool {
        self.stop_file.exists()
    }

    /// Handle one modification event
    ///
    /// Read failures are reported through [`EventOutcome::Skipped`] and
    /// leave the cache untouched; they never stop the monitor.
    pub fn handle_event(&self, event: &ModificationEvent) -> EventOutcome {
        let mut state = self.state.lock();
        state.stats.events_seen += 1;

        if event.is_directory || !self.is_watched(&event.path) || self.is_own_log(&event.path) {
            return EventOutcome::Ignored;
        }

        let content = match read_text_with(&event.path, self.allow_fallback) {
            Ok(content) => content,
            Err(e) => {
                warn!("Error reading file {}: {}", event.path.display(), e);
                state.stats.events_skipped += 1;
                return EventOutcome::Skipped(e);
            }
        };

        let new_lines = split_lines_inclusive(&content);
        let diffs = {
            let old_lines = state.cache.get(&event.path).map(Vec::as_slice).unwrap_or(&[]);
            positional_diff(old_lines, &new_lines)
        };

        let outcome = if diffs.is_empty() {
            EventOutcome::Unchanged
        } else if self.is_suppressed() {
            info!(
                "Not logging changes to {} while {} exists",
                event.path.display(),
                self.stop_file.display()
            );
            state.stats.entries_suppressed += 1;
            EventOutcome::Suppressed { lines: diffs.len() }
        } else if let Err(e) = self.append_entry(&event.path, &diffs) {
            warn!("Failed to append to {}: {}", self.log_path.display(), e);
            state.stats.events_skipped += 1;
            return EventOutcome::Skipped(e);
        } else {
            debug!("Logged {} changed lines for {}", diffs.len(), event.path.display());
            state.stats.entries_logged += 1;
            EventOutcome::Logged { lines: diffs.len() }
        };

        state.cache.insert(event.path.clone(), new_lines);
        outcome
    }

    /// Subscribe to `source` and handle events until it ends or `shutdown` fires
    ///
    /// The shutdown flag is checked between events, so an entry being
    /// appended is always completed.
    #[instrument(skip(self, source, shutdown), fields(directory = %self.directory.display()))]
    pub fn run<S: EventSource>(&self, source: S, shutdown: &ShutdownSignal) -> Result<MonitorStats> {
        let events = source.subscribe(&self.directory)?;
        info!("Monitoring changes, logging to {}", self.log_path.display());

        for event in events {
            if shutdown.is_triggered() {
                break;
            }
            match event {
                Ok(event) => {
                    self.handle_event(&event);
                }
                Err(e) => warn!("Watch error: {}", e),
            }
        }

        info!("Monitoring stopped");
        Ok(self.stats())
    }

    /// Counters so far
    pub fn stats(&self) -> MonitorStats {
        self.state.lock().stats.clone()
    }

    /// Content cached for `path`, if it has been seen
    pub fn cached_content(&self, path: &Path) -> Option<String> {
        self.state.lock().cache.get(path).map(|lines| lines.concat())
    }

    /// Number of files in the session cache
    pub fn tracked_files(&self) -> usize {
        self.state.lock().cache.len()
    }

    fn is_watched(&self, path: &Path) -> bool {
        file_name_of(path).is_some_and(|name| self.matcher.is_match(name))
    }

    fn is_own_log(&self, path: &Path) -> bool {
        path.file_name() == self.log_identity.file_name() && resolve_path(path) == self.log_identity
    }

    fn append_entry(&self, path: &Path, diffs: &[LineDiff]) -> Result<()> {
        let entry = render_live_entry(path, &timestamp(), diffs);
        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        log.write_all(entry.as_bytes())?;
        Ok(())
    }
}

/// Canonical form of `path`, resolving the parent when the file does not exist yet
fn resolve_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    match (parent.canonicalize(), path.file_name()) {
        (Ok(parent), Some(name)) => parent.join(name),
        _ => path.to_path_buf(),
    }
}

/// Local time in `ctime` layout, e.g. `Thu Oct 16 09:12:44 2026`
fn timestamp() -> String {
    Local::now().format("%a %b %e %H:%M:%S %Y").to_string()
}
