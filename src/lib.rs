//! # driftlog - Line-level change tracking for flat directories
//!
//! driftlog records how the text files in a directory change over time and
//! replays those changes onto another copy of the same files.
//!
//! ## Overview
//!
//! - **Snapshots**: capture the full text of every file directly under a
//!   directory and persist it as the baseline for the next comparison
//! - **Batch detection**: compare a directory against a snapshot, write a
//!   unified-diff log of every new or modified file and return the updated
//!   snapshot
//! - **Live monitoring**: react to file system modification events, diff each
//!   file against the last version seen in this session and append
//!   timestamped entries to a log as changes happen
//! - **Replay**: parse either kind of log and re-apply the recorded
//!   substitutions to files in a target directory
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use driftlog::{ChangeDetector, LogReplayer, ReplacePolicy, TrackerConfig};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let notes = Path::new("./notes");
//! let snapshot_path = Path::new("./notes.snapshot.json");
//! let detector = ChangeDetector::new(TrackerConfig::default());
//!
//! // The first run logs every file as new and stores the baseline
//! detector.detect_with_snapshot(notes, Path::new("changes.log"), snapshot_path)?;
//!
//! // ... files are edited ...
//!
//! // Later runs log what changed and move the baseline forward
//! let (report, _first_run) = detector.detect_with_snapshot(notes, Path::new("changes.log"), snapshot_path)?;
//! println!("{} files changed", report.changes.len());
//!
//! // Apply the same edits to a second copy
//! let replayer = LogReplayer::new(ReplacePolicy::AtRecordedLine)?;
//! let replayed = replayer.apply_log(Path::new("changes.log"), Path::new("./notes-copy"))?;
//! println!("Patched {} files", replayed.files_patched);
//! # Ok(())
//! # }
//! ```
//!
//! ## Live Monitoring
//!
//! ```rust,no_run
//! use driftlog::{LiveMonitor, NotifySource, ShutdownSignal, TrackerConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TrackerConfig::default();
//! let monitor = LiveMonitor::new("./notes", "live.log", &config)?;
//!
//! let shutdown = ShutdownSignal::new();
//! let source = NotifySource::new(config.poll_interval, shutdown.clone());
//! let stats = monitor.run(source, &shutdown)?;
//! println!("Logged {} entries", stats.entries_logged);
//! # Ok(())
//! # }
//! ```
//!
//! ## Two Diff Engines
//!
//! Batch detection aligns lines using their longest common subsequence, so a
//! single inserted line is reported as one insertion. The live monitor
//! compares lines by position, so the same insertion reports every later
//! line as changed. Both behaviors are intentional; see [`diff`].
//!
//! ## Error Handling
//!
//! All operations return `Result<T, DriftError>`. Pre-flight problems (a
//! missing directory, a corrupt snapshot) abort the operation; per-file
//! problems during replay and live monitoring are collected or reported and
//! the run continues.
//!
//! ## Module Organization
//!
//! - [`snapshot`]: Snapshot capture and persistence
//! - [`detector`]: Batch change detection
//! - [`monitor`]: Live change monitoring
//! - [`watcher`]: File system event sources
//! - [`replay`]: Change-log replay
//! - [`log`]: Log rendering and parsing
//! - [`diff`]: Aligned and positional line diffs
//! - [`encoding`]: Encoding-safe text I/O
//! - [`config`]: Configuration and builder
//! - [`types`]: Common types and data structures
//! - [`error`]: Error types and handling

// Public API modules
pub mod config;
pub mod detector;
pub mod diff;
pub mod encoding;
pub mod error;
pub mod log;
pub mod monitor;
pub mod replay;
pub mod snapshot;
pub mod types;
pub mod watcher;

// Internal modules (not part of public API)
mod utils;

// Re-export main types for convenience
pub use config::{ReplacePolicy, TrackerBuilder, TrackerConfig};
pub use detector::{ChangeDetector, DetectionReport};
pub use error::{DriftError, Result};
pub use monitor::LiveMonitor;
pub use replay::LogReplayer;
pub use snapshot::Snapshot;
pub use types::*;
pub use watcher::{EventSource, NotifySource, ShutdownSignal};
