//! # driftlog CLI - Line-level change tracking
//!
//! Command-line front end for the driftlog library.
//!
//! ## Usage
//! ```bash
//! # Capture a baseline explicitly
//! driftlog snapshot ./notes notes.snapshot.json
//!
//! # Log what changed since the last run and move the baseline forward
//! driftlog detect ./notes changes.log notes.snapshot.json
//!
//! # Log changes as they happen (Ctrl-C to stop)
//! driftlog watch ./notes live.log
//!
//! # Apply a log to a second copy of the files
//! driftlog replay changes.log ./notes-copy
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use driftlog::{
    ChangeDetector, DriftError, LiveMonitor, LogReplayer, NotifySource, ReplacePolicy, ShutdownSignal, Snapshot,
    TrackerBuilder,
};
use humantime::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// driftlog - Track, log and replay line-level changes in a directory
#[derive(Parser)]
#[command(name = "driftlog")]
#[command(version)]
#[command(about = "Track, log and replay line-level changes to the text files in a directory")]
#[command(long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture the directory's current contents as a snapshot
    Snapshot {
        /// Directory to capture
        directory: PathBuf,

        /// Where to write the snapshot
        snapshot_path: PathBuf,
    },

    /// Log changes since the last snapshot and update it
    Detect {
        /// Directory to compare
        directory: PathBuf,

        /// Log file to regenerate
        log_path: PathBuf,

        /// Snapshot to compare against (created if missing)
        snapshot_path: PathBuf,

        /// Number of context lines around each change
        #[arg(long, default_value_t = driftlog::config::DEFAULT_CONTEXT_LINES)]
        context: usize,
    },

    /// Log changes to files as they are modified
    Watch {
        /// Directory to monitor
        folder_to_watch: PathBuf,

        /// Log file to append to
        log_file: PathBuf,

        /// File name patterns to monitor
        #[arg(short, long = "pattern")]
        patterns: Vec<String>,

        /// Skip files that are not valid UTF-8 instead of decoding them as Latin-1
        #[arg(long)]
        strict: bool,
    },

    /// Apply a change log to another copy of the files
    Replay {
        /// Log written by `detect` or `watch`
        log_path: PathBuf,

        /// Directory holding the files to patch
        target_directory: PathBuf,

        /// Which occurrences of the old text are replaced
        #[arg(long, value_enum, default_value = "line")]
        policy: PolicyMode,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum PolicyMode {
    /// The recorded line, when it still reads the old text
    Line,
    /// The first substring occurrence in the file
    First,
    /// Every substring occurrence in the file
    All,
}

impl From<PolicyMode> for ReplacePolicy {
    fn from(mode: PolicyMode) -> Self {
        match mode {
            PolicyMode::Line => ReplacePolicy::AtRecordedLine,
            PolicyMode::First => ReplacePolicy::FirstMatch,
            PolicyMode::All => ReplacePolicy::AllMatches,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Disable colors if needed
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        let message = match e.downcast_ref::<DriftError>() {
            Some(err) => err.user_message(),
            None => format!("{:#}", e),
        };
        eprintln!("{}: {}", "Error".red().bold(), message);
        std::process::exit(1);
    }
}

/// Main command runner
fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Snapshot {
            directory,
            snapshot_path,
        } => cmd_snapshot(directory, snapshot_path),
        Commands::Detect {
            directory,
            log_path,
            snapshot_path,
            context,
        } => cmd_detect(directory, log_path, snapshot_path, context),
        Commands::Watch {
            folder_to_watch,
            log_file,
            patterns,
            strict,
        } => cmd_watch(folder_to_watch, log_file, patterns, strict),
        Commands::Replay {
            log_path,
            target_directory,
            policy,
        } => cmd_replay(log_path, target_directory, policy.into()),
    }
}

fn cmd_snapshot(directory: PathBuf, snapshot_path: PathBuf) -> anyhow::Result<()> {
    let start = Instant::now();
    let snapshot = Snapshot::initialize(&directory)?;
    snapshot.save(&snapshot_path)?;

    println!(
        "{} Captured {} files from {}",
        "✓".green().bold(),
        snapshot.len().to_string().cyan(),
        directory.display().to_string().cyan()
    );
    println!("  Snapshot: {}", snapshot_path.display());
    println!("  Time: {}", format_duration(round_millis(start.elapsed())).to_string().cyan());
    Ok(())
}

/// Compare a directory against its snapshot
///
/// On the very first run there is no snapshot yet; every file is reported as
/// new and the current contents become the baseline.
fn cmd_detect(directory: PathBuf, log_path: PathBuf, snapshot_path: PathBuf, context: usize) -> anyhow::Result<()> {
    let config = TrackerBuilder::new().context_lines(context).build()?;

    let start = Instant::now();
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("Comparing files...");
    pb.enable_steady_tick(Duration::from_millis(100));

    let outcome = ChangeDetector::new(config).detect_with_snapshot(&directory, &log_path, &snapshot_path);
    pb.finish_and_clear();
    let (report, first_run) = outcome?;

    if first_run {
        println!(
            "{} No snapshot found, reporting every file as new and saving {}",
            "i".blue().bold(),
            snapshot_path.display()
        );
    }

    if report.is_empty() {
        println!("{} No changes since the last snapshot", "✓".green().bold());
    } else {
        println!(
            "{} Logged changes to {}",
            "✓".green().bold(),
            log_path.display().to_string().cyan()
        );
        for (filename, record) in &report.changes {
            match record {
                driftlog::ChangeRecord::NewFile => println!("  + {}", filename.green()),
                driftlog::ChangeRecord::Modified(change) => println!(
                    "  ~ {} ({} lines)",
                    filename.yellow(),
                    change.line_diffs.len()
                ),
            }
        }
        println!(
            "  New: {}  Modified: {}",
            report.new_files().to_string().green(),
            report.modified_files().to_string().yellow()
        );
    }
    println!("  Time: {}", format_duration(round_millis(start.elapsed())).to_string().cyan());
    Ok(())
}

fn cmd_watch(folder: PathBuf, log_file: PathBuf, patterns: Vec<String>, strict: bool) -> anyhow::Result<()> {
    let mut builder = TrackerBuilder::new().allow_fallback_encoding(!strict);
    if !patterns.is_empty() {
        builder = builder.watch_patterns(patterns);
    }
    let config = builder.build()?;

    let monitor = LiveMonitor::new(&folder, &log_file, &config)?;

    let shutdown = ShutdownSignal::new();
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.trigger()).context("failed to install Ctrl-C handler")?;
    }

    println!(
        "{} Monitoring changes in {}. Logging to {}",
        "▶".blue().bold(),
        folder.display().to_string().cyan(),
        log_file.display().to_string().cyan()
    );
    println!(
        "  Create {} to pause logging, press Ctrl-C to stop",
        monitor.stop_file().display().to_string().yellow()
    );

    let start = Instant::now();
    let source = NotifySource::new(config.poll_interval, shutdown.clone());
    let stats = monitor.run(source, &shutdown)?;

    println!("\n{} Monitoring stopped", "■".blue().bold());
    println!("  Events: {}", stats.events_seen);
    println!("  Logged: {}", stats.entries_logged.to_string().green());
    if stats.entries_suppressed > 0 {
        println!("  Suppressed: {}", stats.entries_suppressed.to_string().yellow());
    }
    if stats.events_skipped > 0 {
        println!("  Skipped: {}", stats.events_skipped.to_string().red());
    }
    println!("  Duration: {}", format_duration(round_secs(start.elapsed())));
    Ok(())
}

fn cmd_replay(log_path: PathBuf, target_directory: PathBuf, policy: ReplacePolicy) -> anyhow::Result<()> {
    let config = TrackerBuilder::new().replace_policy(policy).build()?;
    let replayer = LogReplayer::from_config(&config)?;
    let report = replayer.apply_log(&log_path, &target_directory)?;

    println!(
        "{} Replayed {} onto {}",
        "✓".green().bold(),
        log_path.display().to_string().cyan(),
        target_directory.display().to_string().cyan()
    );
    println!("  Files patched: {}", report.files_patched.to_string().green());
    println!("  Rules applied: {}", report.rules_applied);
    if report.rules_skipped > 0 {
        println!("  Rules skipped: {}", report.rules_skipped.to_string().yellow());
    }

    if !report.is_clean() {
        println!("\n{}", "Problems:".red().bold());
        for error in &report.errors {
            println!("  {} {}", "✗".red(), error.user_message());
        }
    }
    Ok(())
}

fn round_millis(duration: Duration) -> Duration {
    Duration::from_millis(duration.as_millis() as u64)
}

fn round_secs(duration: Duration) -> Duration {
    Duration::from_secs(duration.as_secs())
}
