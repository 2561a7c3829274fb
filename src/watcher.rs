//! File system event subscription
//!
//! The live monitor consumes modification events through the [`EventSource`]
//! trait so its diff and log logic can be driven by synthetic events in
//! tests. [`NotifySource`] is the platform implementation built on `notify`.
//!
//! The `notify` callback only forwards raw events into a channel. Conversion
//! and delivery happen on the thread iterating [`NotifyEvents`], one event at
//! a time.

use crate::error::Result;
use crate::types::ModificationEvent;
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Cooperative cancellation flag shared between a signal handler and a loop
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    /// Create an untriggered signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown was requested
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A source of modification events for one directory
pub trait EventSource {
    /// Sequence of events, ending when the source is closed
    type Events: Iterator<Item = Result<ModificationEvent>>;

    /// Start delivering modification events for files directly under `directory`
    fn subscribe(self, directory: &Path) -> Result<Self::Events>;
}

/// Event source backed by the platform's recommended `notify` watcher
#[derive(Debug, Clone)]
pub struct NotifySource {
    poll_interval: Duration,
    shutdown: ShutdownSignal,
}

impl NotifySource {
    /// Create a source that wakes every `poll_interval` to check `shutdown`
    pub fn new(poll_interval: Duration, shutdown: ShutdownSignal) -> Self {
        Self {
            poll_interval,
            shutdown,
        }
    }
}

impl EventSource for NotifySource {
    type Events = NotifyEvents;

    fn subscribe(self, directory: &Path) -> Result<NotifyEvents> {
        info!("Starting file system watch on: {}", directory.display());

        let (sender, receiver) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(sender)?;
        watcher.configure(Config::default().with_poll_interval(self.poll_interval))?;
        watcher.watch(directory, RecursiveMode::NonRecursive)?;

        Ok(NotifyEvents {
            _watcher: watcher,
            receiver,
            pending: VecDeque::new(),
            poll_interval: self.poll_interval,
            shutdown: self.shutdown,
        })
    }
}

/// Live event stream of a [`NotifySource`]
///
/// Ends when the shutdown signal is triggered or the watcher goes away.
/// Dropping it stops the underlying watcher.
pub struct NotifyEvents {
    _watcher: RecommendedWatcher,
    receiver: Receiver<notify::Result<Event>>,
    pending: VecDeque<ModificationEvent>,
    poll_interval: Duration,
    shutdown: ShutdownSignal,
}

impl Iterator for NotifyEvents {
    type Item = Result<ModificationEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.shutdown.is_triggered() {
                debug!("Shutdown requested, closing event stream");
                return None;
            }
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            match self.receiver.recv_timeout(self.poll_interval) {
                Ok(Ok(event)) => {
                    trace!("File system event: {:?}", event);
                    self.pending.extend(modification_events(event));
                }
                Ok(Err(e)) => return Some(Err(e.into())),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

/// Convert a raw `notify` event into modification events
///
/// Only content and metadata modifications count; creations, removals and
/// renames are ignored.
pub fn modification_events(event: Event) -> Vec<ModificationEvent> {
    match event.kind {
        EventKind::Modify(ModifyKind::Name(_)) => Vec::new(),
        EventKind::Modify(_) => event
            .paths
            .into_iter()
            .map(|path| ModificationEvent {
                is_directory: path.is_dir(),
                path,
            })
            .collect(),
        _ => Vec::new(),
    }
}
