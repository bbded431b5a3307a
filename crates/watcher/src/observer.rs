//! Recursive directory observer
//!
//! A single run loop owns the batching state: it selects across the OS
//! event and error channels, the stop signal, a shared cancellation
//! context, and the debounce timer. Bursts of notifications on a path
//! are collapsed into one handler call carrying the ORed operations.

use crate::events::{EventHandler, EventOp, WatchEvent};
use crate::subtree;
use mediawatch_core::error::{Error, Result};
use mediawatch_core::types::WatchDir;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

/// Capacity of the channel carrying raw OS events into the run loop
const EVENT_CHANNEL_CAPACITY: usize = 8192;

/// Capacity of the channel carrying OS watcher errors
const ERROR_CHANNEL_CAPACITY: usize = 128;

/// The OS watcher, shared with the background subtree registration
/// workers; `None` once the observer has been stopped.
pub(crate) type SharedWatcher = Arc<Mutex<Option<RecommendedWatcher>>>;

/// Configuration for a [`DirectoryObserver`]
#[derive(Clone)]
pub struct ObserverConfig {
    /// Directories to watch; disabled entries are skipped
    pub dirs: Vec<WatchDir>,
    /// Also watch all subdirectories, including ones created later
    pub recursive: bool,
    /// Quiescence interval before a path's batched event is emitted.
    /// Zero disables batching and forwards events immediately.
    pub debounce_window: Duration,
    /// Receives batched events and watcher errors
    pub handler: EventHandler,
}

impl fmt::Debug for ObserverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverConfig")
            .field("dirs", &self.dirs)
            .field("recursive", &self.recursive)
            .field("debounce_window", &self.debounce_window)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Lifecycle {
    started: bool,
    closed: bool,
}

/// Recursive filesystem observer with per-path event batching
pub struct DirectoryObserver {
    config: ObserverConfig,
    watcher: SharedWatcher,
    state: Mutex<Lifecycle>,
    stop: CancellationToken,
    channels: Mutex<Option<(mpsc::Receiver<notify::Event>, mpsc::Receiver<notify::Error>)>>,
    run_handle: Mutex<Option<JoinHandle<()>>>,
}

impl DirectoryObserver {
    /// Create a new observer. Call [`start`](Self::start) to begin watching.
    pub fn new(config: ObserverConfig) -> Result<Self> {
        if config.dirs.is_empty() {
            return Err(Error::watcher("no directories provided"));
        }

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (err_tx, err_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);

        let watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    if let Err(e) = event_tx.try_send(event) {
                        error!("failed to enqueue watch event: {e}");
                    }
                }
                Err(e) => {
                    if err_tx.try_send(e).is_err() {
                        error!("watcher error channel full, dropping error");
                    }
                }
            },
            notify::Config::default(),
        )
        .map_err(|e| Error::watcher(format!("failed to create OS watcher: {e}")))?;

        Ok(Self {
            config,
            watcher: Arc::new(Mutex::new(Some(watcher))),
            state: Mutex::new(Lifecycle::default()),
            stop: CancellationToken::new(),
            channels: Mutex::new(Some((event_rx, err_rx))),
            run_handle: Mutex::new(None),
        })
    }

    /// Start watching.
    ///
    /// Top-level watches for every enabled directory are registered
    /// synchronously; each directory must exist and be a directory, and
    /// any registration failure aborts the start. When `recursive`,
    /// subtree watches are added by background workers so this returns
    /// immediately even for very large trees.
    ///
    /// Fails if the observer was already started or already stopped.
    pub fn start(&self, ctx: CancellationToken) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(Error::watcher("watcher already closed"));
        }
        if state.started {
            return Err(Error::watcher("watcher already started"));
        }

        {
            let mut guard = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
            let watcher = guard
                .as_mut()
                .ok_or_else(|| Error::watcher("watcher already closed"))?;
            for dir in self.config.dirs.iter().filter(|d| d.enabled) {
                ensure_watchable_dir(&dir.path)?;
                watcher
                    .watch(&dir.path, RecursiveMode::NonRecursive)
                    .map_err(|e| {
                        Error::watcher(format!("failed to watch {}: {e}", dir.path.display()))
                    })?;
            }
        }

        let (event_rx, err_rx) = self
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| Error::watcher("event channels already consumed"))?;

        let handle = tokio::spawn(run_loop(RunLoop {
            event_rx,
            err_rx,
            handler: Arc::clone(&self.config.handler),
            debounce: self.config.debounce_window,
            recursive: self.config.recursive,
            watcher: Arc::clone(&self.watcher),
            stop: self.stop.clone(),
            ctx,
        }));
        *self
            .run_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);

        if self.config.recursive {
            for dir in self.config.dirs.iter().filter(|d| d.enabled) {
                subtree::spawn_watch(Arc::clone(&self.watcher), dir.path.clone());
            }
        }

        state.started = true;
        Ok(())
    }

    /// Stop watching.
    ///
    /// Idempotent. Signals the run loop, closes the OS watcher, and
    /// waits for the loop to drain; pending batched events are flushed
    /// to the handler before this returns, and no handler call happens
    /// afterwards.
    pub async fn stop(&self) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.closed {
                return;
            }
            state.closed = true;
        }

        self.stop.cancel();
        // dropping the OS watcher stops the notification callback and
        // closes the event channels
        drop(
            self.watcher
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );

        let handle = self
            .run_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("watch loop terminated abnormally: {e}");
            }
        }
        debug!("directory observer stopped");
    }

    /// The effective configuration
    pub fn config(&self) -> &ObserverConfig {
        &self.config
    }
}

fn ensure_watchable_dir(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::watcher(format!("directory does not exist: {}", path.display()))
        } else {
            Error::watcher(format!("stat {}: {e}", path.display()))
        }
    })?;
    if !metadata.is_dir() {
        return Err(Error::watcher(format!(
            "path is not a directory: {}",
            path.display()
        )));
    }
    Ok(())
}

struct RunLoop {
    event_rx: mpsc::Receiver<notify::Event>,
    err_rx: mpsc::Receiver<notify::Error>,
    handler: EventHandler,
    debounce: Duration,
    recursive: bool,
    watcher: SharedWatcher,
    stop: CancellationToken,
    ctx: CancellationToken,
}

/// Pump events and errors, debounce, and register watches for
/// directories created under a watched tree.
async fn run_loop(mut rl: RunLoop) {
    // path -> accumulated ops; the timer is armed only while non-empty
    let mut pending: HashMap<PathBuf, EventOp> = HashMap::new();
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = rl.stop.cancelled() => {
                flush(&mut pending, &rl.handler);
                return;
            }
            _ = rl.ctx.cancelled() => {
                flush(&mut pending, &rl.handler);
                return;
            }
            Some(err) = rl.err_rx.recv() => {
                (rl.handler)(WatchEvent::Error(err.to_string()));
            }
            maybe_event = rl.event_rx.recv() => {
                let Some(event) = maybe_event else {
                    flush(&mut pending, &rl.handler);
                    return;
                };
                trace!(kind = ?event.kind, paths = ?event.paths, "raw watch event");

                if rl.recursive && matches!(event.kind, EventKind::Create(_)) {
                    for path in &event.paths {
                        if path.is_dir() {
                            subtree::spawn_watch(Arc::clone(&rl.watcher), path.clone());
                        }
                    }
                }

                let op = EventOp::from_kind(&event.kind);
                if op.is_empty() {
                    continue;
                }

                for path in event.paths {
                    if rl.debounce.is_zero() {
                        (rl.handler)(WatchEvent::Change { path, op });
                    } else {
                        *pending.entry(path).or_default() |= op;
                        deadline = Some(Instant::now() + rl.debounce);
                    }
                }
            }
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                if deadline.is_some() =>
            {
                flush(&mut pending, &rl.handler);
                deadline = None;
            }
        }
    }
}

fn flush(pending: &mut HashMap<PathBuf, EventOp>, handler: &EventHandler) {
    if pending.is_empty() {
        return;
    }
    debug!(paths = pending.len(), "flushing batched events");
    for (path, op) in pending.drain() {
        handler(WatchEvent::Change { path, op });
    }
}
