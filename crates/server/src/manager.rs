//! Watcher lifecycle manager
//!
//! Binds the observer, the handler registry and the service routing
//! into a single start/stop unit. Exactly one observer runs at a time;
//! a new Start reconstructs everything from fresh request data.

use crate::registry::HandlerRegistry;
use mediawatch_core::error::{Error, Result};
use mediawatch_core::types::{ServiceKind, StartRequest, WatchDir, WatcherStatus};
use mediawatch_watcher::{DirectoryObserver, EventHandler, ObserverConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

struct Running {
    observer: Arc<DirectoryObserver>,
    cancel: CancellationToken,
    watched_dirs: Vec<WatchDir>,
    cooldown: i64,
}

/// Single coherent watcher lifecycle
#[derive(Default)]
pub struct WatcherManager {
    registry: Arc<HandlerRegistry>,
    running: Mutex<Option<Running>>,
}

impl WatcherManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the dispatch function for a service. Call before
    /// [`start`](Self::start).
    pub fn register_handler(&self, service: ServiceKind, handler: EventHandler) {
        self.registry.register(service, handler);
    }

    /// Start watching per the request.
    ///
    /// `ctx` is the shared context for this Start cycle: it is passed
    /// to the observer and should also be captured by the registered
    /// service handlers, so that [`stop`](Self::stop) aborts in-flight
    /// scan calls.
    ///
    /// Fails when already running or when `watched_dirs` is empty; a
    /// failure to start the observer rolls back all partial state.
    pub async fn start(&self, req: &StartRequest, ctx: CancellationToken) -> Result<()> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(Error::watcher("watcher is already running"));
        }
        if req.watched_dirs.is_empty() {
            return Err(Error::watcher("no watched directories provided"));
        }
        // at least one dir must be enabled, otherwise the observer
        // would register zero watches and idle while reporting running
        if !req.watched_dirs.iter().any(|d| d.enabled) {
            return Err(Error::watcher("no enabled watched directories provided"));
        }

        let cooldown = req.cooldown.max(0);
        let debounce = Duration::from_secs(cooldown as u64);
        let watched_dirs = req.watched_dirs.clone();

        // single dispatch function: longest-prefix routing into the
        // per-service handlers
        let registry = Arc::clone(&self.registry);
        let routing_dirs = watched_dirs.clone();
        let handler: EventHandler =
            Arc::new(move |event| registry.dispatch(event, &routing_dirs));

        let observer = match DirectoryObserver::new(ObserverConfig {
            dirs: watched_dirs.clone(),
            recursive: true,
            debounce_window: debounce,
            handler,
        }) {
            Ok(observer) => observer,
            Err(e) => {
                self.registry.clear();
                return Err(e);
            }
        };

        if let Err(e) = observer.start(ctx.clone()) {
            ctx.cancel();
            self.registry.clear();
            return Err(e);
        }

        info!(dirs = watched_dirs.len(), cooldown, "watcher started");
        *running = Some(Running {
            observer: Arc::new(observer),
            cancel: ctx,
            watched_dirs,
            cooldown,
        });
        Ok(())
    }

    /// Stop watching.
    ///
    /// Idempotent: a no-op when nothing is running. The shared context
    /// is cancelled before the observer is stopped, so in-flight scan
    /// calls observe the cancellation; the observer drains and performs
    /// its final flush before this returns.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        let Some(state) = running.take() else {
            return;
        };

        state.cancel.cancel();
        state.observer.stop().await;
        self.registry.clear();
        info!("watcher stopped");
    }

    /// Current lifecycle status
    pub async fn status(&self) -> WatcherStatus {
        match &*self.running.lock().await {
            Some(state) => WatcherStatus {
                is_watching: true,
                watched_dirs: state.watched_dirs.clone(),
                cooldown: state.cooldown,
            },
            None => WatcherStatus {
                is_watching: false,
                watched_dirs: Vec::new(),
                cooldown: 0,
            },
        }
    }
}
