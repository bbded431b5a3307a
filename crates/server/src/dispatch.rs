//! Scan dispatch: deduplication, admission control and per-service
//! handlers
//!
//! Each service handler is a closure over the shared semaphore, the
//! in-flight scan set and that service's library index. The handler
//! body runs serially on the observer's run loop; the work it enqueues
//! runs concurrently, bounded by the semaphore.

use crate::paths;
use dashmap::DashSet;
use mediawatch_services::audiobookshelf::AbsLibraryIndex;
use mediawatch_services::plex::PlexScanner;
use mediawatch_watcher::{EventHandler, EventOp, WatchEvent};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Shared scan dispatch state
///
/// Lives across Start/Stop cycles: in-flight work from a previous cycle
/// keeps draining against the same semaphore and dedup set.
pub struct ScanDispatcher {
    semaphore: Arc<Semaphore>,
    active_scans: Arc<DashSet<String>>,
    allowed_extensions: Arc<Vec<String>>,
}

impl ScanDispatcher {
    /// Create a dispatcher with the given process-wide concurrency
    /// limit (at least 1) and allowed extension set.
    pub fn new(concurrency_limit: usize, allowed_extensions: Vec<String>) -> Self {
        let limit = if concurrency_limit == 0 {
            warn!("concurrency limit must be at least 1, defaulting to 1");
            1
        } else {
            concurrency_limit
        };
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            active_scans: Arc::new(DashSet::new()),
            allowed_extensions: Arc::new(allowed_extensions),
        }
    }

    /// Number of scans currently in flight or queued for dispatch
    pub fn active_scan_count(&self) -> usize {
        self.active_scans.len()
    }

    /// Build the event handler for a Plex-bound watched directory.
    ///
    /// `ctx` is the Start-cycle context: cancelling it aborts scans
    /// still in flight.
    pub fn plex_handler(&self, scanner: Arc<PlexScanner>, ctx: CancellationToken) -> EventHandler {
        let semaphore = Arc::clone(&self.semaphore);
        let active_scans = Arc::clone(&self.active_scans);
        let allowed = Arc::clone(&self.allowed_extensions);

        Arc::new(move |event| {
            let Some((path, op)) = validate_event(event, &allowed) else {
                return;
            };

            let Some((_, section)) = scanner.map_to_plex(&path) else {
                warn!(path, "path does not map to any Plex library, skipping scan");
                return;
            };

            // compute the item root on the local path first, then map
            // the target; the target may climb above the event file's
            // directory
            let local_target = scanner.scan_target(&path, section.kind);
            let Some((target, _)) = scanner.map_to_plex(&local_target) else {
                warn!(path, local_target, "failed to map scan target to a Plex path");
                return;
            };

            debug!(path, target, event = %op, "file event detected, queuing scan");

            // at most one in-flight scan per target; duplicates during
            // the window are dropped, not queued
            if !active_scans.insert(target.clone()) {
                return;
            }
            info!(target, event = %op, "file event accepted, queuing Plex scan");

            let semaphore = Arc::clone(&semaphore);
            let active_scans = Arc::clone(&active_scans);
            let scanner = Arc::clone(&scanner);
            let ctx = ctx.clone();
            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    error!(target, "scan semaphore closed");
                    active_scans.remove(&target);
                    return;
                };
                tokio::select! {
                    _ = ctx.cancelled() => debug!(target, "Plex scan cancelled"),
                    result = scanner.scan_path(&target) => match result {
                        Ok(section) => {
                            info!(target, section = %section.title, "Plex scan triggered")
                        }
                        Err(e) => error!(target, "Plex scan failed: {e}"),
                    }
                }
                active_scans.remove(&target);
            });
        })
    }

    /// Build the event handler for an Audiobookshelf-bound watched
    /// directory
    pub fn abs_handler(&self, index: Arc<AbsLibraryIndex>, ctx: CancellationToken) -> EventHandler {
        let semaphore = Arc::clone(&self.semaphore);
        let active_scans = Arc::clone(&self.active_scans);
        let allowed = Arc::clone(&self.allowed_extensions);

        Arc::new(move |event| {
            let Some((path, op)) = validate_event(event, &allowed) else {
                return;
            };

            let target = paths::parent_dir(&path);
            debug!(path, target, event = %op, "file event detected, queuing scan");

            if !active_scans.insert(target.clone()) {
                return;
            }
            info!(target, event = %op, "file event accepted, queuing Audiobookshelf scan");

            let semaphore = Arc::clone(&semaphore);
            let active_scans = Arc::clone(&active_scans);
            let index = Arc::clone(&index);
            let ctx = ctx.clone();
            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    error!(target, "scan semaphore closed");
                    active_scans.remove(&target);
                    return;
                };
                tokio::select! {
                    _ = ctx.cancelled() => debug!(target, "Audiobookshelf scan cancelled"),
                    result = index.scan_path(&target) => match result {
                        Ok(()) => info!(target, "Audiobookshelf scan triggered"),
                        Err(e) => error!(target, "Audiobookshelf scan failed: {e}"),
                    }
                }
                active_scans.remove(&target);
            });
        })
    }

    /// Manually trigger Plex scans for a list of paths.
    ///
    /// Stateless: no debounce and no in-flight dedup, but identical
    /// targets within one request are scanned once. Extensionless
    /// inputs are treated as already-target directories.
    pub fn manual_scan_plex(&self, scanner: Arc<PlexScanner>, request_paths: &[String]) {
        let mut unique: HashSet<String> = HashSet::new();
        let mut targets = Vec::new();

        for path in request_paths {
            let Some((plex_path, _)) = scanner.map_to_plex(path) else {
                warn!(path, "failed to map to any Plex library path, skipping scan");
                continue;
            };

            let ext = paths::extension_of(path);
            let target = if ext.is_empty() {
                // no extension: assume it is a directory, use as is
                plex_path
            } else if self.allowed_extensions.contains(&ext) {
                paths::parent_dir(&plex_path)
            } else {
                warn!(path, extension = ext, "disallowed extension, skipping scan");
                continue;
            };

            if unique.insert(target.clone()) {
                targets.push(target);
            } else {
                debug!(target, "duplicate scan path detected and skipped");
            }
        }

        info!(
            unique = targets.len(),
            requested = request_paths.len(),
            "triggering manual Plex scans"
        );

        for target in targets {
            let semaphore = Arc::clone(&self.semaphore);
            let scanner = Arc::clone(&scanner);
            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return;
                };
                match scanner.scan_path(&target).await {
                    Ok(section) => {
                        info!(target, section = %section.title, "manual scan completed")
                    }
                    Err(e) => error!(target, "manual scan failed: {e}"),
                }
            });
        }
    }

    /// Manually trigger Audiobookshelf scans for a list of paths
    pub fn manual_scan_abs(&self, index: Arc<AbsLibraryIndex>, request_paths: &[String]) {
        let mut unique: HashSet<String> = HashSet::new();
        let mut targets = Vec::new();

        for path in request_paths {
            let ext = paths::extension_of(path);
            let target = if ext.is_empty() {
                paths::normalize(path)
            } else if self.allowed_extensions.contains(&ext) {
                paths::parent_dir(path)
            } else {
                warn!(path, extension = ext, "disallowed extension, skipping scan");
                continue;
            };

            if unique.insert(target.clone()) {
                targets.push(target);
            }
        }

        info!(
            unique = targets.len(),
            requested = request_paths.len(),
            "triggering manual Audiobookshelf scans"
        );

        for target in targets {
            let semaphore = Arc::clone(&self.semaphore);
            let index = Arc::clone(&index);
            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return;
                };
                match index.scan_path(&target).await {
                    Ok(()) => info!(target, "manual scan completed"),
                    Err(e) => error!(target, "manual scan failed: {e}"),
                }
            });
        }
    }
}

/// Common validation for filesystem events.
///
/// Watcher errors are logged and swallowed here. Extensionless paths
/// (directories included) and disallowed extensions never trigger a
/// scan.
fn validate_event(event: WatchEvent, allowed: &[String]) -> Option<(String, EventOp)> {
    match event {
        WatchEvent::Error(e) => {
            error!("watcher error: {e}");
            None
        }
        WatchEvent::Change { path, op } => {
            let path = path.to_string_lossy().into_owned();
            let ext = paths::extension_of(&path);
            if ext.is_empty() {
                debug!(path, "skipping directory or extensionless file");
                return None;
            }
            if !allowed.iter().any(|e| *e == ext) {
                debug!(path, extension = ext, "disallowed extension, skipping event");
                return None;
            }
            Some((path, op))
        }
    }
}
