//! Per-service handler registry and service routing
//!
//! Replaces runtime polymorphism with an explicit service → handler
//! map. Events are routed to the service whose watched directory is the
//! longest prefix of the event path.

use crate::paths;
use mediawatch_core::types::{ServiceKind, WatchDir};
use mediawatch_watcher::{EventHandler, WatchEvent};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::{error, warn};

/// Maps services to their event handlers
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Mutex<HashMap<ServiceKind, EventHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, service: ServiceKind, handler: EventHandler) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(service, handler);
    }

    pub fn get(&self, service: ServiceKind) -> Option<EventHandler> {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&service)
            .cloned()
    }

    /// Drop all registered handlers (and the library indices their
    /// closures capture)
    pub fn clear(&self) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Route a batched event to the handler of the owning service.
    ///
    /// Error events carry no path to route and are logged here; path
    /// events outside every watched directory are dropped with a
    /// warning.
    pub fn dispatch(&self, event: WatchEvent, watch_dirs: &[WatchDir]) {
        let path = match &event {
            WatchEvent::Error(e) => {
                error!("watcher error: {e}");
                return;
            }
            WatchEvent::Change { path, .. } => path.to_string_lossy().into_owned(),
        };

        let Some(service) = service_for_path(&path, watch_dirs) else {
            warn!(path, "no service found for path, dropping event");
            return;
        };
        let Some(handler) = self.get(service) else {
            warn!(path, service = %service, "no handler registered for service");
            return;
        };
        handler(event);
    }
}

/// Find which service owns this path (longest prefix match,
/// case-insensitive, component-boundary-aware; disabled dirs are
/// skipped).
pub fn service_for_path(path: &str, watch_dirs: &[WatchDir]) -> Option<ServiceKind> {
    let lower = paths::normalize(path).to_lowercase();

    let mut longest_match = 0usize;
    let mut matched = None;

    for dir in watch_dirs.iter().filter(|d| d.enabled) {
        let dir_lower = paths::normalize(&dir.path.to_string_lossy()).to_lowercase();
        if dir_lower.is_empty() {
            continue;
        }
        let is_exact = lower == dir_lower;
        let is_sub_path = lower.len() > dir_lower.len()
            && lower.starts_with(&dir_lower)
            && lower.as_bytes()[dir_lower.len()] == b'/';
        if (is_exact || is_sub_path) && dir_lower.len() > longest_match {
            longest_match = dir_lower.len();
            matched = Some(dir.service);
        }
    }
    matched
}
