//! Shared request, response and domain types
//!
//! These records cross the API boundary and are also used internally as
//! routing keys, so they live in core rather than in the server crate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Media services a watched directory can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// Plex Media Server
    Plex,
    /// Audiobookshelf
    Audiobookshelf,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plex => write!(f, "plex"),
            Self::Audiobookshelf => write!(f, "audiobookshelf"),
        }
    }
}

/// A configured directory/service binding
///
/// Used both as a watch input and as the routing key that decides which
/// service handles events under the directory. Immutable for the
/// lifetime of a running watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchDir {
    /// Absolute path to watch
    pub path: PathBuf,
    /// Which service this dir is for
    pub service: ServiceKind,
    /// Whether this dir participates in watching and routing
    pub enabled: bool,
}

/// Connection settings for a single media service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub server_url: String,
    pub token: String,
}

/// Request to start the watcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRequest {
    /// Per-service connection settings; absent services are not initialized
    #[serde(default)]
    pub service_configs: HashMap<ServiceKind, ServiceConfig>,
    pub watched_dirs: Vec<WatchDir>,
    /// Debounce window in seconds; negative values are treated as 0
    #[serde(default)]
    pub cooldown: i64,
}

/// Request for a stateless manual scan of specific paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub service_configs: HashMap<ServiceKind, ServiceConfig>,
    pub paths: Vec<String>,
}

/// Snapshot of the watcher lifecycle, suitable for external inspection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherStatus {
    pub is_watching: bool,
    pub watched_dirs: Vec<WatchDir>,
    /// Effective debounce window in seconds
    pub cooldown: i64,
}
