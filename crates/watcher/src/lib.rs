//! Filesystem watching for media directory changes
//!
//! This crate provides the recursive directory observer that feeds the
//! scan pipeline:
//!
//! - Per-path event batching with a configurable debounce window
//! - Recursive watching with non-blocking subtree registration
//! - OS watcher errors surfaced as events, never as crashes
//! - Idempotent start/stop lifecycle with a final flush on shutdown
//!
//! # Example
//!
//! ```no_run
//! use mediawatch_watcher::{DirectoryObserver, ObserverConfig, WatchEvent};
//! use mediawatch_core::{ServiceKind, WatchDir};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> mediawatch_core::Result<()> {
//! let config = ObserverConfig {
//!     dirs: vec![WatchDir {
//!         path: "/media/movies".into(),
//!         service: ServiceKind::Plex,
//!         enabled: true,
//!     }],
//!     recursive: true,
//!     debounce_window: Duration::from_secs(5),
//!     handler: Arc::new(|event: WatchEvent| println!("{event:?}")),
//! };
//!
//! let observer = DirectoryObserver::new(config)?;
//! observer.start(tokio_util::sync::CancellationToken::new())?;
//! // ... later
//! observer.stop().await;
//! # Ok(())
//! # }
//! ```

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod events;
pub mod observer;
mod subtree;

// Re-export main types
pub use events::{EventHandler, EventOp, WatchEvent};
pub use observer::{DirectoryObserver, ObserverConfig};
