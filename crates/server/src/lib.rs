//! REST API server for mediawatch
//!
//! This crate wires the directory observer, the library indices and the
//! scan dispatcher into a single start/stop lifecycle and exposes it
//! over HTTP.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod dispatch;
pub mod manager;
pub mod paths;
pub mod registry;
pub mod responses;
pub mod routes;

// Re-export error types from core
pub use mediawatch_core::error::{Error, Result};

pub use dispatch::ScanDispatcher;
pub use manager::WatcherManager;
pub use routes::{build_router, AppState};
