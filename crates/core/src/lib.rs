//! Core types for the mediawatch media-server rescan bridge
//!
//! This crate provides the foundational pieces shared across the
//! mediawatch workspace:
//!
//! - **Types**: watch directory bindings, service identifiers, and the
//!   request/response records exchanged with the API surface
//! - **Configuration**: process-environment configuration read once at
//!   startup
//! - **Error handling**: unified error types

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod config;
pub mod error;
pub mod types;

// Re-export main types for convenience
pub use config::ServerConfig;
pub use error::{Error, Result, ResultExt};
pub use types::{ScanRequest, ServiceConfig, ServiceKind, StartRequest, WatchDir, WatcherStatus};

/// Version of the core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
