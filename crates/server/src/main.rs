//! mediawatch server binary
//!
//! Watches media directories and drives Plex / Audiobookshelf library
//! rescans for the paths that actually changed.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use mediawatch_core::config::ServerConfig;
use mediawatch_server::{build_router, AppState, ScanDispatcher, WatcherManager};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.to_lowercase())),
        )
        .init();

    info!(version = mediawatch_core::VERSION, "starting mediawatch server");
    info!(
        concurrency = config.concurrency_limit,
        extensions = ?config.supported_extensions,
        origins = ?config.allowed_origins,
        "configuration loaded"
    );

    let dispatcher = Arc::new(ScanDispatcher::new(
        config.concurrency_limit,
        config.supported_extensions.clone(),
    ));
    let state = AppState {
        manager: Arc::new(WatcherManager::new()),
        dispatcher,
        config: Arc::new(config),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("server listening on {addr}");
    axum::serve(listener, build_router(state)).await?;

    Ok(())
}
