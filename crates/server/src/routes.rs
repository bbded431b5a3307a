//! REST API surface
//!
//! Endpoints mirror the watcher lifecycle: probe a media server,
//! start/stop the watcher, trigger manual scans, and inspect status.

use crate::dispatch::ScanDispatcher;
use crate::manager::WatcherManager;
use crate::responses::{ApiError, ApiResponse};
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use mediawatch_core::config::ServerConfig;
use mediawatch_core::types::{ScanRequest, ServiceKind, StartRequest, WatcherStatus};
use mediawatch_services::audiobookshelf::{AbsClient, AbsLibrary, AbsLibraryIndex};
use mediawatch_services::plex::{PlexClient, PlexScanner, SectionRoot};
use mediawatch_watcher::EventHandler;
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<WatcherManager>,
    pub dispatcher: Arc<ScanDispatcher>,
    pub config: Arc<ServerConfig>,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);
    Router::new()
        .route("/", get(root_handler))
        .route("/status", get(status_handler))
        .route("/prob-plex", get(probe_plex_handler))
        .route("/prob-abs", get(probe_abs_handler))
        .route("/start", post(start_handler))
        .route("/stop", post(stop_handler))
        .route("/scan", post(scan_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// GET /
async fn root_handler() -> ApiResponse<()> {
    ApiResponse::message("mediawatch API is running")
}

/// GET /status
async fn status_handler(State(state): State<AppState>) -> ApiResponse<WatcherStatus> {
    let status = state.manager.status().await;
    info!(
        watching = status.is_watching,
        dirs = status.watched_dirs.len(),
        cooldown = status.cooldown,
        "watcher status"
    );
    ApiResponse::ok("success retrieving status", status)
}

#[derive(Debug, Deserialize)]
struct ProbeParams {
    server_url: String,
    token: String,
}

/// GET /prob-plex — list the sections a Plex server exposes
async fn probe_plex_handler(
    Query(params): Query<ProbeParams>,
) -> Result<ApiResponse<Vec<SectionRoot>>, ApiError> {
    let client = PlexClient::new(&params.server_url, &params.token)?;
    let scanner = PlexScanner::new(Arc::new(client)).await.map_err(|e| {
        error!("failed to probe Plex server: {e}");
        ApiError::from(e)
    })?;

    info!(
        server = params.server_url,
        sections = scanner.sections().len(),
        "plex server library sections detected"
    );
    Ok(ApiResponse::ok(
        "success retrieving library sections",
        scanner.sections().to_vec(),
    ))
}

/// GET /prob-abs — list the libraries an Audiobookshelf server exposes
async fn probe_abs_handler(
    Query(params): Query<ProbeParams>,
) -> Result<ApiResponse<Vec<AbsLibrary>>, ApiError> {
    let client = AbsClient::new(&params.server_url, &params.token)?;
    let index = AbsLibraryIndex::new(Arc::new(client)).await.map_err(|e| {
        error!("failed to probe Audiobookshelf server: {e}");
        ApiError::from(e)
    })?;

    info!(
        server = params.server_url,
        libraries = index.libraries().len(),
        "audiobookshelf libraries detected"
    );
    Ok(ApiResponse::ok(
        "success retrieving libraries",
        index.libraries().to_vec(),
    ))
}

/// POST /start — initialize configured services and start the watcher
async fn start_handler(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    // one shared context per Start cycle; Stop cancels it and aborts
    // in-flight scan calls
    let ctx = CancellationToken::new();

    // build every handler before touching the registry, so a failed
    // discovery leaves no partial registrations behind
    let mut handlers: Vec<(ServiceKind, EventHandler)> = Vec::new();

    if let Some(config) = req.service_configs.get(&ServiceKind::Plex) {
        let client = PlexClient::new(&config.server_url, &config.token)?;
        let scanner = Arc::new(PlexScanner::new(Arc::new(client)).await?);
        handlers.push((
            ServiceKind::Plex,
            state.dispatcher.plex_handler(scanner, ctx.clone()),
        ));
        info!(server = config.server_url, "Plex service initialized");
    }

    if let Some(config) = req.service_configs.get(&ServiceKind::Audiobookshelf) {
        let client = AbsClient::new(&config.server_url, &config.token)?;
        let index = Arc::new(AbsLibraryIndex::new(Arc::new(client)).await?);
        handlers.push((
            ServiceKind::Audiobookshelf,
            state.dispatcher.abs_handler(index, ctx.clone()),
        ));
        info!(server = config.server_url, "Audiobookshelf service initialized");
    }

    for (service, handler) in handlers {
        state.manager.register_handler(service, handler);
    }
    state.manager.start(&req, ctx).await?;
    info!(
        dirs = req.watched_dirs.len(),
        cooldown = req.cooldown,
        "watcher started"
    );
    Ok(ApiResponse::message("watcher started"))
}

/// POST /stop
async fn stop_handler(State(state): State<AppState>) -> ApiResponse<()> {
    state.manager.stop().await;
    ApiResponse::message("watcher stopped")
}

/// POST /scan — stateless manual scan for specific paths
async fn scan_handler(
    State(state): State<AppState>,
    Json(req): Json<ScanRequest>,
) -> Result<ApiResponse<()>, ApiError> {
    let mut any_service = false;

    if let Some(config) = req.service_configs.get(&ServiceKind::Plex) {
        let client = PlexClient::new(&config.server_url, &config.token)?;
        let scanner = Arc::new(PlexScanner::new(Arc::new(client)).await?);
        state.dispatcher.manual_scan_plex(scanner, &req.paths);
        any_service = true;
    }

    if let Some(config) = req.service_configs.get(&ServiceKind::Audiobookshelf) {
        let client = AbsClient::new(&config.server_url, &config.token)?;
        let index = Arc::new(AbsLibraryIndex::new(Arc::new(client)).await?);
        state.dispatcher.manual_scan_abs(index, &req.paths);
        any_service = true;
    }

    if !any_service {
        return Err(ApiError::BadRequest("no service configs provided".to_string()));
    }
    Ok(ApiResponse::message("scans triggered"))
}
