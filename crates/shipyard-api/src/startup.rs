//! Background startup helpers for the binary.
//!
//! Each helper binds its listener eagerly, so a taken port fails startup
//! instead of a background task, then serves on a spawned Tokio task.
//! The caller holds the returned [`JoinHandle`]s and aborts or awaits
//! them on shutdown.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::error;

use crate::router::{build_router, build_socket_router};
use crate::server::{bind, serve, ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning a server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Spawn the deploy API server (`GET /`, `POST /project`).
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the listener cannot bind.
pub async fn spawn_api(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<JoinHandle<()>, StartupError> {
    let listener = bind(config).await?;
    Ok(spawn_serving(listener, build_router(state), "api"))
}

/// Spawn the realtime log socket server.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the listener cannot bind.
pub async fn spawn_socket(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<JoinHandle<()>, StartupError> {
    let listener = bind(config).await?;
    Ok(spawn_serving(listener, build_socket_router(state), "socket"))
}

fn spawn_serving(
    listener: tokio::net::TcpListener,
    router: axum::Router,
    name: &'static str,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = serve(listener, router, name).await {
            error!(error = %e, server = name, "server exited with error");
        }
    })
}
