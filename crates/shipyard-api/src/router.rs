//! Axum router construction for both listeners.
//!
//! The deploy API and the realtime log socket listen on separate ports,
//! so each gets its own [`Router`]. Both allow any origin, method and
//! header so browser dashboards on other hosts can call them.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the deploy API router.
///
/// - `GET /` -- liveness text
/// - `POST /project` -- queue a deployment
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/project", post(handlers::create_project))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the realtime log router.
///
/// - `GET /` and `GET /ws` -- `WebSocket` upgrade
pub fn build_socket_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(ws::ws_logs))
        .route("/ws", get(ws::ws_logs))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
