//! HTTP and realtime surfaces of the Shipyard service.
//!
//! Two Axum servers share one [`AppState`]:
//!
//! - **Deploy API** (`GET /`, `POST /project`) runs a deployment through
//!   the [`DeploymentCoordinator`](shipyard_deploy::DeploymentCoordinator)
//!   and answers `queued` once the build task is submitted.
//! - **Realtime log socket** (`GET /`, `GET /ws`) upgrades to a
//!   `WebSocket`; clients subscribe to `logs:<projectId>` and receive the
//!   lines the [`RelayHub`](shipyard_relay::RelayHub) fans out.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::{build_router, build_socket_router};
pub use server::{ServerConfig, ServerError};
pub use startup::{spawn_api, spawn_socket, StartupError};
pub use state::AppState;
