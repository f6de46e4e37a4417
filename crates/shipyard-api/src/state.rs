//! Shared application state for the API and realtime servers.

use shipyard_deploy::DeploymentCoordinator;
use shipyard_relay::RelayHub;

/// State shared by every request handler.
///
/// Both fields are cheap handles over shared state, so the API router
/// and the realtime router can each hold an `Arc<AppState>` built from
/// the same hub.
#[derive(Clone)]
pub struct AppState {
    /// Runs deployments for `POST /project`.
    pub coordinator: DeploymentCoordinator,
    /// Room registry for realtime log subscribers.
    pub hub: RelayHub,
}

impl AppState {
    /// Create state from its parts.
    pub const fn new(coordinator: DeploymentCoordinator, hub: RelayHub) -> Self {
        Self { coordinator, hub }
    }
}
