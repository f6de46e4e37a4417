//! HTTP request handlers for the deploy API.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use shipyard_types::{DeploymentRequest, DeploymentResponse};
use tracing::info;
use validator::Validate;

use crate::error::ApiError;
use crate::state::AppState;

/// Liveness text served at `GET /`.
pub const INDEX_TEXT: &str = "API Server is running...";

/// Report that the server is up.
pub async fn index() -> &'static str {
    INDEX_TEXT
}

/// Queue a deployment of the posted repository.
///
/// Responds only after the build task is submitted, so a `queued`
/// response always names a project whose bucket exists and whose build
/// is running. Logs for it arrive on channel `logs:<projectSlug>`.
///
/// # Route
///
/// `POST /project`
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeploymentRequest>, JsonRejection>,
) -> Result<Json<DeploymentResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    request.validate()?;

    info!(repository = request.repository_url(), slug = ?request.preferred_slug(), "deployment requested");
    let deployment = state.coordinator.deploy(&request).await?;

    Ok(Json(DeploymentResponse::queued(
        &deployment.project_id,
        &deployment.url,
    )))
}
