//! Error types for the deploy API.
//!
//! [`ApiError`] unifies every failure of a request into one enum that
//! converts into an Axum response with a `{"error", "status"}` JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shipyard_deploy::{AllocationError, DeployError};

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request body was not valid JSON for the endpoint.
    #[error("invalid body: {0}")]
    InvalidBody(String),

    /// The body parsed but failed field validation.
    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// The deployment pipeline failed.
    #[error(transparent)]
    Deploy(#[from] DeployError),
}

impl ApiError {
    /// HTTP status for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBody(_)
            | Self::Validation(_)
            | Self::Deploy(DeployError::Allocation(AllocationError::InvalidId(_))) => {
                StatusCode::BAD_REQUEST
            }
            Self::Deploy(DeployError::Allocation(AllocationError::Taken(_))) => StatusCode::CONFLICT,
            Self::Deploy(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
