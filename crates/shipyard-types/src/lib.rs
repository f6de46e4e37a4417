//! Shared type definitions for the Shipyard deploy service.
//!
//! This crate defines the identifiers, request/response bodies, and
//! realtime protocol frames exchanged between the deploy API, the log
//! relay, and dashboard clients. Wire types derive [`ts_rs::TS`] so the
//! dashboard can import generated TypeScript bindings.
//!
//! # Modules
//!
//! - [`ids`] -- [`ProjectId`] and [`ConnectionId`]
//! - [`channel`] -- `logs:<project>` channel naming
//! - [`endpoint`] -- [`HostingEndpoint`] derivation
//! - [`request`] -- `POST /project` bodies with validation
//! - [`protocol`] -- socket events

pub mod channel;
pub mod endpoint;
pub mod ids;
pub mod protocol;
pub mod request;

// Re-export primary types for convenience.
pub use channel::{is_log_channel, log_channel, project_of_channel, LOG_CHANNEL_PATTERN, LOG_CHANNEL_PREFIX};
pub use endpoint::HostingEndpoint;
pub use ids::{ConnectionId, IdError, ProjectId};
pub use protocol::{ClientEvent, ServerEvent};
pub use request::{DeploymentRequest, DeploymentResponse, DeploymentStatus, QueuedProject};
