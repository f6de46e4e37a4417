//! Deployment pipeline for the Shipyard service.
//!
//! A deployment moves through three stages, each backed by an external
//! system reached through a backend enum:
//!
//! ```text
//! DeploymentRequest
//!     |
//!     +-- IdentifierAllocator --> StorageBackend::bucket_exists (namespace)
//!     +-- HostingProvisioner ---> StorageBackend (4 calls)
//!     +-- TaskDispatcher -------> OrchestratorBackend::run_task
//!     |
//! Deployment { project_id, url, log_channel, handle }
//! ```
//!
//! No stage retries and nothing is rolled back; see each module for the
//! exact failure semantics.
//!
//! # Modules
//!
//! - [`allocator`] -- collision-checked project id allocation
//! - [`provisioner`] -- static website bucket provisioning
//! - [`dispatcher`] -- build task submission
//! - [`coordinator`] -- the three stages in order
//! - [`storage`] -- S3 and in-memory storage backends
//! - [`orchestrator`] -- ECS and in-memory orchestrator backends
//! - [`slug`] -- candidate name generation
//! - [`error`] -- error types

pub mod allocator;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod orchestrator;
pub mod provisioner;
pub mod slug;
pub mod storage;

// Re-export primary types for convenience.
pub use allocator::{AllocatorSettings, IdentifierAllocator};
pub use coordinator::{Deployment, DeploymentCoordinator};
pub use dispatcher::{DispatchHandle, DispatchSettings, TaskDispatcher};
pub use error::{
    AllocationError, BackendError, DeployError, DispatchError, ProvisionError, ProvisionStep,
};
pub use orchestrator::{OrchestratorBackend, RunTaskFailure, TaskRunRequest};
pub use provisioner::{HostingProvisioner, ProvisionerSettings};
pub use slug::{RandomSlugs, SlugSource};
pub use storage::StorageBackend;
