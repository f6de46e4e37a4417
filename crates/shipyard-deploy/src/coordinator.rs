//! Deployment coordination.
//!
//! Runs allocate, provision, dispatch strictly in that order and returns
//! as soon as the build task is submitted. Concurrent deployments
//! interleave freely; each one's steps never overlap.

use shipyard_types::{log_channel, DeploymentRequest, HostingEndpoint, ProjectId};
use tracing::{info, warn};

use crate::allocator::IdentifierAllocator;
use crate::dispatcher::{DispatchHandle, TaskDispatcher};
use crate::error::DeployError;
use crate::provisioner::HostingProvisioner;

/// A queued deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    /// The allocated project id.
    pub project_id: ProjectId,
    /// Where the site will be served.
    pub url: HostingEndpoint,
    /// Bus channel the build task publishes its log lines on.
    pub log_channel: String,
    /// The submitted build task.
    pub handle: DispatchHandle,
}

/// Wires the three pipeline stages together.
#[derive(Clone)]
pub struct DeploymentCoordinator {
    allocator: IdentifierAllocator,
    provisioner: HostingProvisioner,
    dispatcher: TaskDispatcher,
}

impl DeploymentCoordinator {
    /// Create a coordinator from its stages.
    pub const fn new(
        allocator: IdentifierAllocator,
        provisioner: HostingProvisioner,
        dispatcher: TaskDispatcher,
    ) -> Self {
        Self {
            allocator,
            provisioner,
            dispatcher,
        }
    }

    /// Deploy the repository named in `request`.
    ///
    /// # Errors
    ///
    /// Returns the first stage error, unchanged inside [`DeployError`].
    pub async fn deploy(&self, request: &DeploymentRequest) -> Result<Deployment, DeployError> {
        let repository_url = request.repository_url();
        let result = self.run(request.preferred_slug(), repository_url).await;
        if let Err(e) = &result {
            warn!(stage = e.stage(), repository = repository_url, error = %e, "deployment failed");
        }
        result
    }

    async fn run(&self, preferred: Option<&str>, repository_url: &str) -> Result<Deployment, DeployError> {
        let project_id = self.allocator.allocate(preferred).await?;
        let url = self.provisioner.provision(&project_id).await?;
        let handle = self.dispatcher.dispatch(&project_id, repository_url).await?;

        let channel = log_channel(&project_id);
        info!(
            project = %project_id,
            url = %url,
            task_id = %handle.task_id,
            log_channel = %channel,
            repository = repository_url,
            "deployment queued"
        );
        Ok(Deployment {
            project_id,
            url,
            log_channel: channel,
            handle,
        })
    }
}
