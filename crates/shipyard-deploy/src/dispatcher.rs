//! Build task dispatch.
//!
//! One submission per deployment, fire-and-forget: the dispatcher does not
//! poll the task and does not retry. The build worker reports progress on
//! its own log channel.

use std::time::Duration;

use chrono::{DateTime, Utc};
use shipyard_types::ProjectId;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::error::{millis, DispatchError};
use crate::orchestrator::{EnvVar, OrchestratorBackend, RunTaskFailure, TaskRunRequest};

/// Environment variable carrying the repository URL into the build container.
pub const ENV_GIT_REPOSITORY_URL: &str = "GIT_REPOSITORY__URL";

/// Environment variable carrying the project id into the build container.
pub const ENV_PROJECT_ID: &str = "PROJECT_ID";

/// Static infrastructure the build task runs on.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Cluster id.
    pub cluster: String,
    /// Task definition id.
    pub task_definition: String,
    /// Container receiving the environment overrides.
    pub container_name: String,
    /// Subnets for the task.
    pub subnets: Vec<String>,
    /// Security groups for the task.
    pub security_groups: Vec<String>,
    /// Whether to assign a public IP (needed to pull from public registries).
    pub assign_public_ip: bool,
    /// Timeout for the submission call.
    pub call_timeout: Duration,
}

/// Opaque handle for a submitted build task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchHandle {
    /// Orchestrator task id (an ARN on ECS).
    pub task_id: String,
    /// When the submission was accepted.
    pub submitted_at: DateTime<Utc>,
}

/// Submits build tasks to the orchestrator.
#[derive(Clone)]
pub struct TaskDispatcher {
    orchestrator: OrchestratorBackend,
    settings: DispatchSettings,
}

impl TaskDispatcher {
    /// Create a dispatcher over `orchestrator`.
    pub const fn new(orchestrator: OrchestratorBackend, settings: DispatchSettings) -> Self {
        Self {
            orchestrator,
            settings,
        }
    }

    /// Build the task submission for `id` without sending it.
    pub fn task_request(&self, id: &ProjectId, repository_url: &str) -> TaskRunRequest {
        TaskRunRequest {
            cluster: self.settings.cluster.clone(),
            task_definition: self.settings.task_definition.clone(),
            subnets: self.settings.subnets.clone(),
            security_groups: self.settings.security_groups.clone(),
            assign_public_ip: self.settings.assign_public_ip,
            container_name: self.settings.container_name.clone(),
            environment: vec![
                EnvVar::new(ENV_GIT_REPOSITORY_URL, repository_url),
                EnvVar::new(ENV_PROJECT_ID, id.as_str()),
            ],
        }
    }

    /// Submit one build task for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if the orchestrator rejects the task, is
    /// unreachable, or does not answer within the call timeout.
    pub async fn dispatch(
        &self,
        id: &ProjectId,
        repository_url: &str,
    ) -> Result<DispatchHandle, DispatchError> {
        let request = self.task_request(id, repository_url);
        let Ok(outcome) =
            timeout(self.settings.call_timeout, self.orchestrator.run_task(&request)).await
        else {
            warn!(project = %id, "build task submission timed out");
            return Err(DispatchError::Timeout {
                after_ms: millis(self.settings.call_timeout),
            });
        };

        match outcome {
            Ok(task_id) => {
                info!(
                    project = %id,
                    task_id = %task_id,
                    cluster = %self.settings.cluster,
                    backend = self.orchestrator.name(),
                    "build task dispatched"
                );
                Ok(DispatchHandle {
                    task_id,
                    submitted_at: Utc::now(),
                })
            }
            Err(failure) => {
                warn!(project = %id, failure = ?failure, "build task dispatch failed");
                Err(match failure {
                    RunTaskFailure::Rejected(message) => DispatchError::Rejected(message),
                    RunTaskFailure::Unreachable(message) => DispatchError::Unreachable(message),
                })
            }
        }
    }
}
