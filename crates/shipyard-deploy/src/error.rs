//! Error types for the deployment pipeline.
//!
//! Each pipeline stage has its own error enum. [`DeployError`] wraps
//! them unchanged, only recording which stage failed, so callers can
//! match on the original failure.

use shipyard_types::IdError;

/// A failure reported by an external cloud backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    /// Human-readable description from the backend.
    pub message: String,
}

impl BackendError {
    /// Create a backend error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors from the identifier allocator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    /// Every attempt produced a taken name or a failed existence check.
    #[error(
        "no free project id after {attempts} attempts (last error: {})",
        .last_error.as_deref().unwrap_or("none")
    )]
    Exhausted {
        /// Number of candidates tried.
        attempts: u32,
        /// The most recent existence-check failure, if any.
        last_error: Option<String>,
    },

    /// The caller-supplied id already exists in the namespace.
    #[error("project id {0} is already taken")]
    Taken(String),

    /// The caller-supplied id violates naming rules.
    #[error(transparent)]
    InvalidId(#[from] IdError),

    /// The existence check for a caller-supplied id could not complete.
    #[error("namespace check for {candidate} failed: {message}")]
    Unreachable {
        /// The id being checked.
        candidate: String,
        /// Why the check failed.
        message: String,
    },
}

/// The four provisioning steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProvisionStep {
    /// Create the bucket named after the project.
    CreateBucket,
    /// Enable static website hosting.
    ConfigureWebsite,
    /// Turn off the default public access block.
    DisablePublicAccessBlock,
    /// Grant anonymous read on every object.
    ApplyPublicReadPolicy,
}

impl ProvisionStep {
    /// All steps in the order they run.
    pub const ALL: [Self; 4] = [
        Self::CreateBucket,
        Self::ConfigureWebsite,
        Self::DisablePublicAccessBlock,
        Self::ApplyPublicReadPolicy,
    ];

    /// One-based position in the sequence.
    pub const fn number(self) -> u8 {
        match self {
            Self::CreateBucket => 1,
            Self::ConfigureWebsite => 2,
            Self::DisablePublicAccessBlock => 3,
            Self::ApplyPublicReadPolicy => 4,
        }
    }

    /// Stable step name used in logs and error bodies.
    pub const fn name(self) -> &'static str {
        match self {
            Self::CreateBucket => "create_bucket",
            Self::ConfigureWebsite => "configure_website",
            Self::DisablePublicAccessBlock => "disable_public_access_block",
            Self::ApplyPublicReadPolicy => "apply_public_read_policy",
        }
    }
}

impl core::fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// A provisioning step failed. Earlier steps stay applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("provisioning step {} ({step}) failed for {project}: {message}", .step.number())]
pub struct ProvisionError {
    /// The step that failed.
    pub step: ProvisionStep,
    /// The project being provisioned.
    pub project: String,
    /// Backend failure description.
    pub message: String,
}

/// Errors from the task dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The orchestrator refused the request (configuration, quota, capacity).
    #[error("orchestrator rejected task: {0}")]
    Rejected(String),

    /// The orchestrator could not be reached.
    #[error("orchestrator unreachable: {0}")]
    Unreachable(String),

    /// The submission did not complete within the call timeout.
    #[error("task submission timed out after {after_ms}ms")]
    Timeout {
        /// The timeout that expired.
        after_ms: u64,
    },
}

/// A deployment failed at one of its three stages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeployError {
    /// Identifier allocation failed.
    #[error("allocate: {0}")]
    Allocation(#[from] AllocationError),

    /// Hosting provisioning failed.
    #[error("provision: {0}")]
    Provision(#[from] ProvisionError),

    /// Task dispatch failed.
    #[error("dispatch: {0}")]
    Dispatch(#[from] DispatchError),
}

impl DeployError {
    /// Name of the stage that failed.
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Allocation(_) => "allocate",
            Self::Provision(_) => "provision",
            Self::Dispatch(_) => "dispatch",
        }
    }
}

/// Milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_numbered_in_order() {
        let numbers: Vec<u8> = ProvisionStep::ALL.iter().map(|s| s.number()).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn provision_error_names_step() {
        let err = ProvisionError {
            step: ProvisionStep::DisablePublicAccessBlock,
            project: String::from("calm-eager-otter"),
            message: String::from("AccessDenied"),
        };
        assert_eq!(
            err.to_string(),
            "provisioning step 3 (disable_public_access_block) failed for calm-eager-otter: AccessDenied"
        );
    }

    #[test]
    fn deploy_error_keeps_inner_error() {
        let inner = DispatchError::Rejected(String::from("quota"));
        let err = DeployError::from(inner.clone());
        assert_eq!(err.stage(), "dispatch");
        assert_eq!(err, DeployError::Dispatch(inner));
        assert_eq!(err.to_string(), "dispatch: orchestrator rejected task: quota");
    }

    #[test]
    fn exhausted_message_mentions_last_error() {
        let err = AllocationError::Exhausted {
            attempts: 20,
            last_error: None,
        };
        assert_eq!(
            err.to_string(),
            "no free project id after 20 attempts (last error: none)"
        );
    }
}
