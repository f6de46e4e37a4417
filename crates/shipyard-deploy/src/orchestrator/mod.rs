//! Container orchestrator backends.
//!
//! The dispatcher hands a fully built [`TaskRunRequest`] to an
//! [`OrchestratorBackend`] and gets back the orchestrator's task id. The
//! orchestrator owns the task from then on; nothing here polls it.

pub mod ecs;
pub mod memory;

pub use ecs::EcsOrchestrator;
pub use memory::MemoryOrchestrator;

/// One environment variable injected into the build container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    /// Variable name.
    pub name: String,
    /// Variable value.
    pub value: String,
}

impl EnvVar {
    /// Build a variable.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A single run-once task submission.
///
/// Always one task on serverless capacity (`FARGATE`) inside the
/// configured subnets and security groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRunRequest {
    /// Cluster the task runs in.
    pub cluster: String,
    /// Task definition (family or ARN) to run.
    pub task_definition: String,
    /// Subnets for the task's network interface.
    pub subnets: Vec<String>,
    /// Security groups for the task's network interface.
    pub security_groups: Vec<String>,
    /// Whether the task gets a public IP address.
    pub assign_public_ip: bool,
    /// Container whose environment is overridden.
    pub container_name: String,
    /// Environment overrides for that container.
    pub environment: Vec<EnvVar>,
}

impl TaskRunRequest {
    /// Look up an environment override by name.
    pub fn env(&self, name: &str) -> Option<&str> {
        self.environment
            .iter()
            .find(|var| var.name == name)
            .map(|var| var.value.as_str())
    }
}

/// Why an orchestrator refused or failed a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunTaskFailure {
    /// The orchestrator answered and refused the task.
    Rejected(String),
    /// The orchestrator could not be reached.
    Unreachable(String),
}

/// A backend that can start build tasks.
#[derive(Clone)]
pub enum OrchestratorBackend {
    /// Amazon ECS.
    Ecs(EcsOrchestrator),
    /// In-process recorder for local runs and tests.
    Memory(MemoryOrchestrator),
}

impl OrchestratorBackend {
    /// Submit `request` once and return the started task's id.
    ///
    /// # Errors
    ///
    /// Returns [`RunTaskFailure`] if the submission is refused or cannot
    /// be delivered.
    pub async fn run_task(&self, request: &TaskRunRequest) -> Result<String, RunTaskFailure> {
        match self {
            Self::Ecs(ecs) => ecs.run_task(request).await,
            Self::Memory(mem) => mem.run_task(request).await,
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::Ecs(_) => "ecs",
            Self::Memory(_) => "memory",
        }
    }
}
