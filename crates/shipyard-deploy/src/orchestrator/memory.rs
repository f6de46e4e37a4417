//! In-process orchestrator that records submissions.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use uuid::Uuid;

use super::{RunTaskFailure, TaskRunRequest};

#[derive(Debug, Default)]
struct Inner {
    submitted: Vec<TaskRunRequest>,
    failure: Option<RunTaskFailure>,
    latency: Option<Duration>,
}

/// Records every submitted task instead of running it. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryOrchestrator {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryOrchestrator {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every future submission with `failure`.
    pub async fn fail_with(&self, failure: RunTaskFailure) {
        self.inner.lock().await.failure = Some(failure);
    }

    /// Delay every submission by `latency`.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.inner.lock().await.latency = latency;
    }

    /// Every submission received so far, in order.
    pub async fn submitted(&self) -> Vec<TaskRunRequest> {
        self.inner.lock().await.submitted.clone()
    }

    pub(crate) async fn run_task(&self, request: &TaskRunRequest) -> Result<String, RunTaskFailure> {
        let (latency, failure) = {
            let inner = self.inner.lock().await;
            (inner.latency, inner.failure.clone())
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(failure) = failure {
            return Err(failure);
        }
        self.inner.lock().await.submitted.push(request.clone());
        Ok(format!("local-task/{}", Uuid::new_v4()))
    }
}
