//! End-to-end tests of the deployment pipeline over in-memory backends.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shipyard_deploy::dispatcher::{ENV_GIT_REPOSITORY_URL, ENV_PROJECT_ID};
use shipyard_deploy::orchestrator::MemoryOrchestrator;
use shipyard_deploy::storage::{MemoryStorage, StorageOp};
use shipyard_deploy::{
    AllocationError, AllocatorSettings, DeployError, DeploymentCoordinator, DispatchSettings,
    HostingProvisioner, IdentifierAllocator, OrchestratorBackend, ProvisionStep,
    ProvisionerSettings, RandomSlugs, SlugSource, StorageBackend, TaskDispatcher,
};
use shipyard_types::{DeploymentRequest, DeploymentResponse};

struct ScriptedSlugs(Mutex<VecDeque<&'static str>>);

impl SlugSource for ScriptedSlugs {
    fn next_candidate(&self) -> String {
        self.0
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or("out-of-names")
            .to_owned()
    }
}

struct Harness {
    storage: MemoryStorage,
    orchestrator: MemoryOrchestrator,
    coordinator: DeploymentCoordinator,
}

fn harness(slugs: Arc<dyn SlugSource>) -> Harness {
    let storage = MemoryStorage::new();
    let orchestrator = MemoryOrchestrator::new();
    let backend = StorageBackend::Memory(storage.clone());
    let timeout = Duration::from_secs(1);

    let allocator = IdentifierAllocator::new(
        backend.clone(),
        slugs,
        AllocatorSettings {
            max_attempts: 20,
            check_preferred: true,
            call_timeout: timeout,
        },
    );
    let provisioner =
        HostingProvisioner::new(backend, ProvisionerSettings::new("localhost:8000", timeout));
    let dispatcher = TaskDispatcher::new(
        OrchestratorBackend::Memory(orchestrator.clone()),
        DispatchSettings {
            cluster: String::from("builder-cluster"),
            task_definition: String::from("builder-task"),
            container_name: String::from("builder-image"),
            subnets: vec![String::from("subnet-a")],
            security_groups: vec![String::from("sg-1")],
            assign_public_ip: true,
            call_timeout: timeout,
        },
    );

    Harness {
        storage,
        orchestrator,
        coordinator: DeploymentCoordinator::new(allocator, provisioner, dispatcher),
    }
}

fn scripted(names: &[&'static str]) -> Arc<dyn SlugSource> {
    Arc::new(ScriptedSlugs(Mutex::new(names.iter().copied().collect())))
}

#[tokio::test]
async fn queued_deployment_end_to_end() {
    let h = harness(scripted(&["calm-eager-otter"]));
    let request = DeploymentRequest::new("https://example.com/r.git");

    let deployment = h.coordinator.deploy(&request).await.unwrap();

    assert_eq!(deployment.project_id.as_str(), "calm-eager-otter");
    assert_eq!(deployment.url.as_str(), "http://calm-eager-otter.localhost:8000");
    assert_eq!(deployment.log_channel, "logs:calm-eager-otter");

    assert_eq!(
        h.storage.ops().await,
        vec![
            StorageOp::Exists,
            StorageOp::CreateBucket,
            StorageOp::ConfigureWebsite,
            StorageOp::DisablePublicAccessBlock,
            StorageOp::ApplyBucketPolicy,
        ]
    );

    let submitted = h.orchestrator.submitted().await;
    assert_eq!(submitted.len(), 1);
    let task = submitted.first().unwrap();
    assert_eq!(task.env(ENV_GIT_REPOSITORY_URL), Some("https://example.com/r.git"));
    assert_eq!(task.env(ENV_PROJECT_ID), Some("calm-eager-otter"));

    let body = serde_json::to_value(DeploymentResponse::queued(
        &deployment.project_id,
        &deployment.url,
    ))
    .unwrap();
    assert_eq!(body["status"], "queued");
    assert_eq!(body["data"]["projectSlug"], "calm-eager-otter");
    assert_eq!(body["data"]["url"], "http://calm-eager-otter.localhost:8000");
}

#[tokio::test]
async fn preferred_slug_skips_generation() {
    let h = harness(scripted(&[]));
    let request = DeploymentRequest::new("https://example.com/r.git").with_slug("my-site");

    let deployment = h.coordinator.deploy(&request).await.unwrap();

    assert_eq!(deployment.project_id.as_str(), "my-site");
}

#[tokio::test]
async fn allocation_failure_stops_before_provisioning() {
    let h = harness(scripted(&[]));
    h.storage.reserve(["my-site"]).await;
    let request = DeploymentRequest::new("https://example.com/r.git").with_slug("my-site");

    let err = h.coordinator.deploy(&request).await.unwrap_err();

    assert_eq!(
        err,
        DeployError::Allocation(AllocationError::Taken(String::from("my-site")))
    );
    assert_eq!(h.storage.ops().await, vec![StorageOp::Exists]);
    assert!(h.orchestrator.submitted().await.is_empty());
}

#[tokio::test]
async fn provisioning_failure_stops_before_dispatch() {
    let h = harness(scripted(&["calm-eager-otter"]));
    h.storage
        .fail_on(StorageOp::DisablePublicAccessBlock, "AccessDenied")
        .await;

    let err = h
        .coordinator
        .deploy(&DeploymentRequest::new("https://example.com/r.git"))
        .await
        .unwrap_err();

    assert!(
        matches!(
            &err,
            DeployError::Provision(inner)
                if inner.step == ProvisionStep::DisablePublicAccessBlock
                    && inner.project == "calm-eager-otter"
        ),
        "expected provisioning error, got {err:?}"
    );
    assert!(h.orchestrator.submitted().await.is_empty());
}

#[tokio::test]
async fn concurrent_deployments_get_distinct_ids() {
    let h = Arc::new(harness(Arc::new(RandomSlugs::seeded(99))));
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let h = Arc::clone(&h);
        tasks.push(tokio::spawn(async move {
            h.coordinator
                .deploy(&DeploymentRequest::new("https://example.com/r.git"))
                .await
        }));
    }

    let mut ids = BTreeSet::new();
    for task in tasks {
        let deployment = task.await.unwrap().unwrap();
        ids.insert(deployment.project_id.into_inner());
    }

    assert_eq!(ids.len(), 8);
    assert_eq!(h.orchestrator.submitted().await.len(), 8);
}
