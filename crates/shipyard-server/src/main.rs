//! Shipyard service binary.
//!
//! Wires the deployment pipeline, the log relay and both HTTP servers
//! together and runs them until `Ctrl-C` or until the log relay stops.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Initialize structured logging (tracing)
//! 3. Build storage and orchestrator backends (AWS or in-memory)
//! 4. Assemble the deployment coordinator
//! 5. Connect to the log bus and start relaying into the hub
//! 6. Start the deploy API and realtime socket servers
//! 7. Wait for shutdown

mod config;
mod error;

use std::sync::Arc;

use anyhow::Context;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use shipyard_api::{AppState, ServerConfig};
use shipyard_deploy::orchestrator::{EcsOrchestrator, MemoryOrchestrator};
use shipyard_deploy::storage::{MemoryStorage, S3Storage};
use shipyard_deploy::{
    AllocatorSettings, DeploymentCoordinator, DispatchSettings, HostingProvisioner,
    IdentifierAllocator, OrchestratorBackend, ProvisionerSettings, RandomSlugs, StorageBackend,
    TaskDispatcher,
};
use shipyard_relay::{LogBus, RelayHub, DEFAULT_HEALTH_INTERVAL};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{AwsConfig, BackendConfig, LogFormat, ShipyardConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration.
    let config = ShipyardConfig::from_env().context("loading configuration")?;

    // 2. Initialize structured logging.
    init_tracing(config.log_format);
    info!("shipyard-server starting");

    // 3-4. Backends and coordinator.
    let coordinator = build_coordinator(&config).await;
    info!(
        public_host = %config.public_host,
        max_attempts = config.allocation_max_attempts,
        check_preferred_slug = config.check_preferred_slug,
        timeout_ms = u64::try_from(config.external_call_timeout.as_millis()).unwrap_or(u64::MAX),
        "Deployment pipeline ready"
    );

    // 5. Log relay.
    let hub = RelayHub::new(config.client_queue_capacity);
    let bus = LogBus::connect(&config.redis_url, config.bus_broadcast_capacity)
        .await
        .context("connecting to the log bus")?;
    let mut relay = {
        let bus = bus.clone();
        let hub = hub.clone();
        tokio::spawn(async move { bus.run(hub, DEFAULT_HEALTH_INTERVAL).await })
    };

    // 6. HTTP servers.
    let state = Arc::new(AppState::new(coordinator, hub));
    let api = shipyard_api::spawn_api(
        &ServerConfig::new(config.api_host.as_str(), config.api_port),
        Arc::clone(&state),
    )
    .await
    .context("starting the deploy API")?;
    let socket = shipyard_api::spawn_socket(
        &ServerConfig::new(config.api_host.as_str(), config.socket_port),
        state,
    )
    .await
    .context("starting the realtime socket server")?;
    info!(
        api_port = config.api_port,
        socket_port = config.socket_port,
        "shipyard-server running"
    );

    // 7. Wait for Ctrl-C or for the relay to stop.
    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
            relay.abort();
            Ok(())
        }
        finished = &mut relay => match finished {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!(error = %e, "log relay stopped");
                Err(anyhow::Error::new(e).context("log relay stopped"))
            }
            Err(e) => {
                error!(error = %e, "log relay task failed");
                Err(anyhow::Error::new(e).context("log relay task failed"))
            }
        },
    };

    api.abort();
    socket.abort();
    if let Err(e) = bus.quit().await {
        warn!(error = %e, "log bus did not close cleanly");
    }

    info!("shipyard-server shutdown complete");
    outcome
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the
/// default `info` filter.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

/// Build the coordinator over the configured backends.
async fn build_coordinator(config: &ShipyardConfig) -> DeploymentCoordinator {
    let (storage, orchestrator, dispatch) = match &config.backend {
        BackendConfig::Aws(aws) => {
            let s3 = load_aws(&aws.s3_region).await;
            let ecs = load_aws(&aws.ecs_region).await;
            info!(
                s3_region = %aws.s3_region,
                ecs_region = %aws.ecs_region,
                cluster = %aws.cluster,
                "Using AWS backends"
            );
            (
                StorageBackend::S3(S3Storage::new(&s3, aws.s3_region.as_str())),
                OrchestratorBackend::Ecs(EcsOrchestrator::new(&ecs)),
                dispatch_settings(config, aws),
            )
        }
        BackendConfig::Local => {
            warn!("Using in-memory backends; nothing is built or hosted");
            (
                StorageBackend::Memory(MemoryStorage::new()),
                OrchestratorBackend::Memory(MemoryOrchestrator::new()),
                DispatchSettings {
                    cluster: String::from("local"),
                    task_definition: String::from("local-builder"),
                    container_name: config.container_name.clone(),
                    subnets: Vec::new(),
                    security_groups: Vec::new(),
                    assign_public_ip: false,
                    call_timeout: config.external_call_timeout,
                },
            )
        }
    };

    let allocator = IdentifierAllocator::new(
        storage.clone(),
        Arc::new(RandomSlugs::new()),
        AllocatorSettings {
            max_attempts: config.allocation_max_attempts,
            check_preferred: config.check_preferred_slug,
            call_timeout: config.external_call_timeout,
        },
    );
    let provisioner = HostingProvisioner::new(
        storage,
        ProvisionerSettings::new(config.public_host.as_str(), config.external_call_timeout),
    );
    let dispatcher = TaskDispatcher::new(orchestrator, dispatch);

    DeploymentCoordinator::new(allocator, provisioner, dispatcher)
}

fn dispatch_settings(config: &ShipyardConfig, aws: &AwsConfig) -> DispatchSettings {
    DispatchSettings {
        cluster: aws.cluster.clone(),
        task_definition: aws.task_definition.clone(),
        container_name: config.container_name.clone(),
        subnets: aws.subnets.clone(),
        security_groups: aws.security_groups.clone(),
        assign_public_ip: true,
        call_timeout: config.external_call_timeout,
    }
}

/// Load shared AWS configuration for `region`. Credentials come from the
/// SDK's default provider chain.
async fn load_aws(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_owned()))
        .load()
        .await
}
