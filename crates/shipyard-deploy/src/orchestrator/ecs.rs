//! Amazon ECS orchestrator backend.

use aws_sdk_ecs::error::{DisplayErrorContext, SdkError};
use aws_sdk_ecs::types::{
    AssignPublicIp, AwsVpcConfiguration, ContainerOverride, KeyValuePair, LaunchType,
    NetworkConfiguration, TaskOverride,
};

use super::{RunTaskFailure, TaskRunRequest};

/// ECS client bound to the orchestrator region.
#[derive(Clone)]
pub struct EcsOrchestrator {
    client: aws_sdk_ecs::Client,
}

impl EcsOrchestrator {
    /// Build a client from shared AWS configuration.
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_ecs::Client::new(config),
        }
    }

    pub(crate) async fn run_task(&self, request: &TaskRunRequest) -> Result<String, RunTaskFailure> {
        let assign_public_ip = if request.assign_public_ip {
            AssignPublicIp::Enabled
        } else {
            AssignPublicIp::Disabled
        };
        let vpc = AwsVpcConfiguration::builder()
            .set_subnets(Some(request.subnets.clone()))
            .set_security_groups(Some(request.security_groups.clone()))
            .assign_public_ip(assign_public_ip)
            .build()
            .map_err(|e| RunTaskFailure::Rejected(format!("invalid network configuration: {e}")))?;

        let environment = request
            .environment
            .iter()
            .map(|var| {
                KeyValuePair::builder()
                    .name(var.name.as_str())
                    .value(var.value.as_str())
                    .build()
            })
            .collect::<Vec<_>>();
        let container = ContainerOverride::builder()
            .name(request.container_name.as_str())
            .set_environment(Some(environment))
            .build();

        let output = self
            .client
            .run_task()
            .cluster(request.cluster.as_str())
            .task_definition(request.task_definition.as_str())
            .launch_type(LaunchType::Fargate)
            .count(1)
            .network_configuration(
                NetworkConfiguration::builder()
                    .awsvpc_configuration(vpc)
                    .build(),
            )
            .overrides(TaskOverride::builder().container_overrides(container).build())
            .send()
            .await
            .map_err(|err| classify(&err))?;

        if let Some(task) = output.tasks().first() {
            return Ok(task.task_arn().unwrap_or("unknown-task").to_owned());
        }

        // RunTask answers 200 with an empty task list when placement fails.
        let reasons = output
            .failures()
            .iter()
            .map(|f| {
                format!(
                    "{}: {}",
                    f.arn().unwrap_or("-"),
                    f.reason().unwrap_or("unknown reason")
                )
            })
            .collect::<Vec<_>>();
        Err(RunTaskFailure::Rejected(if reasons.is_empty() {
            String::from("no task started")
        } else {
            reasons.join("; ")
        }))
    }
}

fn classify<E, R>(err: &SdkError<E, R>) -> RunTaskFailure
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(err).to_string();
    match err {
        SdkError::ServiceError(_) => RunTaskFailure::Rejected(message),
        _ => RunTaskFailure::Unreachable(message),
    }
}
