//! Configuration for the service binary.
//!
//! All configuration is loaded from environment variables once at
//! startup. Cloud credentials are not read here; `aws-config` resolves
//! them from its standard provider chain.

use std::str::FromStr;
use std::time::Duration;

use shipyard_relay::{DEFAULT_BUS_BROADCAST_CAPACITY, DEFAULT_CLIENT_QUEUE_CAPACITY};
use shipyard_types::HostingEndpoint;

use crate::error::ConfigError;

/// Public host used for hosting URLs in local mode.
pub const LOCAL_PUBLIC_HOST: &str = "localhost:8000";

/// Complete service configuration loaded from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipyardConfig {
    /// Message bus URL (e.g. `redis://localhost:6379`).
    pub redis_url: String,
    /// Which external systems deployments talk to.
    pub backend: BackendConfig,
    /// Container that receives the build environment overrides.
    pub container_name: String,
    /// Host suffix of hosting URLs (`http://<id>.<public_host>`).
    pub public_host: String,
    /// Deploy API listen host.
    pub api_host: String,
    /// Deploy API listen port.
    pub api_port: u16,
    /// Realtime socket listen port (same host as the API).
    pub socket_port: u16,
    /// Allocator attempt cap.
    pub allocation_max_attempts: u32,
    /// Whether a caller-chosen slug is checked against the namespace.
    pub check_preferred_slug: bool,
    /// Timeout applied to every external call.
    pub external_call_timeout: Duration,
    /// Outbound queue capacity per realtime connection.
    pub client_queue_capacity: usize,
    /// Capacity of the bus client's message and event channels.
    pub bus_broadcast_capacity: usize,
    /// Log output format.
    pub log_format: LogFormat,
}

/// Backend selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// S3 for buckets, ECS Fargate for build tasks.
    Aws(AwsConfig),
    /// In-memory storage and orchestrator; nothing leaves the process.
    Local,
}

/// AWS settings, required when `SHIPYARD_BACKEND=aws`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsConfig {
    /// ECS cluster running build tasks.
    pub cluster: String,
    /// Build task definition.
    pub task_definition: String,
    /// Subnets for the build task.
    pub subnets: Vec<String>,
    /// Security groups for the build task.
    pub security_groups: Vec<String>,
    /// Region of the ECS cluster.
    pub ecs_region: String,
    /// Region buckets are created in.
    pub s3_region: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

impl ShipyardConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `REDIS_URL` -- message bus connection string
    /// - `AWS_BUILD_CLUSTER`, `AWS_BUILD_TASK`, `AWS_BUILD_SUBNETS`,
    ///   `AWS_BUILD_SECURITY_GROUPS` -- only when the backend is `aws`
    ///
    /// Optional variables:
    /// - `SHIPYARD_BACKEND` -- `aws` or `local` (default `aws`)
    /// - `BUILDER_CONTAINER_NAME` -- container override name (default `builder-image`)
    /// - `ECS_REGION` / `S3_REGION` -- regions (default `us-east-1`)
    /// - `PUBLIC_HOST` -- hosting URL suffix (default: S3 website host, or
    ///   `localhost:8000` for `local`)
    /// - `API_HOST` / `API_PORT` / `SOCKET_PORT` -- listeners (default `0.0.0.0` / 9000 / 9001)
    /// - `ALLOCATION_MAX_ATTEMPTS` -- allocator cap (default 20)
    /// - `CHECK_PREFERRED_SLUG` -- check caller slugs for collisions (default `true`)
    /// - `EXTERNAL_CALL_TIMEOUT_MS` -- per-call timeout (default 10000)
    /// - `CLIENT_QUEUE_CAPACITY` -- realtime queue size (default 256)
    /// - `BUS_BROADCAST_CAPACITY` -- bus messages buffered before the relay
    ///   skips some (default 4096)
    /// - `LOG_FORMAT` -- `pretty` or `json` (default `pretty`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's
    /// value if it is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(lookup);

        let redis_url = vars.required("REDIS_URL")?;
        let backend = match vars.or("SHIPYARD_BACKEND", "aws").to_lowercase().as_str() {
            "aws" => BackendConfig::Aws(AwsConfig {
                cluster: vars.required("AWS_BUILD_CLUSTER")?,
                task_definition: vars.required("AWS_BUILD_TASK")?,
                subnets: vars.list("AWS_BUILD_SUBNETS")?,
                security_groups: vars.list("AWS_BUILD_SECURITY_GROUPS")?,
                ecs_region: vars.or("ECS_REGION", "us-east-1"),
                s3_region: vars.or("S3_REGION", "us-east-1"),
            }),
            "local" => BackendConfig::Local,
            other => {
                return Err(ConfigError::Invalid {
                    name: "SHIPYARD_BACKEND",
                    message: format!("unknown backend {other}, expected aws or local"),
                })
            }
        };

        let public_host = vars.get("PUBLIC_HOST").unwrap_or_else(|| match &backend {
            BackendConfig::Aws(aws) => HostingEndpoint::s3_website_host(&aws.s3_region),
            BackendConfig::Local => LOCAL_PUBLIC_HOST.to_owned(),
        });

        let allocation_max_attempts: u32 = vars.parsed("ALLOCATION_MAX_ATTEMPTS", 20)?;
        if allocation_max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "ALLOCATION_MAX_ATTEMPTS",
                message: String::from("must be at least 1"),
            });
        }

        Ok(Self {
            redis_url,
            backend,
            container_name: vars.or("BUILDER_CONTAINER_NAME", "builder-image"),
            public_host,
            api_host: vars.or("API_HOST", "0.0.0.0"),
            api_port: vars.parsed("API_PORT", 9000)?,
            socket_port: vars.parsed("SOCKET_PORT", 9001)?,
            allocation_max_attempts,
            check_preferred_slug: vars.parsed("CHECK_PREFERRED_SLUG", true)?,
            external_call_timeout: Duration::from_millis(
                vars.parsed("EXTERNAL_CALL_TIMEOUT_MS", 10_000)?,
            ),
            client_queue_capacity: vars
                .parsed("CLIENT_QUEUE_CAPACITY", DEFAULT_CLIENT_QUEUE_CAPACITY)?,
            bus_broadcast_capacity: vars
                .parsed("BUS_BROADCAST_CAPACITY", DEFAULT_BUS_BROADCAST_CAPACITY)?,
            log_format: vars.parsed("LOG_FORMAT", LogFormat::Pretty)?,
        })
    }
}

/// Variable reader that treats blank values as unset.
struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }

    fn or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_owned())
    }

    /// Comma-separated, non-empty list.
    fn list(&self, name: &'static str) -> Result<Vec<String>, ConfigError> {
        let items: Vec<String> = self
            .required(name)?
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_owned)
            .collect();
        if items.is_empty() {
            return Err(ConfigError::Missing(name));
        }
        Ok(items)
    }

    fn parsed<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(name).map_or(Ok(default), |raw| {
            raw.parse().map_err(|e| ConfigError::Invalid {
                name,
                message: format!("{raw:?}: {e}"),
            })
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ShipyardConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ShipyardConfig::from_lookup(|name| map.get(name).cloned())
    }

    const AWS: &[(&str, &str)] = &[
        ("REDIS_URL", "redis://localhost:6379"),
        ("AWS_BUILD_CLUSTER", "builder-cluster"),
        ("AWS_BUILD_TASK", "builder-task"),
        ("AWS_BUILD_SUBNETS", "subnet-a, subnet-b,,"),
        ("AWS_BUILD_SECURITY_GROUPS", "sg-1"),
    ];

    #[test]
    fn aws_defaults() {
        let config = load(AWS).unwrap();
        assert_eq!(config.api_host, "0.0.0.0");
        assert_eq!(config.api_port, 9000);
        assert_eq!(config.socket_port, 9001);
        assert_eq!(config.container_name, "builder-image");
        assert_eq!(config.allocation_max_attempts, 20);
        assert!(config.check_preferred_slug);
        assert_eq!(config.external_call_timeout, Duration::from_secs(10));
        assert_eq!(config.client_queue_capacity, 256);
        assert_eq!(config.bus_broadcast_capacity, 4096);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.public_host, "s3-website-us-east-1.amazonaws.com");

        assert_eq!(
            config.backend,
            BackendConfig::Aws(AwsConfig {
                cluster: String::from("builder-cluster"),
                task_definition: String::from("builder-task"),
                subnets: vec![String::from("subnet-a"), String::from("subnet-b")],
                security_groups: vec![String::from("sg-1")],
                ecs_region: String::from("us-east-1"),
                s3_region: String::from("us-east-1"),
            })
        );
    }

    #[test]
    fn local_backend_needs_only_the_bus() {
        let config = load(&[
            ("REDIS_URL", "redis://localhost:6379"),
            ("SHIPYARD_BACKEND", "local"),
        ])
        .unwrap();
        assert_eq!(config.backend, BackendConfig::Local);
        assert_eq!(config.public_host, LOCAL_PUBLIC_HOST);
    }

    #[test]
    fn missing_values_are_reported_by_name() {
        assert_eq!(load(&[]).err(), Some(ConfigError::Missing("REDIS_URL")));
        assert_eq!(
            load(&[("REDIS_URL", "redis://localhost:6379")]).err(),
            Some(ConfigError::Missing("AWS_BUILD_CLUSTER"))
        );
        let mut vars = AWS.to_vec();
        vars.push(("AWS_BUILD_SECURITY_GROUPS", " , "));
        assert_eq!(load(&vars).err(), Some(ConfigError::Missing("AWS_BUILD_SECURITY_GROUPS")));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = AWS.to_vec();
        vars.extend([
            ("S3_REGION", "eu-west-1"),
            ("API_PORT", "8080"),
            ("CHECK_PREFERRED_SLUG", "false"),
            ("EXTERNAL_CALL_TIMEOUT_MS", "250"),
            ("LOG_FORMAT", "JSON"),
            ("CLIENT_QUEUE_CAPACITY", "64"),
            ("BUS_BROADCAST_CAPACITY", "16384"),
        ]);
        let config = load(&vars).unwrap();
        assert_eq!(config.public_host, "s3-website-eu-west-1.amazonaws.com");
        assert_eq!(config.client_queue_capacity, 64);
        assert_eq!(config.bus_broadcast_capacity, 16_384);
        assert_eq!(config.api_port, 8080);
        assert!(!config.check_preferred_slug);
        assert_eq!(config.external_call_timeout, Duration::from_millis(250));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn newer_s3_regions_get_the_dotted_website_host() {
        let mut vars = AWS.to_vec();
        vars.push(("S3_REGION", "eu-central-1"));
        let config = load(&vars).unwrap();
        assert_eq!(config.public_host, "s3-website.eu-central-1.amazonaws.com");
    }

    #[test]
    fn bad_capacity_is_rejected_by_name() {
        let mut vars = AWS.to_vec();
        vars.push(("BUS_BROADCAST_CAPACITY", "lots"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { name: "BUS_BROADCAST_CAPACITY", .. })
        ));
    }

    #[test]
    fn explicit_public_host_wins() {
        let config = load(&[
            ("REDIS_URL", "redis://localhost:6379"),
            ("SHIPYARD_BACKEND", "local"),
            ("PUBLIC_HOST", "sites.example.com"),
        ])
        .unwrap();
        assert_eq!(config.public_host, "sites.example.com");
    }

    #[test]
    fn bad_values_are_invalid() {
        for (name, value) in [
            ("API_PORT", "ninety"),
            ("ALLOCATION_MAX_ATTEMPTS", "0"),
            ("CHECK_PREFERRED_SLUG", "maybe"),
            ("LOG_FORMAT", "xml"),
            ("SHIPYARD_BACKEND", "gcp"),
        ] {
            let mut vars = AWS.to_vec();
            vars.push((name, value));
            assert!(
                matches!(load(&vars), Err(ConfigError::Invalid { name: n, .. }) if n == name),
                "{name}={value}"
            );
        }
    }
}
