//! Static hosting provisioning.
//!
//! Turns a freshly allocated project id into a public website bucket in
//! four calls. A failing step aborts the sequence and nothing is rolled
//! back: the bucket stays behind with steps 1..k-1 applied.

use std::future::Future;
use std::time::Duration;

use shipyard_types::{HostingEndpoint, ProjectId};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{millis, BackendError, ProvisionError, ProvisionStep};
use crate::storage::StorageBackend;

/// Tunables for [`HostingProvisioner`].
#[derive(Debug, Clone)]
pub struct ProvisionerSettings {
    /// Host suffix of public URLs (`http://<id>.<public_host>`).
    pub public_host: String,
    /// Document served for directory requests.
    pub index_document: String,
    /// Document served on errors.
    pub error_document: String,
    /// Timeout for each storage call.
    pub call_timeout: Duration,
}

impl ProvisionerSettings {
    /// Settings with the conventional `index.html` / `error.html` documents.
    pub fn new(public_host: impl Into<String>, call_timeout: Duration) -> Self {
        Self {
            public_host: public_host.into(),
            index_document: String::from("index.html"),
            error_document: String::from("error.html"),
            call_timeout,
        }
    }
}

/// Creates and publicly exposes a project's website bucket.
#[derive(Clone)]
pub struct HostingProvisioner {
    storage: StorageBackend,
    settings: ProvisionerSettings,
}

impl HostingProvisioner {
    /// Create a provisioner over `storage`.
    pub const fn new(storage: StorageBackend, settings: ProvisionerSettings) -> Self {
        Self { storage, settings }
    }

    /// Run the four provisioning steps for `id` and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] naming the first step that failed or
    /// timed out. Later steps are not attempted.
    pub async fn provision(&self, id: &ProjectId) -> Result<HostingEndpoint, ProvisionError> {
        let bucket = id.as_str();

        self.run_step(id, ProvisionStep::CreateBucket, self.storage.create_bucket(bucket))
            .await?;
        self.run_step(
            id,
            ProvisionStep::ConfigureWebsite,
            self.storage.configure_website(
                bucket,
                &self.settings.index_document,
                &self.settings.error_document,
            ),
        )
        .await?;
        self.run_step(
            id,
            ProvisionStep::DisablePublicAccessBlock,
            self.storage.disable_public_access_block(bucket),
        )
        .await?;
        let policy = public_read_policy(bucket);
        self.run_step(
            id,
            ProvisionStep::ApplyPublicReadPolicy,
            self.storage.apply_bucket_policy(bucket, &policy),
        )
        .await?;

        let endpoint = HostingEndpoint::for_project(id, &self.settings.public_host);
        info!(project = %id, url = %endpoint, backend = self.storage.name(), "hosting provisioned");
        Ok(endpoint)
    }

    async fn run_step<F>(&self, id: &ProjectId, step: ProvisionStep, call: F) -> Result<(), ProvisionError>
    where
        F: Future<Output = Result<(), BackendError>>,
    {
        debug!(project = %id, step = %step, "provisioning step");
        let outcome = match timeout(self.settings.call_timeout, call).await {
            Ok(result) => result.map_err(|e| e.message),
            Err(_) => Err(format!(
                "timed out after {}ms",
                millis(self.settings.call_timeout)
            )),
        };
        outcome.map_err(|message| {
            warn!(
                project = %id,
                step = %step,
                error = %message,
                "provisioning aborted; bucket may require manual cleanup"
            );
            ProvisionError {
                step,
                project: id.to_string(),
                message,
            }
        })
    }
}

/// Bucket policy granting anonymous `s3:GetObject` on every object.
pub fn public_read_policy(bucket: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Sid": "PublicReadGetObject",
            "Effect": "Allow",
            "Principal": "*",
            "Action": "s3:GetObject",
            "Resource": format!("arn:aws:s3:::{bucket}/*"),
        }]
    })
    .to_string()
}
