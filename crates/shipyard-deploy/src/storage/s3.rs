//! Amazon S3 storage backend.

use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, ErrorDocument, IndexDocument,
    PublicAccessBlockConfiguration, WebsiteConfiguration,
};
use tracing::debug;

use crate::error::BackendError;

/// Region in which `CreateBucket` must not carry a location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// S3 client bound to one region.
#[derive(Clone)]
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    region: String,
}

impl S3Storage {
    /// Build a client from shared AWS configuration.
    pub fn new(config: &aws_config::SdkConfig, region: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(config),
            region: region.into(),
        }
    }

    pub(crate) async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                if err
                    .as_service_error()
                    .is_some_and(HeadBucketError::is_not_found)
                {
                    return Ok(false);
                }
                // HEAD responses carry no error body, so fall back to the status.
                match err.raw_response().map(|r| r.status().as_u16()) {
                    Some(404) => Ok(false),
                    // Owned by another account or living in another region.
                    Some(301 | 403) => {
                        debug!(bucket, "bucket exists outside this account or region");
                        Ok(true)
                    }
                    _ => Err(sdk_error("head bucket", bucket, &err)),
                }
            }
        }
    }

    pub(crate) async fn create_bucket(&self, bucket: &str) -> Result<(), BackendError> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }
        request
            .send()
            .await
            .map_err(|e| sdk_error("create bucket", bucket, &e))?;
        Ok(())
    }

    pub(crate) async fn configure_website(
        &self,
        bucket: &str,
        index_document: &str,
        error_document: &str,
    ) -> Result<(), BackendError> {
        let index = IndexDocument::builder()
            .suffix(index_document)
            .build()
            .map_err(|e| BackendError::new(format!("invalid index document: {e}")))?;
        let error = ErrorDocument::builder()
            .key(error_document)
            .build()
            .map_err(|e| BackendError::new(format!("invalid error document: {e}")))?;
        let website = WebsiteConfiguration::builder()
            .index_document(index)
            .error_document(error)
            .build();

        self.client
            .put_bucket_website()
            .bucket(bucket)
            .website_configuration(website)
            .send()
            .await
            .map_err(|e| sdk_error("put bucket website", bucket, &e))?;
        Ok(())
    }

    pub(crate) async fn disable_public_access_block(&self, bucket: &str) -> Result<(), BackendError> {
        let config = PublicAccessBlockConfiguration::builder()
            .block_public_acls(false)
            .ignore_public_acls(false)
            .block_public_policy(false)
            .restrict_public_buckets(false)
            .build();

        self.client
            .put_public_access_block()
            .bucket(bucket)
            .public_access_block_configuration(config)
            .send()
            .await
            .map_err(|e| sdk_error("put public access block", bucket, &e))?;
        Ok(())
    }

    pub(crate) async fn apply_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), BackendError> {
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await
            .map_err(|e| sdk_error("put bucket policy", bucket, &e))?;
        Ok(())
    }
}

fn sdk_error<E, R>(action: &str, bucket: &str, err: &SdkError<E, R>) -> BackendError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    BackendError::new(format!("{action} {bucket}: {}", DisplayErrorContext(err)))
}
