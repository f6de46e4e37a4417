//! Object storage backends.
//!
//! The bucket namespace doubles as the project id registry, and each
//! project's bucket serves its static site. Uses enum dispatch instead
//! of trait objects because async methods are not dyn-compatible.

pub mod memory;
pub mod s3;

pub use memory::{BucketState, MemoryStorage, StorageCall, StorageOp};
pub use s3::S3Storage;

use crate::error::BackendError;

/// A storage backend that can check and provision buckets.
#[derive(Clone)]
pub enum StorageBackend {
    /// Amazon S3.
    S3(S3Storage),
    /// In-process bucket registry for local runs and tests.
    Memory(MemoryStorage),
}

impl StorageBackend {
    /// Whether a bucket named `bucket` already exists anywhere in the
    /// namespace (including buckets owned by other accounts).
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the namespace cannot be queried.
    pub async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError> {
        match self {
            Self::S3(s3) => s3.bucket_exists(bucket).await,
            Self::Memory(mem) => mem.bucket_exists(bucket).await,
        }
    }

    /// Create `bucket`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the bucket cannot be created.
    pub async fn create_bucket(&self, bucket: &str) -> Result<(), BackendError> {
        match self {
            Self::S3(s3) => s3.create_bucket(bucket).await,
            Self::Memory(mem) => mem.create_bucket(bucket).await,
        }
    }

    /// Enable static website hosting with the given index and error documents.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the configuration is refused.
    pub async fn configure_website(
        &self,
        bucket: &str,
        index_document: &str,
        error_document: &str,
    ) -> Result<(), BackendError> {
        match self {
            Self::S3(s3) => s3.configure_website(bucket, index_document, error_document).await,
            Self::Memory(mem) => {
                mem.configure_website(bucket, index_document, error_document)
                    .await
            }
        }
    }

    /// Turn off every "block public access" control on `bucket`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the change is refused.
    pub async fn disable_public_access_block(&self, bucket: &str) -> Result<(), BackendError> {
        match self {
            Self::S3(s3) => s3.disable_public_access_block(bucket).await,
            Self::Memory(mem) => mem.disable_public_access_block(bucket).await,
        }
    }

    /// Attach the JSON bucket `policy` to `bucket`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the policy is refused.
    pub async fn apply_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), BackendError> {
        match self {
            Self::S3(s3) => s3.apply_bucket_policy(bucket, policy).await,
            Self::Memory(mem) => mem.apply_bucket_policy(bucket, policy).await,
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::S3(_) => "s3",
            Self::Memory(_) => "memory",
        }
    }
}
