//! In-process storage backend.
//!
//! Keeps a bucket registry in memory, records every call in order, and
//! supports failure injection per operation. Used by the `local` backend
//! mode and by tests that assert on call order.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::error::BackendError;

/// Storage operations, as recorded in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StorageOp {
    /// Existence check.
    Exists,
    /// Bucket creation.
    CreateBucket,
    /// Website configuration.
    ConfigureWebsite,
    /// Public access block removal.
    DisablePublicAccessBlock,
    /// Bucket policy attachment.
    ApplyBucketPolicy,
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageCall {
    /// Which operation ran.
    pub op: StorageOp,
    /// The bucket it targeted.
    pub bucket: String,
}

/// Configuration applied to a bucket so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketState {
    /// `(index, error)` documents once website hosting is enabled.
    pub website: Option<(String, String)>,
    /// Whether the default public access block is still in place.
    pub public_access_blocked: bool,
    /// The attached bucket policy, if any.
    pub policy: Option<String>,
}

impl Default for BucketState {
    fn default() -> Self {
        Self {
            website: None,
            public_access_blocked: true,
            policy: None,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    buckets: BTreeMap<String, BucketState>,
    calls: Vec<StorageCall>,
    failures: BTreeMap<StorageOp, String>,
    /// Names that always report as taken without being real buckets.
    reserved: BTreeSet<String>,
    latency: Option<Duration>,
}

/// Shared in-memory bucket registry. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStorage {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `names` as taken in the namespace.
    pub async fn reserve<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = self.inner.lock().await;
        inner.reserved.extend(names.into_iter().map(Into::into));
    }

    /// Make every future call of `op` fail with `message`.
    pub async fn fail_on(&self, op: StorageOp, message: impl Into<String>) {
        self.inner.lock().await.failures.insert(op, message.into());
    }

    /// Remove any injected failure for `op`.
    pub async fn clear_failure(&self, op: StorageOp) {
        self.inner.lock().await.failures.remove(&op);
    }

    /// Delay every call by `latency`.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.inner.lock().await.latency = latency;
    }

    /// Every call made so far, in order.
    pub async fn calls(&self) -> Vec<StorageCall> {
        self.inner.lock().await.calls.clone()
    }

    /// Only the operations of the calls made so far, in order.
    pub async fn ops(&self) -> Vec<StorageOp> {
        self.inner.lock().await.calls.iter().map(|c| c.op).collect()
    }

    /// Current state of `bucket`, if it was created.
    pub async fn bucket(&self, bucket: &str) -> Option<BucketState> {
        self.inner.lock().await.buckets.get(bucket).cloned()
    }

    pub(crate) async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError> {
        self.record(StorageOp::Exists, bucket).await?;
        let inner = self.inner.lock().await;
        Ok(inner.buckets.contains_key(bucket) || inner.reserved.contains(bucket))
    }

    pub(crate) async fn create_bucket(&self, bucket: &str) -> Result<(), BackendError> {
        self.record(StorageOp::CreateBucket, bucket).await?;
        let mut inner = self.inner.lock().await;
        if inner.buckets.contains_key(bucket) || inner.reserved.contains(bucket) {
            return Err(BackendError::new(format!(
                "create bucket {bucket}: BucketAlreadyExists"
            )));
        }
        inner
            .buckets
            .insert(bucket.to_owned(), BucketState::default());
        Ok(())
    }

    pub(crate) async fn configure_website(
        &self,
        bucket: &str,
        index_document: &str,
        error_document: &str,
    ) -> Result<(), BackendError> {
        self.record(StorageOp::ConfigureWebsite, bucket).await?;
        self.update(bucket, |state| {
            state.website = Some((index_document.to_owned(), error_document.to_owned()));
        })
        .await
    }

    pub(crate) async fn disable_public_access_block(&self, bucket: &str) -> Result<(), BackendError> {
        self.record(StorageOp::DisablePublicAccessBlock, bucket).await?;
        self.update(bucket, |state| state.public_access_blocked = false)
            .await
    }

    pub(crate) async fn apply_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), BackendError> {
        self.record(StorageOp::ApplyBucketPolicy, bucket).await?;
        self.update(bucket, |state| state.policy = Some(policy.to_owned()))
            .await
    }

    /// Log the call, wait out any latency, then apply injected failures.
    async fn record(&self, op: StorageOp, bucket: &str) -> Result<(), BackendError> {
        let (latency, failure) = {
            let mut inner = self.inner.lock().await;
            inner.calls.push(StorageCall {
                op,
                bucket: bucket.to_owned(),
            });
            (inner.latency, inner.failures.get(&op).cloned())
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        failure.map_or(Ok(()), |message| Err(BackendError::new(message)))
    }

    async fn update(
        &self,
        bucket: &str,
        apply: impl FnOnce(&mut BucketState),
    ) -> Result<(), BackendError> {
        let mut inner = self.inner.lock().await;
        let state = inner
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| BackendError::new(format!("{bucket}: NoSuchBucket")))?;
        apply(state);
        Ok(())
    }
}
