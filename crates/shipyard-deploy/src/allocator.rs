//! Project identifier allocation.
//!
//! Candidates come from a [`SlugSource`] and are checked one at a time
//! against the live bucket namespace. Nothing is cached between calls, so
//! every allocation sees names taken by other processes. The check is not
//! a reservation: a name can still be claimed elsewhere between the check
//! and bucket creation, in which case provisioning step 1 fails.

use std::sync::Arc;
use std::time::Duration;

use shipyard_types::ProjectId;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{millis, AllocationError};
use crate::slug::SlugSource;
use crate::storage::StorageBackend;

/// Default cap on candidates tried per allocation.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

/// Tunables for [`IdentifierAllocator`].
#[derive(Debug, Clone)]
pub struct AllocatorSettings {
    /// Maximum candidates tried before giving up.
    pub max_attempts: u32,
    /// Whether a caller-supplied id is checked for collisions.
    pub check_preferred: bool,
    /// Timeout for each existence check.
    pub call_timeout: Duration,
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            check_preferred: true,
            call_timeout: Duration::from_secs(10),
        }
    }
}

/// Finds a project id that is free in the bucket namespace.
#[derive(Clone)]
pub struct IdentifierAllocator {
    storage: StorageBackend,
    slugs: Arc<dyn SlugSource>,
    settings: AllocatorSettings,
}

impl IdentifierAllocator {
    /// Create an allocator over `storage`, drawing candidates from `slugs`.
    pub fn new(
        storage: StorageBackend,
        slugs: Arc<dyn SlugSource>,
        settings: AllocatorSettings,
    ) -> Self {
        Self {
            storage,
            slugs,
            settings,
        }
    }

    /// Allocate an id, honouring `preferred` when given.
    ///
    /// A preferred id is validated and, when `check_preferred` is set,
    /// rejected if it already exists. Otherwise candidates are generated
    /// until one is reported absent or `max_attempts` is reached. A failed
    /// or timed-out existence check uses up one attempt.
    ///
    /// # Errors
    ///
    /// - [`AllocationError::InvalidId`] if `preferred` breaks naming rules.
    /// - [`AllocationError::Taken`] if `preferred` already exists.
    /// - [`AllocationError::Unreachable`] if `preferred` cannot be checked.
    /// - [`AllocationError::Exhausted`] if no free candidate was found.
    pub async fn allocate(&self, preferred: Option<&str>) -> Result<ProjectId, AllocationError> {
        if let Some(slug) = preferred {
            return self.claim_preferred(slug).await;
        }

        let mut last_error = None;
        for attempt in 1..=self.settings.max_attempts {
            let candidate = self.slugs.next_candidate();
            let id = match ProjectId::parse(candidate) {
                Ok(id) => id,
                Err(e) => {
                    warn!(attempt, error = %e, "slug source produced an invalid candidate");
                    last_error = Some(e.to_string());
                    continue;
                }
            };

            match self.exists(&id).await {
                Ok(false) => {
                    info!(project = %id, attempt, "allocated project id");
                    return Ok(id);
                }
                Ok(true) => debug!(candidate = %id, attempt, "candidate taken, retrying"),
                Err(message) => {
                    warn!(candidate = %id, attempt, error = %message, "namespace check failed");
                    last_error = Some(message);
                }
            }
        }

        warn!(
            attempts = self.settings.max_attempts,
            "project id allocation exhausted"
        );
        Err(AllocationError::Exhausted {
            attempts: self.settings.max_attempts,
            last_error,
        })
    }

    async fn claim_preferred(&self, slug: &str) -> Result<ProjectId, AllocationError> {
        let id = ProjectId::parse(slug)?;
        if !self.settings.check_preferred {
            debug!(project = %id, "using caller-supplied project id unchecked");
            return Ok(id);
        }
        match self.exists(&id).await {
            Ok(false) => {
                info!(project = %id, "caller-supplied project id is free");
                Ok(id)
            }
            Ok(true) => Err(AllocationError::Taken(id.into_inner())),
            Err(message) => Err(AllocationError::Unreachable {
                candidate: id.into_inner(),
                message,
            }),
        }
    }

    /// One existence check, bounded by the call timeout.
    async fn exists(&self, id: &ProjectId) -> Result<bool, String> {
        match timeout(self.settings.call_timeout, self.storage.bucket_exists(id.as_str())).await {
            Ok(result) => result.map_err(|e| e.message),
            Err(_) => Err(format!(
                "existence check timed out after {}ms",
                millis(self.settings.call_timeout)
            )),
        }
    }
}
