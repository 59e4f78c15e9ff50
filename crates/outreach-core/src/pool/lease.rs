//! RAII lease over a pooled resource.

use chrono::{DateTime, Utc};
use outreach_types::{PoolError, ReleaseOutcome, Resource};

use super::ResourcePool;

/// Exclusive hold on one resource.
/// Releases with `NoOp` on drop unless `release()` is called.
pub struct ResourceLease {
    pool: ResourcePool,
    resource: Resource,
    released: bool,
}

impl ResourceLease {
    pub(super) fn new(pool: ResourcePool, resource: Resource) -> Self {
        Self { pool, resource, released: false }
    }

    pub fn id(&self) -> &str {
        &self.resource.id
    }

    /// Snapshot taken at acquisition time.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// End the lease with an explicit outcome.
    pub fn release(self, outcome: ReleaseOutcome) -> Result<Resource, PoolError> {
        self.release_at(outcome, Utc::now())
    }

    pub fn release_at(
        mut self,
        outcome: ReleaseOutcome,
        now: DateTime<Utc>,
    ) -> Result<Resource, PoolError> {
        self.released = true;
        self.pool.release_at(&self.resource.id, outcome, now)
    }
}

impl Drop for ResourceLease {
    fn drop(&mut self) {
        if !self.released {
            tracing::debug!(resource_id = %self.resource.id, "Lease dropped without outcome, returning unused");
            if let Err(e) = self.pool.release(&self.resource.id, ReleaseOutcome::NoOp) {
                tracing::warn!(resource_id = %self.resource.id, "Implicit lease release failed: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for ResourceLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLease")
            .field("id", &self.resource.id)
            .field("address", &self.resource.address)
            .field("released", &self.released)
            .finish()
    }
}
