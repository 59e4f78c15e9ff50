//! Persistence collaborator for resources and work items.
//!
//! Stores are called from inside the pool and queue critical sections, so the
//! traits are synchronous and every call is a single keyed read-modify-write.
//! The in-process lock held by the caller provides the atomic conditional
//! update the lease protocol needs; the store only has to be durable.

mod memory;
mod sqlite;


pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use outreach_types::{Resource, ResourceKind, WorkItem};

use crate::error::AppResult;

/// Durable keyed storage for `Resource` records.
pub trait ResourceStore: Send + Sync {
    fn load_resources(&self, kind: ResourceKind) -> AppResult<Vec<Resource>>;
    fn save_resource(&self, resource: &Resource) -> AppResult<()>;
    fn delete_resource(&self, id: &str) -> AppResult<()>;
}

/// Durable keyed storage for `WorkItem` records.
pub trait WorkItemStore: Send + Sync {
    fn load_work_items(&self) -> AppResult<Vec<WorkItem>>;
    fn save_work_item(&self, item: &WorkItem) -> AppResult<()>;
    fn delete_work_item(&self, id: &str) -> AppResult<()>;
}
