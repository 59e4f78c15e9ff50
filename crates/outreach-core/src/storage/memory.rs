use dashmap::DashMap;
use outreach_types::{Resource, ResourceKind, WorkItem};

use super::{ResourceStore, WorkItemStore};
use crate::error::AppResult;

/// Non-durable store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    resources: DashMap<String, Resource>,
    work_items: DashMap<String, WorkItem>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResourceStore for MemoryStore {
    fn load_resources(&self, kind: ResourceKind) -> AppResult<Vec<Resource>> {
        Ok(self
            .resources
            .iter()
            .filter(|e| e.value().kind() == kind)
            .map(|e| e.value().clone())
            .collect())
    }

    fn save_resource(&self, resource: &Resource) -> AppResult<()> {
        self.resources.insert(resource.id.clone(), resource.clone());
        Ok(())
    }

    fn delete_resource(&self, id: &str) -> AppResult<()> {
        self.resources.remove(id);
        Ok(())
    }
}

impl WorkItemStore for MemoryStore {
    fn load_work_items(&self) -> AppResult<Vec<WorkItem>> {
        Ok(self.work_items.iter().map(|e| e.value().clone()).collect())
    }

    fn save_work_item(&self, item: &WorkItem) -> AppResult<()> {
        self.work_items.insert(item.id.clone(), item.clone());
        Ok(())
    }

    fn delete_work_item(&self, id: &str) -> AppResult<()> {
        self.work_items.remove(id);
        Ok(())
    }
}
