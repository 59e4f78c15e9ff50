use std::sync::Arc;

use crate::queue::WorkQueue;

pub(super) const INTERRUPTED: &str = "dispatch interrupted";

/// Holds an `in_flight` work item for the duration of one dispatch.
///
/// If the dispatch future is dropped before the item reaches a queue outcome,
/// the item is failed retryably so it re-enters the retry schedule.
pub(super) struct ItemClaim {
    queue: Arc<WorkQueue>,
    id: String,
    resolved: bool,
}

impl ItemClaim {
    pub(super) fn new(queue: Arc<WorkQueue>, id: String) -> Self {
        Self { queue, id, resolved: false }
    }

    pub(super) fn id(&self) -> &str {
        &self.id
    }

    /// The item has been completed or failed through the queue.
    pub(super) fn resolve(&mut self) {
        self.resolved = true;
    }
}

impl Drop for ItemClaim {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        tracing::warn!(work_item_id = %self.id, "Dispatch dropped mid-flight, rescheduling item");
        if let Err(e) = self.queue.fail(&self.id, INTERRUPTED, true) {
            tracing::warn!(work_item_id = %self.id, "Could not reschedule interrupted item: {}", e);
        }
    }
}
