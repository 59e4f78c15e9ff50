//! RAII guard for cancellation-safe dispatch slot counting.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One of `max_concurrent` dispatch slots. Frees the slot on drop.
pub struct DispatchSlot {
    active: Arc<AtomicUsize>,
}

impl DispatchSlot {
    /// Atomically reserve a slot if fewer than `max_concurrent` are taken.
    pub fn try_acquire(active: &Arc<AtomicUsize>, max_concurrent: usize) -> Option<Self> {
        let mut current = active.load(Ordering::SeqCst);
        loop {
            if current >= max_concurrent {
                return None;
            }
            match active.compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => return Some(Self { active: Arc::clone(active) }),
                Err(actual) => current = actual,
            }
        }
    }
}

impl Drop for DispatchSlot {
    fn drop(&mut self) {
        let _ = self
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_capped_and_freed_on_drop() {
        let active = Arc::new(AtomicUsize::new(0));
        let a = DispatchSlot::try_acquire(&active, 2).unwrap();
        let _b = DispatchSlot::try_acquire(&active, 2).unwrap();
        assert!(DispatchSlot::try_acquire(&active, 2).is_none());

        drop(a);
        assert_eq!(active.load(Ordering::SeqCst), 1);
        assert!(DispatchSlot::try_acquire(&active, 2).is_some());
    }
}
