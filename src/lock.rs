//! Per-entity mutual exclusion around read-check-write sequences
use super::store::Collection;
use parking_lot::{ArcMutexGuard, Mutex, RawMutex};
use std::collections::HashMap;
use std::sync::Arc;

type Slot = Arc<Mutex<()>>;

#[derive(Default)]
pub struct EntityLocks {
    slots: Mutex<HashMap<(Collection, String), Slot>>,
}

/// Held for the duration of one mutation. Releasing the last holder of a slot
/// removes it from the table.
pub struct EntityGuard<'a> {
    locks: &'a EntityLocks,
    key: (Collection, String),
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self, collection: Collection, id: &str) -> EntityGuard<'_> {
        let key = (collection, id.to_string());
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(key.clone()).or_default())
        };
        let guard = slot.lock_arc();

        EntityGuard {
            locks: self,
            key,
            guard: Some(guard),
        }
    }

    pub fn held(&self) -> usize {
        self.slots.lock().len()
    }
}

impl Drop for EntityGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut slots = self.locks.slots.lock();
        if slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.key);
        }
    }
}
