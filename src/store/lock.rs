//! Per-key mutual exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::trace;

/// A map of lazily created mutexes, one per key.
///
/// Operations on the same key run one at a time; different keys never
/// contend beyond the brief map lookup. Slots are dropped once idle.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    /// Create an empty lock map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with_key<R>(&self, key: &str, f: impl FnOnce() -> R) -> R {
        let slot = self.slot(key);
        let result = {
            // The slot guards `()`, so a panic in another holder leaves nothing to repair.
            let _held = slot.lock().unwrap_or_else(PoisonError::into_inner);
            trace!(key, "Acquired key lock");
            f()
        };
        self.release(key, &slot);
        result
    }

    /// Number of keys with a live slot.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    /// Whether no key currently has a slot.
    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    fn slot(&self, key: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.map().entry(key.to_string()).or_default())
    }

    fn release(&self, key: &str, slot: &Arc<Mutex<()>>) {
        let mut map = self.map();
        // One reference in the map plus ours: nobody else is waiting.
        if Arc::strong_count(slot) == 2 {
            map.remove(key);
        }
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
