//! One active import per brand

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Set of brands with a batch in progress
#[derive(Debug, Clone, Default)]
pub struct BatchLocks {
    active: Arc<Mutex<HashSet<i64>>>,
}

impl BatchLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `brand_id`, or `None` if a batch for it is already running
    pub fn try_acquire(&self, brand_id: i64) -> Option<BatchGuard> {
        if !lock(&self.active).insert(brand_id) {
            return None;
        }
        Some(BatchGuard {
            active: Arc::clone(&self.active),
            brand_id,
        })
    }

    pub fn is_active(&self, brand_id: i64) -> bool {
        lock(&self.active).contains(&brand_id)
    }
}

fn lock(active: &Mutex<HashSet<i64>>) -> MutexGuard<'_, HashSet<i64>> {
    active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Releases the brand when dropped
#[derive(Debug)]
pub struct BatchGuard {
    active: Arc<Mutex<HashSet<i64>>>,
    brand_id: i64,
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        lock(&self.active).remove(&self.brand_id);
    }
}
