//! Keyed critical sections — one logical lock per contact id.
//!
//! Two rapid messages from the same contact must serialize their
//! read-modify-write of that contact's record; messages from different
//! contacts proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily-created per-key mutexes.
///
/// The map only ever grows within a day's traffic; the contact registry's
/// daily reset keeps the working set small.
#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`, creating it on first use. The guard
    /// is owned, so it can be held across awaits in a spawned task.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(
                locks
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}
