//! Per-shutter locks serialising read-modify-write cycles.
//!
//! The sun evaluator and the rule executor both read a shutter's state
//! items, decide, and write back. Holding the shutter's lock across
//! that cycle keeps concurrent evaluations from interleaving their
//! writes.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use lamella_domain::item::ShutterId;

/// Lazily created lock per shutter id.
#[derive(Default)]
pub struct ShutterLocks {
    locks: Mutex<HashMap<ShutterId, Arc<Mutex<()>>>>,
}

impl ShutterLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one shutter, creating it on first use.
    /// The guard releases on drop.
    pub async fn acquire(&self, shutter: &ShutterId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(shutter.clone()).or_default())
        };
        lock.lock_owned().await
    }
}
