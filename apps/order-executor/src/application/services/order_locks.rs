//! Per-order mutation locks.
//!
//! Every transition of a given order runs under that order's async mutex;
//! different orders never contend. The registry map itself is only locked
//! long enough to fetch, insert or remove an entry. An entry lives only while
//! some caller holds or awaits it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::shared::OrderId;

#[derive(Debug, Default)]
struct LockEntry {
    lock: Arc<AsyncMutex<()>>,
    holders: usize,
}

/// Registry of order-scoped locks.
#[derive(Debug, Default)]
pub struct OrderLocks {
    locks: Mutex<HashMap<OrderId, LockEntry>>,
}

impl OrderLocks {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `order_id`.
    ///
    /// The registry entry is removed when the last guard or waiter for the
    /// order goes away, including a waiter whose future is dropped.
    pub async fn lock(&self, order_id: &OrderId) -> OrderLockGuard<'_> {
        let lock = {
            let mut locks = self.registry();
            let entry = locks.entry(order_id.clone()).or_default();
            entry.holders += 1;
            Arc::clone(&entry.lock)
        };

        let mut held = OrderLockGuard {
            locks: self,
            order_id: order_id.clone(),
            guard: None,
        };
        held.guard = Some(lock.lock_owned().await);
        held
    }

    /// Number of tracked locks.
    pub fn len(&self) -> usize {
        self.registry().len()
    }

    /// True if no locks are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<OrderId, LockEntry>> {
        self.locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn release(&self, order_id: &OrderId) {
        let mut locks = self.registry();
        let Some(entry) = locks.get_mut(order_id) else {
            return;
        };
        entry.holders = entry.holders.saturating_sub(1);
        if entry.holders == 0 {
            locks.remove(order_id);
        }
    }
}

/// Exclusive access to one order; released on drop.
#[must_use = "the order lock is released as soon as the guard is dropped"]
pub struct OrderLockGuard<'a> {
    locks: &'a OrderLocks,
    order_id: OrderId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for OrderLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(&self.order_id);
    }
}
