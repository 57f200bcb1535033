//! Two-tier order state store.
//!
//! Reads consult the in-process map first, then the distributed cache. Writes
//! go through both tiers before returning. Distributed entries expire after a
//! fixed TTL regardless of order status.
//!
//! The memory tier holds open orders only. A terminal order is evicted once
//! its final state is in the distributed tier, and later reads are served
//! from there.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::application::ports::{CacheError, CacheStore};
use crate::domain::order_execution::Order;
use crate::domain::shared::OrderId;

/// Key prefix for order entries in the distributed tier.
pub const ORDER_KEY_PREFIX: &str = "order:";

/// Default distributed-tier TTL (24 hours).
pub const DEFAULT_ORDER_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Distributed-tier key for an order.
#[must_use]
pub fn order_key(order_id: &OrderId) -> String {
    format!("{ORDER_KEY_PREFIX}{order_id}")
}

/// State store errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateStoreError {
    /// The distributed tier failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// An order could not be encoded or decoded.
    #[error("Order serialization failed for {key}: {message}")]
    Serialization {
        /// Cache key involved.
        key: String,
        /// Error details.
        message: String,
    },
}

/// Memory tier with a running count of open entries.
#[derive(Debug, Default)]
struct MemoryTier {
    orders: HashMap<OrderId, Order>,
    open: usize,
    evictions: u64,
}

impl MemoryTier {
    fn upsert(&mut self, order: Order) {
        let now_open = !order.status().is_terminal();
        let was_open = self
            .orders
            .insert(order.id().clone(), order)
            .is_some_and(|previous| !previous.status().is_terminal());
        match (was_open, now_open) {
            (false, true) => self.open += 1,
            (true, false) => self.open -= 1,
            _ => {}
        }
    }

    /// Drop `order_id` if the held copy is terminal.
    fn evict_terminal(&mut self, order_id: &OrderId) -> bool {
        let terminal = self
            .orders
            .get(order_id)
            .is_some_and(|order| order.status().is_terminal());
        if terminal {
            self.orders.remove(order_id);
            self.evictions += 1;
        }
        terminal
    }
}

/// Order state store with a memory tier in front of a distributed cache.
pub struct StateStore<C>
where
    C: CacheStore,
{
    memory: RwLock<MemoryTier>,
    cache: Arc<C>,
    ttl: Duration,
}

impl<C> StateStore<C>
where
    C: CacheStore,
{
    /// Create a store over `cache` with the given distributed-tier TTL.
    pub fn new(cache: Arc<C>, ttl: Duration) -> Self {
        Self {
            memory: RwLock::new(MemoryTier::default()),
            cache,
            ttl,
        }
    }

    /// Distributed-tier TTL.
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Write `order` through both tiers.
    ///
    /// The memory tier is updated first, so a distributed failure still leaves
    /// this process with the latest state. A terminal order leaves the memory
    /// tier only after the distributed write succeeds.
    ///
    /// # Errors
    ///
    /// Returns error if the order cannot be encoded or the cache write fails.
    pub async fn save(&self, order: &Order) -> Result<(), StateStoreError> {
        let key = order_key(order.id());
        let payload = serde_json::to_vec(order).map_err(|e| StateStoreError::Serialization {
            key: key.clone(),
            message: e.to_string(),
        })?;

        self.memory
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .upsert(order.clone());

        if let Err(e) = self.cache.set(&key, payload, self.ttl).await {
            tracing::warn!(order_id = %order.id(), key = %key, error = %e, "Distributed state write failed");
            return Err(e.into());
        }

        if order.status().is_terminal() {
            let evicted = self
                .memory
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .evict_terminal(order.id());
            if evicted {
                tracing::debug!(order_id = %order.id(), status = %order.status(), "Evicted terminal order from memory tier");
            }
        }

        Ok(())
    }

    /// Look up an order, memory tier first.
    ///
    /// An open order found only in the distributed tier is promoted into the
    /// memory tier, unless an eviction happened while it was being read.
    ///
    /// # Errors
    ///
    /// Returns error if the cache read fails or the entry cannot be decoded.
    pub async fn get(&self, order_id: &OrderId) -> Result<Option<Order>, StateStoreError> {
        let evictions = {
            let memory = self
                .memory
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(order) = memory.orders.get(order_id) {
                return Ok(Some(order.clone()));
            }
            memory.evictions
        };

        let key = order_key(order_id);
        let Some(bytes) = self.cache.get(&key).await? else {
            return Ok(None);
        };
        let order = decode(&key, &bytes)?;

        if !order.status().is_terminal() {
            let mut memory = self
                .memory
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if memory.evictions == evictions && !memory.orders.contains_key(order_id) {
                memory.upsert(order.clone());
                tracing::debug!(order_id = %order_id, "Promoted order from distributed tier");
            }
        }

        Ok(Some(order))
    }

    /// Memory-tier lookup only.
    pub fn get_cached(&self, order_id: &OrderId) -> Option<Order> {
        self.memory
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .orders
            .get(order_id)
            .cloned()
    }

    /// Load every non-terminal order from the distributed tier into memory.
    ///
    /// Entries that fail to decode are skipped with a warning. Returns the
    /// number of orders loaded.
    ///
    /// # Errors
    ///
    /// Returns error if the cache cannot list or read keys.
    pub async fn rehydrate(&self) -> Result<usize, StateStoreError> {
        let keys = self.cache.keys_with_prefix(ORDER_KEY_PREFIX).await?;
        let mut loaded = 0;

        for key in keys {
            let Some(bytes) = self.cache.get(&key).await? else {
                continue;
            };

            let order = match decode(&key, &bytes) {
                Ok(order) => order,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Skipping undecodable order entry");
                    continue;
                }
            };

            if order.status().is_terminal() {
                continue;
            }

            self.memory
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .upsert(order);
            loaded += 1;
        }

        tracing::info!(loaded, "Rehydrated open orders");
        Ok(loaded)
    }

    /// Orders in the memory tier that are still open.
    pub fn open_orders(&self) -> Vec<Order> {
        self.memory
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .orders
            .values()
            .filter(|order| !order.status().is_terminal())
            .cloned()
            .collect()
    }

    /// Number of open orders in the memory tier.
    pub fn open_order_count(&self) -> usize {
        self.memory
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .open
    }

    /// Number of orders held in the memory tier.
    pub fn len(&self) -> usize {
        self.memory
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .orders
            .len()
    }

    /// True if the memory tier is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn decode(key: &str, bytes: &[u8]) -> Result<Order, StateStoreError> {
    serde_json::from_slice(bytes).map_err(|e| StateStoreError::Serialization {
        key: key.to_string(),
        message: e.to_string(),
    })
}
