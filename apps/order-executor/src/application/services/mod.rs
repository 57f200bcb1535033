//! Application Services
//!
//! Application services coordinate domain logic and infrastructure adapters:
//! the order executor facade plus the state it owns (two-tier order store,
//! per-order locks and exposure tracking).

mod order_executor;
mod order_locks;
mod risk_tracker;
mod state_store;

pub use order_executor::{
    CANCEL_ORDER_BREAKER, CANCEL_ORDER_KEY, CREATE_ORDER_BREAKER, CREATE_ORDER_KEY,
    EXCHANGE_INFO_BREAKER, OrderExecutor, QUERY_ORDER_BREAKER, QUERY_ORDER_KEY,
};
pub use order_locks::{OrderLockGuard, OrderLocks};
pub use risk_tracker::{OpenOrderSlot, RiskTracker};
pub use state_store::{
    DEFAULT_ORDER_TTL, ORDER_KEY_PREFIX, StateStore, StateStoreError, order_key,
};
