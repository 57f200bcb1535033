//! Application Ports (Driven)
//!
//! Ports define interfaces for the external collaborators of the executor:
//! the exchange, the distributed cache and the event bus.

mod cache_port;
mod event_publisher_port;
mod exchange_port;

pub use cache_port::{CacheError, CacheStore};
pub use event_publisher_port::{EventPublishError, EventPublisherPort, OrderUpdateSubscriber};
#[cfg(test)]
pub use exchange_port::MockExchangePort;
pub use exchange_port::{
    ExchangeError, ExchangeErrorKind, ExchangeOrder, ExchangeOrderRef, ExchangeOrderStatus,
    ExchangePort, PlaceOrderRequest,
};
