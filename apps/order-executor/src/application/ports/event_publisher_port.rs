//! Event Publisher Port (Driven Port)
//!
//! Interface for publishing order updates to an event bus, plus the
//! subscription side used by `StreamOrderUpdates`.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::application::dto::OrderUpdateFilter;
use crate::domain::order_execution::events::OrderUpdate;

/// Event publishing error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventPublishError {
    /// Connection error.
    #[error("Event publish connection error: {message}")]
    ConnectionError {
        /// Error details.
        message: String,
    },

    /// Serialization error.
    #[error("Event serialization error: {message}")]
    SerializationError {
        /// Error details.
        message: String,
    },

    /// Publishing failed.
    #[error("Event publish failed: {message}")]
    PublishFailed {
        /// Error details.
        message: String,
    },
}

/// Port for publishing order updates.
///
/// Delivery is at-most-once. Implementations must not block on slow consumers.
#[async_trait]
pub trait EventPublisherPort: Send + Sync {
    /// Publish one update on `topic`.
    async fn publish(&self, topic: &str, update: &OrderUpdate) -> Result<(), EventPublishError>;
}

/// Subscription side of an in-process event bus.
pub trait OrderUpdateSubscriber: Send + Sync {
    /// Lazy, unbounded stream of updates matching `filter`, starting now.
    ///
    /// Dropping the stream unsubscribes; subscribing again restarts it.
    fn subscribe(&self, filter: OrderUpdateFilter) -> BoxStream<'static, OrderUpdate>;
}
