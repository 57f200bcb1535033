//! In-process order update bus over a tokio broadcast channel.
//!
//! Publishing never waits on subscribers. A subscriber that falls more than
//! `capacity` updates behind skips the oldest ones and keeps going.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::application::dto::OrderUpdateFilter;
use crate::application::ports::{EventPublishError, EventPublisherPort, OrderUpdateSubscriber};
use crate::domain::order_execution::events::OrderUpdate;

/// Default channel capacity.
pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 1_024;

/// Fan-out bus delivering every published update to all live subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastEventBus {
    sender: broadcast::Sender<OrderUpdate>,
}

impl BroadcastEventBus {
    /// Create a bus buffering up to `capacity` updates per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUS_CAPACITY)
    }
}

#[async_trait]
impl EventPublisherPort for BroadcastEventBus {
    async fn publish(&self, topic: &str, update: &OrderUpdate) -> Result<(), EventPublishError> {
        match self.sender.send(update.clone()) {
            Ok(receivers) => {
                tracing::trace!(topic, receivers, order_id = %update.order_id(), "Order update published");
            }
            Err(_) => {
                tracing::trace!(topic, order_id = %update.order_id(), "Order update published with no subscribers");
            }
        }
        Ok(())
    }
}

impl OrderUpdateSubscriber for BroadcastEventBus {
    fn subscribe(&self, filter: OrderUpdateFilter) -> BoxStream<'static, OrderUpdate> {
        BroadcastStream::new(self.sender.subscribe())
            .filter_map(move |item| {
                let update = match item {
                    Ok(update) => filter.matches(&update).then_some(update),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Order update subscriber lagged, updates dropped");
                        None
                    }
                };
                futures::future::ready(update)
            })
            .boxed()
    }
}
