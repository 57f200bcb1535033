//! Order Executor
//!
//! Orchestrates the order lifecycle: validation, admission control, the
//! exchange call, state persistence and update publication. Every mutation of
//! an existing order runs under that order's lock.
//!
//! # Create Flow
//!
//! ```text
//! validate ──fail──► REJECTED (persist, publish) ──► Validation
//!    │
//!  rate limit ──deny──► RateLimitExceeded (no record)
//!    │
//!  breaker ──open──► CircuitOpen (no record)
//!    │
//!  exchange ──ok──► SUBMITTED (persist, publish)
//!           └─err──► REJECTED (persist, publish) ──► Exchange | Transient
//! ```

use std::sync::Arc;
use std::time::Instant;

use futures::stream::BoxStream;

use crate::application::dto::{CreateOrderDto, OrderUpdateFilter};
use crate::application::ports::{
    CacheStore, EventPublisherPort, ExchangeError, ExchangeOrder, ExchangeOrderRef,
    ExchangeOrderStatus, ExchangePort, OrderUpdateSubscriber, PlaceOrderRequest,
};
use crate::application::services::order_locks::OrderLocks;
use crate::application::services::risk_tracker::RiskTracker;
use crate::application::services::state_store::StateStore;
use crate::domain::order_execution::{Fill, Order, OrderStatus, OrderUpdate};
use crate::domain::risk_management::OrderValidator;
use crate::domain::shared::{OrderId, Symbol};
use crate::error::ExecutionError;
use crate::observability::{
    record_exchange_error, record_event_publish_failure, record_event_published,
    record_order_canceled, record_order_created, record_order_filled, record_order_latency,
    record_order_rejected, update_open_orders,
};
use crate::resilience::{CircuitBreakerRegistry, CircuitError, RateLimiter};

/// Rate limiter key for order creation.
pub const CREATE_ORDER_KEY: &str = "create_order";
/// Rate limiter key for order cancellation.
pub const CANCEL_ORDER_KEY: &str = "cancel_order";
/// Rate limiter key for order status queries.
pub const QUERY_ORDER_KEY: &str = "query_order";

/// Circuit breaker key for the create endpoint.
pub const CREATE_ORDER_BREAKER: &str = "exchange_create_order";
/// Circuit breaker key for the cancel endpoint.
pub const CANCEL_ORDER_BREAKER: &str = "exchange_cancel_order";
/// Circuit breaker key for the query endpoint.
pub const QUERY_ORDER_BREAKER: &str = "exchange_query_order";
/// Circuit breaker key for the exchange info endpoint.
pub const EXCHANGE_INFO_BREAKER: &str = "exchange_info";

/// Order execution facade.
pub struct OrderExecutor<E, C, P>
where
    E: ExchangePort,
    C: CacheStore,
    P: EventPublisherPort,
{
    exchange: Arc<E>,
    store: Arc<StateStore<C>>,
    publisher: Arc<P>,
    validator: OrderValidator,
    rate_limiter: Arc<RateLimiter>,
    breakers: Arc<CircuitBreakerRegistry>,
    risk: RiskTracker,
    locks: OrderLocks,
}

impl<E, C, P> OrderExecutor<E, C, P>
where
    E: ExchangePort,
    C: CacheStore,
    P: EventPublisherPort,
{
    /// Create a new executor.
    pub fn new(
        exchange: Arc<E>,
        store: Arc<StateStore<C>>,
        publisher: Arc<P>,
        validator: OrderValidator,
        rate_limiter: Arc<RateLimiter>,
        breakers: Arc<CircuitBreakerRegistry>,
    ) -> Self {
        Self {
            exchange,
            store,
            publisher,
            validator,
            rate_limiter,
            breakers,
            risk: RiskTracker::new(),
            locks: OrderLocks::new(),
        }
    }

    /// Exposure tracker used for risk snapshots.
    pub const fn risk(&self) -> &RiskTracker {
        &self.risk
    }

    /// Underlying state store.
    pub const fn store(&self) -> &Arc<StateStore<C>> {
        &self.store
    }

    /// Circuit breakers guarding exchange endpoints.
    pub const fn breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.breakers
    }

    // ========================================================================
    // Create
    // ========================================================================

    /// Validate and submit a new order.
    ///
    /// # Errors
    ///
    /// - `Validation` if a rule fails; a `REJECTED` order is recorded
    /// - `RateLimitExceeded` / `CircuitOpen` on admission refusal; nothing is recorded
    /// - `Exchange` / `Transient` if the exchange call fails; the order is recorded `REJECTED`
    /// - `Transient` if the accepted order could not be written to the distributed tier
    pub async fn create_order(&self, request: CreateOrderDto) -> Result<Order, ExecutionError> {
        let started = Instant::now();
        let result = self.create_order_inner(request).await;
        let elapsed = started.elapsed();
        record_order_latency("create_order", elapsed.as_secs_f64());

        match &result {
            Ok(order) => tracing::info!(
                order_id = %order.id(),
                symbol = %order.symbol(),
                status = %order.status(),
                latency_ms = elapsed.as_millis() as u64,
                "Order created"
            ),
            Err(e) => {
                record_order_rejected(e.reason());
                tracing::info!(
                    order_id = ?e.order_id(),
                    reason = e.reason(),
                    error = %e,
                    latency_ms = elapsed.as_millis() as u64,
                    "Order not accepted"
                );
            }
        }

        result
    }

    async fn create_order_inner(&self, request: CreateOrderDto) -> Result<Order, ExecutionError> {
        let mut order = Order::new(request.into_command());

        // Held until the order is stored or has failed.
        let admitted = self.risk.admit(
            order.symbol(),
            || self.store.open_order_count(),
            |snapshot| self.validator.validate(&order, snapshot),
        );
        let _slot = match admitted {
            Ok(slot) => slot,
            Err(failure) => {
                order.reject(failure.to_string())?;
                self.persist_rejection(&mut order).await;
                return Err(ExecutionError::validation(&failure, Some(order.id().clone())));
            }
        };

        if !self.rate_limiter.allow(CREATE_ORDER_KEY, 1) {
            return Err(ExecutionError::RateLimitExceeded {
                key: CREATE_ORDER_KEY.to_string(),
            });
        }

        let place = PlaceOrderRequest::from_order(&order);
        let result = self
            .breakers
            .execute(CREATE_ORDER_BREAKER, || {
                self.risk.record_order_sent();
                self.exchange.create_order(&place)
            })
            .await;

        match result {
            Ok(ack) => {
                self.apply_create_ack(&mut order, ack)?;
                self.persist_and_publish(&mut order).await?;
                if order.status() == OrderStatus::Submitted {
                    record_order_created(order.symbol().as_str(), &order.order_type().to_string());
                }
                Ok(order)
            }
            Err(CircuitError::Open { name }) => Err(ExecutionError::CircuitOpen { name }),
            Err(CircuitError::Inner(e)) => {
                record_exchange_error(e.kind_label());
                tracing::warn!(
                    order_id = %order.id(),
                    symbol = %order.symbol(),
                    kind = e.kind_label(),
                    error = %e,
                    "Exchange refused order"
                );
                order.reject(e.to_string())?;
                self.persist_rejection(&mut order).await;
                Err(ExecutionError::from_exchange(e, Some(order.id().clone())))
            }
        }
    }

    /// Move a new order to the state the exchange acknowledged.
    ///
    /// A post-only order that would have crossed comes back `EXPIRED`; it is
    /// recorded as submitted and then canceled.
    fn apply_create_ack(&self, order: &mut Order, ack: ExchangeOrder) -> Result<(), ExecutionError> {
        if ack.status == ExchangeOrderStatus::Rejected {
            order.reject("rejected by exchange")?;
            return Ok(());
        }

        order.submit(ack.exchange_order_id)?;
        if ack.status.to_order_status() == OrderStatus::Canceled {
            tracing::info!(
                order_id = %order.id(),
                status = ?ack.status,
                "Exchange closed order on arrival"
            );
            order.cancel()?;
        }
        Ok(())
    }

    // ========================================================================
    // Cancel
    // ========================================================================

    /// Cancel an open order.
    ///
    /// An unknown outcome from the exchange leaves the order unchanged; the
    /// caller should re-query.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the order is unknown
    /// - `Validation` if `symbol` does not match the order
    /// - `Conflict` if the order is not `SUBMITTED` or `PARTIALLY_FILLED`
    /// - `RateLimitExceeded` / `CircuitOpen` on admission refusal
    /// - `Exchange` / `Transient` if the exchange call fails
    pub async fn cancel_order(
        &self,
        order_id: &OrderId,
        symbol: &Symbol,
    ) -> Result<Order, ExecutionError> {
        let started = Instant::now();
        let result = self.cancel_order_inner(order_id, symbol).await;
        let elapsed = started.elapsed();
        record_order_latency("cancel_order", elapsed.as_secs_f64());

        match &result {
            Ok(order) => tracing::info!(
                order_id = %order_id,
                symbol = %order.symbol(),
                latency_ms = elapsed.as_millis() as u64,
                "Order canceled"
            ),
            Err(e) => tracing::info!(
                order_id = %order_id,
                reason = e.reason(),
                error = %e,
                latency_ms = elapsed.as_millis() as u64,
                "Cancel not applied"
            ),
        }

        result
    }

    async fn cancel_order_inner(
        &self,
        order_id: &OrderId,
        symbol: &Symbol,
    ) -> Result<Order, ExecutionError> {
        let _guard = self.locks.lock(order_id).await;
        let mut order = self.load(order_id).await?;

        if order.symbol() != symbol {
            return Err(ExecutionError::Validation {
                kind: "symbol",
                message: format!("order {order_id} trades {}, not {symbol}", order.symbol()),
                order_id: None,
            });
        }

        if !order.status().is_cancelable() {
            return Err(ExecutionError::Conflict {
                message: format!("cannot cancel order {order_id} in status {}", order.status()),
            });
        }

        if !self.rate_limiter.allow(CANCEL_ORDER_KEY, 1) {
            return Err(ExecutionError::RateLimitExceeded {
                key: CANCEL_ORDER_KEY.to_string(),
            });
        }

        let target = ExchangeOrderRef::for_order(&order);
        let ack = self
            .breakers
            .execute(CANCEL_ORDER_BREAKER, || self.exchange.cancel_order(&target))
            .await
            .map_err(|e| self.exchange_failure(e, order_id))?;

        if ack.status.to_order_status() != OrderStatus::Canceled {
            return Err(ExecutionError::Conflict {
                message: format!(
                    "exchange reports order {order_id} as {:?}, not canceled",
                    ack.status
                ),
            });
        }

        order.cancel()?;
        self.persist_and_publish(&mut order).await?;
        record_order_canceled(order.symbol().as_str());
        Ok(order)
    }

    // ========================================================================
    // Fills
    // ========================================================================

    /// Apply a fill from the exchange fill stream.
    ///
    /// Fills for untracked orders are logged and dropped with `Ok(None)`.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the order cannot take the fill (terminal, overfill, bad values)
    /// - `Transient` if state could not be read or written
    pub async fn apply_fill(&self, fill: &Fill) -> Result<Option<Order>, ExecutionError> {
        let _guard = self.locks.lock(&fill.order_id).await;

        let Some(mut order) = self.lookup(&fill.order_id).await? else {
            tracing::warn!(
                order_id = %fill.order_id,
                symbol = %fill.symbol,
                fill_id = %fill.fill_id,
                "Dropping fill for untracked order"
            );
            return Ok(None);
        };

        if let Err(e) = order.apply_fill(fill) {
            tracing::error!(
                order_id = %fill.order_id,
                fill_id = %fill.fill_id,
                error = %e,
                "Fill rejected"
            );
            return Err(e.into());
        }

        self.risk.record_fill(fill);
        self.persist_and_publish(&mut order).await?;

        tracing::debug!(
            order_id = %order.id(),
            filled = %order.filled_quantity(),
            avg_price = %order.avg_fill_price(),
            status = %order.status(),
            "Fill applied"
        );

        if order.status() == OrderStatus::Filled {
            record_order_filled(order.symbol().as_str());
        }

        Ok(Some(order))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Look up an order, memory tier then distributed tier.
    ///
    /// # Errors
    ///
    /// - `NotFound` if absent in both tiers
    /// - `Transient` if the distributed tier fails
    pub async fn get_order(&self, order_id: &OrderId) -> Result<Order, ExecutionError> {
        self.load(order_id).await
    }

    /// Reconcile an order's status with the exchange.
    ///
    /// A cancel or expiry reported by the exchange is applied locally. Fill
    /// quantities still arrive only through [`Self::apply_fill`].
    ///
    /// # Errors
    ///
    /// - `NotFound` if the order is unknown
    /// - `RateLimitExceeded` / `CircuitOpen` on admission refusal
    /// - `Exchange` / `Transient` if the exchange call fails
    pub async fn sync_order(&self, order_id: &OrderId) -> Result<Order, ExecutionError> {
        let _guard = self.locks.lock(order_id).await;
        let mut order = self.load(order_id).await?;

        if order.status().is_terminal() || order.status() == OrderStatus::New {
            return Ok(order);
        }

        if !self.rate_limiter.allow(QUERY_ORDER_KEY, 1) {
            return Err(ExecutionError::RateLimitExceeded {
                key: QUERY_ORDER_KEY.to_string(),
            });
        }

        let target = ExchangeOrderRef::for_order(&order);
        let remote = self
            .breakers
            .execute(QUERY_ORDER_BREAKER, || self.exchange.query_order(&target))
            .await
            .map_err(|e| self.exchange_failure(e, order_id))?;

        if remote.executed_qty > order.filled_quantity() {
            tracing::debug!(
                order_id = %order_id,
                local = %order.filled_quantity(),
                remote = %remote.executed_qty,
                "Exchange reports fills not yet applied"
            );
        }

        if remote.status.to_order_status() == OrderStatus::Canceled {
            tracing::info!(order_id = %order_id, status = ?remote.status, "Exchange closed order");
            order.cancel()?;
            self.persist_and_publish(&mut order).await?;
            record_order_canceled(order.symbol().as_str());
        }

        Ok(order)
    }

    // ========================================================================
    // Startup
    // ========================================================================

    /// Replace the symbol rule table with the exchange's current rules.
    ///
    /// Returns the number of rules loaded.
    ///
    /// # Errors
    ///
    /// Returns error if the exchange info call fails; the table is unchanged.
    pub async fn refresh_symbol_rules(&self) -> Result<usize, ExecutionError> {
        let rules = self
            .breakers
            .execute(EXCHANGE_INFO_BREAKER, || self.exchange.get_exchange_info())
            .await
            .map_err(|e| match e {
                CircuitError::Open { name } => ExecutionError::CircuitOpen { name },
                CircuitError::Inner(e) => {
                    record_exchange_error(e.kind_label());
                    ExecutionError::from_exchange(e, None)
                }
            })?;

        let count = rules.len();
        if count == 0 {
            tracing::warn!("Exchange returned no symbol rules");
        }
        self.validator.rules().replace_all(rules);
        tracing::info!(count, "Symbol rules refreshed");
        Ok(count)
    }

    /// Load open orders from the distributed tier after a restart.
    ///
    /// # Errors
    ///
    /// Returns `Transient` if the distributed tier cannot be read.
    pub async fn rehydrate(&self) -> Result<usize, ExecutionError> {
        let count = self
            .store
            .rehydrate()
            .await
            .map_err(|e| ExecutionError::Transient {
                message: e.to_string(),
                order_id: None,
            })?;
        update_open_orders(self.store.open_order_count());
        Ok(count)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn lookup(&self, order_id: &OrderId) -> Result<Option<Order>, ExecutionError> {
        self.store
            .get(order_id)
            .await
            .map_err(|e| ExecutionError::Transient {
                message: e.to_string(),
                order_id: Some(order_id.clone()),
            })
    }

    async fn load(&self, order_id: &OrderId) -> Result<Order, ExecutionError> {
        self.lookup(order_id)
            .await?
            .ok_or_else(|| ExecutionError::not_found(order_id))
    }

    fn exchange_failure(
        &self,
        err: CircuitError<ExchangeError>,
        order_id: &OrderId,
    ) -> ExecutionError {
        match err {
            CircuitError::Open { name } => ExecutionError::CircuitOpen { name },
            CircuitError::Inner(e) => {
                record_exchange_error(e.kind_label());
                ExecutionError::from_exchange(e, Some(order_id.clone()))
            }
        }
    }

    /// Write the order through both tiers, then publish its updates.
    ///
    /// Updates are published even if the distributed write failed, since the
    /// memory tier already reflects the transition.
    async fn persist_and_publish(&self, order: &mut Order) -> Result<(), ExecutionError> {
        let updates = order.drain_updates();
        let saved = self.store.save(order).await;

        for update in &updates {
            self.publish(update).await;
        }
        update_open_orders(self.store.open_order_count());

        saved.map_err(|e| ExecutionError::Transient {
            message: format!("order state not persisted: {e}"),
            order_id: Some(order.id().clone()),
        })
    }

    /// Persist a rejected order; a storage failure is logged, not returned.
    async fn persist_rejection(&self, order: &mut Order) {
        if let Err(e) = self.persist_and_publish(order).await {
            tracing::error!(order_id = %order.id(), error = %e, "Failed to persist rejected order");
        }
    }

    async fn publish(&self, update: &OrderUpdate) {
        let topic = update.topic();
        match self.publisher.publish(&topic, update).await {
            Ok(()) => record_event_published(&topic),
            Err(e) => {
                record_event_publish_failure(&topic);
                tracing::warn!(
                    order_id = %update.order_id(),
                    topic = %topic,
                    event = update.update_type.event_type(),
                    error = %e,
                    "Order update publish failed"
                );
            }
        }
    }
}

impl<E, C, P> OrderExecutor<E, C, P>
where
    E: ExchangePort,
    C: CacheStore,
    P: EventPublisherPort + OrderUpdateSubscriber,
{
    /// Subscribe to order updates matching `filter`.
    ///
    /// The stream starts at the time of the call and ends only when dropped.
    pub fn stream_order_updates(&self, filter: OrderUpdateFilter) -> BoxStream<'static, OrderUpdate> {
        self.publisher.subscribe(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use futures::StreamExt;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::application::ports::{
        CacheError, EventPublishError, ExchangeErrorKind, MockExchangePort,
    };
    use crate::application::services::state_store::{DEFAULT_ORDER_TTL, order_key};
    use crate::domain::order_execution::{OrderSide, OrderType, TimeInForce, UpdateType};
    use crate::domain::risk_management::{RiskLimits, SymbolRule, SymbolRuleTable};
    use crate::domain::shared::{ExchangeOrderId, Timestamp};
    use crate::infrastructure::cache::InMemoryCacheStore;
    use crate::infrastructure::events::BroadcastEventBus;
    use crate::resilience::{CircuitBreakerConfig, CircuitBreakerState, RateLimitTier};

    type TestExecutor = OrderExecutor<MockExchangePort, InMemoryCacheStore, BroadcastEventBus>;

    fn btc_rule() -> SymbolRule {
        SymbolRule {
            symbol: Symbol::new("BTCUSDT"),
            tick_size: dec!(0.01),
            step_size: dec!(0.001),
            min_qty: dec!(0.001),
            max_qty: dec!(1000),
            min_notional: dec!(10),
            price_precision: 2,
            quantity_precision: 3,
            tradable: true,
        }
    }

    fn limiter(capacity: u32) -> Arc<RateLimiter> {
        Arc::new(RateLimiter::new(vec![RateLimitTier::new(
            "test",
            capacity,
            Duration::from_secs(60),
        )]))
    }

    fn breakers() -> Arc<CircuitBreakerRegistry> {
        Arc::new(CircuitBreakerRegistry::new(CircuitBreakerConfig {
            failure_rate_threshold: 0.6,
            sliding_window_size: 10,
            minimum_calls: 3,
            wait_duration_in_open: Duration::from_secs(30),
            permitted_calls_in_half_open: 1,
        }))
    }

    fn executor_with(
        exchange: MockExchangePort,
        cache: Arc<InMemoryCacheStore>,
        rate_limiter: Arc<RateLimiter>,
    ) -> TestExecutor {
        let rules = Arc::new(SymbolRuleTable::with_rules([btc_rule()]));
        OrderExecutor::new(
            Arc::new(exchange),
            Arc::new(StateStore::new(cache, DEFAULT_ORDER_TTL)),
            Arc::new(BroadcastEventBus::new(64)),
            OrderValidator::new(rules, RiskLimits::default()),
            rate_limiter,
            breakers(),
        )
    }

    fn executor(exchange: MockExchangePort) -> TestExecutor {
        executor_with(exchange, Arc::new(InMemoryCacheStore::new()), limiter(100))
    }

    fn limit_buy(quantity: Decimal) -> CreateOrderDto {
        CreateOrderDto {
            client_order_id: None,
            symbol: "BTCUSDT".to_string(),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            quantity,
            price: Some(dec!(45000)),
            time_in_force: Some(TimeInForce::Gtc),
            post_only: false,
            reduce_only: false,
        }
    }

    fn ack(request: &PlaceOrderRequest, status: ExchangeOrderStatus) -> ExchangeOrder {
        ExchangeOrder {
            exchange_order_id: ExchangeOrderId::new("8389765"),
            client_order_id: request.client_order_id.clone(),
            symbol: request.symbol.clone(),
            status,
            executed_qty: Decimal::ZERO,
            avg_price: None,
            update_time: Timestamp::now(),
        }
    }

    fn remote(target: &ExchangeOrderRef, status: ExchangeOrderStatus) -> ExchangeOrder {
        ExchangeOrder {
            exchange_order_id: ExchangeOrderId::new("8389765"),
            client_order_id: target.client_order_id.clone(),
            symbol: target.symbol.clone(),
            status,
            executed_qty: Decimal::ZERO,
            avg_price: None,
            update_time: Timestamp::now(),
        }
    }

    fn accepting_exchange() -> MockExchangePort {
        let mut exchange = MockExchangePort::new();
        exchange
            .expect_create_order()
            .returning(|request| Ok(ack(request, ExchangeOrderStatus::New)));
        exchange
    }

    fn fill_for(order: &Order, price: Decimal, quantity: Decimal) -> Fill {
        Fill::new(
            order.id().clone(),
            order.symbol().clone(),
            order.side(),
            price,
            quantity,
        )
    }

    // ========================================================================
    // Create
    // ========================================================================

    #[tokio::test]
    async fn create_limit_order_is_submitted() {
        let mut exchange = MockExchangePort::new();
        exchange
            .expect_create_order()
            .times(1)
            .withf(|request| {
                request.quantity == dec!(0.001)
                    && request.price == Some(dec!(45000))
                    && request.time_in_force == Some(TimeInForce::Gtc)
            })
            .returning(|request| Ok(ack(request, ExchangeOrderStatus::New)));
        let executor = executor(exchange);

        let order = executor.create_order(limit_buy(dec!(0.001))).await.unwrap();

        assert_eq!(order.status(), OrderStatus::Submitted);
        assert_eq!(order.exchange_order_id().map(|id| id.as_str()), Some("8389765"));
        assert_eq!(executor.get_order(order.id()).await.unwrap(), order);
        assert_eq!(executor.store().open_order_count(), 1);
    }

    #[tokio::test]
    async fn quantity_below_minimum_is_rejected_without_exchange_call() {
        let mut exchange = MockExchangePort::new();
        exchange.expect_create_order().never();
        let executor = executor(exchange);

        let err = executor
            .create_order(limit_buy(dec!(0.0001)))
            .await
            .unwrap_err();

        let ExecutionError::Validation { kind, order_id, .. } = &err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(*kind, "quantity");

        let stored = executor.get_order(order_id.as_ref().unwrap()).await.unwrap();
        assert_eq!(stored.status(), OrderStatus::Rejected);
        assert!(stored.reject_reason().unwrap().contains("below minimum"));
    }

    #[tokio::test]
    async fn rate_limited_create_records_nothing() {
        let exchange = accepting_exchange();
        let cache = Arc::new(InMemoryCacheStore::new());
        let executor = executor_with(exchange, Arc::clone(&cache), limiter(1));

        executor.create_order(limit_buy(dec!(0.001))).await.unwrap();
        let err = executor
            .create_order(limit_buy(dec!(0.001)))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::RateLimitExceeded { ref key } if key == CREATE_ORDER_KEY));
        assert_eq!(executor.store().len(), 1);
        assert_eq!(cache.keys_with_prefix("order:").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn exchange_rejection_marks_order_rejected() {
        let mut exchange = MockExchangePort::new();
        exchange.expect_create_order().returning(|_| {
            Err(ExchangeError::Api {
                kind: ExchangeErrorKind::InsufficientBalance,
                code: -2019,
                message: "Margin is insufficient.".to_string(),
            })
        });
        let executor = executor(exchange);

        let err = executor
            .create_order(limit_buy(dec!(0.001)))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::Exchange { code: -2019, .. }));
        let stored = executor.get_order(err.order_id().unwrap()).await.unwrap();
        assert_eq!(stored.status(), OrderStatus::Rejected);
        assert!(stored.reject_reason().unwrap().contains("Margin is insufficient."));
    }

    #[tokio::test]
    async fn transient_failure_on_create_is_not_retried() {
        let mut exchange = MockExchangePort::new();
        exchange
            .expect_create_order()
            .times(1)
            .returning(|_| Err(ExchangeError::transient("request timed out")));
        let executor = executor(exchange);

        let err = executor
            .create_order(limit_buy(dec!(0.001)))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::Transient { .. }));
        let stored = executor.get_order(err.order_id().unwrap()).await.unwrap();
        assert_eq!(stored.status(), OrderStatus::Rejected);
    }

    #[tokio::test]
    async fn open_breaker_fails_fast() {
        let mut exchange = MockExchangePort::new();
        exchange.expect_create_order().never();
        let executor = executor(exchange);
        executor.breakers().force_open(CREATE_ORDER_BREAKER);

        let err = executor
            .create_order(limit_buy(dec!(0.001)))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::CircuitOpen { .. }));
        assert!(executor.store().is_empty());
    }

    #[tokio::test]
    async fn repeated_transient_failures_open_the_breaker() {
        let mut exchange = MockExchangePort::new();
        exchange
            .expect_create_order()
            .times(3)
            .returning(|_| Err(ExchangeError::transient("connection reset")));
        let executor = executor(exchange);

        for _ in 0..3 {
            let _ = executor.create_order(limit_buy(dec!(0.001))).await;
        }

        assert_eq!(
            executor.breakers().state(CREATE_ORDER_BREAKER),
            CircuitBreakerState::Open
        );
        let err = executor
            .create_order(limit_buy(dec!(0.001)))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::CircuitOpen { .. }));
    }

    #[tokio::test]
    async fn expired_post_only_is_canceled_on_arrival() {
        let mut exchange = MockExchangePort::new();
        exchange
            .expect_create_order()
            .returning(|request| Ok(ack(request, ExchangeOrderStatus::Expired)));
        let executor = executor(exchange);

        let mut request = limit_buy(dec!(0.001));
        request.order_type = OrderType::PostOnly;
        request.time_in_force = None;
        let order = executor.create_order(request).await.unwrap();

        assert_eq!(order.status(), OrderStatus::Canceled);
        assert_eq!(executor.store().open_order_count(), 0);
    }

    struct SlowExchange {
        delay: Duration,
    }

    #[async_trait]
    impl ExchangePort for SlowExchange {
        async fn create_order(
            &self,
            request: &PlaceOrderRequest,
        ) -> Result<ExchangeOrder, ExchangeError> {
            tokio::time::sleep(self.delay).await;
            Ok(ack(request, ExchangeOrderStatus::New))
        }

        async fn cancel_order(&self, order: &ExchangeOrderRef) -> Result<ExchangeOrder, ExchangeError> {
            Ok(remote(order, ExchangeOrderStatus::Canceled))
        }

        async fn query_order(&self, order: &ExchangeOrderRef) -> Result<ExchangeOrder, ExchangeError> {
            Ok(remote(order, ExchangeOrderStatus::New))
        }

        async fn get_exchange_info(&self) -> Result<Vec<SymbolRule>, ExchangeError> {
            Ok(vec![btc_rule()])
        }
    }

    #[tokio::test]
    async fn concurrent_creates_respect_open_order_limit() {
        let rules = Arc::new(SymbolRuleTable::with_rules([btc_rule()]));
        let limits = RiskLimits {
            max_open_orders: 1,
            ..RiskLimits::default()
        };
        let executor = OrderExecutor::new(
            Arc::new(SlowExchange {
                delay: Duration::from_millis(20),
            }),
            Arc::new(StateStore::new(
                Arc::new(InMemoryCacheStore::new()),
                DEFAULT_ORDER_TTL,
            )),
            Arc::new(BroadcastEventBus::new(16)),
            OrderValidator::new(rules, limits),
            limiter(100),
            breakers(),
        );

        let (first, second) = tokio::join!(
            executor.create_order(limit_buy(dec!(0.001))),
            executor.create_order(limit_buy(dec!(0.001)))
        );

        let outcomes = [first, second];
        let submitted = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(submitted, 1);
        assert!(outcomes.iter().any(|r| matches!(
            r,
            Err(ExecutionError::Validation { kind: "risk", .. })
        )));
        assert_eq!(executor.store().open_order_count(), 1);
        assert_eq!(executor.risk().in_flight(), 0);
    }

    #[tokio::test]
    async fn failed_create_releases_open_order_slot() {
        let mut exchange = MockExchangePort::new();
        exchange
            .expect_create_order()
            .returning(|_| Err(ExchangeError::transient("request timed out")));
        let executor = executor(exchange);

        let _ = executor.create_order(limit_buy(dec!(0.001))).await;
        let _ = executor.create_order(limit_buy(dec!(0.0001))).await;

        assert_eq!(executor.risk().in_flight(), 0);
        assert_eq!(executor.store().open_order_count(), 0);
    }

    // ========================================================================
    // Cancel
    // ========================================================================

    #[tokio::test]
    async fn cancel_submitted_order() {
        let mut exchange = accepting_exchange();
        exchange
            .expect_cancel_order()
            .times(1)
            .returning(|target| Ok(remote(target, ExchangeOrderStatus::Canceled)));
        let executor = executor(exchange);
        let order = executor.create_order(limit_buy(dec!(0.001))).await.unwrap();

        let canceled = executor
            .cancel_order(order.id(), order.symbol())
            .await
            .unwrap();

        assert_eq!(canceled.status(), OrderStatus::Canceled);
        assert_eq!(executor.get_order(order.id()).await.unwrap(), canceled);
    }

    #[tokio::test]
    async fn cancel_of_canceled_order_conflicts_and_leaves_state_untouched() {
        let mut exchange = accepting_exchange();
        exchange
            .expect_cancel_order()
            .times(1)
            .returning(|target| Ok(remote(target, ExchangeOrderStatus::Canceled)));
        let cache = Arc::new(InMemoryCacheStore::new());
        let executor = executor_with(exchange, Arc::clone(&cache), limiter(100));
        let order = executor.create_order(limit_buy(dec!(0.001))).await.unwrap();
        executor
            .cancel_order(order.id(), order.symbol())
            .await
            .unwrap();

        let key = order_key(order.id());
        let before = cache.get(&key).await.unwrap().unwrap();

        let err = executor
            .cancel_order(order.id(), order.symbol())
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::Conflict { .. }));
        assert_eq!(cache.get(&key).await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn cancel_unknown_order_is_not_found() {
        let executor = executor(MockExchangePort::new());
        let err = executor
            .cancel_order(&OrderId::new("missing"), &Symbol::new("BTCUSDT"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::NotFound { .. }));
    }

    #[tokio::test]
    async fn cancel_with_wrong_symbol_is_refused() {
        let mut exchange = accepting_exchange();
        exchange.expect_cancel_order().never();
        let executor = executor(exchange);
        let order = executor.create_order(limit_buy(dec!(0.001))).await.unwrap();

        let err = executor
            .cancel_order(order.id(), &Symbol::new("ETHUSDT"))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::Validation { kind: "symbol", .. }));
    }

    #[tokio::test]
    async fn transient_cancel_leaves_order_open() {
        let mut exchange = accepting_exchange();
        exchange
            .expect_cancel_order()
            .returning(|_| Err(ExchangeError::transient("request timed out")));
        let executor = executor(exchange);
        let order = executor.create_order(limit_buy(dec!(0.001))).await.unwrap();

        let err = executor
            .cancel_order(order.id(), order.symbol())
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        let stored = executor.get_order(order.id()).await.unwrap();
        assert_eq!(stored.status(), OrderStatus::Submitted);
    }

    // ========================================================================
    // Fills
    // ========================================================================

    #[tokio::test]
    async fn full_fill_completes_order() {
        let executor = executor(accepting_exchange());
        let order = executor.create_order(limit_buy(dec!(0.001))).await.unwrap();

        let filled = executor
            .apply_fill(&fill_for(&order, dec!(45000), dec!(0.001)))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(filled.status(), OrderStatus::Filled);
        assert_eq!(filled.filled_quantity(), filled.quantity());
        assert_eq!(filled.avg_fill_price(), dec!(45000));
        assert_eq!(
            executor.risk().position(&Symbol::new("BTCUSDT")),
            dec!(0.001)
        );
    }

    #[tokio::test]
    async fn partial_fills_average_price() {
        let executor = executor(accepting_exchange());
        let order = executor.create_order(limit_buy(dec!(0.004))).await.unwrap();

        let partial = executor
            .apply_fill(&fill_for(&order, dec!(45000), dec!(0.001)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(partial.status(), OrderStatus::PartiallyFilled);

        let filled = executor
            .apply_fill(&fill_for(&order, dec!(44000), dec!(0.003)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(filled.status(), OrderStatus::Filled);
        assert_eq!(filled.avg_fill_price(), dec!(44250));
    }

    #[tokio::test]
    async fn fill_for_untracked_order_is_dropped() {
        let executor = executor(MockExchangePort::new());
        let fill = Fill::new(
            OrderId::new("previous-instance"),
            Symbol::new("BTCUSDT"),
            OrderSide::Buy,
            dec!(45000),
            dec!(0.001),
        );

        assert!(executor.apply_fill(&fill).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn overfill_is_conflict_and_order_unchanged() {
        let executor = executor(accepting_exchange());
        let order = executor.create_order(limit_buy(dec!(0.001))).await.unwrap();

        let err = executor
            .apply_fill(&fill_for(&order, dec!(45000), dec!(0.002)))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::Conflict { .. }));
        assert_eq!(executor.get_order(order.id()).await.unwrap(), order);
    }

    #[tokio::test]
    async fn concurrent_cancel_and_fill_do_not_lose_updates() {
        let mut exchange = accepting_exchange();
        exchange
            .expect_cancel_order()
            .returning(|target| Ok(remote(target, ExchangeOrderStatus::Canceled)));
        let executor = Arc::new(executor(exchange));
        let order = executor.create_order(limit_buy(dec!(0.002))).await.unwrap();

        let fill = fill_for(&order, dec!(45000), dec!(0.001));
        let (cancel, fill) = tokio::join!(
            executor.cancel_order(order.id(), order.symbol()),
            executor.apply_fill(&fill)
        );

        let stored = executor.get_order(order.id()).await.unwrap();
        match (cancel, fill) {
            (Ok(_), Ok(Some(_))) => {
                assert_eq!(stored.status(), OrderStatus::Canceled);
                assert_eq!(stored.filled_quantity(), dec!(0.001));
            }
            (Ok(_), Err(ExecutionError::Conflict { .. })) => {
                assert_eq!(stored.status(), OrderStatus::Canceled);
                assert_eq!(stored.filled_quantity(), Decimal::ZERO);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fill_with_mismatched_symbol_is_conflict_and_position_unchanged() {
        let executor = executor(accepting_exchange());
        let order = executor.create_order(limit_buy(dec!(0.001))).await.unwrap();
        let mut fill = fill_for(&order, dec!(3000), dec!(0.001));
        fill.symbol = Symbol::new("ETHUSDT");

        let err = executor.apply_fill(&fill).await.unwrap_err();

        assert!(matches!(err, ExecutionError::Conflict { .. }));
        assert_eq!(executor.get_order(order.id()).await.unwrap(), order);
        assert_eq!(executor.risk().position(&Symbol::new("ETHUSDT")), Decimal::ZERO);
    }

    #[tokio::test]
    async fn order_locks_do_not_accumulate() {
        let mut exchange = accepting_exchange();
        exchange
            .expect_cancel_order()
            .returning(|target| Ok(remote(target, ExchangeOrderStatus::Canceled)));
        let executor = executor(exchange);

        for i in 0..1000 {
            let fill = Fill::new(
                OrderId::new(format!("untracked-{i}")),
                Symbol::new("BTCUSDT"),
                OrderSide::Buy,
                dec!(45000),
                dec!(0.001),
            );
            assert!(executor.apply_fill(&fill).await.unwrap().is_none());
        }

        let order = executor.create_order(limit_buy(dec!(0.001))).await.unwrap();
        executor
            .cancel_order(order.id(), order.symbol())
            .await
            .unwrap();
        for _ in 0..10 {
            let _ = executor.cancel_order(order.id(), order.symbol()).await;
            let _ = executor.sync_order(order.id()).await;
        }
        let _ = executor
            .cancel_order(&OrderId::new("missing"), order.symbol())
            .await;

        assert!(executor.locks.is_empty());
    }

    #[tokio::test]
    async fn terminal_orders_leave_memory_tier_but_stay_readable() {
        let executor = executor(accepting_exchange());
        let order = executor.create_order(limit_buy(dec!(0.001))).await.unwrap();
        assert_eq!(executor.store().len(), 1);

        let filled = executor
            .apply_fill(&fill_for(&order, dec!(45000), dec!(0.001)))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(executor.store().len(), 0);
        assert_eq!(executor.store().open_order_count(), 0);
        assert_eq!(executor.get_order(order.id()).await.unwrap(), filled);
        assert_eq!(executor.store().len(), 0);
    }

    // ========================================================================
    // Sync, refresh, rehydrate
    // ========================================================================

    #[tokio::test]
    async fn sync_applies_exchange_cancel() {
        let mut exchange = accepting_exchange();
        exchange
            .expect_query_order()
            .times(1)
            .returning(|target| Ok(remote(target, ExchangeOrderStatus::Expired)));
        let executor = executor(exchange);
        let order = executor.create_order(limit_buy(dec!(0.001))).await.unwrap();

        let synced = executor.sync_order(order.id()).await.unwrap();
        assert_eq!(synced.status(), OrderStatus::Canceled);
    }

    #[tokio::test]
    async fn sync_of_open_order_leaves_it_open() {
        let mut exchange = accepting_exchange();
        exchange
            .expect_query_order()
            .returning(|target| Ok(remote(target, ExchangeOrderStatus::New)));
        let executor = executor(exchange);
        let order = executor.create_order(limit_buy(dec!(0.001))).await.unwrap();

        let synced = executor.sync_order(order.id()).await.unwrap();
        assert_eq!(synced, order);
    }

    #[tokio::test]
    async fn refresh_replaces_rule_table() {
        let mut exchange = MockExchangePort::new();
        exchange.expect_get_exchange_info().returning(|| {
            let mut eth = btc_rule();
            eth.symbol = Symbol::new("ETHUSDT");
            Ok(vec![eth])
        });
        let executor = executor(exchange);

        assert_eq!(executor.refresh_symbol_rules().await.unwrap(), 1);

        let err = executor
            .create_order(limit_buy(dec!(0.001)))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Validation { kind: "symbol", .. }));
    }

    #[tokio::test]
    async fn rehydrate_restores_open_orders_after_restart() {
        let cache = Arc::new(InMemoryCacheStore::new());
        let first = executor_with(accepting_exchange(), Arc::clone(&cache), limiter(100));
        let order = first.create_order(limit_buy(dec!(0.001))).await.unwrap();

        let second = executor_with(MockExchangePort::new(), cache, limiter(100));
        assert_eq!(second.rehydrate().await.unwrap(), 1);
        assert_eq!(second.store().get_cached(order.id()), Some(order));
    }

    // ========================================================================
    // Streams and fire-and-forget publication
    // ========================================================================

    #[tokio::test]
    async fn stream_delivers_filtered_updates() {
        let executor = executor(accepting_exchange());
        let mut updates = executor.stream_order_updates(OrderUpdateFilter::for_symbol("BTCUSDT"));

        let order = executor.create_order(limit_buy(dec!(0.001))).await.unwrap();
        executor
            .apply_fill(&fill_for(&order, dec!(45000), dec!(0.001)))
            .await
            .unwrap();

        let created = updates.next().await.unwrap();
        assert_eq!(created.update_type, UpdateType::Created);
        assert_eq!(created.order.status(), OrderStatus::Submitted);

        let filled = updates.next().await.unwrap();
        assert_eq!(filled.update_type, UpdateType::Filled);
        assert_eq!(filled.order_id(), order.id());
    }

    struct FailingPublisher;

    #[async_trait]
    impl EventPublisherPort for FailingPublisher {
        async fn publish(&self, _topic: &str, _update: &OrderUpdate) -> Result<(), EventPublishError> {
            Err(EventPublishError::ConnectionError {
                message: "bus down".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn publish_failure_does_not_fail_operation() {
        let rules = Arc::new(SymbolRuleTable::with_rules([btc_rule()]));
        let executor = OrderExecutor::new(
            Arc::new(accepting_exchange()),
            Arc::new(StateStore::new(
                Arc::new(InMemoryCacheStore::new()),
                DEFAULT_ORDER_TTL,
            )),
            Arc::new(FailingPublisher),
            OrderValidator::new(rules, RiskLimits::default()),
            limiter(100),
            breakers(),
        );

        let order = executor.create_order(limit_buy(dec!(0.001))).await.unwrap();
        assert_eq!(order.status(), OrderStatus::Submitted);
    }

    struct UnavailableCache;

    #[async_trait]
    impl CacheStore for UnavailableCache {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Unavailable {
                message: "connection refused".to_string(),
            })
        }

        async fn keys_with_prefix(&self, _prefix: &str) -> Result<Vec<String>, CacheError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn distributed_write_failure_is_transient_but_memory_updated() {
        let rules = Arc::new(SymbolRuleTable::with_rules([btc_rule()]));
        let executor = OrderExecutor::new(
            Arc::new(accepting_exchange()),
            Arc::new(StateStore::new(Arc::new(UnavailableCache), DEFAULT_ORDER_TTL)),
            Arc::new(BroadcastEventBus::new(16)),
            OrderValidator::new(rules, RiskLimits::default()),
            limiter(100),
            breakers(),
        );

        let err = executor
            .create_order(limit_buy(dec!(0.001)))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::Transient { .. }));
        let order_id = err.order_id().unwrap();
        let cached = executor.store().get_cached(order_id).unwrap();
        assert_eq!(cached.status(), OrderStatus::Submitted);
    }
}
