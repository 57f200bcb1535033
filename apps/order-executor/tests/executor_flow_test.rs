//! End-to-end order lifecycle tests.
//!
//! Wires the executor the way the binary does (Binance adapter, in-memory
//! cache, broadcast bus) against a mock exchange and drives orders through
//! create, fill, cancel, sync and restart.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use order_executor::application::dto::{CreateOrderDto, OrderUpdateFilter};
use order_executor::application::services::{OrderExecutor, StateStore};
use order_executor::config::{CircuitBreakerConfig, RateLimitConfig};
use order_executor::domain::risk_management::{OrderValidator, RiskLimits, SymbolRuleTable};
use order_executor::domain::shared::Symbol;
use order_executor::infrastructure::{
    BinanceConfig, BinanceEnvironment, BinanceExchangeAdapter, BroadcastEventBus,
    InMemoryCacheStore,
};
use order_executor::{
    ExecutionError, Fill, OrderSide, OrderStatus, OrderType, OrderUpdate, UpdateType,
};

type Executor = OrderExecutor<BinanceExchangeAdapter, InMemoryCacheStore, BroadcastEventBus>;

// =============================================================================
// Helpers
// =============================================================================

fn executor(server: &MockServer, cache: Arc<InMemoryCacheStore>) -> Executor {
    let config = BinanceConfig::new(
        "flow-key".to_string(),
        "flow-secret".to_string(),
        BinanceEnvironment::Testnet,
    )
    .with_base_url(server.uri())
    .with_timeout(Duration::from_secs(2));
    let exchange = BinanceExchangeAdapter::new(&config).unwrap();

    OrderExecutor::new(
        Arc::new(exchange),
        Arc::new(StateStore::new(cache, Duration::from_secs(86_400))),
        Arc::new(BroadcastEventBus::new(64)),
        OrderValidator::new(Arc::new(SymbolRuleTable::new()), RiskLimits::default()),
        Arc::new(RateLimitConfig::default().to_rate_limiter()),
        Arc::new(CircuitBreakerConfig::default().to_registry()),
    )
}

fn order_body(order_id: i64, client_order_id: &str, status: &str) -> serde_json::Value {
    json!({
        "orderId": order_id,
        "symbol": "BTCUSDT",
        "status": status,
        "clientOrderId": client_order_id,
        "price": "45000.00",
        "avgPrice": "0",
        "origQty": "0.010",
        "executedQty": "0",
        "type": "LIMIT",
        "side": "BUY",
        "timeInForce": "GTC",
        "updateTime": 1_700_000_000_000_i64
    })
}

async fn mount_exchange_info(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/fapi/v1/exchangeInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "symbols": [{
                "symbol": "BTCUSDT",
                "status": "TRADING",
                "pricePrecision": 2,
                "quantityPrecision": 3,
                "filters": [
                    {"filterType": "PRICE_FILTER", "tickSize": "0.10"},
                    {"filterType": "LOT_SIZE", "minQty": "0.001", "maxQty": "1000", "stepSize": "0.001"},
                    {"filterType": "MIN_NOTIONAL", "notional": "100"}
                ]
            }]
        })))
        .mount(server)
        .await;
}

async fn mount_create(server: &MockServer, client_order_id: &str, exchange_order_id: i64) {
    Mock::given(method("POST"))
        .and(path("/fapi/v1/order"))
        .and(query_param("newClientOrderId", client_order_id))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(order_body(
                exchange_order_id,
                client_order_id,
                "NEW",
            )),
        )
        .expect(1)
        .mount(server)
        .await;
}

fn limit_buy(client_order_id: &str, price: Decimal) -> CreateOrderDto {
    CreateOrderDto {
        client_order_id: Some(client_order_id.to_string()),
        symbol: "BTCUSDT".to_string(),
        side: OrderSide::Buy,
        order_type: OrderType::Limit,
        quantity: dec!(0.010),
        price: Some(price),
        time_in_force: None,
        post_only: false,
        reduce_only: false,
    }
}

async fn next_update(stream: &mut BoxStream<'static, OrderUpdate>) -> OrderUpdate {
    tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("timed out waiting for order update")
        .expect("update stream ended")
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_create_fill_cancel_lifecycle() {
    let server = MockServer::start().await;
    mount_exchange_info(&server).await;
    mount_create(&server, "flow-a", 1001).await;
    Mock::given(method("DELETE"))
        .and(path("/fapi/v1/order"))
        .and(query_param("orderId", "1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(order_body(1001, "flow-a", "CANCELED")))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor(&server, Arc::new(InMemoryCacheStore::new()));
    assert_eq!(executor.refresh_symbol_rules().await.unwrap(), 1);

    let mut updates = executor.stream_order_updates(OrderUpdateFilter::for_symbol("BTCUSDT"));

    let order = executor.create_order(limit_buy("flow-a", dec!(45000.0))).await.unwrap();
    assert_eq!(order.status(), OrderStatus::Submitted);
    assert_eq!(order.exchange_order_id().unwrap().as_str(), "1001");

    let created = next_update(&mut updates).await;
    assert_eq!(created.update_type, UpdateType::Created);
    assert_eq!(created.order.id(), order.id());

    let fill = Fill::new(
        order.id().clone(),
        Symbol::new("BTCUSDT"),
        OrderSide::Buy,
        dec!(44990),
        dec!(0.004),
    );
    let partial = executor.apply_fill(&fill).await.unwrap().unwrap();
    assert_eq!(partial.status(), OrderStatus::PartiallyFilled);
    assert_eq!(partial.filled_quantity(), dec!(0.004));
    assert_eq!(partial.avg_fill_price(), dec!(44990));
    assert_eq!(next_update(&mut updates).await.update_type, UpdateType::Updated);

    let canceled = executor
        .cancel_order(order.id(), &Symbol::new("BTCUSDT"))
        .await
        .unwrap();
    assert_eq!(canceled.status(), OrderStatus::Canceled);
    assert_eq!(canceled.filled_quantity(), dec!(0.004));
    assert_eq!(next_update(&mut updates).await.update_type, UpdateType::Canceled);

    let stored = executor.get_order(order.id()).await.unwrap();
    assert_eq!(stored.status(), OrderStatus::Canceled);
}

#[tokio::test]
async fn test_invalid_order_is_rejected_without_exchange_call() {
    let server = MockServer::start().await;
    mount_exchange_info(&server).await;
    Mock::given(method("POST"))
        .and(path("/fapi/v1/order"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let executor = executor(&server, Arc::new(InMemoryCacheStore::new()));
    executor.refresh_symbol_rules().await.unwrap();
    let mut updates = executor.stream_order_updates(OrderUpdateFilter::all());

    let Err(err) = executor.create_order(limit_buy("flow-bad", dec!(45000.05))).await else {
        panic!("expected price validation failure");
    };
    let ExecutionError::Validation {
        kind,
        order_id: Some(order_id),
        ..
    } = err
    else {
        panic!("expected validation error with a recorded order, got {err:?}");
    };
    assert_eq!(kind, "price");

    let rejected = executor.get_order(&order_id).await.unwrap();
    assert_eq!(rejected.status(), OrderStatus::Rejected);
    assert!(rejected.reject_reason().is_some());
    assert_eq!(next_update(&mut updates).await.update_type, UpdateType::Rejected);
}

#[tokio::test]
async fn test_exchange_rejection_records_rejected_order() {
    let server = MockServer::start().await;
    mount_exchange_info(&server).await;
    Mock::given(method("POST"))
        .and(path("/fapi/v1/order"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"code": -2019, "msg": "Margin is insufficient."})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor(&server, Arc::new(InMemoryCacheStore::new()));
    executor.refresh_symbol_rules().await.unwrap();

    let Err(err) = executor.create_order(limit_buy("flow-margin", dec!(45000.0))).await else {
        panic!("expected exchange rejection");
    };
    assert_eq!(err.reason(), "insufficient_balance");

    let order_id = err.order_id().cloned().unwrap();
    let stored = executor.get_order(&order_id).await.unwrap();
    assert_eq!(stored.status(), OrderStatus::Rejected);
}

#[tokio::test]
async fn test_unknown_symbol_is_rejected_before_rules_load() {
    let server = MockServer::start().await;
    let executor = executor(&server, Arc::new(InMemoryCacheStore::new()));

    let Err(err) = executor.create_order(limit_buy("flow-early", dec!(45000.0))).await else {
        panic!("expected unknown symbol");
    };
    assert!(matches!(err, ExecutionError::Validation { kind: "symbol", .. }));
}

// =============================================================================
// Restart
// =============================================================================

#[tokio::test]
async fn test_rehydrate_then_sync_after_restart() {
    let server = MockServer::start().await;
    mount_exchange_info(&server).await;
    mount_create(&server, "flow-open", 2001).await;
    mount_create(&server, "flow-done", 2002).await;
    Mock::given(method("DELETE"))
        .and(path("/fapi/v1/order"))
        .and(query_param("orderId", "2002"))
        .respond_with(ResponseTemplate::new(200).set_body_json(order_body(2002, "flow-done", "CANCELED")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fapi/v1/order"))
        .and(query_param("orderId", "2001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(order_body(2001, "flow-open", "EXPIRED")))
        .expect(1)
        .mount(&server)
        .await;

    let cache = Arc::new(InMemoryCacheStore::new());
    let first = executor(&server, Arc::clone(&cache));
    first.refresh_symbol_rules().await.unwrap();

    let open = first.create_order(limit_buy("flow-open", dec!(45000.0))).await.unwrap();
    let done = first.create_order(limit_buy("flow-done", dec!(45000.0))).await.unwrap();
    first.cancel_order(done.id(), &Symbol::new("BTCUSDT")).await.unwrap();
    drop(first);

    let second = executor(&server, Arc::clone(&cache));
    assert_eq!(second.rehydrate().await.unwrap(), 1);
    assert_eq!(second.store().open_order_count(), 1);

    let restored = second.get_order(open.id()).await.unwrap();
    assert_eq!(restored.status(), OrderStatus::Submitted);
    assert_eq!(restored.exchange_order_id().unwrap().as_str(), "2001");

    let closed = second.get_order(done.id()).await.unwrap();
    assert_eq!(closed.status(), OrderStatus::Canceled);

    let synced = second.sync_order(open.id()).await.unwrap();
    assert_eq!(synced.status(), OrderStatus::Canceled);
}

#[tokio::test]
async fn test_cancel_for_wrong_symbol_is_refused() {
    let server = MockServer::start().await;
    mount_exchange_info(&server).await;
    mount_create(&server, "flow-sym", 3001).await;
    Mock::given(method("DELETE"))
        .and(path("/fapi/v1/order"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let executor = executor(&server, Arc::new(InMemoryCacheStore::new()));
    executor.refresh_symbol_rules().await.unwrap();
    let order = executor.create_order(limit_buy("flow-sym", dec!(45000.0))).await.unwrap();

    let err = executor
        .cancel_order(order.id(), &Symbol::new("ETHUSDT"))
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutionError::Validation { kind: "symbol", .. }));

    let unchanged = executor.get_order(order.id()).await.unwrap();
    assert_eq!(unchanged.status(), OrderStatus::Submitted);
}
