//! Order Executor Binary
//!
//! Starts the order execution core: loads configuration, connects to the
//! exchange, restores open orders, and logs order updates until shutdown.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin order-executor
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `EXCHANGE_API_KEY`: Exchange API key
//! - `EXCHANGE_API_SECRET`: Exchange API secret
//!
//! ## Optional
//! - `ORDER_EXECUTOR_CONFIG`: Config file path (default: config.yaml)
//! - `RUST_LOG`: Log filter (default: `order_executor=<observability.logging.level>`)

use std::sync::Arc;

use anyhow::Context;
use futures::StreamExt;
use tokio::signal;

use order_executor::application::dto::OrderUpdateFilter;
use order_executor::application::services::{OrderExecutor, StateStore};
use order_executor::config::{Config, ExchangeCredentials, load_config};
use order_executor::domain::risk_management::{OrderValidator, SymbolRuleTable};
use order_executor::infrastructure::{BinanceExchangeAdapter, BroadcastEventBus, InMemoryCacheStore};
use order_executor::observability::{init_metrics, init_tracing};

/// Concrete executor wired for the Binance adapter.
type Executor = OrderExecutor<BinanceExchangeAdapter, InMemoryCacheStore, BroadcastEventBus>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let config = load_config(None).context("failed to load configuration")?;
    init_tracing(&config.observability.logging).context("failed to initialize tracing")?;

    tracing::info!("Starting Order Executor");

    if config.observability.metrics.enabled {
        let metrics_config = config.observability.metrics.to_metrics_config()?;
        init_metrics(&metrics_config).context("failed to start metrics exporter")?;
    }

    let executor = build_executor(&config)?;

    let rules = executor
        .refresh_symbol_rules()
        .await
        .context("failed to load symbol rules")?;
    let restored = executor
        .rehydrate()
        .await
        .context("failed to rehydrate open orders")?;

    tracing::info!(
        environment = %config.exchange.environment,
        symbols = rules,
        open_orders = restored,
        "Order executor ready"
    );

    let mut updates = executor.stream_order_updates(OrderUpdateFilter::all());
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            update = updates.next() => {
                let Some(update) = update else { break };
                tracing::info!(
                    order_id = %update.order_id(),
                    symbol = %update.symbol(),
                    event = update.update_type.event_type(),
                    status = %update.order.status(),
                    filled = %update.order.filled_quantity(),
                    "Order update"
                );
            }
        }
    }

    tracing::info!("Order executor stopped");
    Ok(())
}

/// Wire the executor from configuration and environment credentials.
fn build_executor(config: &Config) -> anyhow::Result<Arc<Executor>> {
    let credentials = ExchangeCredentials::from_env()?;
    let exchange_config = config.exchange.to_binance_config(credentials)?;
    let exchange = BinanceExchangeAdapter::new(&exchange_config)
        .context("failed to create exchange adapter")?;

    if exchange.is_live() {
        tracing::warn!("LIVE exchange environment - orders will execute with real funds");
    }

    let cache = Arc::new(InMemoryCacheStore::new());
    let store = Arc::new(StateStore::new(cache, config.state_store.ttl()));
    let publisher = Arc::new(BroadcastEventBus::new(config.events.capacity));
    let validator = OrderValidator::new(Arc::new(SymbolRuleTable::new()), config.risk.clone());

    Ok(Arc::new(OrderExecutor::new(
        Arc::new(exchange),
        store,
        publisher,
        validator,
        Arc::new(config.rate_limits.to_rate_limiter()),
        Arc::new(config.circuit_breaker.to_registry()),
    )))
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
