//! Prometheus metrics for the order executor.
//!
//! Recording is fire-and-forget: without an installed exporter every call is
//! a no-op.
//!
//! # Example
//!
//! ```ignore
//! use order_executor::observability::{init_metrics, MetricsConfig};
//!
//! init_metrics(&MetricsConfig::default())?;
//! record_order_created("BTCUSDT", "limit");
//! ```

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for latency measurements (in seconds).
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9090)),
            // Latency buckets from 100us to 1s
            latency_buckets: vec![
                0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ],
        }
    }
}

impl MetricsConfig {
    /// Create a new metrics configuration with custom address.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            ..Default::default()
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the metrics exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.latency_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Order Lifecycle Metrics
// ============================================================================

/// Record an order accepted by the exchange.
pub fn record_order_created(symbol: &str, order_type: &str) {
    counter!(
        "orders_created_total",
        "symbol" => symbol.to_string(),
        "order_type" => order_type.to_string()
    )
    .increment(1);
}

/// Record an order rejection.
///
/// # Arguments
///
/// * `reason` - Rejection category (e.g., `"quantity"`, `"insufficient_balance"`, `"transient"`)
pub fn record_order_rejected(reason: &str) {
    counter!(
        "orders_rejected_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record a confirmed cancellation.
pub fn record_order_canceled(symbol: &str) {
    counter!(
        "orders_canceled_total",
        "symbol" => symbol.to_string()
    )
    .increment(1);
}

/// Record an order reaching `FILLED`.
pub fn record_order_filled(symbol: &str) {
    counter!(
        "orders_filled_total",
        "symbol" => symbol.to_string()
    )
    .increment(1);
}

/// Record the end-to-end latency of an executor operation.
///
/// # Arguments
///
/// * `operation` - Operation name (e.g., `"create_order"`, `"cancel_order"`)
/// * `latency_seconds` - Wall time of the operation in seconds
pub fn record_order_latency(operation: &str, latency_seconds: f64) {
    histogram!(
        "order_latency_seconds",
        "operation" => operation.to_string()
    )
    .record(latency_seconds);
}

/// Update the open orders gauge.
pub fn update_open_orders(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("open_orders").set(count as f64);
}

// ============================================================================
// Exchange Metrics
// ============================================================================

/// Record an error returned by the exchange client.
///
/// # Arguments
///
/// * `kind` - Error kind (e.g., `"insufficient_balance"`, `"transient"`)
pub fn record_exchange_error(kind: &str) {
    counter!(
        "exchange_errors_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record the latency of a single exchange REST call.
pub fn record_exchange_request(endpoint: &str, status: &str, latency_seconds: f64) {
    counter!(
        "exchange_requests_total",
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        "exchange_request_duration_seconds",
        "endpoint" => endpoint.to_string()
    )
    .record(latency_seconds);
}

// ============================================================================
// Admission Control Metrics
// ============================================================================

/// Record a rate limiter denial.
pub fn record_rate_limit_rejection(key: &str) {
    counter!(
        "rate_limit_rejections_total",
        "key" => key.to_string()
    )
    .increment(1);
}

/// Circuit breaker state values for the gauge.
pub mod circuit_breaker_state {
    /// Circuit is closed (healthy).
    pub const CLOSED: f64 = 0.0;
    /// Circuit is open (failing).
    pub const OPEN: f64 = 1.0;
    /// Circuit is half-open (testing).
    pub const HALF_OPEN: f64 = 2.0;
}

/// Update circuit breaker state gauge.
///
/// # Arguments
///
/// * `name` - Breaker key (e.g., `"exchange_create_order"`)
/// * `state` - Numeric state (0=closed, 1=open, 2=`half_open`)
pub fn record_circuit_breaker_state(name: &str, state: f64) {
    gauge!(
        "circuit_breaker_state",
        "name" => name.to_string()
    )
    .set(state);
}

/// Record a call rejected because the circuit is open.
pub fn record_circuit_breaker_rejected(name: &str) {
    counter!(
        "circuit_breaker_rejected_total",
        "name" => name.to_string()
    )
    .increment(1);
}

// ============================================================================
// Event Publication Metrics
// ============================================================================

/// Record a published order update.
pub fn record_event_published(topic: &str) {
    counter!(
        "events_published_total",
        "topic" => topic.to_string()
    )
    .increment(1);
}

/// Record a failed order update publication.
pub fn record_event_publish_failure(topic: &str) {
    counter!(
        "event_publish_failures_total",
        "topic" => topic.to_string()
    )
    .increment(1);
}

// ============================================================================
// Tests
// ============================================================================
