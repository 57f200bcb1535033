//! Observability module for metrics and logging.
//!
//! This module provides instrumentation for the order executor,
//! including Prometheus metrics export and structured logging setup.

mod logging;
mod metrics;

pub use logging::{TracingError, env_filter, init_tracing};
pub use self::metrics::{
    MetricsConfig, MetricsError, circuit_breaker_state, init_metrics,
    record_circuit_breaker_rejected, record_circuit_breaker_state, record_event_publish_failure,
    record_event_published, record_exchange_error, record_exchange_request, record_order_canceled,
    record_order_created, record_order_filled, record_order_latency, record_order_rejected,
    record_rate_limit_rejection, update_open_orders,
};
