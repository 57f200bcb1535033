//! Resilience patterns for exchange calls.
//!
//! This module provides the admission-control and fault-isolation gates
//! placed in front of the exchange client: token-bucket rate limiting and
//! per-endpoint circuit breakers.

mod circuit_breaker;
mod rate_limiter;

pub use circuit_breaker::{
    BreakerFailure, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics,
    CircuitBreakerRegistry, CircuitBreakerState, CircuitError,
};
pub use rate_limiter::{MultiTierLimiter, RateLimitTier, RateLimiter, TokenBucket};
