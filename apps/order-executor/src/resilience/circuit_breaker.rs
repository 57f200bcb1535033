//! Circuit breaker for exchange endpoints.
//!
//! Fails fast while an upstream endpoint is degraded and probes for recovery.
//!
//! # State Machine
//!
//! ```text
//! CLOSED → OPEN (failure rate >= threshold over at least minimum_calls)
//! OPEN → HALF_OPEN (wait duration elapsed, on the next call)
//! HALF_OPEN → CLOSED (every permitted probe succeeds)
//! HALF_OPEN → OPEN (any probe fails)
//! ```
//!
//! # Configuration
//!
//! - `failure_rate_threshold`: Open at this failure rate (default: 50%)
//! - `sliding_window_size`: Number of calls to track (default: 10)
//! - `minimum_calls`: Minimum calls before evaluating (default: 5)
//! - `wait_duration_in_open`: Time to stay open (default: 30s)
//! - `permitted_calls_in_half_open`: Concurrent probe calls allowed (default: 3)
//!
//! # Example
//!
//! ```rust,ignore
//! use order_executor::resilience::{CircuitBreakerRegistry, CircuitBreakerConfig};
//!
//! let breakers = CircuitBreakerRegistry::new(CircuitBreakerConfig::default());
//! let order = breakers
//!     .execute("exchange_create_order", || exchange.create_order(&request))
//!     .await?;
//! ```

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::observability::{
    circuit_breaker_state, record_circuit_breaker_rejected, record_circuit_breaker_state,
};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitBreakerState {
    /// Circuit is closed, calls flow normally.
    Closed,
    /// Circuit is open, calls are rejected.
    Open,
    /// Circuit is testing with limited calls.
    HalfOpen,
}

impl CircuitBreakerState {
    const fn gauge_value(self) -> f64 {
        match self {
            Self::Closed => circuit_breaker_state::CLOSED,
            Self::Open => circuit_breaker_state::OPEN,
            Self::HalfOpen => circuit_breaker_state::HALF_OPEN,
        }
    }
}

impl std::fmt::Display for CircuitBreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
            Self::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Failure rate threshold to open circuit (0.0-1.0).
    pub failure_rate_threshold: f64,
    /// Number of calls in the sliding window.
    pub sliding_window_size: u32,
    /// Minimum calls before evaluating failure rate.
    pub minimum_calls: u32,
    /// Duration to stay in `OPEN` state.
    pub wait_duration_in_open: Duration,
    /// Permitted concurrent probe calls in `HALF_OPEN` state.
    pub permitted_calls_in_half_open: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5, // 50%
            sliding_window_size: 10,
            minimum_calls: 5,
            wait_duration_in_open: Duration::from_secs(30),
            permitted_calls_in_half_open: 3,
        }
    }
}

/// Error returned by [`CircuitBreaker::execute`].
#[derive(Debug, thiserror::Error)]
pub enum CircuitError<E> {
    /// The circuit rejected the call without invoking it.
    #[error("circuit breaker '{name}' is open")]
    Open {
        /// Breaker key.
        name: String,
    },
    /// The call ran and failed.
    #[error("{0}")]
    Inner(E),
}

/// Classifies call errors for the breaker.
///
/// Only upstream faults should count against an endpoint; business
/// rejections prove the endpoint is healthy.
pub trait BreakerFailure {
    /// True if this error should be recorded as a failure.
    fn is_breaker_failure(&self) -> bool {
        true
    }
}

/// Outcome of a call for sliding window tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallOutcome {
    Success,
    Failure,
}

/// Mutable breaker state, mutated under a single lock.
#[derive(Debug)]
struct BreakerCore {
    state: CircuitBreakerState,
    window: VecDeque<CallOutcome>,
    opened_at: Option<Instant>,
    probes_in_flight: u32,
    probe_successes: u32,
}

impl BreakerCore {
    fn new() -> Self {
        Self {
            state: CircuitBreakerState::Closed,
            window: VecDeque::new(),
            opened_at: None,
            probes_in_flight: 0,
            probe_successes: 0,
        }
    }
}

/// Circuit breaker for one endpoint.
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Endpoint key for logging and metrics.
    name: String,
    /// Configuration.
    config: CircuitBreakerConfig,
    /// State, window and probe counters.
    core: Mutex<BreakerCore>,
    /// Total calls counter (for metrics).
    total_calls: AtomicU64,
    /// Total failures counter (for metrics).
    total_failures: AtomicU64,
    /// Calls rejected while open (for metrics).
    rejected_calls: AtomicU64,
    /// State transitions counter (for metrics).
    state_transitions: AtomicU64,
}

impl CircuitBreaker {
    /// Create a new circuit breaker.
    #[must_use]
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            core: Mutex::new(BreakerCore::new()),
            total_calls: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            rejected_calls: AtomicU64::new(0),
            state_transitions: AtomicU64::new(0),
        }
    }

    /// Get the endpoint key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Get the current state.
    ///
    /// Reports `OPEN` until a call arrives after the wait duration.
    #[must_use]
    pub fn state(&self) -> CircuitBreakerState {
        self.lock().state
    }

    /// Run `call` through the breaker.
    ///
    /// # Errors
    ///
    /// Returns `CircuitError::Open` without invoking `call` when the circuit
    /// rejects it, or `CircuitError::Inner` when `call` fails.
    pub async fn execute<F, Fut, T, E>(&self, call: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: BreakerFailure,
    {
        if !self.try_acquire() {
            self.rejected_calls.fetch_add(1, Ordering::Relaxed);
            record_circuit_breaker_rejected(&self.name);
            return Err(CircuitError::Open {
                name: self.name.clone(),
            });
        }

        let mut permit = CallPermit {
            breaker: self,
            settled: false,
        };

        let result = call().await;
        permit.settled = true;

        match result {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                if err.is_breaker_failure() {
                    self.record_failure();
                } else {
                    self.record_success();
                }
                Err(CircuitError::Inner(err))
            }
        }
    }

    /// Ask for permission to make a call.
    ///
    /// In `HALF_OPEN` a granted permission reserves one probe slot that must be
    /// released by `record_success`/`record_failure`.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        let mut core = self.lock();

        if core.state == CircuitBreakerState::Open
            && core
                .opened_at
                .is_some_and(|opened| opened.elapsed() >= self.config.wait_duration_in_open)
        {
            self.transition(&mut core, CircuitBreakerState::HalfOpen);
        }

        match core.state {
            CircuitBreakerState::Closed => true,
            CircuitBreakerState::Open => false,
            CircuitBreakerState::HalfOpen => {
                if core.probes_in_flight < self.config.permitted_calls_in_half_open {
                    core.probes_in_flight += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.record_outcome(CallOutcome::Success);
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.total_failures.fetch_add(1, Ordering::Relaxed);
        self.record_outcome(CallOutcome::Failure);
    }

    /// Record call outcome and update state.
    fn record_outcome(&self, outcome: CallOutcome) {
        let mut core = self.lock();

        match core.state {
            CircuitBreakerState::Closed => {
                core.window.push_back(outcome);
                while core.window.len() > self.config.sliding_window_size as usize {
                    core.window.pop_front();
                }
                if self.should_open(&core.window) {
                    self.transition(&mut core, CircuitBreakerState::Open);
                }
            }
            CircuitBreakerState::HalfOpen => {
                core.probes_in_flight = core.probes_in_flight.saturating_sub(1);
                match outcome {
                    CallOutcome::Failure => {
                        self.transition(&mut core, CircuitBreakerState::Open);
                    }
                    CallOutcome::Success => {
                        core.probe_successes += 1;
                        if core.probe_successes >= self.config.permitted_calls_in_half_open {
                            self.transition(&mut core, CircuitBreakerState::Closed);
                        }
                    }
                }
            }
            CircuitBreakerState::Open => {
                // A call admitted before the circuit opened finished late.
                tracing::debug!(
                    name = %self.name,
                    "Call outcome recorded while circuit is OPEN"
                );
            }
        }
    }

    /// Release a probe slot for a call that never completed.
    fn release_abandoned(&self) {
        let mut core = self.lock();
        if core.state == CircuitBreakerState::HalfOpen {
            core.probes_in_flight = core.probes_in_flight.saturating_sub(1);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn should_open(&self, window: &VecDeque<CallOutcome>) -> bool {
        if window.len() < self.config.minimum_calls as usize {
            return false;
        }

        let failures = window
            .iter()
            .filter(|o| **o == CallOutcome::Failure)
            .count();
        // Precision loss acceptable for rate calculation
        let failure_rate = failures as f64 / window.len() as f64;

        failure_rate >= self.config.failure_rate_threshold
    }

    fn transition(&self, core: &mut BreakerCore, to: CircuitBreakerState) {
        let previous = core.state;
        if previous == to {
            return;
        }

        core.state = to;
        match to {
            CircuitBreakerState::Open => {
                core.opened_at = Some(Instant::now());
                core.probes_in_flight = 0;
                core.probe_successes = 0;
                tracing::warn!(
                    name = %self.name,
                    from = %previous,
                    to = "OPEN",
                    "Circuit breaker opened"
                );
            }
            CircuitBreakerState::HalfOpen => {
                core.probes_in_flight = 0;
                core.probe_successes = 0;
                tracing::info!(
                    name = %self.name,
                    from = %previous,
                    to = "HALF_OPEN",
                    "Circuit breaker testing"
                );
            }
            CircuitBreakerState::Closed => {
                core.window.clear();
                core.opened_at = None;
                core.probes_in_flight = 0;
                core.probe_successes = 0;
                tracing::info!(
                    name = %self.name,
                    from = %previous,
                    to = "CLOSED",
                    "Circuit breaker closed"
                );
            }
        }

        self.state_transitions.fetch_add(1, Ordering::Relaxed);
        record_circuit_breaker_state(&self.name, to.gauge_value());
    }

    /// Get metrics for this circuit breaker.
    #[must_use]
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let core = self.lock();
        CircuitBreakerMetrics {
            name: self.name.clone(),
            state: core.state,
            total_calls: self.total_calls.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            rejected_calls: self.rejected_calls.load(Ordering::Relaxed),
            state_transitions: self.state_transitions.load(Ordering::Relaxed),
            failure_rate: failure_rate(&core.window),
        }
    }

    /// Force the circuit breaker to open (for testing or emergency).
    pub fn force_open(&self) {
        let mut core = self.lock();
        self.transition(&mut core, CircuitBreakerState::Open);
    }

    /// Force the circuit breaker to close and clear its window.
    pub fn reset(&self) {
        let mut core = self.lock();
        self.transition(&mut core, CircuitBreakerState::Closed);
        core.window.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerCore> {
        self.core
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[allow(clippy::cast_precision_loss)]
fn failure_rate(window: &VecDeque<CallOutcome>) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    let failures = window
        .iter()
        .filter(|o| **o == CallOutcome::Failure)
        .count();
    failures as f64 / window.len() as f64
}

/// Releases a half-open probe slot if the call future is dropped mid-flight.
struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    settled: bool,
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.release_abandoned();
        }
    }
}

/// Metrics for a circuit breaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    /// Endpoint key.
    pub name: String,
    /// Current state.
    pub state: CircuitBreakerState,
    /// Total calls.
    pub total_calls: u64,
    /// Total failures.
    pub total_failures: u64,
    /// Calls rejected while open.
    pub rejected_calls: u64,
    /// Number of state transitions.
    pub state_transitions: u64,
    /// Current failure rate (0.0-1.0).
    pub failure_rate: f64,
}

// ============================================================================
// Registry
// ============================================================================

/// Circuit breakers keyed by endpoint, created lazily.
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    default_config: CircuitBreakerConfig,
    overrides: HashMap<String, CircuitBreakerConfig>,
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreakerRegistry {
    /// Create a registry using `default_config` for every key.
    #[must_use]
    pub fn new(default_config: CircuitBreakerConfig) -> Self {
        Self {
            default_config,
            overrides: HashMap::new(),
            breakers: RwLock::new(HashMap::new()),
        }
    }

    /// Use `config` for breakers created under `key`.
    #[must_use]
    pub fn with_override(mut self, key: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        self.overrides.insert(key.into(), config);
        self
    }

    /// Get or create the breaker for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self
            .breakers
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
        {
            return Arc::clone(breaker);
        }

        let mut breakers = self
            .breakers
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let breaker = breakers.entry(key.to_string()).or_insert_with(|| {
            let config = self
                .overrides
                .get(key)
                .cloned()
                .unwrap_or_else(|| self.default_config.clone());
            Arc::new(CircuitBreaker::new(key, config))
        });
        Arc::clone(breaker)
    }

    /// Run `call` through the breaker for `key`.
    ///
    /// # Errors
    ///
    /// See [`CircuitBreaker::execute`].
    pub async fn execute<F, Fut, T, E>(&self, key: &str, call: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: BreakerFailure,
    {
        let breaker = self.get(key);
        breaker.execute(call).await
    }

    /// Current state for `key`.
    #[must_use]
    pub fn state(&self, key: &str) -> CircuitBreakerState {
        self.get(key).state()
    }

    /// Metrics for `key`.
    #[must_use]
    pub fn metrics(&self, key: &str) -> CircuitBreakerMetrics {
        self.get(key).metrics()
    }

    /// Metrics for every breaker created so far.
    #[must_use]
    pub fn all_metrics(&self) -> Vec<CircuitBreakerMetrics> {
        let breakers = self
            .breakers
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut metrics: Vec<_> = breakers.values().map(|b| b.metrics()).collect();
        drop(breakers);
        metrics.sort_by(|a, b| a.name.cmp(&b.name));
        metrics
    }

    /// Force the breaker for `key` open.
    pub fn force_open(&self, key: &str) {
        self.get(key).force_open();
    }

    /// Reset the breaker for `key` to closed.
    pub fn reset(&self, key: &str) {
        self.get(key).reset();
    }
}
