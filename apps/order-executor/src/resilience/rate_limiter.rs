//! Token-bucket rate limiting for exchange requests.
//!
//! Admission is non-blocking: a call either gets its tokens now or is refused.
//! Callers own backoff and retry.
//!
//! # Tiers
//!
//! Exchanges enforce several windows at once (e.g. 10 orders per second and
//! 1200 per minute). A [`MultiTierLimiter`] holds one bucket per window and
//! debits all of them together or none of them.
//!
//! # Example
//!
//! ```rust,ignore
//! use order_executor::resilience::{RateLimiter, RateLimitTier};
//!
//! let limiter = RateLimiter::new(RateLimitTier::exchange_order_defaults());
//! if !limiter.allow("create_order", 1) {
//!     return Err(ExecutionError::RateLimitExceeded { key: "create_order".into() });
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::observability::record_rate_limit_rejection;

/// One rate window: `capacity` tokens replenished evenly over `window`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitTier {
    /// Tier name for logs (e.g. "per_second").
    pub name: String,
    /// Maximum tokens in the bucket.
    pub capacity: u32,
    /// Time to refill an empty bucket.
    pub window: Duration,
}

impl RateLimitTier {
    /// Create a tier.
    #[must_use]
    pub fn new(name: impl Into<String>, capacity: u32, window: Duration) -> Self {
        Self {
            name: name.into(),
            capacity,
            window,
        }
    }

    /// Tokens added per second.
    #[must_use]
    pub fn refill_rate(&self) -> f64 {
        let secs = self.window.as_secs_f64();
        if secs <= 0.0 {
            return f64::from(self.capacity);
        }
        f64::from(self.capacity) / secs
    }

    /// Default order-entry tiers: 10 per second and 1200 per minute.
    #[must_use]
    pub fn exchange_order_defaults() -> Vec<Self> {
        vec![
            Self::new("per_second", 10, Duration::from_secs(1)),
            Self::new("per_minute", 1200, Duration::from_secs(60)),
        ]
    }
}

// ============================================================================
// Token Bucket
// ============================================================================

/// Single token bucket with lazy refill.
///
/// Not synchronized; owners serialize access.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    #[must_use]
    pub fn new(tier: &RateLimitTier, now: Instant) -> Self {
        let capacity = f64::from(tier.capacity);
        Self {
            capacity,
            refill_per_sec: tier.refill_rate(),
            tokens: capacity,
            last_refill: now,
        }
    }

    /// Accrue tokens for the time elapsed since the last refill, capped at capacity.
    pub fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        if elapsed.is_zero() {
            return;
        }
        self.last_refill = now;
        self.tokens = elapsed
            .as_secs_f64()
            .mul_add(self.refill_per_sec, self.tokens)
            .min(self.capacity);
    }

    /// True if `weight` tokens are available.
    #[must_use]
    pub fn can_take(&self, weight: u32) -> bool {
        self.tokens >= f64::from(weight)
    }

    /// Remove `weight` tokens. Callers check [`Self::can_take`] first.
    pub fn take(&mut self, weight: u32) {
        self.tokens = (self.tokens - f64::from(weight)).max(0.0);
    }

    /// Tokens currently available.
    #[must_use]
    pub const fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Bucket capacity.
    #[must_use]
    pub const fn capacity(&self) -> f64 {
        self.capacity
    }
}

// ============================================================================
// Multi-Tier Limiter
// ============================================================================

/// Several buckets debited atomically together.
#[derive(Debug)]
pub struct MultiTierLimiter {
    buckets: Mutex<Vec<TokenBucket>>,
}

impl MultiTierLimiter {
    /// Create a limiter with one full bucket per tier.
    #[must_use]
    pub fn new(tiers: &[RateLimitTier]) -> Self {
        Self::new_at(tiers, Instant::now())
    }

    /// Create a limiter whose buckets start full at `now`.
    #[must_use]
    pub fn new_at(tiers: &[RateLimitTier], now: Instant) -> Self {
        let buckets = tiers.iter().map(|tier| TokenBucket::new(tier, now)).collect();
        Self {
            buckets: Mutex::new(buckets),
        }
    }

    /// Try to take `weight` tokens from every tier.
    #[must_use]
    pub fn allow(&self, weight: u32) -> bool {
        self.allow_at(weight, Instant::now())
    }

    /// Try to take `weight` tokens from every tier at time `now`.
    ///
    /// A refusal from any tier debits none.
    #[must_use]
    pub fn allow_at(&self, weight: u32, now: Instant) -> bool {
        if weight == 0 {
            return true;
        }

        let mut buckets = self.lock();
        for bucket in buckets.iter_mut() {
            bucket.refill(now);
        }

        if !buckets.iter().all(|bucket| bucket.can_take(weight)) {
            return false;
        }

        for bucket in buckets.iter_mut() {
            bucket.take(weight);
        }
        true
    }

    /// Smallest token count across tiers, after refill.
    #[must_use]
    pub fn available(&self) -> f64 {
        let now = Instant::now();
        let mut buckets = self.lock();
        buckets
            .iter_mut()
            .map(|bucket| {
                bucket.refill(now);
                bucket.tokens()
            })
            .fold(f64::INFINITY, f64::min)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TokenBucket>> {
        self.buckets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// ============================================================================
// Keyed Rate Limiter
// ============================================================================

/// Rate limiters keyed by logical operation, created lazily.
#[derive(Debug)]
pub struct RateLimiter {
    default_tiers: Vec<RateLimitTier>,
    key_tiers: HashMap<String, Vec<RateLimitTier>>,
    limiters: RwLock<HashMap<String, Arc<MultiTierLimiter>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitTier::exchange_order_defaults())
    }
}

impl RateLimiter {
    /// Create a limiter using `default_tiers` for every key.
    #[must_use]
    pub fn new(default_tiers: Vec<RateLimitTier>) -> Self {
        Self {
            default_tiers,
            key_tiers: HashMap::new(),
            limiters: RwLock::new(HashMap::new()),
        }
    }

    /// Use `tiers` for `key` instead of the defaults.
    #[must_use]
    pub fn with_key_tiers(mut self, key: impl Into<String>, tiers: Vec<RateLimitTier>) -> Self {
        self.key_tiers.insert(key.into(), tiers);
        self
    }

    /// Non-blocking admission check for `weight` tokens under `key`.
    #[must_use]
    pub fn allow(&self, key: &str, weight: u32) -> bool {
        let allowed = self.limiter(key).allow(weight);
        if !allowed {
            record_rate_limit_rejection(key);
            tracing::debug!(key, weight, "Rate limit exceeded");
        }
        allowed
    }

    /// Tokens currently available under `key`.
    #[must_use]
    pub fn available(&self, key: &str) -> f64 {
        self.limiter(key).available()
    }

    /// Get or create the limiter for `key`.
    #[must_use]
    pub fn limiter(&self, key: &str) -> Arc<MultiTierLimiter> {
        if let Some(limiter) = self
            .limiters
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
        {
            return Arc::clone(limiter);
        }

        let mut limiters = self
            .limiters
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let limiter = limiters.entry(key.to_string()).or_insert_with(|| {
            let tiers = self.key_tiers.get(key).unwrap_or(&self.default_tiers);
            Arc::new(MultiTierLimiter::new(tiers))
        });
        Arc::clone(limiter)
    }
}
