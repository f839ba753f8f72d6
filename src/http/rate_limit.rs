//! Rate limiting implementation
//!
//! A lazily replenished token bucket. The pool holds a fractional token
//! count capped at the configured rate; each grant removes exactly one token.
//! Waiters poll on a fixed backoff instead of spinning.
//!
//! Time comes from [`tokio::time::Instant`], so tests can pause and
//! fast-forward the clock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Configuration for rate limiting
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of requests per second (also the bucket ceiling)
    pub requests_per_second: u32,
    /// Delay between checks while the bucket is empty
    pub backoff: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 4,
            backoff: Duration::from_millis(100),
        }
    }
}

impl RateLimiterConfig {
    /// Create a new rate limiter config with the default backoff
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            requests_per_second,
            ..Self::default()
        }
    }

    /// Set the polling backoff
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    updated_at: Instant,
}

impl Bucket {
    /// Add tokens for the time elapsed since the last replenishment.
    ///
    /// The timestamp only moves when the pool reaches at least one token,
    /// so sub-token fractions keep accruing across polls.
    fn replenish(&mut self, now: Instant, rate: f64) {
        let elapsed = now.saturating_duration_since(self.updated_at).as_secs_f64();
        let new_tokens = elapsed * rate;
        if self.tokens + new_tokens >= 1.0 {
            self.tokens = (self.tokens + new_tokens).min(rate);
            self.updated_at = now;
        }
    }
}

/// Token bucket rate limiter, shared by every request in a run
#[derive(Clone)]
pub struct RateLimiter {
    bucket: Arc<Mutex<Bucket>>,
    rate: f64,
    backoff: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config, starting full
    pub fn new(config: &RateLimiterConfig) -> Self {
        let rate = f64::from(config.requests_per_second.max(1));
        Self {
            bucket: Arc::new(Mutex::new(Bucket {
                tokens: rate,
                updated_at: Instant::now(),
            })),
            rate,
            backoff: config.backoff,
        }
    }

    /// Wait until a token is available, then take it
    pub async fn acquire(&self) {
        loop {
            if self.try_acquire() {
                return;
            }
            trace!("Rate limiter empty, backing off {:?}", self.backoff);
            tokio::time::sleep(self.backoff).await;
        }
    }

    /// Take a token if one is available right now
    pub fn try_acquire(&self) -> bool {
        let mut bucket = self.lock();
        bucket.replenish(Instant::now(), self.rate);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Current token count, without replenishing
    pub fn available_tokens(&self) -> f64 {
        self.lock().tokens
    }

    /// Bucket ceiling (equal to the per-second rate)
    pub fn ceiling(&self) -> f64 {
        self.rate
    }

    fn lock(&self) -> MutexGuard<'_, Bucket> {
        // The critical section never panics midway, so a poisoned bucket is still consistent
        self.bucket.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(&RateLimiterConfig::default())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("rate", &self.rate)
            .field("tokens", &self.available_tokens())
            .finish()
    }
}
