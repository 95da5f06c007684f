//! Continuous-refill token bucket.

use std::time::Duration;

use config::BucketQuota;
use tokio::time::Instant;

/// Rate limiting state of a single client.
///
/// Tokens are fractional and refilled lazily on every access: a bucket holding
/// `tokens` at `last_refill` holds `min(capacity, tokens + elapsed * refill_rate)`
/// when looked at again. Bursts are bounded by `capacity`, sustained throughput by
/// `refill_rate` per second.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a fully charged bucket.
    pub fn new(quota: BucketQuota) -> Self {
        Self::with_instant(quota, Instant::now())
    }

    /// Create a fully charged bucket whose refill clock starts at `now`.
    pub fn with_instant(quota: BucketQuota, now: Instant) -> Self {
        let capacity = f64::from(quota.capacity);

        Self {
            capacity,
            refill_rate: quota.refill_rate,
            tokens: capacity,
            last_refill: now,
        }
    }

    /// Take `n` tokens if available.
    pub fn try_consume(&mut self, n: u32) -> bool {
        self.try_consume_at(n, Instant::now())
    }

    /// Take `n` tokens if available at `now`.
    ///
    /// The refill is applied even when the request is denied, so a denied call only
    /// moves the refill clock forward.
    pub fn try_consume_at(&mut self, n: u32, now: Instant) -> bool {
        self.refill(now);

        let n = f64::from(n);

        if self.tokens >= n {
            self.tokens -= n;
            true
        } else {
            false
        }
    }

    /// How long until `n` tokens are available, as of the last access.
    ///
    /// Returns `None` if that can never happen.
    pub fn retry_after(&self, n: u32) -> Option<Duration> {
        let n = f64::from(n);

        if n > self.capacity {
            return None;
        }

        let missing = n - self.tokens;

        if missing <= 0.0 {
            return Some(Duration::ZERO);
        }

        if self.refill_rate <= 0.0 {
            return None;
        }

        Some(Duration::from_secs_f64(missing / self.refill_rate))
    }

    /// Tokens available as of the last access.
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Maximum burst size.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Tokens added per second.
    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();

        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }
}
