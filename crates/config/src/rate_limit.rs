//! Rate limiting configuration structures.

use duration_str::deserialize_duration;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rate limiting configuration for the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled.
    pub enabled: bool,
    /// Prefer `X-Forwarded-For` and `X-Real-IP` over the peer address when identifying clients.
    /// Only enable this behind a proxy that overwrites these headers.
    pub trust_forwarded_headers: bool,
    /// Token bucket parameters for every client IP address.
    pub per_ip: BucketQuota,
    /// Idle client eviction settings.
    pub eviction: EvictionConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trust_forwarded_headers: false,
            per_ip: BucketQuota::default(),
            eviction: EvictionConfig::default(),
        }
    }
}

/// Parameters of a single token bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BucketQuota {
    /// Maximum burst size, and the number of tokens a fresh bucket starts with.
    pub capacity: u32,
    /// Tokens added back per second.
    pub refill_rate: f64,
}

impl BucketQuota {
    /// Create a new quota.
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        Self { capacity, refill_rate }
    }

    /// Checks the quota can admit at least one request and refills at a real rate.
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("capacity must be at least 1".to_string());
        }

        if !self.refill_rate.is_finite() || self.refill_rate < 0.0 {
            return Err(format!(
                "refill_rate must be a finite, non-negative number, got {}",
                self.refill_rate
            ));
        }

        Ok(())
    }
}

impl Default for BucketQuota {
    fn default() -> Self {
        Self {
            capacity: 100,
            refill_rate: 100.0,
        }
    }
}

/// Settings of the background task dropping idle clients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvictionConfig {
    /// A client untouched for longer than this is removed on the next sweep.
    #[serde(deserialize_with = "deserialize_duration")]
    pub idle_timeout: Duration,
    /// How often the sweep runs.
    #[serde(deserialize_with = "deserialize_duration")]
    pub sweep_interval: Duration,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(3 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}
