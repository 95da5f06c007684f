//! Per-client bucket registry with idle eviction.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use config::{BucketQuota, EvictionConfig};
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::bucket::TokenBucket;

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitResult {
    /// Whether the request is allowed.
    pub allowed: bool,
    /// Time to wait before retrying if not allowed. `None` when allowed, or when
    /// the request can never be admitted.
    pub retry_after: Option<Duration>,
}

struct ClientEntry {
    bucket: TokenBucket,
    last_seen: Instant,
}

/// Concurrency-safe map from client identifier to its token bucket.
///
/// Every access, including the eviction sweep, goes through a single mutex. None of
/// the critical sections await, so a plain std mutex is enough.
#[derive(Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<String, ClientEntry>>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` on the bucket of `id`, creating a fully charged one from `quota` first if the
    /// client is unknown. Refreshes the client's last-seen time.
    ///
    /// The lock is held while `f` runs, so concurrent callers for the same client observe
    /// each other's updates in order. Keep `f` short.
    pub fn with_bucket<R>(&self, id: &str, quota: BucketQuota, f: impl FnOnce(&mut TokenBucket) -> R) -> R {
        self.with_bucket_at(id, quota, Instant::now(), f)
    }

    /// Same as [`ClientRegistry::with_bucket`], as of `now`.
    pub fn with_bucket_at<R>(
        &self,
        id: &str,
        quota: BucketQuota,
        now: Instant,
        f: impl FnOnce(&mut TokenBucket) -> R,
    ) -> R {
        let mut clients = self.lock();

        if let Some(entry) = clients.get_mut(id) {
            entry.last_seen = now;
            return f(&mut entry.bucket);
        }

        log::debug!("Creating token bucket for client '{id}': {quota:?}");

        let entry = clients.entry(id.to_string()).or_insert(ClientEntry {
            bucket: TokenBucket::with_instant(quota, now),
            last_seen: now,
        });

        f(&mut entry.bucket)
    }

    /// Take `n` tokens from the bucket of `id`.
    pub fn check_and_consume(&self, id: &str, quota: BucketQuota, n: u32) -> RateLimitResult {
        self.check_and_consume_at(id, quota, n, Instant::now())
    }

    /// Take `n` tokens from the bucket of `id`, as of `now`.
    pub fn check_and_consume_at(&self, id: &str, quota: BucketQuota, n: u32, now: Instant) -> RateLimitResult {
        self.with_bucket_at(id, quota, now, |bucket| {
            if bucket.try_consume_at(n, now) {
                RateLimitResult {
                    allowed: true,
                    retry_after: None,
                }
            } else {
                RateLimitResult {
                    allowed: false,
                    retry_after: bucket.retry_after(n),
                }
            }
        })
    }

    /// Drop every client not seen for longer than `idle_timeout`. Returns how many were dropped.
    pub fn sweep(&self, idle_timeout: Duration) -> usize {
        self.sweep_at(Instant::now(), idle_timeout)
    }

    /// Same as [`ClientRegistry::sweep`], as of `now`.
    pub fn sweep_at(&self, now: Instant, idle_timeout: Duration) -> usize {
        let mut clients = self.lock();
        let before = clients.len();

        clients.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= idle_timeout);

        before - clients.len()
    }

    /// Spawn the periodic eviction task. It runs until `shutdown` is cancelled.
    ///
    /// The first sweep happens one `sweep_interval` after spawning.
    pub fn spawn_sweeper(self: Arc<Self>, eviction: EvictionConfig, shutdown: CancellationToken) -> JoinHandle<()> {
        let EvictionConfig {
            idle_timeout,
            sweep_interval,
        } = eviction;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + sweep_interval, sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = self.sweep(idle_timeout);

                        if evicted > 0 {
                            log::debug!("Evicted {evicted} idle rate limit clients, {} remaining", self.len());
                        }
                    }
                }
            }

            log::debug!("Rate limit eviction task stopped");
        })
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no client is tracked.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether `id` is tracked.
    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    // Buckets are updated in a single assignment, so state behind a poisoned lock is
    // still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, ClientEntry>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
