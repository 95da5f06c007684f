//! Rate limit manager implementation.

use std::sync::Arc;

use config::RateLimitConfig;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::RateLimitError;
use crate::registry::ClientRegistry;
use crate::request::RateLimitRequest;

/// Per-client admission control: owns the client registry and its eviction task.
pub struct RateLimitManager {
    /// Rate limit configuration.
    config: Arc<RateLimitConfig>,
    /// Token buckets by client.
    registry: Arc<ClientRegistry>,
    /// Stops the eviction task when the manager goes away.
    _sweeper: DropGuard,
}

impl RateLimitManager {
    /// Create a new rate limit manager and start its eviction task.
    ///
    /// The task stops when `shutdown` is cancelled or the manager is dropped, whichever
    /// comes first. Must be called from within a Tokio runtime.
    pub fn new(config: RateLimitConfig, shutdown: &CancellationToken) -> Result<Self, RateLimitError> {
        config.per_ip.validate().map_err(RateLimitError::InvalidQuota)?;

        let registry = Arc::new(ClientRegistry::new());
        let sweeper_token = shutdown.child_token();

        log::debug!(
            "Starting rate limit eviction task: sweep every {:?}, evict after {:?} idle",
            config.eviction.sweep_interval,
            config.eviction.idle_timeout
        );

        registry.clone().spawn_sweeper(config.eviction, sweeper_token.clone());

        Ok(Self {
            config: Arc::new(config),
            registry,
            _sweeper: sweeper_token.drop_guard(),
        })
    }

    /// Check if rate limiting is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Take one token from the bucket of the request's client.
    ///
    /// Allowed or not, the client's bucket and last-seen time are updated.
    pub fn check_request(&self, request: &RateLimitRequest) -> Result<(), RateLimitError> {
        if !self.is_enabled() {
            return Ok(());
        }

        let client = request.client_id();
        let result = self.registry.check_and_consume(&client, self.config.per_ip, 1);

        if result.allowed {
            return Ok(());
        }

        log::debug!(
            "Request blocked for client '{client}' - rate limit exceeded, retry after {:?}",
            result.retry_after
        );

        Err(RateLimitError::ClientLimitExceeded {
            client,
            retry_after: result.retry_after,
        })
    }

    /// The underlying client registry.
    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }
}
