//! Error types for rate limiting.

use std::time::Duration;

/// Errors that can occur during rate limiting.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// The client's bucket has no token left.
    #[error("Rate limit exceeded for client {client}")]
    ClientLimitExceeded {
        /// Identifier of the client, usually its IP address.
        client: String,
        /// Time to wait before retrying, if the request can ever be admitted.
        retry_after: Option<Duration>,
    },

    /// The configured quota cannot be used to build token buckets.
    #[error("Invalid rate limit quota: {0}")]
    InvalidQuota(String),
}

impl RateLimitError {
    /// Get the retry-after duration if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::ClientLimitExceeded { retry_after, .. } => *retry_after,
            Self::InvalidQuota(_) => None,
        }
    }
}
