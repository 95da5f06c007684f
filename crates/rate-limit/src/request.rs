//! Request information for rate limiting.

use std::net::IpAddr;

/// Identifier used for requests whose origin address cannot be resolved.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Information about a request that needs to be rate limited.
#[derive(Debug, Clone, Default)]
pub struct RateLimitRequest {
    /// IP address of the request origin.
    pub ip: Option<IpAddr>,
}

impl RateLimitRequest {
    /// Create a new builder for a rate limit request.
    pub fn builder() -> RateLimitRequestBuilder {
        RateLimitRequestBuilder::default()
    }

    /// The key of this request's bucket in the client registry.
    ///
    /// All requests without a resolvable address share one bucket.
    pub fn client_id(&self) -> String {
        match self.ip {
            Some(ip) => ip.to_string(),
            None => UNKNOWN_CLIENT.to_string(),
        }
    }
}

/// Builder for creating rate limit requests.
#[derive(Debug, Default)]
pub struct RateLimitRequestBuilder {
    ip: Option<IpAddr>,
}

impl RateLimitRequestBuilder {
    /// Set the IP address.
    pub fn ip(mut self, ip: IpAddr) -> Self {
        self.ip = Some(ip);
        self
    }

    /// Set the IP address from a string.
    pub fn ip_str(mut self, ip: &str) -> Result<Self, std::net::AddrParseError> {
        self.ip = Some(ip.parse()?);
        Ok(self)
    }

    /// Build the rate limit request.
    pub fn build(self) -> RateLimitRequest {
        RateLimitRequest { ip: self.ip }
    }
}
