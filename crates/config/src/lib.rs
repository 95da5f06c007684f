//! thermod configuration structures to map the thermod.toml configuration.

#![deny(missing_docs)]

mod cors;
mod health;
mod loader;
mod rate_limit;
mod sensor;

use std::{net::SocketAddr, path::Path};

pub use cors::*;
pub use health::HealthConfig;
pub use rate_limit::*;
pub use sensor::{SensorConfig, StreamConfig};
use serde::Deserialize;

/// Main configuration structure for the thermod application.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Temperature endpoints configuration settings.
    #[serde(default)]
    pub sensor: SensorConfig,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        loader::load(path)
    }

    /// Validates the cross-field constraints serde cannot express.
    pub fn validate(&self) -> anyhow::Result<()> {
        loader::validate(self)
    }
}

/// HTTP server configuration settings.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// The socket address the server should listen on.
    pub listen_address: Option<SocketAddr>,
    /// Health endpoint configuration.
    #[serde(default)]
    pub health: HealthConfig,
    /// CORS configuration
    #[serde(default)]
    pub cors: CorsConfig,
    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limits: RateLimitConfig,
}
