//! Temperature endpoints configuration.

use std::{borrow::Cow, time::Duration};

use duration_str::deserialize_duration;
use serde::Deserialize;

/// Configuration of the polling and streaming temperature endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorConfig {
    /// Path of the single-shot reading endpoint.
    pub path: Cow<'static, str>,
    /// Unit label attached to every reading.
    pub unit: String,
    /// Lower bound of the generated temperatures.
    pub min_temperature: f64,
    /// Upper bound (exclusive) of the generated temperatures.
    pub max_temperature: f64,
    /// WebSocket streaming configuration.
    pub stream: StreamConfig,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            path: Cow::Borrowed("/temperature"),
            unit: "°C".to_string(),
            min_temperature: 15.0,
            max_temperature: 50.0,
            stream: StreamConfig::default(),
        }
    }
}

/// WebSocket streaming configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    /// Path of the WebSocket upgrade endpoint.
    pub path: Cow<'static, str>,
    /// Push interval used when the client asks for none, or for an invalid one.
    #[serde(deserialize_with = "deserialize_duration")]
    pub default_period: Duration,
    /// Smallest push interval a client may ask for.
    #[serde(deserialize_with = "deserialize_duration")]
    pub min_period: Duration,
    /// Largest push interval a client may ask for.
    #[serde(deserialize_with = "deserialize_duration")]
    pub max_period: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            path: Cow::Borrowed("/ws"),
            default_period: Duration::from_millis(1000),
            min_period: Duration::from_millis(1000),
            max_period: Duration::from_millis(60_000),
        }
    }
}
