use std::ops::Range;

use config::SensorConfig;
use jiff::Timestamp;
use rand::Rng;
use serde::Serialize;

/// A single temperature sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    /// The measured temperature.
    pub temperature: f64,
    /// Unit label, e.g. `°C`.
    pub unit: String,
    /// When the sample was taken, rendered as RFC 3339 in UTC.
    pub timestamp: Timestamp,
}

/// Source of readings for both the polling and the streaming endpoint.
pub trait ReadingGenerator: Send + Sync + 'static {
    /// Produce the next reading.
    fn next_reading(&self) -> Reading;
}

/// Synthetic thermometer returning uniformly distributed temperatures.
#[derive(Debug, Clone)]
pub struct Thermometer {
    range: Range<f64>,
    unit: String,
}

impl Thermometer {
    /// Create a thermometer sampling from `range`.
    pub fn new(range: Range<f64>, unit: impl Into<String>) -> Self {
        Self {
            range,
            unit: unit.into(),
        }
    }

    /// Create a thermometer from the `[sensor]` configuration.
    pub fn from_config(config: &SensorConfig) -> Self {
        Self::new(config.min_temperature..config.max_temperature, config.unit.clone())
    }
}

impl ReadingGenerator for Thermometer {
    fn next_reading(&self) -> Reading {
        let temperature = if self.range.is_empty() {
            self.range.start
        } else {
            rand::thread_rng().gen_range(self.range.clone())
        };

        Reading {
            temperature,
            unit: self.unit.clone(),
            timestamp: Timestamp::now(),
        }
    }
}
