use std::{cmp::Ordering, path::Path};

use anyhow::{Context, bail};
use indoc::indoc;

use crate::Config;

pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let path = path.as_ref();

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

    let config: Config =
        toml::from_str(&content).with_context(|| format!("Failed to parse configuration file {}", path.display()))?;

    validate(&config)?;

    log::debug!("Loaded configuration from {}", path.display());

    Ok(config)
}

pub(crate) fn validate(config: &Config) -> anyhow::Result<()> {
    validate_rate_limits(config)?;
    validate_stream(config)?;
    validate_sensor(config)?;
    validate_cors(config)?;

    Ok(())
}

fn validate_rate_limits(config: &Config) -> anyhow::Result<()> {
    let rate_limits = &config.server.rate_limits;

    if !rate_limits.enabled {
        return Ok(());
    }

    if let Err(reason) = rate_limits.per_ip.validate() {
        bail!("Invalid [server.rate_limits.per_ip] quota: {reason}");
    }

    let eviction = &rate_limits.eviction;

    if eviction.sweep_interval.is_zero() {
        bail!("server.rate_limits.eviction.sweep_interval must be greater than zero");
    }

    if eviction.idle_timeout.is_zero() {
        bail!("server.rate_limits.eviction.idle_timeout must be greater than zero");
    }

    Ok(())
}

fn validate_stream(config: &Config) -> anyhow::Result<()> {
    let stream = &config.sensor.stream;

    if stream.min_period.is_zero() {
        bail!("sensor.stream.min_period must be greater than zero");
    }

    if stream.min_period > stream.max_period {
        bail!(
            "sensor.stream.min_period ({:?}) is larger than sensor.stream.max_period ({:?})",
            stream.min_period,
            stream.max_period
        );
    }

    if stream.default_period < stream.min_period || stream.default_period > stream.max_period {
        bail!(
            "sensor.stream.default_period ({:?}) must be within [{:?}, {:?}]",
            stream.default_period,
            stream.min_period,
            stream.max_period
        );
    }

    if stream.path == config.sensor.path {
        bail!("sensor.path and sensor.stream.path must differ, both are {}", stream.path);
    }

    Ok(())
}

fn validate_sensor(config: &Config) -> anyhow::Result<()> {
    let sensor = &config.sensor;

    if sensor.min_temperature.partial_cmp(&sensor.max_temperature) != Some(Ordering::Less) {
        bail!(
            "sensor.min_temperature ({}) must be lower than sensor.max_temperature ({})",
            sensor.min_temperature,
            sensor.max_temperature
        );
    }

    Ok(())
}

fn validate_cors(config: &Config) -> anyhow::Result<()> {
    let cors = &config.server.cors;
    let any_origin = cors.allow_origins.as_ref().is_some_and(|origins| origins.is_any());

    if cors.allow_credentials && any_origin {
        bail!(indoc! {r#"
            CORS cannot allow credentials together with the "*" origin wildcard.

            Either list the frontend origins explicitly:

              [server.cors]
              allow_origins = ["http://localhost:5173"]

            or disable credentials:

              [server.cors]
              allow_origins = "*"
              allow_credentials = false
        "#});
    }

    Ok(())
}
