//! thermod server library.
//!
//! Provides a reusable server function to serve thermod either for the binary, or for the integration tests.

#![deny(missing_docs)]

mod cors;
mod health;
mod rate_limit;

use std::{net::SocketAddr, sync::Arc};

use ::rate_limit::RateLimitManager;
use anyhow::anyhow;
use axum::{Router, routing::get};
use config::Config;
use rate_limit::RateLimitLayer;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Configuration for serving thermod.
pub struct ServeConfig {
    /// The socket address (IP and port) the server will bind to
    pub listen_address: SocketAddr,
    /// The deserialized thermod TOML configuration.
    pub config: Config,
    /// Cancelling this token stops the server, every open stream and the idle sweeper.
    pub shutdown: CancellationToken,
}

/// Starts and runs the thermod server with the provided configuration.
///
/// Returns once the shutdown token is cancelled and all in-flight HTTP requests are done.
pub async fn serve(
    ServeConfig {
        listen_address,
        config,
        shutdown,
    }: ServeConfig,
) -> anyhow::Result<()> {
    let cors = cors::generate(&config.server.cors);

    let mut sensor_router = sensor::router(config.sensor.clone(), shutdown.child_token());

    // The manager lives as long as the router holding its layer. Dropping both stops the sweeper.
    if config.server.rate_limits.enabled {
        log::debug!(
            "Rate limiting enabled: capacity {}, refill rate {}/s",
            config.server.rate_limits.per_ip.capacity,
            config.server.rate_limits.per_ip.refill_rate
        );

        let trust_forwarded_headers = config.server.rate_limits.trust_forwarded_headers;
        let manager = RateLimitManager::new(config.server.rate_limits.clone(), &shutdown)?;

        sensor_router = sensor_router.layer(RateLimitLayer::new(Arc::new(manager), trust_forwarded_headers));
    } else {
        log::debug!("Rate limiting disabled - no manager created");
    }

    let mut app = Router::new().merge(sensor_router);

    // Health is added after the rate limiting layer so probes are never throttled.
    if config.server.health.enabled {
        app = app.route(&config.server.health.path, get(health::health));
    }

    let app = app.layer(cors);

    let listener = TcpListener::bind(listen_address)
        .await
        .map_err(|e| anyhow!("Failed to bind to {listen_address}: {e}"))?;

    log::info!(
        "Temperature endpoint available at: http://{listen_address}{}",
        config.sensor.path
    );
    log::info!(
        "Temperature stream available at: ws://{listen_address}{}",
        config.sensor.stream.path
    );

    if config.server.health.enabled {
        log::info!(
            "Health check endpoint exposed at http://{listen_address}{}",
            config.server.health.path
        );
    }

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| anyhow!("Failed to start HTTP server: {e}"))?;

    log::info!("Server stopped");

    Ok(())
}
