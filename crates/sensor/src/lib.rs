//! Synthetic temperature endpoints.
//!
//! Provides a polling endpoint returning a single reading and a WebSocket endpoint
//! pushing a reading at a client-chosen interval.

#![deny(missing_docs)]

mod reading;
pub mod stream;

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use config::{SensorConfig, StreamConfig};
use tokio_util::sync::CancellationToken;

pub use reading::{Reading, ReadingGenerator, Thermometer};
pub use stream::{CloseReason, StreamSession, resolve_period};

pub(crate) struct SensorState {
    generator: Arc<dyn ReadingGenerator>,
    stream: StreamConfig,
    shutdown: CancellationToken,
}

/// Creates an axum router for the temperature endpoints, backed by a [`Thermometer`].
///
/// Streams started from this router end when `shutdown` is cancelled. The router must be
/// served with connection info (`into_make_service_with_connect_info::<SocketAddr>`).
pub fn router(config: SensorConfig, shutdown: CancellationToken) -> Router {
    let generator = Arc::new(Thermometer::from_config(&config));
    router_with_generator(config, generator, shutdown)
}

/// Same as [`router`] with a custom reading source.
pub fn router_with_generator(
    config: SensorConfig,
    generator: Arc<dyn ReadingGenerator>,
    shutdown: CancellationToken,
) -> Router {
    let state = Arc::new(SensorState {
        generator,
        stream: config.stream.clone(),
        shutdown,
    });

    Router::new()
        .route(&config.path, get(temperature))
        .route(&config.stream.path, get(stream::upgrade))
        .with_state(state)
}

/// Handle single-shot reading requests.
async fn temperature(State(state): State<Arc<SensorState>>) -> Json<Reading> {
    Json(state.generator.next_reading())
}
