//! WebSocket streaming of readings.
//!
//! A session is created once the upgrade handshake succeeded and is consumed by
//! [`StreamSession::run`], which returns once the connection is closed. A failed
//! handshake never creates a session.

use std::{fmt::Display, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{
        ConnectInfo, Query, State,
        ws::{Message, WebSocketUpgrade},
    },
    response::Response,
};
use config::StreamConfig;
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{ReadingGenerator, SensorState};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Pushing a reading to the client failed.
    WriteFailed,
    /// The client closed the connection, or it broke while reading from it.
    ClientClosed,
    /// The server is shutting down.
    Shutdown,
}

/// Periodic push of readings to one connected client.
pub struct StreamSession {
    generator: Arc<dyn ReadingGenerator>,
    period: Duration,
    client: String,
    shutdown: CancellationToken,
}

impl StreamSession {
    /// Create a session pushing a reading every `period`. `client` is only used in logs.
    pub fn new(
        generator: Arc<dyn ReadingGenerator>,
        period: Duration,
        client: impl Into<String>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            generator,
            period,
            client: client.into(),
            shutdown,
        }
    }

    /// The push interval.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Push a reading every period until the connection fails, the client goes away, or the
    /// shutdown token fires. The first reading is sent one period after the call.
    ///
    /// A failed write ends the session immediately; nothing is retried or buffered. On shutdown
    /// a close frame is sent on a best-effort basis. The ticker and both halves of the
    /// connection are dropped on every exit path.
    pub async fn run<Tx, Rx, E>(self, mut outgoing: Tx, mut incoming: Rx) -> CloseReason
    where
        Tx: Sink<Message> + Unpin,
        Tx::Error: Display,
        Rx: Stream<Item = Result<Message, E>> + Unpin,
        E: Display,
    {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    if let Err(e) = outgoing.send(Message::Close(None)).await {
                        log::debug!("Could not send close frame to {}: {e}", self.client);
                    }

                    return CloseReason::Shutdown;
                }
                message = incoming.next() => match message {
                    None | Some(Ok(Message::Close(_))) => return CloseReason::ClientClosed,
                    Some(Err(e)) => {
                        log::debug!("Reading from {} failed: {e}", self.client);
                        return CloseReason::ClientClosed;
                    }
                    // Pings are answered by the protocol layer, everything else is ignored.
                    Some(Ok(_)) => (),
                },
                _ = ticker.tick() => {
                    let reading = self.generator.next_reading();

                    let payload = match serde_json::to_string(&reading) {
                        Ok(payload) => payload,
                        Err(e) => {
                            log::error!("Failed to serialize reading: {e}");
                            continue;
                        }
                    };

                    if let Err(e) = outgoing.send(Message::Text(payload.into())).await {
                        log::debug!("Writing to {} failed: {e}", self.client);
                        return CloseReason::WriteFailed;
                    }
                }
            }
        }
    }
}

/// Query parameters of the upgrade request.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamParams {
    /// Requested push interval in milliseconds. Kept as text so that an invalid
    /// value falls back to the default instead of rejecting the request.
    period: Option<String>,
}

/// The push interval for a requested `period` in milliseconds.
///
/// Anything that is not an integer within `[min_period, max_period]` yields the
/// default period.
pub fn resolve_period(requested: Option<&str>, config: &StreamConfig) -> Duration {
    let Some(requested) = requested else {
        return config.default_period;
    };

    let Ok(millis) = requested.parse::<u64>() else {
        log::debug!("Ignoring non-numeric stream period '{requested}'");
        return config.default_period;
    };

    let period = Duration::from_millis(millis);

    if period < config.min_period || period > config.max_period {
        log::debug!(
            "Ignoring stream period {period:?} outside of [{:?}, {:?}]",
            config.min_period,
            config.max_period
        );

        return config.default_period;
    }

    period
}

/// Upgrade the connection and stream readings over it.
pub(crate) async fn upgrade(
    State(state): State<Arc<SensorState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(params): Query<StreamParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let period = resolve_period(params.period.as_deref(), &state.stream);
    let session = StreamSession::new(
        state.generator.clone(),
        period,
        peer.to_string(),
        state.shutdown.child_token(),
    );

    ws.on_failed_upgrade(move |e| log::error!("WebSocket upgrade for {peer} failed: {e}"))
        .on_upgrade(move |socket| async move {
            log::info!("Client {peer} streaming every {:?}", session.period());

            let (outgoing, incoming) = socket.split();
            let reason = session.run(outgoing, incoming).await;

            log::info!("Stream to {peer} closed: {reason:?}");
        })
}
