use std::time::Duration;

use futures::StreamExt;
use indoc::indoc;
use integration_tests::{TestServer, WsStream};
use tokio::time::{Instant, timeout};
use tokio_tungstenite::tungstenite::Message;

/// Waits for the next text frame and parses it.
pub(crate) async fn next_reading(stream: &mut WsStream) -> serde_json::Value {
    let message = timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("no reading within 5s")
        .expect("stream ended")
        .unwrap();

    let Message::Text(text) = message else {
        panic!("expected a text frame, got {message:?}");
    };

    serde_json::from_str(text.as_str()).unwrap()
}

#[tokio::test]
async fn streams_readings() {
    let server = TestServer::start("").await;
    let mut stream = server.ws_connect("/ws?period=1000").await.unwrap();

    for _ in 0..2 {
        let reading = next_reading(&mut stream).await;

        let temperature = reading["temperature"].as_f64().unwrap();
        assert!((15.0..50.0).contains(&temperature), "{temperature}");
        assert_eq!(reading["unit"], "°C");

        let timestamp = reading["timestamp"].as_str().unwrap();
        assert!(timestamp.parse::<jiff::Timestamp>().is_ok(), "{timestamp}");
    }
}

#[tokio::test]
async fn first_reading_after_one_period() {
    let config = indoc! {r#"
        [sensor.stream]
        min_period = "100ms"
    "#};

    let server = TestServer::start(config).await;
    let mut stream = server.ws_connect("/ws?period=300").await.unwrap();

    let start = Instant::now();
    next_reading(&mut stream).await;

    assert!(start.elapsed() >= Duration::from_millis(250), "{:?}", start.elapsed());
}

#[tokio::test]
async fn out_of_range_period_falls_back_to_default() {
    let config = indoc! {r#"
        [sensor.stream]
        default_period = "100ms"
        min_period = "50ms"
        max_period = "10s"
    "#};

    let server = TestServer::start(config).await;

    // With the requested periods, no reading would arrive within the 5s of `next_reading`.
    for query in ["?period=20000", "?period=10", "?period=abc", ""] {
        let mut stream = server.ws_connect(&format!("/ws{query}")).await.unwrap();

        let start = Instant::now();

        for _ in 0..3 {
            next_reading(&mut stream).await;
        }

        assert!(start.elapsed() < Duration::from_secs(3), "{query}: {:?}", start.elapsed());
    }
}

#[tokio::test]
async fn custom_stream_path() {
    let config = indoc! {r#"
        [sensor.stream]
        path = "/stream"
    "#};

    let server = TestServer::start(config).await;

    assert!(server.ws_connect("/ws").await.is_err());
    assert!(server.ws_connect("/stream").await.is_ok());
}

#[tokio::test]
async fn client_close_is_acknowledged() {
    let server = TestServer::start("").await;
    let mut stream = server.ws_connect("/ws").await.unwrap();

    stream.close(None).await.unwrap();

    // The server answers the close handshake and the connection ends.
    let rest: Vec<_> = timeout(Duration::from_secs(5), stream.collect::<Vec<_>>())
        .await
        .unwrap();

    assert!(
        rest.iter().all(|message| !matches!(message, Ok(Message::Text(_)))),
        "{rest:?}"
    );
}

#[tokio::test]
async fn shutdown_closes_open_streams() {
    let server = TestServer::start("").await;
    let mut stream = server.ws_connect("/ws").await.unwrap();

    server.shutdown().await.unwrap();

    let message = timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("no close frame within 5s")
        .expect("stream ended without a close frame")
        .unwrap();

    assert!(matches!(message, Message::Close(_)), "{message:?}");
}
