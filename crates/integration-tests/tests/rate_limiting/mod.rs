use indoc::indoc;
use integration_tests::TestServer;
use serde_json::json;
use tokio_tungstenite::tungstenite;

#[tokio::test]
async fn burst_then_rejected() {
    // A slow refill keeps the outcome independent of how fast the requests are sent.
    let config = indoc! {r#"
        [server.rate_limits.per_ip]
        capacity = 100
        refill_rate = 0.01
    "#};

    let server = TestServer::start(config).await;

    for i in 1..=100 {
        let response = server.client.get("/temperature").await;
        assert_eq!(response.status(), 200, "request {i}");
    }

    let response = server.client.get("/temperature").await;

    assert_eq!(response.status(), 429);
    assert_eq!(response.headers()["content-type"], "application/json");
    assert!(!response.headers().contains_key("retry-after"));

    let mut body: serde_json::Value = response.json().await.unwrap();

    let timestamp = body["timestamp"].take();
    let timestamp = timestamp.as_str().unwrap();
    assert!(timestamp.parse::<jiff::Timestamp>().is_ok(), "{timestamp}");

    insta::assert_json_snapshot!(body, @r#"
    {
      "error": "Too Many Requests",
      "timestamp": null
    }
    "#);
}

#[tokio::test]
async fn tokens_refill_over_time() {
    let config = indoc! {r#"
        [server.rate_limits.per_ip]
        capacity = 2
        refill_rate = 5.0
    "#};

    let server = TestServer::start(config).await;

    assert_eq!(server.client.get("/temperature").await.status(), 200);
    assert_eq!(server.client.get("/temperature").await.status(), 200);
    assert_eq!(server.client.get("/temperature").await.status(), 429);

    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    assert_eq!(server.client.get("/temperature").await.status(), 200);
}

#[tokio::test]
async fn per_ip_buckets_behind_trusted_proxy() {
    let config = indoc! {r#"
        [server.rate_limits]
        trust_forwarded_headers = true

        [server.rate_limits.per_ip]
        capacity = 2
        refill_rate = 0.01
    "#};

    let server = TestServer::start(config).await;

    let mut results = Vec::new();

    for (ip, requests) in [("192.168.1.1", 3), ("192.168.1.2", 2)] {
        for i in 1..=requests {
            let response = server
                .client
                .request(reqwest::Method::GET, "/temperature")
                .header("X-Forwarded-For", ip)
                .send()
                .await
                .unwrap();

            results.push(json!({
                "ip": ip,
                "request": i,
                "status": response.status().as_u16(),
            }));
        }
    }

    insta::assert_json_snapshot!(results, @r#"
    [
      {
        "ip": "192.168.1.1",
        "request": 1,
        "status": 200
      },
      {
        "ip": "192.168.1.1",
        "request": 2,
        "status": 200
      },
      {
        "ip": "192.168.1.1",
        "request": 3,
        "status": 429
      },
      {
        "ip": "192.168.1.2",
        "request": 1,
        "status": 200
      },
      {
        "ip": "192.168.1.2",
        "request": 2,
        "status": 200
      }
    ]
    "#);
}

#[tokio::test]
async fn forwarded_headers_ignored_by_default() {
    let config = indoc! {r#"
        [server.rate_limits.per_ip]
        capacity = 1
        refill_rate = 0.01
    "#};

    let server = TestServer::start(config).await;

    let request = |ip: &'static str| {
        server
            .client
            .request(reqwest::Method::GET, "/temperature")
            .header("X-Forwarded-For", ip)
            .send()
    };

    assert_eq!(request("192.168.1.1").await.unwrap().status(), 200);
    assert_eq!(request("192.168.1.2").await.unwrap().status(), 429);
}

#[tokio::test]
async fn rate_limiting_disabled() {
    let config = indoc! {r#"
        [server.rate_limits]
        enabled = false

        [server.rate_limits.per_ip]
        capacity = 1
        refill_rate = 0.0
    "#};

    let server = TestServer::start(config).await;

    for i in 1..=20 {
        assert_eq!(server.client.get("/temperature").await.status(), 200, "request {i}");
    }
}

#[tokio::test]
async fn stream_upgrade_is_rate_limited() {
    let config = indoc! {r#"
        [server.rate_limits.per_ip]
        capacity = 1
        refill_rate = 0.0
    "#};

    let server = TestServer::start(config).await;

    assert_eq!(server.client.get("/temperature").await.status(), 200);

    match server.ws_connect("/ws").await {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 429),
        Err(e) => panic!("expected a 429 response, got {e}"),
        Ok(_) => panic!("expected the upgrade to be rejected"),
    }
}

#[tokio::test]
async fn open_stream_is_not_charged_per_message() {
    let config = indoc! {r#"
        [server.rate_limits.per_ip]
        capacity = 1
        refill_rate = 0.0

        [sensor.stream]
        default_period = "100ms"
        min_period = "100ms"
    "#};

    let server = TestServer::start(config).await;
    let mut stream = server.ws_connect("/ws").await.unwrap();

    for _ in 0..3 {
        let message = crate::stream::next_reading(&mut stream).await;
        assert!(message.is_object());
    }
}
