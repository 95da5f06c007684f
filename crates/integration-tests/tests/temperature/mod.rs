use indoc::indoc;
use integration_tests::TestServer;

#[tokio::test]
async fn reading_shape() {
    let server = TestServer::start("").await;

    let response = server.client.get("/temperature").await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "application/json");

    let body: serde_json::Value = response.json().await.unwrap();

    let mut keys: Vec<_> = body.as_object().unwrap().keys().cloned().collect();
    keys.sort();
    assert_eq!(keys, ["temperature", "timestamp", "unit"]);

    let temperature = body["temperature"].as_f64().unwrap();
    assert!((15.0..50.0).contains(&temperature), "{temperature}");
    assert_eq!(body["unit"], "°C");

    let timestamp = body["timestamp"].as_str().unwrap();
    assert!(timestamp.ends_with('Z'), "{timestamp}");
    assert!(timestamp.parse::<jiff::Timestamp>().is_ok(), "{timestamp}");
}

#[tokio::test]
async fn configured_sensor() {
    let config = indoc! {r#"
        [sensor]
        path = "/api/temperature"
        unit = "K"
        min_temperature = 290.0
        max_temperature = 291.0
    "#};

    let server = TestServer::start(config).await;

    let response = server.client.get("/temperature").await;
    assert_eq!(response.status(), 404);

    let response = server.client.get("/api/temperature").await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();

    let temperature = body["temperature"].as_f64().unwrap();
    assert!((290.0..291.0).contains(&temperature), "{temperature}");
    assert_eq!(body["unit"], "K");
}

#[tokio::test]
async fn only_get_is_routed() {
    let server = TestServer::start("").await;

    let response = server
        .client
        .request(reqwest::Method::POST, "/temperature")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 405);
}
