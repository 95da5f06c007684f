use indoc::indoc;
use integration_tests::TestServer;

#[tokio::test]
async fn health_endpoint_enabled_by_default() {
    let server = TestServer::start("").await;

    let response = server.client.get("/health").await;
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    insta::assert_snapshot!(body, @r#"{"status":"healthy"}"#);
}

#[tokio::test]
async fn health_endpoint_disabled() {
    let config = indoc! {r#"
        [server.health]
        enabled = false
    "#};

    let server = TestServer::start(config).await;

    let response = server.client.get("/health").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn health_endpoint_custom_path() {
    let config = indoc! {r#"
        [server.health]
        path = "/status"
    "#};

    let server = TestServer::start(config).await;

    let response = server.client.get("/status").await;
    assert_eq!(response.status(), 200);

    let response = server.client.get("/health").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn health_endpoint_is_not_rate_limited() {
    let config = indoc! {r#"
        [server.rate_limits.per_ip]
        capacity = 1
        refill_rate = 0.0
    "#};

    let server = TestServer::start(config).await;

    assert_eq!(server.client.get("/temperature").await.status(), 200);
    assert_eq!(server.client.get("/temperature").await.status(), 429);

    for _ in 0..5 {
        assert_eq!(server.client.get("/health").await.status(), 200);
    }
}
