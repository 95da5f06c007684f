use indoc::indoc;
use integration_tests::TestServer;
use reqwest::Method;

#[tokio::test]
async fn frontend_origin_allowed_by_default() {
    let server = TestServer::start("").await;

    let response = server
        .client
        .request(Method::GET, "/temperature")
        .header("Origin", "http://localhost:5173")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "http://localhost:5173");
    assert_eq!(headers["access-control-allow-credentials"], "true");
}

#[tokio::test]
async fn preflight() {
    let server = TestServer::start("").await;

    let response = server
        .client
        .request(Method::OPTIONS, "/temperature")
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "GET")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "http://localhost:5173");
    assert_eq!(headers["access-control-allow-methods"], "GET,OPTIONS");
}

#[tokio::test]
async fn other_origins_get_no_cors_headers() {
    let server = TestServer::start("").await;

    let response = server
        .client
        .request(Method::GET, "/temperature")
        .header("Origin", "https://example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(!response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn allow_origins_any() {
    let config = indoc! {r#"
        [server.cors]
        allow_origins = "*"
        allow_credentials = false
        max_age = "1h"
    "#};

    let server = TestServer::start(config).await;

    let response = server
        .client
        .request(Method::OPTIONS, "/temperature")
        .header("Origin", "https://example.com")
        .header("Access-Control-Request-Method", "GET")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-max-age"], "3600");
    assert!(!headers.contains_key("access-control-allow-credentials"));
}
