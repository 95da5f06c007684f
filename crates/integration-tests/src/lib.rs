use std::net::SocketAddr;
use std::time::Duration;

use config::Config;
use server::ServeConfig;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite};
use tokio_util::sync::CancellationToken;

/// A WebSocket connection to the test server.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Test client for making HTTP requests to the test server
pub struct TestClient {
    base_url: String,
    client: reqwest::Client,
}

impl TestClient {
    /// Create a new test client for the given base URL
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Send a GET request to the given path
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap()
    }

    /// Create a request builder for custom requests
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }
}

/// Test server that manages the lifecycle of a server instance
pub struct TestServer {
    pub client: TestClient,
    pub address: SocketAddr,
    shutdown: CancellationToken,
    handle: Option<tokio::task::JoinHandle<anyhow::Result<()>>>,
}

impl TestServer {
    /// Start a new test server with the given TOML configuration
    pub async fn start(config_toml: &str) -> Self {
        let config: Config = toml::from_str(config_toml).unwrap();
        config.validate().unwrap();

        // Find an available port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let shutdown = CancellationToken::new();

        let serve_config = ServeConfig {
            listen_address: address,
            config,
            shutdown: shutdown.clone(),
        };

        let handle = tokio::spawn(server::serve(serve_config));

        // Wait until the server accepts connections
        let mut retries = 50;

        while TcpStream::connect(address).await.is_err() {
            assert!(!handle.is_finished(), "server exited during startup");

            retries -= 1;
            assert!(retries > 0, "server did not start listening on {address}");

            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        TestServer {
            client: TestClient::new(format!("http://{address}")),
            address,
            shutdown,
            handle: Some(handle),
        }
    }

    /// Open a WebSocket connection to the given path, query string included.
    pub async fn ws_connect(&self, path: &str) -> Result<WsStream, tungstenite::Error> {
        let (stream, _) = tokio_tungstenite::connect_async(format!("ws://{}{}", self.address, path)).await?;

        Ok(stream)
    }

    /// Stop the server and wait until it stopped accepting requests.
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        self.shutdown.cancel();

        match self.handle.take() {
            Some(handle) => tokio::time::timeout(Duration::from_secs(5), handle).await??,
            None => Ok(()),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
