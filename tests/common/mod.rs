//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use wsgate::config::{ConfigOverrides, MappingConfig, ServerConfig};
use wsgate::lifecycle::{build_container, Shutdown};
use wsgate::{HttpServer, WebSocketContainer};

pub const ADMIN_KEY: &str = "test-admin-key";

pub type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub admin_addr: SocketAddr,
    pub container: Arc<WebSocketContainer>,
    pub shutdown: Shutdown,
}

impl TestServer {
    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn admin_url(&self, path: &str) -> String {
        format!("http://{}{}", self.admin_addr, path)
    }
}

pub fn mapping(spec: &str, endpoint: &str) -> MappingConfig {
    MappingConfig {
        path_spec: spec.to_string(),
        endpoint: endpoint.to_string(),
        overrides: ConfigOverrides::default(),
    }
}

fn test_config(mappings: Vec<MappingConfig>) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.to_string();
    config.admin.bind_address = "127.0.0.1:0".to_string();
    config.mappings = mappings;
    config
}

/// Start a server on ephemeral ports with the admin API enabled.
pub async fn start_server(mappings: Vec<MappingConfig>) -> TestServer {
    let config = test_config(mappings);
    wsgate::config::validate_config(&config).unwrap();

    let container = Arc::new(build_container(&config).unwrap());
    serve(config, container).await
}

/// Serve an already built container, for endpoints not nameable in config.
pub async fn start_with_container(container: WebSocketContainer) -> TestServer {
    serve(test_config(Vec::new()), Arc::new(container)).await
}

async fn serve(config: ServerConfig, container: Arc<WebSocketContainer>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let admin_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let admin_addr = admin_listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, Arc::clone(&container));
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server
            .run(listener, Some(admin_listener), &server_shutdown)
            .await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        admin_addr,
        container,
        shutdown,
    }
}

/// Next data or close message, skipping pings.
pub async fn next_message(client: &mut Client) -> Option<Message> {
    let deadline = Duration::from_secs(5);
    loop {
        let message = tokio::time::timeout(deadline, client.next())
            .await
            .expect("timed out waiting for a message")?
            .ok()?;
        match message {
            Message::Ping(_) | Message::Pong(_) => continue,
            other => return Some(other),
        }
    }
}

/// Poll `condition` until it holds or a second has passed.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
