//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use adaptive_gateway::admin::setup_admin_router;
use adaptive_gateway::config::{GatewayConfig, RouteConfig};
use adaptive_gateway::gateway::GatewayRouter;
use adaptive_gateway::http::{HttpServer, HttpTransport};
use adaptive_gateway::lifecycle::Shutdown;

pub const ADMIN_KEY: &str = "test-admin-key";

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

async fn respond(mut socket: tokio::net::TcpStream, status: u16, body: String) {
    let mut buf = [0u8; 4096];
    let _ = socket.read(&mut buf).await;
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason(status),
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Start a mock backend that always answers 200 with `body`.
pub async fn start_mock_backend(body: &'static str) -> SocketAddr {
    start_programmable_backend(move || async move { (200, body.to_string()) }).await
}

/// Start a backend whose status and body come from `f`, called once per request.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let (status, body) = f().await;
                respond(socket, status, body).await;
            });
        }
    });
    addr
}

/// A gateway running on ephemeral ports.
pub struct TestGateway {
    pub gateway: Arc<GatewayRouter>,
    pub front: SocketAddr,
    pub admin: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.front, path)
    }

    pub fn admin_url(&self) -> String {
        format!("http://{}", self.admin)
    }

    /// Register `addr` as an instance of `service`. Returns the instance id.
    pub fn register(&self, service: &str, addr: SocketAddr) -> String {
        self.gateway.registry().register_service(
            service,
            &addr.ip().to_string(),
            addr.port(),
            Default::default(),
        )
    }
}

/// Start the front listener and the admin API with the given routes.
pub async fn start_gateway(routes: Vec<RouteConfig>) -> TestGateway {
    let mut config = GatewayConfig::default();
    config.routes = routes;
    config.transport.connect_timeout_ms = 500;

    let transport = Arc::new(HttpTransport::new(&config.transport));
    let gateway = Arc::new(GatewayRouter::from_config(&config, transport).unwrap());
    let shutdown = Shutdown::new();

    let front_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let front = front_listener.local_addr().unwrap();
    let server = HttpServer::new(gateway.clone(), &config.listener);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(front_listener, server_shutdown).await;
    });

    let admin_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let admin = admin_listener.local_addr().unwrap();
    let admin_router = setup_admin_router(gateway.clone(), ADMIN_KEY);
    let mut admin_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = axum::serve(admin_listener, admin_router)
            .with_graceful_shutdown(async move {
                let _ = admin_shutdown.recv().await;
            })
            .await;
    });

    // Listeners are bound already; give the accept loops a moment to start.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestGateway {
        gateway,
        front,
        admin,
        shutdown,
    }
}

/// Client without connection pooling so every request opens a fresh connection.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
