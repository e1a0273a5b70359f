//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use scriptserve::{HttpServer, Shutdown, WebSocketServer};
use tokio::net::TcpListener;

/// Run `server` on an ephemeral port. Returns its address and shutdown handle.
#[allow(dead_code)]
pub async fn spawn_http(server: HttpServer) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });
    (addr, shutdown)
}

/// Run a standalone WebSocket server on an ephemeral port.
#[allow(dead_code)]
pub async fn spawn_ws(server: WebSocketServer) -> (SocketAddr, Arc<WebSocketServer>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Arc::new(server);
    let running = server.clone();
    tokio::spawn(async move {
        let _ = running.run(listener).await;
    });
    (addr, server)
}

/// A client that never pools or proxies, so each test sees fresh connections.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Poll `condition` until it holds, panicking after two seconds.
#[allow(dead_code)]
pub async fn eventually<F: Fn() -> bool>(condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 2s");
}
