//! Standalone WebSocket server with its own accept loop.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::config::WebSocketConfig;
use crate::http::handler::HandlerError;
use crate::lifecycle::Shutdown;
use crate::ws::connection::{self, ConnectionContext, WsCallbacks};
use crate::ws::error::WsResult;
use crate::ws::frame::DEFAULT_MAX_FRAME_BYTES;
use crate::ws::handshake;
use crate::ws::registry::ClientRegistry;

/// WebSocket server listening on its own port.
///
/// Clients are identified by their `ip:port` peer address. Callbacks are set
/// before [`run`](Self::run); `send`, `broadcast` and `stop` can be called
/// from any thread while it runs.
#[derive(Debug)]
pub struct WebSocketServer {
    host: String,
    port: u16,
    max_frame_bytes: usize,
    callbacks: WsCallbacks,
    clients: Arc<ClientRegistry>,
    shutdown: Shutdown,
}

impl WebSocketServer {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            callbacks: WsCallbacks::new(),
            clients: Arc::new(ClientRegistry::new()),
            shutdown: Shutdown::new(),
        }
    }

    /// Build from the `[websocket]` config section, if it names a bind address.
    pub fn from_config(config: &WebSocketConfig) -> Option<Self> {
        let addr: SocketAddr = config.bind_address.as_deref()?.parse().ok()?;
        Some(Self::new(addr.ip().to_string(), addr.port()).with_max_frame_bytes(config.max_frame_bytes))
    }

    pub fn with_max_frame_bytes(mut self, max: usize) -> Self {
        self.max_frame_bytes = max;
        self
    }

    pub fn on_connect<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&str) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.callbacks = std::mem::take(&mut self.callbacks).on_connect(f);
        self
    }

    pub fn on_message<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&str, &str) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.callbacks = std::mem::take(&mut self.callbacks).on_message(f);
        self
    }

    pub fn on_disconnect<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&str) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.callbacks = std::mem::take(&mut self.callbacks).on_disconnect(f);
        self
    }

    /// Bind `host:port` and run until [`stop`](Self::stop).
    pub async fn serve(&self) -> WsResult<()> {
        let listener = TcpListener::bind((self.host.as_str(), self.port)).await?;
        self.run(listener).await
    }

    /// Accept clients from `listener` until stopped.
    pub async fn run(&self, listener: TcpListener) -> WsResult<()> {
        let local = listener.local_addr()?;
        tracing::info!(address = %local, "WebSocket server listening");

        loop {
            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        continue;
                    }
                },
                _ = self.shutdown.wait() => break,
            };

            let ctx = ConnectionContext {
                client_id: peer.to_string(),
                callbacks: self.callbacks.clone(),
                registry: Arc::clone(&self.clients),
                shutdown: self.shutdown.clone(),
                max_frame_bytes: self.max_frame_bytes,
            };
            tokio::spawn(handle_client(stream, ctx));
        }

        tracing::info!(address = %local, "WebSocket server stopped");
        Ok(())
    }

    /// Stop accepting and end every connection loop.
    pub fn stop(&self) {
        self.shutdown.trigger();
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.is_triggered()
    }

    /// Send a text message to every client. Returns the number reached.
    pub fn broadcast(&self, message: &str) -> usize {
        self.clients.broadcast(message)
    }

    /// Send a text message to one client.
    pub fn send(&self, client_id: &str, message: &str) -> bool {
        self.clients.send(client_id, message)
    }

    /// Shared handle to the client registry, for use inside callbacks.
    pub fn clients(&self) -> Arc<ClientRegistry> {
        Arc::clone(&self.clients)
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }
}

async fn handle_client(stream: TcpStream, ctx: ConnectionContext) {
    let (read, mut write) = tokio::io::split(stream);
    let mut reader = BufReader::new(read);

    let head = match handshake::read_request_head(&mut reader).await {
        Ok(head) => head,
        Err(e) => {
            tracing::debug!(client = %ctx.client_id, error = %e, "Handshake failed");
            return;
        }
    };
    let Some(key) = handshake::find_key(&head) else {
        tracing::debug!(client = %ctx.client_id, "Missing Sec-WebSocket-Key, closing");
        return;
    };

    let response = handshake::response_block(&handshake::accept_key(&key));
    if let Err(e) = write.write_all(response.as_bytes()).await {
        tracing::debug!(client = %ctx.client_id, error = %e, "Handshake write failed");
        return;
    }

    connection::drive(reader, write, ctx).await;
}
