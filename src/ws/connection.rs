//! Per-connection driver shared by the standalone server and HTTP upgrades.

use std::fmt;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, WeakUnboundedSender};

use crate::http::handler::HandlerError;
use crate::lifecycle::Shutdown;
use crate::ws::frame::{self, Incoming, CLOSE_FRAME};
use crate::ws::registry::{ClientRegistry, Outgoing};

type ConnectFn = dyn Fn(&str) -> Result<(), HandlerError> + Send + Sync;
type MessageFn = dyn Fn(&str, &str) -> Result<(), HandlerError> + Send + Sync;

/// Callbacks invoked over a WebSocket connection's lifetime.
///
/// Callbacks run on the blocking pool; they may call back into the registry
/// (`send`, `broadcast`) freely.
#[derive(Clone, Default)]
pub struct WsCallbacks {
    pub(crate) on_connect: Option<Arc<ConnectFn>>,
    pub(crate) on_message: Option<Arc<MessageFn>>,
    pub(crate) on_disconnect: Option<Arc<ConnectFn>>,
}

impl WsCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with the client id once the client is registered.
    pub fn on_connect<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.on_connect = Some(Arc::new(f));
        self
    }

    /// Called with the client id and text of each text frame.
    pub fn on_message<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.on_message = Some(Arc::new(f));
        self
    }

    /// Called once when the connection ends, for any reason.
    pub fn on_disconnect<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.on_disconnect = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for WsCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsCallbacks")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_message", &self.on_message.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .finish()
    }
}

/// Everything a connection needs besides its socket.
#[derive(Debug, Clone)]
pub(crate) struct ConnectionContext {
    pub client_id: String,
    pub callbacks: WsCallbacks,
    pub registry: Arc<ClientRegistry>,
    pub shutdown: Shutdown,
    pub max_frame_bytes: usize,
}

/// Run a connection whose handshake has completed.
///
/// Returns after the disconnect callback has run, the client is unregistered
/// and the close frame has been written.
pub(crate) async fn drive<R, W>(mut reader: R, writer: W, ctx: ConnectionContext)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let ConnectionContext {
        client_id,
        callbacks,
        registry,
        shutdown,
        max_frame_bytes,
    } = ctx;

    let (tx, rx) = mpsc::unbounded_channel();
    registry.register(client_id.clone(), tx.clone());
    let writer_task = tokio::spawn(write_loop(
        writer,
        rx,
        tx.downgrade(),
        client_id.clone(),
        Arc::clone(&registry),
    ));
    tracing::info!(client = %client_id, "WebSocket client connected");

    let outcome = async {
        if let Some(cb) = callbacks.on_connect.clone() {
            let id = client_id.clone();
            invoke(move || cb(&id)).await?;
        }

        loop {
            let incoming = tokio::select! {
                incoming = frame::read_message(&mut reader, max_frame_bytes) => incoming,
                _ = shutdown.wait() => break,
            };

            match incoming {
                Incoming::Text(text) => {
                    if let Some(cb) = callbacks.on_message.clone() {
                        let id = client_id.clone();
                        invoke(move || cb(&id, &text)).await?;
                    }
                }
                Incoming::Ignored(opcode) => {
                    tracing::trace!(client = %client_id, opcode, "Ignoring frame");
                }
                Incoming::Closed => break,
            }
        }
        Ok::<(), HandlerError>(())
    }
    .await;

    if let Err(e) = outcome {
        tracing::warn!(client = %client_id, error = %e, "WebSocket callback failed, closing");
    }

    if let Some(cb) = callbacks.on_disconnect.clone() {
        let id = client_id.clone();
        if let Err(e) = invoke(move || cb(&id)).await {
            tracing::warn!(client = %client_id, error = %e, "Disconnect callback failed");
        }
    }

    registry.unregister(&client_id, &tx);
    let _ = tx.send(Outgoing::Close);
    drop(tx);
    let _ = writer_task.await;
    tracing::info!(client = %client_id, "WebSocket client disconnected");
}

/// Run a host callback on the blocking pool; a panic counts as a failure.
async fn invoke<F>(f: F) -> Result<(), HandlerError>
where
    F: FnOnce() -> Result<(), HandlerError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => Err(HandlerError::new(format!("callback panicked: {e}"))),
    }
}

/// Drain queued messages onto the socket.
///
/// A failed write unregisters the client at once, so the registry shrinks
/// without waiting for the reader to notice the dead peer.
async fn write_loop<W>(
    mut writer: W,
    mut rx: UnboundedReceiver<Outgoing>,
    own_tx: WeakUnboundedSender<Outgoing>,
    client_id: String,
    registry: Arc<ClientRegistry>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(outgoing) = rx.recv().await {
        match outgoing {
            Outgoing::Text(text) => {
                if let Err(e) = writer.write_all(&frame::encode_text(&text)).await {
                    tracing::debug!(client = %client_id, error = %e, "WebSocket write failed, removing client");
                    if let Some(tx) = own_tx.upgrade() {
                        registry.unregister(&client_id, &tx);
                    }
                    break;
                }
            }
            Outgoing::Close => {
                let _ = writer.write_all(&CLOSE_FRAME).await;
                break;
            }
        }
    }
    let _ = writer.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::task::{Context, Poll};
    use tokio::io::{duplex, AsyncReadExt};

    use crate::ws::frame::{encode_frame, OP_TEXT};

    const KEY: [u8; 4] = [1, 2, 3, 4];

    fn context(callbacks: WsCallbacks, registry: Arc<ClientRegistry>) -> ConnectionContext {
        ConnectionContext {
            client_id: "127.0.0.1:4000".into(),
            callbacks,
            registry,
            shutdown: Shutdown::new(),
            max_frame_bytes: 1024,
        }
    }

    #[tokio::test]
    async fn echo_then_close() {
        let registry = Arc::new(ClientRegistry::new());
        let events = Arc::new(Mutex::new(Vec::new()));

        let callbacks = {
            let (reg, ev1, ev2, ev3) = (registry.clone(), events.clone(), events.clone(), events.clone());
            WsCallbacks::new()
                .on_connect(move |id| {
                    ev1.lock().unwrap().push(format!("connect {id}"));
                    Ok(())
                })
                .on_message(move |id, text| {
                    ev2.lock().unwrap().push(format!("message {text}"));
                    reg.send(id, &format!("echo: {text}"));
                    Ok(())
                })
                .on_disconnect(move |id| {
                    ev3.lock().unwrap().push(format!("disconnect {id}"));
                    Ok(())
                })
        };

        let (client, server) = duplex(4096);
        let (server_read, server_write) = tokio::io::split(server);
        let task = tokio::spawn(drive(server_read, server_write, context(callbacks, registry.clone())));

        let (mut client_read, mut client_write) = tokio::io::split(client);
        client_write.write_all(&encode_frame(OP_TEXT, b"hi", Some(KEY))).await.unwrap();

        let mut reply = [0u8; 10];
        client_read.read_exact(&mut reply).await.unwrap();
        assert_eq!(&reply[..], &frame::encode_text("echo: hi")[..]);

        client_write.write_all(&encode_frame(frame::OP_CLOSE, &[], Some(KEY))).await.unwrap();
        task.await.unwrap();

        let mut rest = Vec::new();
        client_read.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, CLOSE_FRAME);

        assert!(registry.is_empty());
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "connect 127.0.0.1:4000".to_string(),
                "message hi".to_string(),
                "disconnect 127.0.0.1:4000".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn failing_message_callback_still_disconnects() {
        let registry = Arc::new(ClientRegistry::new());
        let disconnected = Arc::new(Mutex::new(false));

        let flag = disconnected.clone();
        let callbacks = WsCallbacks::new()
            .on_message(|_, _| Err(HandlerError::new("boom")))
            .on_disconnect(move |_| {
                *flag.lock().unwrap() = true;
                Ok(())
            });

        let (client, server) = duplex(1024);
        let (server_read, server_write) = tokio::io::split(server);
        let task = tokio::spawn(drive(server_read, server_write, context(callbacks, registry.clone())));

        let (_client_read, mut client_write) = tokio::io::split(client);
        client_write.write_all(&encode_frame(OP_TEXT, b"x", Some(KEY))).await.unwrap();
        task.await.unwrap();

        assert!(*disconnected.lock().unwrap());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn shutdown_ends_idle_connection() {
        let registry = Arc::new(ClientRegistry::new());
        let ctx = context(WsCallbacks::new(), registry.clone());
        let shutdown = ctx.shutdown.clone();

        let (_client, server) = duplex(1024);
        let (server_read, server_write) = tokio::io::split(server);
        let task = tokio::spawn(drive(server_read, server_write, ctx));

        tokio::task::yield_now().await;
        shutdown.trigger();
        task.await.unwrap();
        assert!(registry.is_empty());
    }

    /// Socket whose peer has gone away.
    struct BrokenPipe;

    impl AsyncWrite for BrokenPipe {
        fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, _: &[u8]) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn failed_write_unregisters_client() {
        let registry = Arc::new(ClientRegistry::new());
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register("127.0.0.1:4000", tx.clone());

        let writer = tokio::spawn(write_loop(
            BrokenPipe,
            rx,
            tx.downgrade(),
            "127.0.0.1:4000".into(),
            registry.clone(),
        ));

        assert_eq!(registry.broadcast("hello"), 1);
        writer.await.unwrap();

        assert!(registry.is_empty());
        assert!(!registry.send("127.0.0.1:4000", "again"));
    }
}
