//! Standalone WebSocket server tests driven by a real client.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use scriptserve::{HandlerError, WebSocketServer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;

mod common;

fn echo_server(events: Arc<Mutex<Vec<String>>>) -> WebSocketServer {
    let mut server = WebSocketServer::new("127.0.0.1", 0);
    let clients = server.clients();
    let (on_connect, on_disconnect) = (events.clone(), events);
    server
        .on_connect(move |id| {
            on_connect.lock().unwrap().push(format!("connect {}", id));
            Ok(())
        })
        .on_message(move |id, text| {
            clients.send(id, text);
            Ok(())
        })
        .on_disconnect(move |id| {
            on_disconnect.lock().unwrap().push(format!("disconnect {}", id));
            Ok(())
        });
    server
}

#[tokio::test]
async fn echo_and_lifecycle_callbacks() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let (addr, server) = common::spawn_ws(echo_server(events.clone())).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/", addr))
        .await
        .unwrap();
    ws.send(Message::Text("ping".into())).await.unwrap();
    let reply = ws.next().await.unwrap().unwrap();
    assert_eq!(reply.to_text().unwrap(), "ping");

    let ids = server.clients().ids();
    assert_eq!(ids.len(), 1);
    let id = ids[0].clone();
    assert!(id.starts_with("127.0.0.1:"));

    ws.close(None).await.unwrap();
    common::eventually(|| server.clients().is_empty()).await;
    common::eventually(|| events.lock().unwrap().len() == 2).await;

    assert_eq!(
        *events.lock().unwrap(),
        vec![format!("connect {}", id), format!("disconnect {}", id)]
    );
    server.stop();
}

#[tokio::test]
async fn large_messages_round_trip() {
    let (addr, server) = common::spawn_ws(echo_server(Default::default())).await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/", addr))
        .await
        .unwrap();

    for len in [200usize, 70_000] {
        let text = "z".repeat(len);
        ws.send(Message::Text(text.clone().into())).await.unwrap();
        let reply = ws.next().await.unwrap().unwrap();
        assert_eq!(reply.to_text().unwrap(), text);
    }
    server.stop();
}

#[tokio::test]
async fn broadcast_and_targeted_send() {
    let (addr, server) = common::spawn_ws(WebSocketServer::new("127.0.0.1", 0)).await;
    let url = format!("ws://{}/", addr);

    let (mut first, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    let (mut second, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    common::eventually(|| server.clients().len() == 2).await;

    assert_eq!(server.broadcast("hello all"), 2);
    assert_eq!(first.next().await.unwrap().unwrap().to_text().unwrap(), "hello all");
    assert_eq!(second.next().await.unwrap().unwrap().to_text().unwrap(), "hello all");

    let ids = server.clients().ids();
    assert!(server.send(&ids[0], "just you"));
    assert!(!server.send("10.0.0.1:1", "nobody"));

    server.stop();
}

#[tokio::test]
async fn failing_connect_callback_closes_connection() {
    let disconnects = Arc::new(Mutex::new(0));
    let mut server = WebSocketServer::new("127.0.0.1", 0);
    let counter = disconnects.clone();
    server
        .on_connect(|_| Err(HandlerError::new("rejected")))
        .on_disconnect(move |_| {
            *counter.lock().unwrap() += 1;
            Ok(())
        });
    let (addr, server) = common::spawn_ws(server).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/", addr))
        .await
        .unwrap();
    let next = tokio::time::timeout(Duration::from_secs(5), ws.next()).await.unwrap();
    assert!(matches!(next, Some(Ok(Message::Close(_))) | None | Some(Err(_))));

    common::eventually(|| *disconnects.lock().unwrap() == 1).await;
    assert!(server.clients().is_empty());
    server.stop();
}

#[tokio::test]
async fn missing_key_closes_silently() {
    let (addr, server) = common::spawn_ws(WebSocketServer::new("127.0.0.1", 0)).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let mut buf = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read, 0);
    assert!(server.clients().is_empty());
    server.stop();
}

#[tokio::test]
async fn stop_closes_live_connections() {
    let (addr, server) = common::spawn_ws(WebSocketServer::new("127.0.0.1", 0)).await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/", addr))
        .await
        .unwrap();
    common::eventually(|| server.clients().len() == 1).await;

    server.stop();
    let next = tokio::time::timeout(Duration::from_secs(5), ws.next()).await.unwrap();
    assert!(matches!(next, Some(Ok(Message::Close(_))) | None | Some(Err(_))));
    common::eventually(|| server.clients().is_empty()).await;
}
