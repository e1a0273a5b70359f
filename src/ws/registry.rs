//! Registry of connected WebSocket clients.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc::UnboundedSender;

use crate::observability::metrics;

/// Command for a client's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Text(String),
    Close,
}

/// Connected clients keyed by client id.
///
/// Each entry is the sending half of that client's writer channel, so pushing
/// a message never blocks on the socket. A client whose channel is closed is
/// dropped on the next send or broadcast.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<String, UnboundedSender<Outgoing>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client, replacing any entry under the same id.
    pub fn register(&self, id: impl Into<String>, tx: UnboundedSender<Outgoing>) {
        let count = {
            let mut clients = self.clients.lock().expect("client registry mutex poisoned");
            clients.insert(id.into(), tx);
            clients.len()
        };
        metrics::record_ws_clients(count);
    }

    /// Remove a client if it is still registered with this channel.
    pub(crate) fn unregister(&self, id: &str, tx: &UnboundedSender<Outgoing>) -> bool {
        let (removed, count) = {
            let mut clients = self.clients.lock().expect("client registry mutex poisoned");
            let removed = match clients.get(id) {
                Some(current) if current.same_channel(tx) => clients.remove(id).is_some(),
                _ => false,
            };
            (removed, clients.len())
        };
        metrics::record_ws_clients(count);
        removed
    }

    /// Remove a client unconditionally.
    pub fn remove(&self, id: &str) -> bool {
        let (removed, count) = {
            let mut clients = self.clients.lock().expect("client registry mutex poisoned");
            let removed = clients.remove(id).is_some();
            (removed, clients.len())
        };
        metrics::record_ws_clients(count);
        removed
    }

    /// Queue a text message for one client.
    ///
    /// Returns false when the id is unknown or the client has gone away; in
    /// the latter case the client is removed.
    pub fn send(&self, id: &str, message: &str) -> bool {
        let Some(tx) = self.sender(id) else {
            return false;
        };
        if tx.send(Outgoing::Text(message.to_string())).is_ok() {
            return true;
        }
        tracing::debug!(client = %id, "Send failed, removing client");
        self.unregister(id, &tx);
        false
    }

    /// Queue a text message for every client. Returns the number reached.
    ///
    /// Works on a snapshot taken under the lock; clients registering during
    /// the broadcast may or may not receive it.
    pub fn broadcast(&self, message: &str) -> usize {
        let snapshot: Vec<(String, UnboundedSender<Outgoing>)> = {
            let clients = self.clients.lock().expect("client registry mutex poisoned");
            clients.iter().map(|(id, tx)| (id.clone(), tx.clone())).collect()
        };

        let mut delivered = 0;
        for (id, tx) in snapshot {
            if tx.send(Outgoing::Text(message.to_string())).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(client = %id, "Broadcast failed, removing client");
                self.unregister(&id, &tx);
            }
        }
        delivered
    }

    /// Ask a client's writer to send a close frame and stop.
    pub fn close(&self, id: &str) -> bool {
        self.sender(id)
            .map(|tx| tx.send(Outgoing::Close).is_ok())
            .unwrap_or(false)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.clients.lock().expect("client registry mutex poisoned").contains_key(id)
    }

    /// Ids of all registered clients, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .clients
            .lock()
            .expect("client registry mutex poisoned")
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.clients.lock().expect("client registry mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sender(&self, id: &str) -> Option<UnboundedSender<Outgoing>> {
        self.clients
            .lock()
            .expect("client registry mutex poisoned")
            .get(id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn send_reaches_registered_client() {
        let registry = ClientRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register("127.0.0.1:5000", tx);

        assert!(registry.send("127.0.0.1:5000", "hi"));
        assert_eq!(rx.try_recv().unwrap(), Outgoing::Text("hi".into()));
    }

    #[test]
    fn send_to_unknown_client_is_false() {
        let registry = ClientRegistry::new();
        assert!(!registry.send("nobody", "hi"));
    }

    #[test]
    fn broadcast_drops_dead_clients() {
        let registry = ClientRegistry::new();
        let (alive_tx, mut alive_rx) = mpsc::unbounded_channel();
        let (dead_tx, dead_rx) = mpsc::unbounded_channel();
        registry.register("a", alive_tx);
        registry.register("b", dead_tx);
        drop(dead_rx);

        assert_eq!(registry.broadcast("x"), 1);
        assert_eq!(alive_rx.try_recv().unwrap(), Outgoing::Text("x".into()));
        assert_eq!(registry.ids(), vec!["a".to_string()]);
    }

    #[test]
    fn failed_send_removes_client() {
        let registry = ClientRegistry::new();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register("a", tx);
        drop(rx);

        assert!(!registry.send("a", "x"));
        assert!(registry.is_empty());
    }

    #[test]
    fn unregister_ignores_replaced_entry() {
        let registry = ClientRegistry::new();
        let (old_tx, _old_rx) = mpsc::unbounded_channel();
        let (new_tx, _new_rx) = mpsc::unbounded_channel();
        registry.register("a", old_tx.clone());
        registry.register("a", new_tx);

        assert!(!registry.unregister("a", &old_tx));
        assert!(registry.contains("a"));
        assert!(registry.remove("a"));
        assert!(!registry.remove("a"));
    }

    #[test]
    fn close_queues_close_command() {
        let registry = ClientRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register("a", tx);

        assert!(registry.close("a"));
        assert_eq!(rx.try_recv().unwrap(), Outgoing::Close);
    }
}
