//! Client sessions and the registry the tick loop broadcasts through.

use bytes::Bytes;
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

/// A connected client session.
#[derive(Debug)]
pub struct Client {
    /// Unique client ID; also the id of the player's snake.
    pub id: u32,
    /// Remote address.
    pub addr: SocketAddr,
    /// Outgoing frames, written to the socket by the connection task.
    tx: mpsc::Sender<Bytes>,
}

/// Result of queueing a frame for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Queued,
    /// The client is behind; this frame was dropped.
    Lagging,
    /// The connection task is gone.
    Closed,
}

impl Client {
    /// Create a new client session.
    pub fn new(id: u32, addr: SocketAddr, tx: mpsc::Sender<Bytes>) -> Self {
        Self { id, addr, tx }
    }

    /// Queue a frame without waiting.
    pub fn send(&self, frame: Bytes) -> SendStatus {
        match self.tx.try_send(frame) {
            Ok(()) => SendStatus::Queued,
            Err(TrySendError::Full(_)) => SendStatus::Lagging,
            Err(TrySendError::Closed(_)) => SendStatus::Closed,
        }
    }
}

/// All clients that completed the handshake.
#[derive(Debug)]
pub struct ClientRegistry {
    clients: HashMap<u32, Client>,
    next_client_id: u32,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 0,
        }
    }

    /// Reserve the next client id.
    pub fn allocate_id(&mut self) -> u32 {
        let id = self.next_client_id;
        self.next_client_id = self.next_client_id.wrapping_add(1);
        id
    }

    pub fn insert(&mut self, client: Client) {
        self.clients.insert(client.id, client);
    }

    pub fn remove(&mut self, id: u32) -> Option<Client> {
        self.clients.remove(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.clients.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Queue `frame` for every client. Returns the ids of clients whose
    /// connection is gone; the caller removes them once it has released
    /// its locks.
    pub fn broadcast(&self, frame: &Bytes) -> Vec<u32> {
        let mut closed = Vec::new();
        for client in self.clients.values() {
            match client.send(frame.clone()) {
                SendStatus::Queued => {}
                SendStatus::Lagging => debug!("Dropped frame for lagging client {}", client.id),
                SendStatus::Closed => closed.push(client.id),
            }
        }
        closed.sort_unstable();
        closed
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:9".parse().unwrap()
    }

    #[test]
    fn test_broadcast_reports_closed() {
        let mut registry = ClientRegistry::new();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, rx_b) = mpsc::channel(4);
        let a = registry.allocate_id();
        let b = registry.allocate_id();
        registry.insert(Client::new(a, addr(), tx_a));
        registry.insert(Client::new(b, addr(), tx_b));
        drop(rx_b);

        let closed = registry.broadcast(&Bytes::from_static(b"frame\n"));
        assert_eq!(closed, vec![b]);
        assert_eq!(rx_a.try_recv().unwrap(), Bytes::from_static(b"frame\n"));
    }

    #[test]
    fn test_full_queue_drops_frame() {
        let (tx, mut rx) = mpsc::channel(1);
        let client = Client::new(0, addr(), tx);
        assert_eq!(client.send(Bytes::from_static(b"1\n")), SendStatus::Queued);
        assert_eq!(client.send(Bytes::from_static(b"2\n")), SendStatus::Lagging);
        assert_eq!(rx.try_recv().unwrap(), Bytes::from_static(b"1\n"));
    }

    #[test]
    fn test_ids_are_unique() {
        let mut registry = ClientRegistry::new();
        let first = registry.allocate_id();
        let second = registry.allocate_id();
        assert_ne!(first, second);
        assert!(!registry.contains(first));
    }
}
