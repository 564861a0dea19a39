//! Connection bookkeeping for the relay
//!
//! The relay does not know about players. It only tracks open sockets, each
//! with an outbound queue, so that a frame read from one connection can be
//! pushed to every other connection:
//! - Connection numbering and capacity enforcement
//! - Per-connection outbound queues for broadcasting
//! - Traffic counters for monitoring

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Queue feeding one connection's writer task
pub type Outbound = mpsc::UnboundedSender<Message>;

/// One connected socket
#[derive(Debug)]
pub struct Client {
    /// Relay-local connection number, unrelated to player ids
    pub id: u32,
    pub addr: SocketAddr,
    pub connected_at: Instant,
    /// Frames received from this client and forwarded
    pub frames_relayed: u64,
    pub sender: Outbound,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr, sender: Outbound) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            frames_relayed: 0,
            sender,
        }
    }
}

/// Manages all connected clients of the relay
///
/// Enforces the capacity limit and hands out the recipient list for each
/// broadcast. Clients are identified by a number that increments from 1.
pub struct ClientManager {
    clients: HashMap<u32, Client>,
    next_client_id: u32,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Registers a connection
    ///
    /// Returns None when the relay is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr, sender: Outbound) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, sender));

        Some(client_id)
    }

    /// Drops a connection and its outbound queue
    ///
    /// Returns false if the client was already gone.
    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!(
                "Client {} disconnected after {:?}, {} frames relayed",
                client.id,
                client.connected_at.elapsed(),
                client.frames_relayed
            );
            true
        } else {
            false
        }
    }

    pub fn record_frame(&mut self, client_id: u32) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.frames_relayed += 1;
        }
    }

    /// Outbound queues of every client except `exclude`
    pub fn recipients(&self, exclude: Option<u32>) -> Vec<(u32, Outbound)> {
        self.clients
            .iter()
            .filter(|(id, _)| Some(**id) != exclude)
            .map(|(id, client)| (*id, client.sender.clone()))
            .collect()
    }

    pub fn get(&self, client_id: u32) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }
}
