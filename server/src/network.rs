//! Relay network layer: WebSocket accept loop and frame forwarding

use crate::client_manager::ClientManager;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::Message;

/// Out-of-band code sent to a connection the relay has no room for
pub const RELAY_FULL: i32 = 503;

/// Forwards every frame from one client to all other clients
///
/// Frames are never parsed. Each connection is read by exactly one task and
/// written by exactly one task, so frames from a given sender reach every
/// recipient in the order they were sent.
pub struct Relay {
    listener: TcpListener,
    clients: Arc<RwLock<ClientManager>>,
}

impl Relay {
    pub async fn new(addr: &str, max_clients: usize) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Relay listening on {}", listener.local_addr()?);

        Ok(Relay {
            listener,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared handle to the connection table, mainly for monitoring
    pub fn clients(&self) -> Arc<RwLock<ClientManager>> {
        Arc::clone(&self.clients)
    }

    /// Accepts connections until the listener fails
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Relay started successfully");

        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    continue;
                }
            };

            let clients = Arc::clone(&self.clients);
            tokio::spawn(async move {
                handle_connection(stream, addr, clients).await;
            });
        }
    }
}

async fn handle_connection(stream: TcpStream, addr: SocketAddr, clients: Arc<RwLock<ClientManager>>) {
    let socket = match tokio_tungstenite::accept_async(stream).await {
        Ok(socket) => socket,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", addr, e);
            return;
        }
    };

    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();

    let client_id = {
        let mut clients = clients.write().await;
        clients.add_client(addr, outbound_tx)
    };

    let Some(client_id) = client_id else {
        warn!("Rejecting {}: relay full", addr);
        if let Err(e) = sink.send(Message::Text(RELAY_FULL.to_string())).await {
            debug!("Could not notify {}: {}", addr, e);
        }
        let _ = sink.close().await;
        return;
    };

    // Ends once the client is removed and its queue sender is dropped.
    tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if let Err(e) = sink.send(frame).await {
                debug!("Failed to write to client {}: {}", client_id, e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(frame @ (Message::Text(_) | Message::Binary(_))) => {
                relay_frame(&clients, client_id, frame).await;
            }
            // The close reply is produced while we keep polling.
            Ok(Message::Close(_)) => debug!("Client {} sent close", client_id),
            Ok(_) => {}
            Err(e) => {
                debug!("Read error from client {}: {}", client_id, e);
                break;
            }
        }
    }

    clients.write().await.remove_client(&client_id);
}

async fn relay_frame(clients: &Arc<RwLock<ClientManager>>, from: u32, frame: Message) {
    let recipients = {
        let mut clients = clients.write().await;
        clients.record_frame(from);
        clients.recipients(Some(from))
    };

    for (client_id, sender) in recipients {
        if sender.send(frame.clone()).is_err() {
            debug!("Client {} is gone, frame dropped", client_id);
        }
    }
}
