//! Session controller
//!
//! Sits between the connection, the peer registry and the presenter. Every
//! inbound message is applied to the registry first; the controller then
//! turns the registry's answer into presenter calls and, for joins and
//! departures, re-broadcasts the merged view so that every node converges on
//! the same peer list without a central authority.
//!
//! The controller is driven from a single event loop, which serializes all
//! registry access: inbound messages and local input are handled one at a
//! time, in order.

use crate::error::{RegistryError, SendError};
use crate::network::{ConnectionEvent, MessageSink};
use crate::registry::{PeerRegistry, Reconciliation};
use crate::rendering::Presenter;
use log::{debug, info, warn};
use shared::{Message, Peer, PeerId, Position, RelayErrorCode, SessionState};
use std::collections::HashMap;

/// Connection-level conditions handed back to whoever drives the controller
///
/// None of these are retried here; the caller decides whether to reconnect
/// or carry on locally.
#[derive(Debug, Clone, PartialEq)]
pub enum Interruption {
    Closed(Option<u16>),
    Errored(String),
    RelayError(RelayErrorCode),
}

pub struct SessionController<S: MessageSink, P: Presenter> {
    registry: PeerRegistry,
    sink: S,
    presenter: P,
    handles: HashMap<PeerId, P::Handle>,
    connected: bool,
}

impl<S: MessageSink, P: Presenter> SessionController<S, P> {
    /// Creates the controller and spawns the local player's representation
    pub fn new(self_peer: Peer, sink: S, mut presenter: P) -> Self {
        let mut handles = HashMap::new();
        handles.insert(self_peer.id, presenter.spawn_peer(&self_peer));

        Self {
            registry: PeerRegistry::new(self_peer),
            sink,
            presenter,
            handles,
            connected: false,
        }
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    pub fn self_peer(&self) -> &Peer {
        self.registry.self_peer()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn handle(&self, id: PeerId) -> Option<&P::Handle> {
        self.handles.get(&id)
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Routes one connection event and returns anything the caller must see
    pub fn handle_event(&mut self, event: ConnectionEvent) -> Option<Interruption> {
        match event {
            ConnectionEvent::Opened => {
                self.on_connection_opened();
                None
            }
            ConnectionEvent::MessageReceived(message) => {
                self.on_message(message);
                None
            }
            ConnectionEvent::Closed(code) => {
                self.on_connection_closed(code);
                Some(Interruption::Closed(code))
            }
            ConnectionEvent::Errored(reason) => {
                warn!("Connection error: {}", reason);
                Some(Interruption::Errored(reason))
            }
            ConnectionEvent::RelayError(code) => {
                warn!("Server error: {}", code.0);
                Some(Interruption::RelayError(code))
            }
        }
    }

    pub fn on_connection_opened(&mut self) {
        self.connected = true;
        let announce = Message::PlayerJoined(self.registry.self_peer().clone());
        self.send(announce);
    }

    /// Marks the session offline. No reconnection is attempted.
    pub fn on_connection_closed(&mut self, code: Option<u16>) {
        self.connected = false;
        info!("Connection closed ({:?}), synchronization stopped", code);
    }

    pub fn on_message(&mut self, message: Message) {
        match message {
            Message::PlayerJoined(peer) => self.on_player_joined(peer),
            Message::PlayerLeft(id) => self.on_player_left(id),
            Message::PlayerMoved(id, position) => self.on_player_moved(id, position),
            Message::PlayerShot(id) => self.on_player_shot(id),
            Message::GameSnapshot(state) => self.on_snapshot(&state),
        }
    }

    fn on_player_joined(&mut self, peer: Peer) {
        let id = peer.id;
        match self.registry.add(peer) {
            Ok(()) => {
                info!("Player {} joined", id);
                self.spawn(id);
            }
            Err(RegistryError::AlreadyExists(_)) => {
                debug!("Player {} announced again", id);
            }
            Err(e) => warn!("Ignoring join: {}", e),
        }
        self.broadcast_snapshot();
    }

    fn on_player_left(&mut self, id: PeerId) {
        match self.registry.remove(id) {
            Ok(_) => {
                info!("Player {} left", id);
                self.despawn(id);
            }
            Err(e) => warn!("Ignoring departure: {}", e),
        }
        self.broadcast_snapshot();
    }

    fn on_player_moved(&mut self, id: PeerId, position: Position) {
        if let Err(e) = self.registry.update_position(id, position) {
            debug!("Ignoring move: {}", e);
            return;
        }
        if let Some(handle) = self.handles.get(&id) {
            self.presenter.set_position(handle, position);
        }
    }

    fn on_player_shot(&mut self, id: PeerId) {
        match self.handles.get(&id) {
            Some(handle) => self.presenter.play_shot_effect(handle),
            None => debug!("Ignoring shot: {}", RegistryError::UnknownPeer(id)),
        }
    }

    fn on_snapshot(&mut self, state: &SessionState) {
        let Reconciliation { joined, left } = self.registry.reconcile(state);

        for id in joined {
            info!("Player {} joined", id);
            self.spawn(id);
        }
        for id in left {
            info!("Player {} left", id);
            self.despawn(id);
        }
    }

    /// Moves the local player and tells the other peers
    pub fn request_move(&mut self, position: Position) {
        if !position.is_finite() {
            warn!("Ignoring move to non-finite position {:?}", position);
            return;
        }
        self.registry.move_self(position);
        let id = self.registry.self_id();
        if let Some(handle) = self.handles.get(&id) {
            self.presenter.set_position(handle, position);
        }
        self.send(Message::PlayerMoved(id, position));
    }

    /// Fires locally and tells the other peers
    pub fn request_shot(&mut self) {
        let id = self.registry.self_id();
        if let Some(handle) = self.handles.get(&id) {
            self.presenter.play_shot_effect(handle);
        }
        self.send(Message::PlayerShot(id));
    }

    /// Announces that the local player is leaving the session
    pub fn leave(&mut self) {
        let id = self.registry.self_id();
        self.send(Message::PlayerLeft(id));
    }

    fn broadcast_snapshot(&mut self) {
        let snapshot = self.registry.snapshot();
        self.send(Message::GameSnapshot(snapshot));
    }

    fn send(&mut self, message: Message) {
        let kind = message.kind();
        match self.sink.send_message(message) {
            Ok(()) => {}
            Err(SendError::NotConnected) => debug!("Skipped {}: not connected", kind),
            Err(e) => warn!("Dropped {}: {}", kind, e),
        }
    }

    fn spawn(&mut self, id: PeerId) {
        if self.handles.contains_key(&id) {
            return;
        }
        if let Some(peer) = self.registry.get(id) {
            let handle = self.presenter.spawn_peer(peer);
            self.handles.insert(id, handle);
        }
    }

    fn despawn(&mut self, id: PeerId) {
        if let Some(handle) = self.handles.remove(&id) {
            self.presenter.destroy_peer(handle);
        }
    }
}
