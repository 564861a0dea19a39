//! Data model shared by the relay and every client of a session.
//!
//! A session is a flat list of peers, each identified by a self-assigned
//! [`PeerId`] and carrying a single mutable [`Position`]. Everything that
//! travels over the wire is expressed as a [`Message`]; the byte-level
//! representation lives in [`protocol`].

pub mod protocol;

pub use protocol::{decode, encode, DecodeError, EncodeError, Inbound, RelayErrorCode};

/// Default port the relay listens on and clients connect to.
pub const DEFAULT_RELAY_PORT: u16 = 42660;

/// Upper bound (exclusive) of the random range peers draw their id from.
pub const PEER_ID_RANGE: u32 = 1_000_000;

/// Opaque identifier a peer assigns to itself when it joins.
pub type PeerId = u32;

/// Three-component position. No bounds are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Peer {
    pub id: PeerId,
    pub position: Position,
}

impl Peer {
    pub fn new(id: PeerId, position: Position) -> Self {
        Self { id, position }
    }
}

/// Full view of the peers known to a node, in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub players: Vec<Peer>,
}

impl SessionState {
    pub fn new(players: Vec<Peer>) -> Self {
        Self { players }
    }

    pub fn ids(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.players.iter().map(|p| p.id)
    }
}

/// Protocol messages exchanged between peers through the relay.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    PlayerJoined(Peer),
    PlayerLeft(PeerId),
    PlayerMoved(PeerId, Position),
    PlayerShot(PeerId),
    GameSnapshot(SessionState),
}

impl Message {
    /// Wire discriminant written to the `packageType` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::PlayerJoined(_) => protocol::PLAYER_JOINED,
            Message::PlayerLeft(_) => protocol::PLAYER_LEFT,
            Message::PlayerMoved(..) => protocol::PLAYER_MOVED,
            Message::PlayerShot(_) => protocol::PLAYER_SHOT,
            Message::GameSnapshot(_) => protocol::GAME_UPDATE,
        }
    }
}
