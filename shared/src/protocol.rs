//! Text wire format for session messages.
//!
//! Every message is one JSON object with a `packageType` discriminant and
//! the variant's payload alongside it. One transport frame carries exactly
//! one message; there is no length prefix and no version field.
//!
//! A frame whose body parses as a bare integer is not a message at all but
//! an error code pushed by the relay, so decoding yields [`Inbound`] rather
//! than [`Message`] directly.

use crate::{Message, Peer, PeerId, Position, SessionState};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const PLAYER_JOINED: &str = "PlayerJoinedPackage";
pub const PLAYER_LEFT: &str = "PlayerLeftPackage";
pub const PLAYER_MOVED: &str = "PlayerMovedPackage";
pub const PLAYER_SHOT: &str = "PlayerShotPackage";
pub const GAME_UPDATE: &str = "GameUpdatePackage";

const KIND_FIELD: &str = "packageType";

/// Numeric error code sent by the relay out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayErrorCode(pub i32);

impl fmt::Display for RelayErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "relay error {}", self.0)
    }
}

/// Result of decoding one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Message(Message),
    RelayError(RelayErrorCode),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// JSON has no representation for NaN or infinity.
    #[error("player {0} has a non-finite position")]
    NonFinite(PeerId),

    #[error("serialization failed: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown package type `{0}`")]
    UnknownKind(String),

    #[error("malformed package: {0}")]
    Malformed(String),
}

/// Player object as laid out on the wire.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerRecord {
    id: PeerId,
    position_x: f32,
    position_y: f32,
    position_z: f32,
}

impl PlayerRecord {
    fn new(id: PeerId, position: Position) -> Result<Self, EncodeError> {
        if !position.is_finite() {
            return Err(EncodeError::NonFinite(id));
        }
        Ok(PlayerRecord {
            id,
            position_x: position.x,
            position_y: position.y,
            position_z: position.z,
        })
    }

    // Out-of-range numbers such as 1e300 deserialize to an infinite f32.
    fn into_peer(self) -> Result<Peer, DecodeError> {
        let position = Position::new(self.position_x, self.position_y, self.position_z);
        if !position.is_finite() {
            return Err(DecodeError::Malformed(format!(
                "player {} has a non-finite position",
                self.id
            )));
        }
        Ok(Peer::new(self.id, position))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GameRecord {
    players: Vec<PlayerRecord>,
}

/// One frame: the discriminant followed by exactly one payload object.
#[derive(Debug, Serialize)]
struct Envelope {
    #[serde(rename = "packageType")]
    package_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    player: Option<PlayerRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    game: Option<GameRecord>,
}

/// Encodes a message as its JSON text.
///
/// Fails with [`EncodeError::NonFinite`] rather than writing a `null`
/// coordinate that no receiver could decode.
pub fn encode_text(message: &Message) -> Result<String, EncodeError> {
    let mut envelope = Envelope {
        package_type: message.kind(),
        player: None,
        game: None,
    };

    match message {
        Message::PlayerJoined(peer) => {
            envelope.player = Some(PlayerRecord::new(peer.id, peer.position)?);
        }
        // Left and shot only need the id; the wire still wants a full player.
        Message::PlayerLeft(id) | Message::PlayerShot(id) => {
            envelope.player = Some(PlayerRecord::new(*id, Position::default())?);
        }
        Message::PlayerMoved(id, position) => {
            envelope.player = Some(PlayerRecord::new(*id, *position)?);
        }
        Message::GameSnapshot(state) => {
            let players = state
                .players
                .iter()
                .map(|p| PlayerRecord::new(p.id, p.position))
                .collect::<Result<Vec<_>, _>>()?;
            envelope.game = Some(GameRecord { players });
        }
    }

    serde_json::to_string(&envelope).map_err(|e| EncodeError::Serialize(e.to_string()))
}

pub fn encode(message: &Message) -> Result<Vec<u8>, EncodeError> {
    encode_text(message).map(String::into_bytes)
}

/// Decodes one frame body.
pub fn decode(bytes: &[u8]) -> Result<Inbound, DecodeError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DecodeError::Malformed(format!("invalid utf-8: {}", e)))?;

    if let Ok(code) = text.trim().parse::<i32>() {
        return Ok(Inbound::RelayError(RelayErrorCode(code)));
    }

    let value: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let kind = value
        .get(KIND_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::Malformed(format!("missing `{}`", KIND_FIELD)))?;

    let message = match kind {
        PLAYER_JOINED => {
            Message::PlayerJoined(field::<PlayerRecord>(&value, "player")?.into_peer()?)
        }
        PLAYER_LEFT => Message::PlayerLeft(field::<PlayerRecord>(&value, "player")?.id),
        PLAYER_MOVED => {
            let peer = field::<PlayerRecord>(&value, "player")?.into_peer()?;
            Message::PlayerMoved(peer.id, peer.position)
        }
        PLAYER_SHOT => Message::PlayerShot(field::<PlayerRecord>(&value, "player")?.id),
        GAME_UPDATE => {
            let game: GameRecord = field(&value, "game")?;
            let players = game
                .players
                .into_iter()
                .map(PlayerRecord::into_peer)
                .collect::<Result<Vec<_>, _>>()?;
            Message::GameSnapshot(SessionState::new(players))
        }
        other => return Err(DecodeError::UnknownKind(other.to_string())),
    };

    Ok(Inbound::Message(message))
}

fn field<T: DeserializeOwned>(value: &Value, name: &str) -> Result<T, DecodeError> {
    let raw = value
        .get(name)
        .ok_or_else(|| DecodeError::Malformed(format!("missing field `{}`", name)))?;
    T::deserialize(raw).map_err(|e| DecodeError::Malformed(format!("field `{}`: {}", name, e)))
}
