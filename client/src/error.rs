use crate::network::ConnectionState;
use shared::{EncodeError, PeerId};

/// Failure to open the duplex connection to the relay.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectError {
    #[error("relay unreachable at {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },

    #[error("cannot connect while {0}")]
    InvalidState(ConnectionState),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("not connected")]
    NotConnected,

    #[error("cannot encode message: {0}")]
    Unencodable(#[from] EncodeError),
}

/// Conditions reported by the peer registry. None of them are fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("peer {0} already exists")]
    AlreadyExists(PeerId),

    #[error("unknown peer {0}")]
    UnknownPeer(PeerId),

    #[error("peer {0} is the local player")]
    SelfPeer(PeerId),
}
