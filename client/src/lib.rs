//! # Session Client Library
//!
//! Client side of a small multiplayer session in which every participant
//! shares the same list of players and their positions. There is no game
//! server: all clients talk through a relay that forwards raw frames, and the
//! clients themselves keep each other in sync.
//!
//! ## How Convergence Works
//!
//! A client announces itself with a join message once its connection opens.
//! Whoever receives a join (or a departure) adds it to their own view and
//! re-broadcasts the full merged player list as a snapshot. Receivers of a
//! snapshot diff it against their view: unseen players are added, players
//! missing from the snapshot are dropped. After a few exchanges every client
//! holds the same set of ids.
//!
//! Position changes never travel inside snapshots. Each client sends a move
//! message when its own player moves and receivers apply it directly.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! The duplex WebSocket connection to the relay:
//! - Connection state machine (idle, connecting, open, closing, closed)
//! - Reader task decoding frames into ordered events
//! - Non-blocking, open-only sends
//!
//! ### Registry Module (`registry`)
//! Engine-agnostic peer state with snapshot reconciliation that reports
//! exactly which ids joined and left.
//!
//! ### Game Module (`game`)
//! The session controller. Applies inbound messages to the registry,
//! re-broadcasts merged views and drives the presenter.
//!
//! ### Rendering Module (`rendering`)
//! The capability interface to whatever draws players, plus a headless
//! console implementation.
//!
//! ### Input Module (`input`)
//! Parses terminal commands into local intents.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::runtime::Client;
//! use shared::{Peer, Position};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let me = Peer::new(4242, Position::default());
//!     let client = Client::new("ws://127.0.0.1:42660", me);
//!
//!     // Connects, announces itself, then processes relay traffic and
//!     // stdin commands until `quit` or Ctrl+C.
//!     client.run().await
//! }
//! ```
//!
//! ## Failure Model
//!
//! Undecodable frames and messages about unknown players are logged and
//! skipped. A dropped connection stops synchronization but local play keeps
//! working; reconnecting is left to the caller.

pub mod error;
pub mod game;
pub mod input;
pub mod network;
pub mod registry;
pub mod rendering;
pub mod runtime;
