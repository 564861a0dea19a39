//! # Relay Server Library
//!
//! The relay is the only fixed point of a session: every client opens one
//! WebSocket to it, and every frame a client sends is copied to all other
//! connected clients. The relay does not parse frames, keep player state, or
//! validate anything. Session logic lives entirely in the clients.
//!
//! ## Core Responsibilities
//!
//! ### Frame Forwarding
//! Each inbound text or binary frame is forwarded verbatim to every other
//! connection. The sender does not receive its own frame back.
//!
//! ### Ordering
//! One task reads each connection and one task writes each connection, with
//! an unbounded queue in between. Frames from one sender therefore arrive at
//! each recipient in send order. No ordering is promised across senders.
//!
//! ### Capacity
//! The relay accepts up to `max_clients` connections. Beyond that a new
//! connection receives the bare integer frame `503` and is closed; clients
//! treat a bare integer as an out-of-band error code.
//!
//! ## Module Organization
//!
//! ### Client Manager Module (`client_manager`)
//! Connection table: numbering, capacity, outbound queues, traffic counters.
//!
//! ### Network Module (`network`)
//! Accept loop, WebSocket handshake, per-connection reader and writer tasks.
//!
//! ### Status Module (`status`)
//! Optional plain HTTP responder for reachability checks.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Relay;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Bind the relay with room for 16 concurrent clients
//!     let relay = Relay::new("0.0.0.0:42660", 16).await?;
//!
//!     // Accept and forward until the process is stopped
//!     relay.run().await
//! }
//! ```

pub mod client_manager;
pub mod network;
pub mod status;
