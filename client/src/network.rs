//! Duplex connection to the relay
//!
//! A [`Connection`] owns one WebSocket. `connect` performs the handshake and
//! spawns a reader task and a writer task; from then on every inbound frame is
//! decoded and reported, in arrival order, as a [`ConnectionEvent`] on the
//! channel returned by [`Connection::new`]. Sends never block: they are only
//! accepted while the connection is open and are queued for the writer task.

use crate::error::{ConnectError, SendError};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use log::{debug, error, info, warn};
use shared::{decode, protocol, Inbound, Message, RelayErrorCode};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Lifecycle and traffic reported by a connection
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Opened,
    /// Close code from the relay's close frame, if it sent one
    Closed(Option<u16>),
    Errored(String),
    MessageReceived(Message),
    RelayError(RelayErrorCode),
}

/// Outbound side the session controller talks to
pub trait MessageSink {
    fn send_message(&mut self, message: Message) -> Result<(), SendError>;
}

struct Shared {
    state: Mutex<ConnectionState>,
    outbound: Mutex<Option<mpsc::UnboundedSender<WsMessage>>>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
}

/// Cloneable handle to a single relay connection
#[derive(Clone)]
pub struct Connection {
    shared: Arc<Shared>,
}

impl Connection {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let connection = Connection {
            shared: Arc::new(Shared {
                state: Mutex::new(ConnectionState::Idle),
                outbound: Mutex::new(None),
                events,
            }),
        };
        (connection, receiver)
    }

    pub fn state(&self) -> ConnectionState {
        *self.lock_state()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    fn lock_state(&self) -> MutexGuard<'_, ConnectionState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_outbound(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<WsMessage>>> {
        self.shared
            .outbound
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, state: ConnectionState) {
        *self.lock_state() = state;
    }

    fn emit(&self, event: ConnectionEvent) {
        if self.shared.events.send(event).is_err() {
            debug!("Connection event dropped, listener is gone");
        }
    }

    /// Opens the connection to `endpoint` (a `ws://` URL)
    ///
    /// Only valid from `Idle` or `Closed`. On success the state is `Open`,
    /// `Opened` has been emitted and the reader and writer tasks are running.
    pub async fn connect(&self, endpoint: &str) -> Result<(), ConnectError> {
        {
            let mut state = self.lock_state();
            match *state {
                ConnectionState::Idle | ConnectionState::Closed => {
                    *state = ConnectionState::Connecting;
                }
                other => return Err(ConnectError::InvalidState(other)),
            }
        }

        info!("Connecting to {}", endpoint);

        let socket = match tokio_tungstenite::connect_async(endpoint).await {
            Ok((socket, _response)) => socket,
            Err(e) => {
                let reason = e.to_string();
                error!("Connection error: {}", reason);
                self.set_state(ConnectionState::Closed);
                self.emit(ConnectionEvent::Errored(reason.clone()));
                return Err(ConnectError::Unreachable {
                    endpoint: endpoint.to_string(),
                    reason,
                });
            }
        };

        let (sink, stream) = socket.split();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        *self.lock_outbound() = Some(outbound_tx);
        self.set_state(ConnectionState::Open);
        info!("Connection opened");
        self.emit(ConnectionEvent::Opened);

        tokio::spawn(write_loop(sink, outbound_rx));
        tokio::spawn(read_loop(self.clone(), stream));

        Ok(())
    }

    /// Queues a message for the relay
    ///
    /// Outside `Open` nothing is queued and `NotConnected` is returned. A
    /// message the codec refuses is reported as `Unencodable`.
    pub fn send(&self, message: &Message) -> Result<(), SendError> {
        if !self.is_open() {
            return Err(SendError::NotConnected);
        }

        let text = protocol::encode_text(message)?;

        let outbound = self.lock_outbound();
        let sender = outbound.as_ref().ok_or(SendError::NotConnected)?;
        sender
            .send(WsMessage::Text(text))
            .map_err(|_| SendError::NotConnected)?;

        debug!("Sent {}", message.kind());
        Ok(())
    }

    /// Starts the close handshake. No effect unless the connection is open.
    pub fn disconnect(&self) {
        {
            let mut state = self.lock_state();
            if *state != ConnectionState::Open {
                debug!("Disconnect ignored while {}", *state);
                return;
            }
            *state = ConnectionState::Closing;
        }

        info!("Closing connection");
        // Dropping the sender ends the writer once the close frame is out.
        if let Some(sender) = self.lock_outbound().take() {
            if sender.send(WsMessage::Close(None)).is_err() {
                debug!("Writer already stopped");
            }
        }
    }

    fn dispatch(&self, bytes: &[u8]) {
        match decode(bytes) {
            Ok(Inbound::Message(message)) => {
                debug!("Received {}", message.kind());
                self.emit(ConnectionEvent::MessageReceived(message));
            }
            Ok(Inbound::RelayError(code)) => {
                warn!("Server error: {}", code.0);
                self.emit(ConnectionEvent::RelayError(code));
            }
            Err(e) => warn!("Dropping inbound frame: {}", e),
        }
    }
}

impl MessageSink for Connection {
    fn send_message(&mut self, message: Message) -> Result<(), SendError> {
        self.send(&message)
    }
}

async fn write_loop<S>(mut sink: S, mut outbound: mpsc::UnboundedReceiver<WsMessage>)
where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = sink.send(frame).await {
            warn!("Failed to write frame: {}", e);
            break;
        }
    }
}

async fn read_loop<S>(connection: Connection, mut stream: S)
where
    S: Stream<Item = Result<WsMessage, WsError>> + Unpin,
{
    let mut close_code = None;

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => connection.dispatch(text.as_bytes()),
            Ok(WsMessage::Binary(bytes)) => connection.dispatch(&bytes),
            Ok(WsMessage::Close(frame)) => {
                // Keep polling so the close reply goes out; the stream ends after it.
                close_code = frame.map(|f| u16::from(f.code));
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Connection error: {}", e);
                connection.emit(ConnectionEvent::Errored(e.to_string()));
                break;
            }
        }
    }

    connection.lock_outbound().take();
    connection.set_state(ConnectionState::Closed);
    info!("Connection closed: {:?}", close_code);
    connection.emit(ConnectionEvent::Closed(close_code));
}
