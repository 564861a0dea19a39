use crate::game::{Interruption, SessionController};
use crate::input::{InputCommand, HELP};
use crate::network::{Connection, ConnectionEvent, ConnectionState};
use crate::rendering::ConsolePresenter;
use log::{error, info, warn};
use shared::Peer;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// How long to wait for the relay to answer our close frame on shutdown.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Terminal client: one connection, one controller, stdin as input
pub struct Client {
    endpoint: String,
    connection: Connection,
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
    controller: SessionController<Connection, ConsolePresenter>,
}

impl Client {
    pub fn new(endpoint: &str, self_peer: Peer) -> Self {
        let (connection, events) = Connection::new();
        let controller =
            SessionController::new(self_peer, connection.clone(), ConsolePresenter::new());

        Client {
            endpoint: endpoint.to_string(),
            connection,
            events,
            controller,
        }
    }

    fn apply(&mut self, command: InputCommand) {
        match command {
            InputCommand::Move(position) => self.controller.request_move(position),
            InputCommand::Shoot => self.controller.request_shot(),
            InputCommand::List => print!("{}", self.controller.presenter().render_table()),
            InputCommand::Help => println!("{}", HELP),
            InputCommand::Quit => {}
        }
    }

    fn report(&self, interruption: Interruption) {
        match interruption {
            Interruption::Closed(code) => {
                warn!(
                    "Lost connection to relay ({:?}); continuing offline",
                    code
                );
            }
            Interruption::Errored(reason) => warn!("Relay connection error: {}", reason),
            Interruption::RelayError(code) => error!("Relay rejected us: {}", code),
        }
    }

    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Err(e) = self.connection.connect(&self.endpoint).await {
            error!("{}", e);
            warn!("Playing offline");
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut input_open = true;

        loop {
            tokio::select! {
                event = self.events.recv() => {
                    match event {
                        Some(event) => {
                            if let Some(interruption) = self.controller.handle_event(event) {
                                self.report(interruption);
                            }
                        }
                        None => break,
                    }
                },

                line = lines.next_line(), if input_open => {
                    match line {
                        Ok(Some(line)) => match line.parse::<InputCommand>() {
                            Ok(InputCommand::Quit) => break,
                            Ok(command) => self.apply(command),
                            Err(e) => warn!("{}", e),
                        },
                        Ok(None) => {
                            info!("Input closed, staying connected until Ctrl+C");
                            input_open = false;
                        }
                        Err(e) => {
                            error!("Error reading input: {}", e);
                            input_open = false;
                        }
                    }
                },

                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    async fn shutdown(&mut self) {
        self.controller.leave();
        self.connection.disconnect();

        if self.connection.state() != ConnectionState::Closing {
            return;
        }

        let events = &mut self.events;
        let closed = async {
            while let Some(event) = events.recv().await {
                if let ConnectionEvent::Closed(_) = event {
                    break;
                }
            }
        };

        if timeout(CLOSE_GRACE, closed).await.is_err() {
            warn!("Relay did not acknowledge close in time");
        }
    }
}
