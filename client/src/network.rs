use crate::input::{parse_line, InputAction, HELP};
use log::{debug, error, info, warn};
use shared::{text, ClientCommand, ParticipantId, ServerEvent, Slot};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::time::interval;

const MAX_DATAGRAM: usize = 2048;

/// Where the client stands with the server, as far as it has been told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub participant_id: ParticipantId,
    pub card_id: String,
    pub slot: Slot,
    pub health: u32,
}

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    session: Option<Session>,
}

impl Client {
    pub async fn new(server_addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            session: None,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub async fn send_command(&self, command: &ClientCommand) -> std::io::Result<()> {
        let data = text::encode_command(command);
        debug!("-> {}", data);
        self.socket.send_to(data.as_bytes(), self.server_addr).await?;
        Ok(())
    }

    /// Waits for the next event from the server, skipping anything unparsable.
    pub async fn recv_event(&self) -> std::io::Result<ServerEvent> {
        let mut buffer = [0u8; MAX_DATAGRAM];
        loop {
            let (len, from) = self.socket.recv_from(&mut buffer).await?;
            if from != self.server_addr {
                debug!("Ignoring datagram from {}", from);
                continue;
            }
            match std::str::from_utf8(&buffer[..len])
                .ok()
                .map(text::decode_event)
            {
                Some(Ok(event)) => return Ok(event),
                Some(Err(e)) => warn!("Unparsable message from server: {}", e),
                None => warn!("Non UTF-8 datagram from server"),
            }
        }
    }

    /// Updates the local session from an event and returns a line to show.
    pub fn handle_event(&mut self, event: ServerEvent) -> String {
        match event {
            ServerEvent::Connected {
                participant_id,
                card_id,
                slot,
                message,
            } => {
                self.session = Some(Session {
                    participant_id,
                    card_id,
                    slot,
                    health: shared::STARTING_HEALTH,
                });
                message
            }
            ServerEvent::Full { message } => format!("Server full: {}", message),
            ServerEvent::Error { message } => {
                if message.starts_with("Not connected") {
                    self.session = None;
                }
                format!("Error: {}", message)
            }
            ServerEvent::AttackSuccess {
                damage,
                target_card_id,
                target_slot,
                target_health,
                ..
            } => format!(
                "Hit Card {} in Slot {} for {} damage ({} health left)",
                target_card_id, target_slot, damage, target_health
            ),
            ServerEvent::Attacked {
                attacker_card_id,
                attacker_slot,
                damage,
                new_health,
                ..
            } => {
                if let Some(session) = self.session.as_mut() {
                    session.health = new_health;
                }
                format!(
                    "Card {} in Slot {} hit you for {} damage ({} health left)",
                    attacker_card_id, attacker_slot, damage, new_health
                )
            }
            ServerEvent::Victory { message, .. } => format!("VICTORY! {}", message),
            ServerEvent::Defeat { message, .. } => format!("DEFEAT. {}", message),
            ServerEvent::GameState {
                players,
                player_count,
            } => {
                let mut lines = vec![format!("{} player(s) in the duel", player_count)];
                for player in players {
                    if let Some(session) = self.session.as_mut() {
                        if session.participant_id == player.id {
                            session.health = player.health;
                            session.slot = player.slot;
                        }
                    }
                    lines.push(format!(
                        "  Player {} Card {} Slot {} health {}{}",
                        player.id,
                        player.card_id,
                        player.slot,
                        player.health,
                        if player.alive { "" } else { " (defeated)" }
                    ));
                }
                lines.join("\n")
            }
            ServerEvent::SlotInfo { card_id, slot } => {
                format!("Card {} is in Slot {}", card_id, slot)
            }
        }
    }

    /// Runs the interactive loop: stdin commands out, server events in, and a
    /// heartbeat while connected. A card given up front is connected at once.
    pub async fn run(
        &mut self,
        card_id: Option<String>,
        heartbeat: Duration,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(card_id) = card_id {
            info!("Connecting to {} with Card {}", self.server_addr, card_id);
            self.send_command(&ClientCommand::Connect { card_id }).await?;
        }

        let mut heartbeat_interval = interval(heartbeat);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        println!("{}", HELP);

        loop {
            tokio::select! {
                result = self.recv_event() => {
                    match result {
                        Ok(event) => println!("{}", self.handle_event(event)),
                        Err(e) => error!("Error receiving from server: {}", e),
                    }
                },

                _ = heartbeat_interval.tick() => {
                    if self.is_connected() {
                        if let Err(e) = self.send_command(&ClientCommand::Heartbeat).await {
                            error!("Error sending heartbeat: {}", e);
                        }
                    }
                },

                line = lines.next_line() => {
                    let Some(line) = line? else {
                        // stdin closed
                        break;
                    };
                    match parse_line(&line) {
                        Ok(InputAction::Send(command)) => {
                            let leaving = command == ClientCommand::Disconnect;
                            self.send_command(&command).await?;
                            if leaving {
                                self.session = None;
                            }
                        }
                        Ok(InputAction::Help) => println!("{}", HELP),
                        Ok(InputAction::Quit) => break,
                        Ok(InputAction::Nothing) => {}
                        Err(e) => println!("{}", e),
                    }
                },
            }
        }

        if self.is_connected() {
            if let Err(e) = self.send_command(&ClientCommand::Disconnect).await {
                debug!("Failed to send DISCONNECT on exit: {}", e);
            }
        }

        Ok(())
    }
}
