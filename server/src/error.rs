//! Error taxonomy for the duel server
//!
//! The `Display` text of admission and command errors is exactly what the
//! rejected client receives in its `FULL`/`ERROR` message.

use shared::{ParticipantId, ServerEvent, MAX_PARTICIPANTS};

/// Reasons a `Connect` is refused. The connection is closed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    #[error("Server is full ({}/{} players)", MAX_PARTICIPANTS, MAX_PARTICIPANTS)]
    ServerFull,
    #[error("Card ID already in use")]
    DuplicateCard(String),
    #[error("No available slots")]
    NoSlotsAvailable,
}

impl AdmissionError {
    /// Event sent to the rejected endpoint before it is dropped.
    pub fn to_event(&self) -> ServerEvent {
        match self {
            AdmissionError::ServerFull => ServerEvent::Full {
                message: self.to_string(),
            },
            _ => ServerEvent::error(self.to_string()),
        }
    }
}

/// Rejected gameplay commands. Surfaced to the issuer only; no state changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Attacker not found")]
    UnknownAttacker,
    #[error("You are dead and cannot attack!")]
    AttackerDead,
    #[error("Target Card {0} not found")]
    UnknownTarget(String),
    #[error("Target Card {0} is already dead")]
    TargetAlreadyDead(String),
    #[error("You cannot attack your own card")]
    SelfTarget,
    #[error("No opponent found. Waiting for another player...")]
    NoOpponent,
    #[error("Not connected. Send CONNECT first.")]
    NotConnected,
}

/// Failure to hand an event to one participant's transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("outbound channel for participant {0} is closed")]
    ChannelClosed(ParticipantId),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("encoding error: {0}")]
    Encode(#[from] shared::DecodeError),
}
