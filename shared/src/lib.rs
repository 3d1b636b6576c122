use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod json;
pub mod text;

pub const MAX_PARTICIPANTS: usize = 2;
pub const ATTACK_DAMAGE: u32 = 10;
pub const STARTING_HEALTH: u32 = 100;
pub const DEFAULT_UDP_PORT: u16 = 7777;
pub const DEFAULT_WS_PORT: u16 = 8080;

pub type ParticipantId = u32;

/// Physical parking position for a card on the play mat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    A1,
    A2,
    B1,
    B2,
}

impl Slot {
    /// Canonical pool order; allocation hands labels out in this order.
    pub const ALL: [Slot; 4] = [Slot::A1, Slot::A2, Slot::B1, Slot::B2];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::A1 => "A1",
            Slot::A2 => "A2",
            Slot::B1 => "B1",
            Slot::B2 => "B2",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Slot::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| DecodeError::InvalidField {
                field: "slot",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    pub id: ParticipantId,
    #[serde(rename = "cardID")]
    pub card_id: String,
    #[serde(rename = "assignedSlot")]
    pub slot: Slot,
    pub health: u32,
    #[serde(rename = "isAlive")]
    pub alive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientCommand {
    Connect {
        #[serde(rename = "cardID")]
        card_id: String,
    },
    /// Attack the sole opponent. The card id is informational only.
    Attack {
        #[serde(rename = "cardID", default, skip_serializing_if = "Option::is_none")]
        card_id: Option<String>,
    },
    AttackByCard {
        #[serde(rename = "cardID", default, skip_serializing_if = "Option::is_none")]
        card_id: Option<String>,
        #[serde(rename = "targetCardID")]
        target_card_id: String,
    },
    Heartbeat,
    GetState,
    GetSlot,
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerEvent {
    Connected {
        #[serde(rename = "playerId")]
        participant_id: ParticipantId,
        #[serde(rename = "cardID")]
        card_id: String,
        #[serde(rename = "assignedSlot")]
        slot: Slot,
        message: String,
    },
    Full {
        message: String,
    },
    Error {
        message: String,
    },
    AttackSuccess {
        damage: u32,
        #[serde(rename = "targetId")]
        target_id: ParticipantId,
        #[serde(rename = "targetCardID")]
        target_card_id: String,
        #[serde(rename = "targetSlot")]
        target_slot: Slot,
        #[serde(rename = "targetHealth")]
        target_health: u32,
    },
    Attacked {
        #[serde(rename = "attackerId")]
        attacker_id: ParticipantId,
        #[serde(rename = "attackerCardID")]
        attacker_card_id: String,
        #[serde(rename = "attackerSlot")]
        attacker_slot: Slot,
        damage: u32,
        #[serde(rename = "newHealth")]
        new_health: u32,
    },
    Victory {
        message: String,
        #[serde(rename = "defeatedCardID")]
        defeated_card_id: String,
    },
    Defeat {
        message: String,
        #[serde(rename = "winnerCardID")]
        winner_card_id: String,
    },
    GameState {
        players: Vec<ParticipantView>,
        #[serde(rename = "playerCount")]
        player_count: usize,
    },
    SlotInfo {
        #[serde(rename = "cardID")]
        card_id: String,
        slot: Slot,
    },
}

impl ServerEvent {
    pub fn connected(participant_id: ParticipantId, card_id: &str, slot: Slot) -> Self {
        ServerEvent::Connected {
            participant_id,
            card_id: card_id.to_string(),
            slot,
            message: format!("Connected as Player {} with Card {}", participant_id, card_id),
        }
    }

    pub fn game_state(players: Vec<ParticipantView>) -> Self {
        let player_count = players.len();
        ServerEvent::GameState {
            players,
            player_count,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("empty message")]
    Empty,
    #[error("unknown message type: {0}")]
    UnknownType(String),
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Card ids travel inside the pipe/comma framed text protocol, so those
/// separators are not allowed in either encoding.
pub fn validate_card_id(card_id: &str) -> Result<(), DecodeError> {
    if card_id.is_empty() || card_id.contains(['|', ',']) || card_id.trim() != card_id {
        return Err(DecodeError::InvalidField {
            field: "cardID",
            value: card_id.to_string(),
        });
    }
    Ok(())
}
