//! Pipe-delimited text encoding used over UDP.
//!
//! One datagram carries one message. Fields are separated by `|`; free-text
//! messages always come last so they may themselves contain `|`.

use crate::{validate_card_id, ClientCommand, DecodeError, ParticipantView, ServerEvent, Slot};

pub fn encode_command(command: &ClientCommand) -> String {
    match command {
        ClientCommand::Connect { card_id } => format!("CONNECT|{}", card_id),
        ClientCommand::Attack { card_id: Some(card_id) } => format!("ATTACK|{}", card_id),
        ClientCommand::Attack { card_id: None } => "ATTACK".to_string(),
        ClientCommand::AttackByCard { target_card_id, .. } => {
            format!("ATTACK_BY_CARD|{}", target_card_id)
        }
        ClientCommand::Heartbeat => "HEARTBEAT".to_string(),
        ClientCommand::GetState => "GET_STATE".to_string(),
        ClientCommand::GetSlot => "GET_SLOT".to_string(),
        ClientCommand::Disconnect => "DISCONNECT".to_string(),
    }
}

pub fn decode_command(message: &str) -> Result<ClientCommand, DecodeError> {
    let message = message.trim_end_matches(['\r', '\n']);
    if message.is_empty() {
        return Err(DecodeError::Empty);
    }

    let mut parts = message.split('|');
    let kind = parts.next().unwrap_or_default();
    let arg = parts.next().filter(|s| !s.is_empty());

    match kind {
        "CONNECT" => {
            let card_id = arg.ok_or(DecodeError::MissingField("cardID"))?;
            validate_card_id(card_id)?;
            Ok(ClientCommand::Connect {
                card_id: card_id.to_string(),
            })
        }
        "ATTACK" => Ok(ClientCommand::Attack {
            card_id: arg.map(str::to_string),
        }),
        "ATTACK_BY_CARD" => {
            let target = arg.ok_or(DecodeError::MissingField("targetCardID"))?;
            Ok(ClientCommand::AttackByCard {
                card_id: None,
                target_card_id: target.to_string(),
            })
        }
        // Older clients append their player id to these; it is ignored.
        "HEARTBEAT" => Ok(ClientCommand::Heartbeat),
        "GET_STATE" => Ok(ClientCommand::GetState),
        "GET_SLOT" => Ok(ClientCommand::GetSlot),
        "DISCONNECT" => Ok(ClientCommand::Disconnect),
        other => Err(DecodeError::UnknownType(other.to_string())),
    }
}

pub fn encode_event(event: &ServerEvent) -> String {
    match event {
        ServerEvent::Connected {
            participant_id,
            card_id,
            slot,
            ..
        } => format!("CONNECTED|{}|{}|{}", participant_id, card_id, slot),
        ServerEvent::Full { message } => format!("FULL|{}", message),
        ServerEvent::Error { message } => format!("ERROR|{}", message),
        ServerEvent::AttackSuccess {
            damage,
            target_id,
            target_card_id,
            target_slot,
            target_health,
        } => format!(
            "ATTACK_SUCCESS|{}|{}|{}|{}|{}",
            damage, target_id, target_card_id, target_slot, target_health
        ),
        ServerEvent::Attacked {
            attacker_id,
            attacker_card_id,
            attacker_slot,
            damage,
            new_health,
        } => format!(
            "ATTACKED|{}|{}|{}|{}|{}",
            attacker_id, attacker_card_id, attacker_slot, damage, new_health
        ),
        ServerEvent::Victory {
            message,
            defeated_card_id,
        } => format!("VICTORY|{}|{}", defeated_card_id, message),
        ServerEvent::Defeat {
            message,
            winner_card_id,
        } => format!("DEFEAT|{}|{}", winner_card_id, message),
        ServerEvent::GameState {
            players,
            player_count,
        } => {
            let mut out = format!("STATE|{}", player_count);
            for p in players {
                out.push_str(&format!(
                    "|{},{},{},{},{}",
                    p.id,
                    p.card_id,
                    p.slot,
                    p.health,
                    if p.alive { "1" } else { "0" }
                ));
            }
            out
        }
        ServerEvent::SlotInfo { card_id, slot } => format!("SLOT|{}|{}", card_id, slot),
    }
}

pub fn decode_event(message: &str) -> Result<ServerEvent, DecodeError> {
    let message = message.trim_end_matches(['\r', '\n']);
    if message.is_empty() {
        return Err(DecodeError::Empty);
    }

    let (kind, rest) = message.split_once('|').unwrap_or((message, ""));
    let mut fields = Fields::new(rest);

    let event = match kind {
        "CONNECTED" => {
            let participant_id = fields.number("playerId")?;
            let card_id = fields.string("cardID")?;
            let slot = fields.slot("assignedSlot")?;
            ServerEvent::connected(participant_id, &card_id, slot)
        }
        "FULL" => ServerEvent::Full {
            message: rest.to_string(),
        },
        "ERROR" => ServerEvent::Error {
            message: rest.to_string(),
        },
        "ATTACK_SUCCESS" => ServerEvent::AttackSuccess {
            damage: fields.number("damage")?,
            target_id: fields.number("targetId")?,
            target_card_id: fields.string("targetCardID")?,
            target_slot: fields.slot("targetSlot")?,
            target_health: fields.number("targetHealth")?,
        },
        "ATTACKED" => ServerEvent::Attacked {
            attacker_id: fields.number("attackerId")?,
            attacker_card_id: fields.string("attackerCardID")?,
            attacker_slot: fields.slot("attackerSlot")?,
            damage: fields.number("damage")?,
            new_health: fields.number("newHealth")?,
        },
        "VICTORY" => {
            let (defeated_card_id, message) = split_message(rest, "defeatedCardID")?;
            ServerEvent::Victory {
                message,
                defeated_card_id,
            }
        }
        "DEFEAT" => {
            let (winner_card_id, message) = split_message(rest, "winnerCardID")?;
            ServerEvent::Defeat {
                message,
                winner_card_id,
            }
        }
        "STATE" => {
            let player_count: usize = fields.number("playerCount")?;
            let players = fields
                .remaining()
                .map(decode_participant)
                .collect::<Result<Vec<_>, _>>()?;
            if players.len() != player_count {
                return Err(DecodeError::InvalidField {
                    field: "playerCount",
                    value: player_count.to_string(),
                });
            }
            ServerEvent::GameState {
                players,
                player_count,
            }
        }
        "SLOT" => ServerEvent::SlotInfo {
            card_id: fields.string("cardID")?,
            slot: fields.slot("slot")?,
        },
        other => return Err(DecodeError::UnknownType(other.to_string())),
    };

    Ok(event)
}

fn split_message(rest: &str, field: &'static str) -> Result<(String, String), DecodeError> {
    let (card_id, message) = rest.split_once('|').ok_or(DecodeError::MissingField(field))?;
    Ok((card_id.to_string(), message.to_string()))
}

fn decode_participant(entry: &str) -> Result<ParticipantView, DecodeError> {
    let mut fields = Fields::with_separator(entry, ',');
    let view = ParticipantView {
        id: fields.number("id")?,
        card_id: fields.string("cardID")?,
        slot: fields.slot("assignedSlot")?,
        health: fields.number("health")?,
        alive: match fields.string("isAlive")?.as_str() {
            "1" => true,
            "0" => false,
            other => {
                return Err(DecodeError::InvalidField {
                    field: "isAlive",
                    value: other.to_string(),
                })
            }
        },
    };
    Ok(view)
}

struct Fields<'a> {
    inner: std::iter::Filter<std::str::Split<'a, char>, fn(&&str) -> bool>,
}

impl<'a> Fields<'a> {
    fn new(rest: &'a str) -> Self {
        Self::with_separator(rest, '|')
    }

    fn with_separator(rest: &'a str, separator: char) -> Self {
        let not_empty: fn(&&str) -> bool = |s| !s.is_empty();
        Self {
            inner: rest.split(separator).filter(not_empty),
        }
    }

    fn string(&mut self, field: &'static str) -> Result<String, DecodeError> {
        self.inner
            .next()
            .map(str::to_string)
            .ok_or(DecodeError::MissingField(field))
    }

    fn number<T: std::str::FromStr>(&mut self, field: &'static str) -> Result<T, DecodeError> {
        let raw = self.inner.next().ok_or(DecodeError::MissingField(field))?;
        raw.parse().map_err(|_| DecodeError::InvalidField {
            field,
            value: raw.to_string(),
        })
    }

    fn slot(&mut self, field: &'static str) -> Result<Slot, DecodeError> {
        let raw = self.inner.next().ok_or(DecodeError::MissingField(field))?;
        raw.parse().map_err(|_| DecodeError::InvalidField {
            field,
            value: raw.to_string(),
        })
    }

    fn remaining(self) -> impl Iterator<Item = &'a str> {
        self.inner
    }
}
