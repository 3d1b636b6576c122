//! JSON encoding used over WebSocket text frames.

use crate::{validate_card_id, ClientCommand, DecodeError, ServerEvent};

pub fn encode_command(command: &ClientCommand) -> Result<String, DecodeError> {
    Ok(serde_json::to_string(command)?)
}

pub fn decode_command(message: &str) -> Result<ClientCommand, DecodeError> {
    let value: serde_json::Value = serde_json::from_str(message)?;
    let kind = value
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or(DecodeError::MissingField("type"))?;

    if !KNOWN_COMMANDS.contains(&kind) {
        return Err(DecodeError::UnknownType(kind.to_string()));
    }

    let command: ClientCommand = serde_json::from_value(value)?;
    if let ClientCommand::Connect { card_id } = &command {
        validate_card_id(card_id)?;
    }
    Ok(command)
}

pub fn encode_event(event: &ServerEvent) -> Result<String, DecodeError> {
    Ok(serde_json::to_string(event)?)
}

pub fn decode_event(message: &str) -> Result<ServerEvent, DecodeError> {
    Ok(serde_json::from_str(message)?)
}

const KNOWN_COMMANDS: [&str; 7] = [
    "CONNECT",
    "ATTACK",
    "ATTACK_BY_CARD",
    "HEARTBEAT",
    "GET_STATE",
    "GET_SLOT",
    "DISCONNECT",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParticipantView, Slot};
    use serde_json::json;

    #[test]
    fn test_decode_unity_client_messages() {
        assert_eq!(
            decode_command(r#"{"type":"CONNECT","cardID":"CARD001"}"#).unwrap(),
            ClientCommand::Connect {
                card_id: "CARD001".to_string()
            }
        );
        assert_eq!(
            decode_command(r#"{"type":"ATTACK","cardID":"CARD001"}"#).unwrap(),
            ClientCommand::Attack {
                card_id: Some("CARD001".to_string())
            }
        );
        assert_eq!(
            decode_command(r#"{"type":"ATTACK_BY_CARD","cardID":"A","targetCardID":"B"}"#)
                .unwrap(),
            ClientCommand::AttackByCard {
                card_id: Some("A".to_string()),
                target_card_id: "B".to_string()
            }
        );
        assert_eq!(
            decode_command(r#"{"type":"HEARTBEAT"}"#).unwrap(),
            ClientCommand::Heartbeat
        );
        assert_eq!(
            decode_command(r#"{"type":"GET_SLOT"}"#).unwrap(),
            ClientCommand::GetSlot
        );
    }

    #[test]
    fn test_decode_rejects_unknown_and_malformed() {
        assert!(matches!(
            decode_command(r#"{"type":"DANCE"}"#),
            Err(DecodeError::UnknownType(_))
        ));
        assert!(matches!(
            decode_command(r#"{"cardID":"A"}"#),
            Err(DecodeError::MissingField("type"))
        ));
        assert!(matches!(decode_command("not json"), Err(DecodeError::Json(_))));
        assert!(matches!(
            decode_command(r#"{"type":"CONNECT"}"#),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(
            decode_command(r#"{"type":"CONNECT","cardID":""}"#),
            Err(DecodeError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_event_field_names() {
        let event = ServerEvent::AttackSuccess {
            damage: 10,
            target_id: 2,
            target_card_id: "CARD_B".to_string(),
            target_slot: Slot::A2,
            target_health: 90,
        };
        let value: serde_json::Value =
            serde_json::from_str(&encode_event(&event).unwrap()).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "ATTACK_SUCCESS",
                "damage": 10,
                "targetId": 2,
                "targetCardID": "CARD_B",
                "targetSlot": "A2",
                "targetHealth": 90
            })
        );
    }

    #[test]
    fn test_game_state_shape() {
        let event = ServerEvent::game_state(vec![ParticipantView {
            id: 1,
            card_id: "CARD_A".to_string(),
            slot: Slot::A1,
            health: 100,
            alive: true,
        }]);
        let value: serde_json::Value =
            serde_json::from_str(&encode_event(&event).unwrap()).unwrap();

        assert_eq!(value["type"], "GAME_STATE");
        assert_eq!(value["playerCount"], 1);
        assert_eq!(value["players"][0]["cardID"], "CARD_A");
        assert_eq!(value["players"][0]["assignedSlot"], "A1");
        assert_eq!(value["players"][0]["isAlive"], true);
    }

    #[test]
    fn test_connected_uses_player_id() {
        let encoded = encode_event(&ServerEvent::connected(1, "CARD_A", Slot::A1)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["type"], "CONNECTED");
        assert_eq!(value["playerId"], 1);
        assert_eq!(value["assignedSlot"], "A1");
    }
}
