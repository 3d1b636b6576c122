//! Terminal command parsing

use shared::{validate_card_id, ClientCommand};
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  connect <card>   join the duel with a card id
  attack           attack the opponent
  attack <card>    attack a specific card
  state            request the current roster
  slot             request your slot
  ping             send a heartbeat
  disconnect       leave the duel
  help             show this text
  quit             disconnect and exit";

/// What a line typed by the user asks the client to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    Send(ClientCommand),
    Help,
    Quit,
    Nothing,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("unknown command '{0}', type 'help' for a list")]
    UnknownCommand(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("invalid card id '{0}'")]
    InvalidCard(String),
}

/// Parses one line of user input. Words are case-insensitive, card ids are not.
pub fn parse_line(line: &str) -> Result<InputAction, InputError> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(InputAction::Nothing);
    };
    let arg = words.next();
    if words.next().is_some() {
        return Err(InputError::Usage("one argument at most"));
    }

    let command = match (word.to_ascii_lowercase().as_str(), arg) {
        ("connect", Some(card_id)) => ClientCommand::Connect {
            card_id: card(card_id)?,
        },
        ("connect", None) => return Err(InputError::Usage("connect <card>")),
        ("attack", None) => ClientCommand::Attack { card_id: None },
        ("attack", Some(target)) => ClientCommand::AttackByCard {
            card_id: None,
            target_card_id: card(target)?,
        },
        ("state", None) => ClientCommand::GetState,
        ("slot", None) => ClientCommand::GetSlot,
        ("ping", None) => ClientCommand::Heartbeat,
        ("disconnect", None) => ClientCommand::Disconnect,
        ("help", None) => return Ok(InputAction::Help),
        ("quit" | "exit", None) => return Ok(InputAction::Quit),
        ("state" | "slot" | "ping" | "disconnect" | "help" | "quit" | "exit", Some(_)) => {
            return Err(InputError::Usage("this command takes no argument"))
        }
        (other, _) => return Err(InputError::UnknownCommand(other.to_string())),
    };

    Ok(InputAction::Send(command))
}

fn card(card_id: &str) -> Result<String, InputError> {
    validate_card_id(card_id).map_err(|_| InputError::InvalidCard(card_id.to_string()))?;
    Ok(card_id.to_string())
}
