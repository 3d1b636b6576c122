//! Transport adapters and the command dispatch they share
//!
//! Both adapters decode their wire format into [`ClientCommand`]s and hand
//! every command from an admitted participant to [`dispatch`]. Only framing,
//! endpoint bookkeeping and admission replies differ between them.

pub mod udp;
pub mod ws;

use crate::context::{Admission, ServerContext};
use crate::error::CommandError;
use crate::registry::ParticipantRef;
use log::{debug, warn};
use shared::{ClientCommand, ServerEvent};

/// Whether the adapter should keep the participant's channel open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// Applies one decoded command from an admitted participant.
pub async fn dispatch(context: &ServerContext, session: &Admission, command: ClientCommand) -> Flow {
    let id = session.participant_id;

    // Any parsed message proves liveness, not only heartbeats
    if !context.record_contact(id).await {
        debug!("Dropping {:?} from departed Player {}", command, id);
        return Flow::Close;
    }

    match command {
        ClientCommand::Connect { card_id } => {
            warn!(
                "Player {} sent CONNECT for Card {} while already connected",
                id, card_id
            );
            context
                .send_to(
                    id,
                    ServerEvent::error(format!(
                        "Already connected as Player {} with Card {}",
                        id, session.card_id
                    )),
                )
                .await;
        }
        ClientCommand::Attack { .. } => {
            let result = context.resolve_attack(ParticipantRef::ById(id), None).await;
            reject_on_error(context, session, result.err()).await;
        }
        ClientCommand::AttackByCard { target_card_id, .. } => {
            let result = context
                .resolve_attack(
                    ParticipantRef::ByCard(session.card_id.clone()),
                    Some(ParticipantRef::ByCard(target_card_id)),
                )
                .await;
            reject_on_error(context, session, result.err()).await;
        }
        ClientCommand::Heartbeat => {
            debug!("Heartbeat from Player {}", id);
        }
        ClientCommand::GetState => {
            context.send_state(id).await;
        }
        ClientCommand::GetSlot => {
            let result = context.send_slot(id).await;
            reject_on_error(context, session, result.err()).await;
        }
        ClientCommand::Disconnect => {
            context.disconnect(id).await;
            return Flow::Close;
        }
    }

    Flow::Continue
}

async fn reject_on_error(context: &ServerContext, session: &Admission, error: Option<CommandError>) {
    if let Some(error) = error {
        warn!(
            "Rejected command from Card {} (Player {}): {}",
            session.card_id, session.participant_id, error
        );
        context
            .send_to(session.participant_id, ServerEvent::error(error.to_string()))
            .await;
    }
}
