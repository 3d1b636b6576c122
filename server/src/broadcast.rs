//! Game state snapshots and fire-and-forget delivery
//!
//! Deliveries are collected while the server lock is held and pushed only
//! after it is released. Pushing never touches the network directly: each
//! [`Link`] just queues the event for its transport's writer, and a closed
//! link is logged and skipped without affecting the other recipients.

use crate::link::Link;
use crate::registry::{Participant, Registry};
use log::{debug, error};
use shared::{ParticipantId, ParticipantView, ServerEvent};

/// Immutable, point-in-time roster in participant id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameStateSnapshot {
    participants: Vec<ParticipantView>,
}

impl GameStateSnapshot {
    pub fn capture(registry: &Registry) -> Self {
        Self {
            participants: registry.iter().map(Participant::view).collect(),
        }
    }

    pub fn participants(&self) -> &[ParticipantView] {
        &self.participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn to_event(&self) -> ServerEvent {
        ServerEvent::game_state(self.participants.clone())
    }
}

/// An event bound for one participant's link
#[derive(Debug)]
pub struct Delivery {
    pub to: ParticipantId,
    pub link: Link,
    pub event: ServerEvent,
}

impl Delivery {
    pub fn new(participant: &Participant, event: ServerEvent) -> Self {
        Self {
            to: participant.id,
            link: participant.link.clone(),
            event,
        }
    }
}

/// Queues the current snapshot for every connected participant.
pub fn push_state(registry: &Registry, deliveries: &mut Vec<Delivery>) {
    let snapshot = GameStateSnapshot::capture(registry);
    for participant in registry.iter() {
        deliveries.push(Delivery::new(participant, snapshot.to_event()));
    }
}

/// Sends every delivery, isolating failures to their own recipient.
/// Returns how many were handed to a transport.
pub fn deliver(deliveries: Vec<Delivery>) -> usize {
    let mut sent = 0;
    for delivery in deliveries {
        match delivery.link.send(delivery.to, delivery.event) {
            Ok(()) => sent += 1,
            Err(e) => error!("Failed to deliver to Player {}: {}", delivery.to, e),
        }
    }
    debug!("Delivered {} events", sent);
    sent
}
