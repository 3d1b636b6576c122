//! Shared server context
//!
//! One [`ServerContext`] is built per process and handed to every transport
//! adapter and to the liveness monitor. All participant, slot and health
//! state lives behind a single lock. Each public operation takes the lock,
//! performs its whole state change, collects the resulting deliveries,
//! releases the lock and only then hands the events to the transports.

use crate::broadcast::{self, Delivery, GameStateSnapshot};
use crate::duel::{AttackOutcome, DuelEngine};
use crate::error::{AdmissionError, CommandError};
use crate::link::Link;
use crate::liveness::LivenessPolicy;
use crate::registry::{ParticipantRef, Registry};
use log::info;
use shared::{ParticipantId, ServerEvent, Slot};
use std::time::Instant;
use tokio::sync::Mutex;

/// What a transport needs to remember about an admitted participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub participant_id: ParticipantId,
    pub card_id: String,
    pub slot: Slot,
}

struct DuelState {
    registry: Registry,
    engine: DuelEngine,
}

pub struct ServerContext {
    state: Mutex<DuelState>,
    policy: LivenessPolicy,
}

impl ServerContext {
    pub fn new(policy: LivenessPolicy) -> Self {
        Self::with_parts(Registry::new(), DuelEngine::default(), policy)
    }

    pub fn with_parts(registry: Registry, engine: DuelEngine, policy: LivenessPolicy) -> Self {
        Self {
            state: Mutex::new(DuelState { registry, engine }),
            policy,
        }
    }

    pub fn policy(&self) -> LivenessPolicy {
        self.policy
    }

    /// Admits a card. On success the new participant receives `Connected`
    /// and everyone receives the updated roster.
    pub async fn admit(&self, card_id: &str, link: Link) -> Result<Admission, AdmissionError> {
        let (admission, deliveries) = {
            let mut state = self.state.lock().await;
            let registry = &mut state.registry;

            let participant = registry.admit(card_id, link, Instant::now())?;
            let admission = Admission {
                participant_id: participant.id,
                card_id: participant.card_id.clone(),
                slot: participant.slot,
            };

            let mut deliveries = vec![Delivery::new(
                participant,
                ServerEvent::connected(participant.id, &participant.card_id, participant.slot),
            )];
            broadcast::push_state(registry, &mut deliveries);
            (admission, deliveries)
        };

        broadcast::deliver(deliveries);
        Ok(admission)
    }

    /// Removes a participant. Returns whether membership changed; only then
    /// is the roster re-broadcast.
    pub async fn disconnect(&self, id: ParticipantId) -> bool {
        let deliveries = {
            let mut state = self.state.lock().await;
            if state.registry.remove(id).is_none() {
                return false;
            }
            let mut deliveries = Vec::new();
            broadcast::push_state(&state.registry, &mut deliveries);
            deliveries
        };

        broadcast::deliver(deliveries);
        true
    }

    /// Marks traffic from `id`. False if the participant is gone.
    pub async fn record_contact(&self, id: ParticipantId) -> bool {
        self.state
            .lock()
            .await
            .registry
            .record_contact(id, Instant::now())
    }

    /// Resolves an attack and notifies attacker, target and roster.
    /// A rejected attack changes nothing and notifies nobody.
    pub async fn resolve_attack(
        &self,
        attacker: ParticipantRef,
        target: Option<ParticipantRef>,
    ) -> Result<AttackOutcome, CommandError> {
        let (outcome, deliveries) = {
            let mut state = self.state.lock().await;
            let DuelState { registry, engine } = &mut *state;

            let outcome = engine.resolve_attack(registry, &attacker, target.as_ref())?;

            let mut deliveries = Vec::new();
            for (to, event) in outcome.events() {
                if let Some(participant) = registry.get(to) {
                    deliveries.push(Delivery::new(participant, event));
                }
            }
            broadcast::push_state(registry, &mut deliveries);
            (outcome, deliveries)
        };

        broadcast::deliver(deliveries);
        Ok(outcome)
    }

    /// Sends one event to one participant, e.g. a command error reply.
    pub async fn send_to(&self, id: ParticipantId, event: ServerEvent) -> bool {
        let delivery = {
            let state = self.state.lock().await;
            match state.registry.get(id) {
                Some(participant) => Delivery::new(participant, event),
                None => return false,
            }
        };
        broadcast::deliver(vec![delivery]) == 1
    }

    /// Replies to a `GetState` with the current roster.
    pub async fn send_state(&self, id: ParticipantId) -> bool {
        let snapshot = self.snapshot().await;
        self.send_to(id, snapshot.to_event()).await
    }

    /// Replies to a `GetSlot` with the participant's own slot.
    pub async fn send_slot(&self, id: ParticipantId) -> Result<(), CommandError> {
        let delivery = {
            let state = self.state.lock().await;
            let participant = state.registry.get(id).ok_or(CommandError::NotConnected)?;
            Delivery::new(
                participant,
                ServerEvent::SlotInfo {
                    card_id: participant.card_id.clone(),
                    slot: participant.slot,
                },
            )
        };
        broadcast::deliver(vec![delivery]);
        Ok(())
    }

    pub async fn snapshot(&self) -> GameStateSnapshot {
        GameStateSnapshot::capture(&self.state.lock().await.registry)
    }

    /// Broadcasts the current roster to everyone.
    pub async fn broadcast(&self) -> usize {
        let deliveries = {
            let state = self.state.lock().await;
            let mut deliveries = Vec::new();
            broadcast::push_state(&state.registry, &mut deliveries);
            deliveries
        };
        broadcast::deliver(deliveries)
    }

    /// Removes everyone silent for longer than their transport's timeout
    /// as of `now`, broadcasting once if anyone was removed.
    pub async fn evict_stale(&self, now: Instant) -> Vec<ParticipantId> {
        let (evicted, deliveries) = {
            let mut state = self.state.lock().await;
            let evicted = state.registry.timed_out(now, &self.policy);
            for id in &evicted {
                if let Some(participant) = state.registry.remove(*id) {
                    info!(
                        "Player {} (Card {}) timed out after {:?} of silence",
                        participant.id,
                        participant.card_id,
                        now.saturating_duration_since(participant.last_contact)
                    );
                }
            }

            let mut deliveries = Vec::new();
            if !evicted.is_empty() {
                broadcast::push_state(&state.registry, &mut deliveries);
            }
            (evicted, deliveries)
        };

        broadcast::deliver(deliveries);
        evicted
    }

    pub async fn connected_ids(&self) -> Vec<ParticipantId> {
        self.state.lock().await.registry.ids()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.registry.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.registry.is_empty()
    }
}

impl Default for ServerContext {
    fn default() -> Self {
        Self::new(LivenessPolicy::default())
    }
}
