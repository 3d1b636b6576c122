//! Participant registry for the duel server
//!
//! This module owns the participant table and everything that must change
//! together with it:
//! - Admission with capacity and card uniqueness checks
//! - Participant id assignment (monotonic, never reused within a run)
//! - Slot assignment and release through the [`SlotAllocator`]
//! - The card id -> participant index used by card-addressed commands
//!
//! The registry itself is not synchronised. [`crate::context::ServerContext`]
//! holds it behind the server's single lock, so every admit or remove updates
//! both indexes before any other operation can observe them.

use crate::error::AdmissionError;
use crate::link::Link;
use crate::liveness::LivenessPolicy;
use crate::slots::SlotAllocator;
use log::info;
use shared::{ParticipantId, ParticipantView, Slot, MAX_PARTICIPANTS, STARTING_HEALTH};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// One connected duel client
#[derive(Debug)]
pub struct Participant {
    /// Server-issued identifier
    pub id: ParticipantId,
    /// Client-supplied card identifier, unique among connected participants
    pub card_id: String,
    /// Parking slot held for the lifetime of the connection
    pub slot: Slot,
    /// Remaining health, never above [`STARTING_HEALTH`]
    pub health: u32,
    /// Last time any valid message arrived from this participant
    pub last_contact: Instant,
    /// Outbound channel into the owning transport
    pub link: Link,
}

impl Participant {
    pub fn new(id: ParticipantId, card_id: String, slot: Slot, link: Link, now: Instant) -> Self {
        Self {
            id,
            card_id,
            slot,
            health: STARTING_HEALTH,
            last_contact: now,
            link,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Subtracts `damage`, flooring at zero. Returns the new health.
    pub fn take_damage(&mut self, damage: u32) -> u32 {
        self.health = self.health.saturating_sub(damage);
        self.health
    }

    pub fn is_timed_out(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_contact) > timeout
    }

    pub fn view(&self) -> ParticipantView {
        ParticipantView {
            id: self.id,
            card_id: self.card_id.clone(),
            slot: self.slot,
            health: self.health,
            alive: self.is_alive(),
        }
    }
}

/// Either form of participant addressing used by the transports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantRef {
    ById(ParticipantId),
    ByCard(String),
}

pub struct Registry {
    /// Participants ordered by id, which is also admission order
    participants: BTreeMap<ParticipantId, Participant>,
    by_card: HashMap<String, ParticipantId>,
    slots: SlotAllocator,
    next_id: ParticipantId,
    max_participants: usize,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_capacity(MAX_PARTICIPANTS, SlotAllocator::new())
    }

    pub fn with_capacity(max_participants: usize, slots: SlotAllocator) -> Self {
        Self {
            participants: BTreeMap::new(),
            by_card: HashMap::new(),
            slots,
            next_id: 1,
            max_participants,
        }
    }

    /// Admits `card_id`, or explains why not.
    ///
    /// Nothing is mutated unless every check passes; in particular a failed
    /// slot assignment does not consume a participant id.
    pub fn admit(
        &mut self,
        card_id: &str,
        link: Link,
        now: Instant,
    ) -> Result<&Participant, AdmissionError> {
        if self.participants.len() >= self.max_participants {
            return Err(AdmissionError::ServerFull);
        }
        if self.by_card.contains_key(card_id) {
            return Err(AdmissionError::DuplicateCard(card_id.to_string()));
        }

        let slot = self.slots.assign(card_id)?;
        let id = self.next_id;
        self.next_id += 1;

        info!(
            "Card {} connected as Player {} via {} ({}/{})",
            card_id,
            id,
            link.kind(),
            self.participants.len() + 1,
            self.max_participants
        );

        self.by_card.insert(card_id.to_string(), id);
        let participant = self
            .participants
            .entry(id)
            .or_insert(Participant::new(id, card_id.to_string(), slot, link, now));
        Ok(&*participant)
    }

    /// Removes a participant and frees its slot. Unknown ids are a no-op.
    pub fn remove(&mut self, id: ParticipantId) -> Option<Participant> {
        let participant = self.participants.remove(&id)?;
        self.by_card.remove(&participant.card_id);
        self.slots.release(&participant.card_id);
        info!(
            "Card {} (Player {}) disconnected ({}/{})",
            participant.card_id,
            participant.id,
            self.participants.len(),
            self.max_participants
        );
        Some(participant)
    }

    pub fn get(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(&id)
    }

    pub fn get_mut(&mut self, id: ParticipantId) -> Option<&mut Participant> {
        self.participants.get_mut(&id)
    }

    pub fn get_by_card(&self, card_id: &str) -> Option<&Participant> {
        self.by_card
            .get(card_id)
            .and_then(|id| self.participants.get(id))
    }

    /// Resolves either addressing form to a participant id.
    pub fn resolve(&self, reference: &ParticipantRef) -> Option<ParticipantId> {
        match reference {
            ParticipantRef::ById(id) => self.participants.get(id).map(|p| p.id),
            ParticipantRef::ByCard(card_id) => self.by_card.get(card_id).copied(),
        }
    }

    /// The first other participant in id order, alive or not.
    pub fn opponent_of(&self, id: ParticipantId) -> Option<ParticipantId> {
        self.participants.keys().copied().find(|other| *other != id)
    }

    /// Updates the contact timestamp; false if the id is unknown.
    pub fn record_contact(&mut self, id: ParticipantId, now: Instant) -> bool {
        match self.participants.get_mut(&id) {
            Some(participant) => {
                participant.last_contact = now;
                true
            }
            None => false,
        }
    }

    /// Ids whose silence exceeds the timeout of their transport.
    pub fn timed_out(&self, now: Instant, policy: &LivenessPolicy) -> Vec<ParticipantId> {
        self.participants
            .values()
            .filter(|p| p.is_timed_out(now, policy.timeout_for(p.link.kind())))
            .map(|p| p.id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    pub fn ids(&self) -> Vec<ParticipantId> {
        self.participants.keys().copied().collect()
    }

    pub fn free_slots(&self) -> usize {
        self.slots.available()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
