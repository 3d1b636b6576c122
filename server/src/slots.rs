//! Parking-slot allocation for connected cards
//!
//! The pool holds a fixed set of labels. Labels are handed out from the
//! front of a FIFO queue and returned to its back, so a freshly started
//! server always assigns `A1` then `A2`, and a released label waits behind
//! every label that is still free.

use crate::error::AdmissionError;
use log::info;
use shared::Slot;
use std::collections::{HashMap, VecDeque};

#[derive(Debug)]
pub struct SlotAllocator {
    /// Labels not currently held, in hand-out order
    available: VecDeque<Slot>,
    /// Card id -> label it currently holds
    assigned: HashMap<String, Slot>,
}

impl SlotAllocator {
    /// Creates the canonical four-label pool
    pub fn new() -> Self {
        Self::with_labels(Slot::ALL)
    }

    pub fn with_labels(labels: impl IntoIterator<Item = Slot>) -> Self {
        Self {
            available: labels.into_iter().collect(),
            assigned: HashMap::new(),
        }
    }

    /// Pops the next free label for `card_id`.
    ///
    /// A card that already holds a label keeps it; it never gets a second one.
    pub fn assign(&mut self, card_id: &str) -> Result<Slot, AdmissionError> {
        if let Some(slot) = self.assigned.get(card_id) {
            return Ok(*slot);
        }

        let slot = self
            .available
            .pop_front()
            .ok_or(AdmissionError::NoSlotsAvailable)?;
        self.assigned.insert(card_id.to_string(), slot);
        info!("Assigned slot {} to Card {}", slot, card_id);
        Ok(slot)
    }

    /// Returns the label held by `card_id` to the back of the queue.
    pub fn release(&mut self, card_id: &str) -> Option<Slot> {
        let slot = self.assigned.remove(card_id)?;
        self.available.push_back(slot);
        info!("Released slot {} from Card {}", slot, card_id);
        Some(slot)
    }

    pub fn slot_of(&self, card_id: &str) -> Option<Slot> {
        self.assigned.get(card_id).copied()
    }

    pub fn available(&self) -> usize {
        self.available.len()
    }
}

impl Default for SlotAllocator {
    fn default() -> Self {
        Self::new()
    }
}
