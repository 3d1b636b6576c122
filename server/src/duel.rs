//! Attack resolution

use crate::error::CommandError;
use crate::registry::{ParticipantRef, Registry};
use log::info;
use shared::{ParticipantId, ServerEvent, Slot, ATTACK_DAMAGE};

/// Result of one resolved attack, captured after damage was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackOutcome {
    pub attacker_id: ParticipantId,
    pub attacker_card_id: String,
    pub attacker_slot: Slot,
    pub target_id: ParticipantId,
    pub target_card_id: String,
    pub target_slot: Slot,
    pub damage: u32,
    pub target_health: u32,
}

impl AttackOutcome {
    /// True when this attack left the target at zero health.
    pub fn is_victory(&self) -> bool {
        self.target_health == 0
    }

    /// Per-recipient notifications, in send order.
    pub fn events(&self) -> Vec<(ParticipantId, ServerEvent)> {
        let mut events = vec![
            (
                self.attacker_id,
                ServerEvent::AttackSuccess {
                    damage: self.damage,
                    target_id: self.target_id,
                    target_card_id: self.target_card_id.clone(),
                    target_slot: self.target_slot,
                    target_health: self.target_health,
                },
            ),
            (
                self.target_id,
                ServerEvent::Attacked {
                    attacker_id: self.attacker_id,
                    attacker_card_id: self.attacker_card_id.clone(),
                    attacker_slot: self.attacker_slot,
                    damage: self.damage,
                    new_health: self.target_health,
                },
            ),
        ];

        if self.is_victory() {
            events.push((
                self.attacker_id,
                ServerEvent::Victory {
                    message: format!(
                        "You defeated Card {} in Slot {}!",
                        self.target_card_id, self.target_slot
                    ),
                    defeated_card_id: self.target_card_id.clone(),
                },
            ));
            events.push((
                self.target_id,
                ServerEvent::Defeat {
                    message: format!(
                        "You were defeated by Card {} in Slot {}!",
                        self.attacker_card_id, self.attacker_slot
                    ),
                    winner_card_id: self.attacker_card_id.clone(),
                },
            ));
        }

        events
    }
}

#[derive(Debug, Clone)]
pub struct DuelEngine {
    damage: u32,
}

impl DuelEngine {
    pub fn new(damage: u32) -> Self {
        Self { damage }
    }

    /// Resolves one attack against the registry.
    ///
    /// With an explicit target, a dead target is rejected. Without one, the
    /// sole opponent is hit regardless of whether it is still alive, so a
    /// finished duel keeps re-announcing its result until someone leaves.
    pub fn resolve_attack(
        &self,
        registry: &mut Registry,
        attacker: &ParticipantRef,
        target: Option<&ParticipantRef>,
    ) -> Result<AttackOutcome, CommandError> {
        let attacker_id = registry
            .resolve(attacker)
            .ok_or(CommandError::UnknownAttacker)?;
        let (attacker_card_id, attacker_slot, attacker_alive) = {
            let a = registry
                .get(attacker_id)
                .ok_or(CommandError::UnknownAttacker)?;
            (a.card_id.clone(), a.slot, a.is_alive())
        };
        if !attacker_alive {
            return Err(CommandError::AttackerDead);
        }

        let target_id = match target {
            Some(reference) => {
                let id = registry
                    .resolve(reference)
                    .ok_or_else(|| CommandError::UnknownTarget(describe(reference)))?;
                if id == attacker_id {
                    return Err(CommandError::SelfTarget);
                }
                let target = registry
                    .get(id)
                    .ok_or_else(|| CommandError::UnknownTarget(describe(reference)))?;
                if !target.is_alive() {
                    return Err(CommandError::TargetAlreadyDead(target.card_id.clone()));
                }
                id
            }
            None => registry
                .opponent_of(attacker_id)
                .ok_or(CommandError::NoOpponent)?,
        };

        let target = registry
            .get_mut(target_id)
            .ok_or(CommandError::NoOpponent)?;
        let target_health = target.take_damage(self.damage);

        let outcome = AttackOutcome {
            attacker_id,
            attacker_card_id,
            attacker_slot,
            target_id,
            target_card_id: target.card_id.clone(),
            target_slot: target.slot,
            damage: self.damage,
            target_health,
        };

        info!(
            "Card {} (Slot {}) attacked Card {} (Slot {}), health now {}",
            outcome.attacker_card_id,
            outcome.attacker_slot,
            outcome.target_card_id,
            outcome.target_slot,
            outcome.target_health
        );
        if outcome.is_victory() {
            info!(
                "GAME OVER! Card {} (Slot {}) wins",
                outcome.attacker_card_id, outcome.attacker_slot
            );
        }

        Ok(outcome)
    }
}

impl Default for DuelEngine {
    fn default() -> Self {
        Self::new(ATTACK_DAMAGE)
    }
}

fn describe(reference: &ParticipantRef) -> String {
    match reference {
        ParticipantRef::ById(id) => format!("#{}", id),
        ParticipantRef::ByCard(card_id) => card_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{Link, TransportKind};
    use std::time::Instant;

    fn duel() -> (Registry, ParticipantId, ParticipantId) {
        let mut registry = Registry::new();
        let a = registry
            .admit("CARD_A", Link::channel(TransportKind::Udp).0, Instant::now())
            .unwrap()
            .id;
        let b = registry
            .admit("CARD_B", Link::channel(TransportKind::Udp).0, Instant::now())
            .unwrap()
            .id;
        (registry, a, b)
    }

    fn by_card(card_id: &str) -> ParticipantRef {
        ParticipantRef::ByCard(card_id.to_string())
    }

    #[test]
    fn test_implicit_attack_hits_opponent() {
        let (mut registry, a, b) = duel();
        let engine = DuelEngine::default();

        let outcome = engine
            .resolve_attack(&mut registry, &ParticipantRef::ById(a), None)
            .unwrap();

        assert_eq!(outcome.target_id, b);
        assert_eq!(outcome.damage, 10);
        assert_eq!(outcome.target_health, 90);
        assert_eq!(outcome.target_slot, Slot::A2);
        assert!(!outcome.is_victory());
        assert_eq!(registry.get(b).unwrap().health, 90);
        assert_eq!(registry.get(a).unwrap().health, 100);
    }

    #[test]
    fn test_ten_attacks_defeat_opponent() {
        let (mut registry, a, b) = duel();
        let engine = DuelEngine::default();

        for round in 1..=10 {
            let outcome = engine
                .resolve_attack(&mut registry, &ParticipantRef::ById(a), None)
                .unwrap();
            assert_eq!(outcome.target_health, 100 - round * 10);
            assert_eq!(outcome.is_victory(), round == 10);
        }

        let target = registry.get(b).unwrap();
        assert_eq!(target.health, 0);
        assert!(!target.is_alive());
    }

    #[test]
    fn test_victory_events() {
        let (mut registry, a, b) = duel();
        registry.get_mut(b).unwrap().health = 10;

        let outcome = DuelEngine::default()
            .resolve_attack(&mut registry, &ParticipantRef::ById(a), None)
            .unwrap();
        let events = outcome.events();

        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], (id, ServerEvent::AttackSuccess { .. }) if id == a));
        assert!(matches!(events[1], (id, ServerEvent::Attacked { new_health: 0, .. }) if id == b));
        match &events[2] {
            (id, ServerEvent::Victory { message, defeated_card_id }) => {
                assert_eq!(*id, a);
                assert!(message.starts_with("You defeated Card CARD_B"));
                assert_eq!(defeated_card_id, "CARD_B");
            }
            other => panic!("Unexpected event: {:?}", other),
        }
        match &events[3] {
            (id, ServerEvent::Defeat { winner_card_id, .. }) => {
                assert_eq!(*id, b);
                assert_eq!(winner_card_id, "CARD_A");
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_non_lethal_attack_has_two_events() {
        let (mut registry, a, _) = duel();
        let outcome = DuelEngine::default()
            .resolve_attack(&mut registry, &ParticipantRef::ById(a), None)
            .unwrap();
        assert_eq!(outcome.events().len(), 2);
    }

    #[test]
    fn test_dead_attacker_cannot_attack() {
        let (mut registry, a, b) = duel();
        registry.get_mut(a).unwrap().health = 0;

        let result =
            DuelEngine::default().resolve_attack(&mut registry, &ParticipantRef::ById(a), None);

        assert_eq!(result, Err(CommandError::AttackerDead));
        assert_eq!(registry.get(b).unwrap().health, 100);
    }

    #[test]
    fn test_unknown_attacker() {
        let (mut registry, _, _) = duel();
        let engine = DuelEngine::default();

        assert_eq!(
            engine.resolve_attack(&mut registry, &ParticipantRef::ById(99), None),
            Err(CommandError::UnknownAttacker)
        );
        assert_eq!(
            engine.resolve_attack(&mut registry, &by_card("CARD_Z"), None),
            Err(CommandError::UnknownAttacker)
        );
    }

    #[test]
    fn test_no_opponent() {
        let mut registry = Registry::new();
        let a = registry
            .admit("CARD_A", Link::channel(TransportKind::Udp).0, Instant::now())
            .unwrap()
            .id;

        assert_eq!(
            DuelEngine::default().resolve_attack(&mut registry, &ParticipantRef::ById(a), None),
            Err(CommandError::NoOpponent)
        );
    }

    #[test]
    fn test_attack_by_card() {
        let (mut registry, a, b) = duel();

        let outcome = DuelEngine::default()
            .resolve_attack(&mut registry, &by_card("CARD_A"), Some(&by_card("CARD_B")))
            .unwrap();

        assert_eq!(outcome.attacker_id, a);
        assert_eq!(outcome.target_id, b);
        assert_eq!(outcome.target_health, 90);
    }

    #[test]
    fn test_explicit_unknown_target() {
        let (mut registry, _, _) = duel();

        assert_eq!(
            DuelEngine::default().resolve_attack(
                &mut registry,
                &by_card("CARD_A"),
                Some(&by_card("CARD_Z"))
            ),
            Err(CommandError::UnknownTarget("CARD_Z".to_string()))
        );
    }

    #[test]
    fn test_explicit_dead_target_is_rejected() {
        let (mut registry, _, b) = duel();
        registry.get_mut(b).unwrap().health = 0;

        assert_eq!(
            DuelEngine::default().resolve_attack(
                &mut registry,
                &by_card("CARD_A"),
                Some(&by_card("CARD_B"))
            ),
            Err(CommandError::TargetAlreadyDead("CARD_B".to_string()))
        );
        assert_eq!(registry.get(b).unwrap().health, 0);
    }

    #[test]
    fn test_explicit_self_target_is_rejected() {
        let (mut registry, a, _) = duel();

        assert_eq!(
            DuelEngine::default().resolve_attack(
                &mut registry,
                &by_card("CARD_A"),
                Some(&by_card("CARD_A"))
            ),
            Err(CommandError::SelfTarget)
        );
        assert_eq!(registry.get(a).unwrap().health, 100);
    }

    #[test]
    fn test_implicit_attack_on_dead_opponent_repeats_victory() {
        let (mut registry, a, b) = duel();
        registry.get_mut(b).unwrap().health = 0;

        let outcome = DuelEngine::default()
            .resolve_attack(&mut registry, &ParticipantRef::ById(a), None)
            .unwrap();

        assert_eq!(outcome.target_id, b);
        assert_eq!(outcome.target_health, 0);
        assert!(outcome.is_victory());
        assert_eq!(outcome.events().len(), 4);
    }
}
