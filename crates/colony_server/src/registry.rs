//! Live attack records and per-colony scheduler descriptors.
//!
//! The registry is plain data. The scheduler owns it behind an async
//! mutex and is the only writer.

use std::collections::{BTreeMap, VecDeque};

use colony_core::army::Army;
use colony_core::colony::{ColonyId, DifficultySettings};
use colony_core::combat::{BattleOutcome, Victor};
use colony_core::planning::AttackType;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::error::{Result, WarfareError};

/// Unique identifier for a scheduled attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttackId(pub u64);

impl std::fmt::Display for AttackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "attack#{}", self.0)
    }
}

/// Lifecycle of an attack. Only `Incoming -> Resolved` is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackStatus {
    /// Travelling toward the target.
    Incoming,
    /// Outcome has been (or is being) applied.
    Resolved,
}

impl std::fmt::Display for AttackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incoming => f.write_str("incoming"),
            Self::Resolved => f.write_str("resolved"),
        }
    }
}

/// One engagement from scheduling to resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRecord {
    /// Attack identifier.
    pub id: AttackId,
    /// Colony that launched the attack.
    pub attacker_colony_id: ColonyId,
    /// Colony under attack.
    pub target_colony_id: ColonyId,
    /// Kind of attack.
    pub attack_type: AttackType,
    /// Units sent.
    pub forces_sent: Army,
    /// When the attack was scheduled.
    pub created_at_ms: u64,
    /// When the attack lands. Always after `created_at_ms`.
    pub estimated_arrival_ms: u64,
    /// Lifecycle status.
    pub status: AttackStatus,
    /// Outcome fixed at scheduling time.
    pub precomputed_outcome: BattleOutcome,
}

/// Scheduling state of one AI colony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerDescriptor {
    /// Colony being scheduled.
    pub colony_id: ColonyId,
    /// Difficulty read when the loop started.
    pub difficulty: DifficultySettings,
    /// Time between decision ticks.
    pub interval_ms: u64,
    /// When the colony last launched an attack.
    pub last_attack_ms: Option<u64>,
    /// When the next decision tick is due.
    pub next_attack_window_ms: u64,
}

/// Running totals since the registry was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Attacks scheduled.
    pub scheduled: u64,
    /// Attacks resolved successfully.
    pub resolved: u64,
    /// Resolved attacks the attacker won.
    pub attacker_victories: u64,
    /// Resolved attacks the defender won.
    pub defender_victories: u64,
    /// Resolved attacks with no survivors.
    pub mutual_destructions: u64,
    /// Resolutions whose store writes failed.
    pub failed_resolutions: u64,
}

/// A resolution that failed and was dropped from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetter {
    /// The attack that failed to resolve.
    pub record: AttackRecord,
    /// Why it failed.
    pub error: String,
    /// When it failed.
    pub failed_at_ms: u64,
}

#[derive(Debug)]
struct Entry {
    record: AttackRecord,
    resolution: Option<JoinHandle<()>>,
}

/// In-memory map of live attacks and scheduler descriptors.
#[derive(Debug)]
pub struct AttackRegistry {
    attacks: BTreeMap<AttackId, Entry>,
    descriptors: BTreeMap<ColonyId, SchedulerDescriptor>,
    stats: RegistryStats,
    dead_letters: VecDeque<DeadLetter>,
    dead_letter_capacity: usize,
    next_id: u64,
}

impl AttackRegistry {
    /// Create an empty registry keeping at most `dead_letter_capacity` failures.
    #[must_use]
    pub fn new(dead_letter_capacity: usize) -> Self {
        Self {
            attacks: BTreeMap::new(),
            descriptors: BTreeMap::new(),
            stats: RegistryStats::default(),
            dead_letters: VecDeque::with_capacity(dead_letter_capacity),
            dead_letter_capacity,
            next_id: 1,
        }
    }

    /// Allocate a fresh attack id.
    pub fn next_attack_id(&mut self) -> AttackId {
        let id = AttackId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a newly scheduled attack.
    pub fn insert(&mut self, record: AttackRecord) {
        self.stats.scheduled += 1;
        self.attacks.insert(
            record.id,
            Entry {
                record,
                resolution: None,
            },
        );
    }

    /// Remember the task that will resolve an attack.
    pub fn attach_resolution(&mut self, id: AttackId, handle: JoinHandle<()>) {
        match self.attacks.get_mut(&id) {
            Some(entry) => entry.resolution = Some(handle),
            // Already resolved and removed.
            None => drop(handle),
        }
    }

    /// Move an attack from incoming to resolved.
    pub fn mark_resolved(&mut self, id: AttackId) -> Result<&AttackRecord> {
        self.transition(id, AttackStatus::Resolved)
    }

    /// Change an attack's status. Only `Incoming -> Resolved` succeeds.
    pub fn transition(&mut self, id: AttackId, to: AttackStatus) -> Result<&AttackRecord> {
        let entry = self.attacks.get_mut(&id).ok_or(WarfareError::NotFound {
            kind: "attack",
            id: id.0,
        })?;
        let from = entry.record.status;
        if !(from == AttackStatus::Incoming && to == AttackStatus::Resolved) {
            return Err(WarfareError::InvalidTransition { id, from, to });
        }
        entry.record.status = to;
        Ok(&entry.record)
    }

    /// Drop an attack. Its resolution task, if any, keeps running.
    pub fn remove(&mut self, id: AttackId) -> Option<AttackRecord> {
        self.attacks.remove(&id).map(|entry| entry.record)
    }

    /// Look up a live attack.
    #[must_use]
    pub fn get(&self, id: AttackId) -> Option<&AttackRecord> {
        self.attacks.get(&id).map(|entry| &entry.record)
    }

    /// Number of live attacks.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.attacks.len()
    }

    /// Incoming attacks launched by a colony.
    #[must_use]
    pub fn incoming_attacks_for(&self, colony: ColonyId) -> u32 {
        let count = self
            .attacks
            .values()
            .filter(|entry| {
                entry.record.attacker_colony_id == colony
                    && entry.record.status == AttackStatus::Incoming
            })
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Live attacks targeting a colony, soonest arrival first.
    #[must_use]
    pub fn incoming_attacks_against(&self, colony: ColonyId) -> Vec<AttackRecord> {
        let mut attacks: Vec<AttackRecord> = self
            .attacks
            .values()
            .filter(|entry| entry.record.target_colony_id == colony)
            .map(|entry| entry.record.clone())
            .collect();
        attacks.sort_by_key(|record| (record.estimated_arrival_ms, record.id));
        attacks
    }

    /// Remove every attack still incoming and abort its resolution task.
    ///
    /// Attacks already marked resolved are mid-apply and are left alone.
    pub fn abandon_incoming(&mut self) -> Vec<AttackRecord> {
        let pending: Vec<AttackId> = self
            .attacks
            .iter()
            .filter(|(_, entry)| entry.record.status == AttackStatus::Incoming)
            .map(|(&id, _)| id)
            .collect();
        pending
            .into_iter()
            .filter_map(|id| self.attacks.remove(&id))
            .map(|entry| {
                if let Some(handle) = entry.resolution {
                    handle.abort();
                }
                entry.record
            })
            .collect()
    }

    /// Descriptor of a scheduled colony.
    #[must_use]
    pub fn descriptor(&self, colony: ColonyId) -> Option<&SchedulerDescriptor> {
        self.descriptors.get(&colony)
    }

    /// Mutable descriptor of a scheduled colony.
    pub fn descriptor_mut(&mut self, colony: ColonyId) -> Option<&mut SchedulerDescriptor> {
        self.descriptors.get_mut(&colony)
    }

    /// Insert or replace a descriptor.
    pub fn upsert_descriptor(&mut self, descriptor: SchedulerDescriptor) {
        self.descriptors.insert(descriptor.colony_id, descriptor);
    }

    /// Forget a colony's descriptor.
    pub fn remove_descriptor(&mut self, colony: ColonyId) -> Option<SchedulerDescriptor> {
        self.descriptors.remove(&colony)
    }

    /// Forget every descriptor.
    pub fn clear_descriptors(&mut self) {
        self.descriptors.clear();
    }

    /// All descriptors, by colony id.
    pub fn descriptors(&self) -> impl Iterator<Item = &SchedulerDescriptor> + '_ {
        self.descriptors.values()
    }

    /// Count a successful resolution.
    pub fn record_outcome(&mut self, outcome: &BattleOutcome) {
        self.stats.resolved += 1;
        match outcome.victor {
            Victor::Attacker => self.stats.attacker_victories += 1,
            Victor::Defender => self.stats.defender_victories += 1,
            Victor::None => self.stats.mutual_destructions += 1,
        }
    }

    /// Keep a failed resolution for reconciliation, evicting the oldest
    /// entry when full.
    pub fn record_failure(&mut self, record: AttackRecord, error: String, failed_at_ms: u64) {
        self.stats.failed_resolutions += 1;
        if self.dead_letter_capacity == 0 {
            return;
        }
        if self.dead_letters.len() == self.dead_letter_capacity {
            self.dead_letters.pop_front();
        }
        self.dead_letters.push_back(DeadLetter {
            record,
            error,
            failed_at_ms,
        });
    }

    /// Failed resolutions, oldest first.
    pub fn dead_letters(&self) -> impl Iterator<Item = &DeadLetter> + '_ {
        self.dead_letters.iter()
    }

    /// Running totals.
    #[must_use]
    pub const fn stats(&self) -> RegistryStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_core::army::UnitType;
    use colony_core::combat::simulate_battle;
    use colony_core::config::CombatConfig;
    use colony_test_utils::fixtures::{seeded_rng, soldiers};

    fn record(registry: &mut AttackRegistry, attacker: u64, target: u64, arrival: u64) -> AttackRecord {
        let forces = soldiers(10);
        let outcome = simulate_battle(
            &forces,
            &soldiers(2),
            &Default::default(),
            &CombatConfig::default(),
            &mut seeded_rng(1),
        )
        .expect("valid battle");
        AttackRecord {
            id: registry.next_attack_id(),
            attacker_colony_id: ColonyId(attacker),
            target_colony_id: ColonyId(target),
            attack_type: AttackType::Assault,
            forces_sent: forces,
            created_at_ms: 0,
            estimated_arrival_ms: arrival,
            status: AttackStatus::Incoming,
            precomputed_outcome: outcome,
        }
    }

    #[test]
    fn test_status_only_moves_forward() {
        let mut registry = AttackRegistry::new(4);
        let attack = record(&mut registry, 1, 2, 100);
        let id = attack.id;
        registry.insert(attack);

        assert_eq!(
            registry.mark_resolved(id).expect("first resolve").status,
            AttackStatus::Resolved
        );
        assert_eq!(
            registry.transition(id, AttackStatus::Incoming),
            Err(WarfareError::InvalidTransition {
                id,
                from: AttackStatus::Resolved,
                to: AttackStatus::Incoming,
            })
        );
        assert!(registry.mark_resolved(id).is_err());
        assert_eq!(registry.get(id).map(|r| r.status), Some(AttackStatus::Resolved));
    }

    #[test]
    fn test_mark_missing_attack() {
        let mut registry = AttackRegistry::new(4);
        assert!(matches!(
            registry.mark_resolved(AttackId(42)),
            Err(WarfareError::NotFound { kind: "attack", id: 42 })
        ));
    }

    #[test]
    fn test_incoming_counts_by_attacker_and_lists_by_target() {
        let mut registry = AttackRegistry::new(4);
        let a = record(&mut registry, 1, 9, 300);
        let b = record(&mut registry, 1, 9, 100);
        let c = record(&mut registry, 2, 8, 200);
        let (a_id, b_id) = (a.id, b.id);
        registry.insert(a);
        registry.insert(b);
        registry.insert(c);

        assert_eq!(registry.incoming_attacks_for(ColonyId(1)), 2);
        assert_eq!(registry.incoming_attacks_for(ColonyId(2)), 1);
        assert_eq!(registry.incoming_attacks_for(ColonyId(9)), 0);

        let against: Vec<AttackId> = registry
            .incoming_attacks_against(ColonyId(9))
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(against, vec![b_id, a_id]);

        registry.mark_resolved(b_id).expect("resolve");
        assert_eq!(registry.incoming_attacks_for(ColonyId(1)), 1);
    }

    #[test]
    fn test_dead_letters_bounded() {
        let mut registry = AttackRegistry::new(2);
        for i in 0..3 {
            let attack = record(&mut registry, 1, 2, 100);
            registry.record_failure(attack, format!("failure {i}"), i);
        }
        let errors: Vec<&str> = registry.dead_letters().map(|d| d.error.as_str()).collect();
        assert_eq!(errors, vec!["failure 1", "failure 2"]);
        assert_eq!(registry.stats().failed_resolutions, 3);
    }

    #[test]
    fn test_outcome_counters() {
        let mut registry = AttackRegistry::new(2);
        let attack = record(&mut registry, 1, 2, 100);
        registry.insert(attack.clone());
        registry.record_outcome(&attack.precomputed_outcome);
        let stats = registry.stats();
        assert_eq!(stats.scheduled, 1);
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.attacker_victories, 1);
        assert_eq!(attack.forces_sent.count(UnitType::Soldier), 10);
    }

    #[test]
    fn test_abandon_leaves_resolving_attacks() {
        let mut registry = AttackRegistry::new(2);
        let pending = record(&mut registry, 1, 2, 100);
        let resolving = record(&mut registry, 1, 3, 100);
        let (pending_id, resolving_id) = (pending.id, resolving.id);
        registry.insert(pending);
        registry.insert(resolving);
        registry.mark_resolved(resolving_id).expect("resolve");

        let abandoned: Vec<AttackId> = registry.abandon_incoming().iter().map(|r| r.id).collect();
        assert_eq!(abandoned, vec![pending_id]);
        assert!(registry.get(resolving_id).is_some());
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn test_descriptor_lifecycle() {
        let mut registry = AttackRegistry::new(2);
        registry.upsert_descriptor(SchedulerDescriptor {
            colony_id: ColonyId(5),
            difficulty: DifficultySettings::default(),
            interval_ms: 1000,
            last_attack_ms: None,
            next_attack_window_ms: 1000,
        });
        if let Some(descriptor) = registry.descriptor_mut(ColonyId(5)) {
            descriptor.last_attack_ms = Some(50);
        }
        assert_eq!(
            registry.descriptor(ColonyId(5)).and_then(|d| d.last_attack_ms),
            Some(50)
        );
        assert!(registry.remove_descriptor(ColonyId(5)).is_some());
        assert!(registry.descriptor(ColonyId(5)).is_none());
    }
}
