//! Determinism testing for battle replays.
//!
//! A battle is fully determined by its armies, conditions, config, and RNG
//! seed. These helpers replay the same battle several times and check that
//! every run produced an identical outcome.

use colony_core::army::Army;
use colony_core::combat::{simulate_battle, BattleConditions, BattleOutcome};
use colony_core::config::CombatConfig;

use crate::fixtures::seeded_rng;

/// Result of a determinism check.
#[derive(Debug, Clone)]
pub struct DeterminismResult {
    /// Whether every run matched the first.
    pub is_deterministic: bool,
    /// Outcome of every run, in order.
    pub outcomes: Vec<BattleOutcome>,
}

impl DeterminismResult {
    /// Panic with a readable message if the runs diverged.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let first = self.outcomes.iter().position(|o| *o != self.outcomes[0]);
            panic!(
                "Battle replay diverged at run {first:?} of {}",
                self.outcomes.len()
            );
        }
    }
}

/// Replay one battle `runs` times from the same seed.
///
/// Returns `None` if the battle is rejected (an empty army).
#[must_use]
pub fn verify_battle_determinism(
    runs: usize,
    seed: u64,
    attacker: &Army,
    defender: &Army,
    conditions: &BattleConditions,
    config: &CombatConfig,
) -> Option<DeterminismResult> {
    let mut outcomes = Vec::with_capacity(runs);
    for _ in 0..runs {
        let mut rng = seeded_rng(seed);
        outcomes.push(simulate_battle(attacker, defender, conditions, config, &mut rng).ok()?);
    }

    let is_deterministic = outcomes.windows(2).all(|w| w[0] == w[1]);
    Some(DeterminismResult {
        is_deterministic,
        outcomes,
    })
}

/// Proptest strategies for combat testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of battle resolution.
pub mod strategies {
    use colony_core::army::{Army, UnitType};
    use colony_core::colony::ResourceBundle;
    use colony_core::combat::BattleConditions;
    use colony_core::config::{Formation, Terrain};
    use proptest::prelude::*;

    /// Generate any unit type.
    pub fn arb_unit_type() -> impl Strategy<Value = UnitType> {
        proptest::sample::select(UnitType::ALL.to_vec())
    }

    /// Generate any formation.
    pub fn arb_formation() -> impl Strategy<Value = Formation> {
        proptest::sample::select(Formation::ALL.to_vec())
    }

    /// Generate any terrain.
    pub fn arb_terrain() -> impl Strategy<Value = Terrain> {
        proptest::sample::select(Terrain::ALL.to_vec())
    }

    /// Generate battle conditions.
    pub fn arb_conditions() -> impl Strategy<Value = BattleConditions> {
        (arb_terrain(), arb_formation(), arb_formation()).prop_map(
            |(terrain, attacker_formation, defender_formation)| BattleConditions {
                terrain,
                attacker_formation,
                defender_formation,
            },
        )
    }

    /// Generate an army that may be empty.
    ///
    /// Counts range 0 to 5000 per entry; repeated types add up.
    pub fn arb_army() -> impl Strategy<Value = Army> {
        proptest::collection::vec((arb_unit_type(), 0u32..5000u32), 0..6)
            .prop_map(|entries| entries.into_iter().collect())
    }

    /// Generate an army with at least one unit.
    pub fn arb_nonempty_army() -> impl Strategy<Value = Army> {
        (arb_army(), arb_unit_type(), 1u32..5000u32).prop_map(|(mut army, unit, count)| {
            army.add(unit, count);
            army
        })
    }

    /// Generate a small army (1 to 20 units per entry), where rounding matters most.
    pub fn arb_small_army() -> impl Strategy<Value = Army> {
        proptest::collection::vec((arb_unit_type(), 1u32..20u32), 1..6)
            .prop_map(|entries| entries.into_iter().collect())
    }

    /// Generate stored resources.
    pub fn arb_resources() -> impl Strategy<Value = ResourceBundle> {
        (0u32..10_000, 0u32..10_000, 0u32..10_000, 0u32..10_000).prop_map(
            |(food, wood, stone, minerals)| ResourceBundle::new(food, wood, stone, minerals),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{home_guard, raiding_party};

    #[test]
    fn test_default_battle_replays_identically() {
        let result = verify_battle_determinism(
            5,
            11,
            &raiding_party(),
            &home_guard(),
            &BattleConditions::default(),
            &CombatConfig::default(),
        )
        .expect("valid battle");
        result.assert_deterministic();
        assert_eq!(result.outcomes.len(), 5);
    }

    #[test]
    fn test_empty_army_rejected() {
        assert!(verify_battle_determinism(
            2,
            1,
            &Army::new(),
            &home_guard(),
            &BattleConditions::default(),
            &CombatConfig::default(),
        )
        .is_none());
    }
}
