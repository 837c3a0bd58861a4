//! Property tests for battle resolution and rewards.

use colony_core::army::UnitType;
use colony_core::colony::DifficultySettings;
use colony_core::combat::{simulate_battle, BattleConditions, Victor};
use colony_core::config::{CombatConfig, Formation, Terrain, MAX_PHASES};
use colony_core::math::Fixed;
use colony_core::rewards::calculate_battle_rewards;
use colony_core::targeting::{is_eligible_for_attack, EligibilityCheck, TargetingRules};
use colony_test_utils::determinism::strategies::*;
use colony_test_utils::determinism::verify_battle_determinism;
use colony_test_utils::fixtures::{home_guard, raiding_party, seeded_rng, ColonyBuilder};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_battle_bounded_and_conserves_units(
        attacker in arb_nonempty_army(),
        defender in arb_nonempty_army(),
        conditions in arb_conditions(),
        seed in any::<u64>(),
    ) {
        let outcome = simulate_battle(
            &attacker,
            &defender,
            &conditions,
            &CombatConfig::default(),
            &mut seeded_rng(seed),
        ).expect("non-empty armies");

        prop_assert!(outcome.phases_fought() >= 1);
        prop_assert!(outcome.phases_fought() <= MAX_PHASES);
        prop_assert!(matches!(outcome.victor, Victor::Attacker | Victor::Defender | Victor::None));

        for (unit, count) in attacker.iter() {
            let lost = outcome.total_casualties.attacker.count(unit);
            prop_assert!(lost <= count);
            prop_assert_eq!(lost + outcome.surviving_armies.attacker.count(unit), count);
        }
        for (unit, count) in defender.iter() {
            let lost = outcome.total_casualties.defender.count(unit);
            prop_assert!(lost <= count);
            prop_assert_eq!(lost + outcome.surviving_armies.defender.count(unit), count);
        }
    }

    #[test]
    fn prop_battle_replays_identically(
        attacker in arb_nonempty_army(),
        defender in arb_nonempty_army(),
        conditions in arb_conditions(),
        seed in any::<u64>(),
    ) {
        let result = verify_battle_determinism(
            3,
            seed,
            &attacker,
            &defender,
            &conditions,
            &CombatConfig::default(),
        ).expect("non-empty armies");
        prop_assert!(result.is_deterministic);
    }

    #[test]
    fn prop_casualty_keys_match_input(
        attacker in arb_small_army(),
        defender in arb_small_army(),
        seed in any::<u64>(),
    ) {
        let outcome = simulate_battle(
            &attacker,
            &defender,
            &BattleConditions::default(),
            &CombatConfig::default(),
            &mut seeded_rng(seed),
        ).expect("non-empty armies");

        for unit in UnitType::ALL {
            prop_assert_eq!(
                outcome.total_casualties.attacker.contains_type(unit),
                attacker.contains_type(unit)
            );
            prop_assert_eq!(
                outcome.total_casualties.defender.contains_type(unit),
                defender.contains_type(unit)
            );
        }
    }

    #[test]
    fn prop_per_phase_casualties_within_cap(
        attacker in arb_small_army(),
        defender in arb_small_army(),
        seed in any::<u64>(),
    ) {
        let config = CombatConfig::default();
        let outcome = simulate_battle(
            &attacker,
            &defender,
            &BattleConditions::default(),
            &config,
            &mut seeded_rng(seed),
        ).expect("non-empty armies");

        let mut remaining = attacker.clone();
        for phase in &outcome.phases {
            for (unit, lost) in phase.attacker_casualties.iter() {
                let before = remaining.count(unit);
                let cap = (u64::from(before) * u64::from(config.max_casualty_rate)).div_ceil(1000);
                prop_assert!(u64::from(lost) <= cap);
                prop_assert!(lost <= before);
            }
            remaining.apply_casualties(&phase.attacker_casualties);
        }
    }

    #[test]
    fn prop_rewards_empty_iff_no_victor(
        attacker in arb_small_army(),
        defender in arb_small_army(),
        loser_population in 0u32..1000,
        seed in any::<u64>(),
    ) {
        let outcome = simulate_battle(
            &attacker,
            &defender,
            &BattleConditions::default(),
            &CombatConfig::default(),
            &mut seeded_rng(seed),
        ).expect("non-empty armies");

        let winner = ColonyBuilder::new(1).build();
        let loser = ColonyBuilder::new(2).population(loser_population).build();
        let reward = calculate_battle_rewards(&outcome, &winner, &loser);
        prop_assert_eq!(reward.is_empty(), outcome.victor == Victor::None);
    }

    #[test]
    fn prop_concurrency_cap_blocks_regardless(
        incoming in 0u32..10,
        max in 0u32..10,
        strength in 0i32..100_000,
        last_attack in proptest::option::of(0u64..1_000_000),
        now in 0u64..2_000_000,
    ) {
        let settings = DifficultySettings {
            max_concurrent_attacks: max,
            ..DifficultySettings::default()
        };
        let check = EligibilityCheck {
            incoming_attacks: incoming,
            settings: &settings,
            military_strength: Fixed::from_num(strength),
            last_attack_ms: last_attack,
            now_ms: now,
        };
        if incoming >= max {
            prop_assert!(!is_eligible_for_attack(&check, &TargetingRules::default()));
        }
    }
}

#[test]
fn test_forest_raid_end_to_end() {
    let conditions = BattleConditions {
        terrain: Terrain::Forest,
        attacker_formation: Formation::Aggressive,
        defender_formation: Formation::Defensive,
    };
    for seed in 0..32 {
        let outcome = simulate_battle(
            &raiding_party(),
            &home_guard(),
            &conditions,
            &CombatConfig::default(),
            &mut seeded_rng(seed),
        )
        .expect("valid battle");

        assert!(matches!(outcome.victor, Victor::Attacker | Victor::Defender));
        let attacker_types: Vec<_> = outcome.total_casualties.attacker.iter().map(|(u, _)| u).collect();
        let defender_types: Vec<_> = outcome.total_casualties.defender.iter().map(|(u, _)| u).collect();
        assert_eq!(attacker_types, vec![UnitType::Worker, UnitType::Soldier]);
        assert_eq!(defender_types, vec![UnitType::Soldier, UnitType::Guard]);
    }
}
