//! Resource rewards for the winner of a battle.

use crate::colony::{ColonySnapshot, ResourceBundle};
use crate::combat::{BattleOutcome, TacticalRating, Victor};

/// Bundle scaled by the multipliers below.
pub const BASE_REWARD: ResourceBundle = ResourceBundle::new(100, 50, 30, 20);

/// Lowest loser-size multiplier (per-mille). Keeps a real victory from
/// paying out nothing when the loser reports zero population.
pub const MIN_LOSER_SIZE_MULTIPLIER: u32 = 100;

/// Highest loser-size multiplier (per-mille).
pub const MAX_LOSER_SIZE_MULTIPLIER: u32 = 2000;

/// Reward multiplier (per-mille) for a tactical rating.
#[must_use]
pub const fn efficiency_multiplier(rating: TacticalRating) -> u32 {
    match rating {
        TacticalRating::Brilliant => 1500,
        TacticalRating::Good => 1250,
        TacticalRating::Fair => 1000,
        TacticalRating::Poor => 800,
        TacticalRating::Disastrous => 600,
    }
}

/// Reward multiplier (per-mille) for the loser's size: `population / 100`,
/// clamped to `[0.1, 2.0]`.
#[must_use]
pub fn loser_size_multiplier(population: u32) -> u32 {
    population
        .saturating_mul(10)
        .clamp(MIN_LOSER_SIZE_MULTIPLIER, MAX_LOSER_SIZE_MULTIPLIER)
}

/// Resources the winner takes from the loser.
///
/// Empty if and only if nobody won.
#[must_use]
pub fn calculate_battle_rewards(
    outcome: &BattleOutcome,
    winner: &ColonySnapshot,
    loser: &ColonySnapshot,
) -> ResourceBundle {
    if outcome.victor == Victor::None {
        return ResourceBundle::ZERO;
    }

    // Ratings are attacker-view; a defending winner is paid for its own showing.
    let rating = match outcome.victor {
        Victor::Defender => outcome.battle_efficiency.tactical_rating.mirrored(),
        _ => outcome.battle_efficiency.tactical_rating,
    };
    let efficiency = u64::from(efficiency_multiplier(rating));
    let size = u64::from(loser_size_multiplier(loser.population));

    let reward = BASE_REWARD.map(|amount| {
        let scaled = u64::from(amount) * efficiency * size / 1_000_000;
        u32::try_from(scaled).unwrap_or(u32::MAX)
    });

    tracing::debug!(
        winner = %winner.id,
        loser = %loser.id,
        total = reward.total(),
        "Battle rewards calculated"
    );
    reward
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::army::{Army, UnitType};
    use crate::colony::{ColonyId, UserId};
    use crate::combat::{simulate_battle, BattleConditions};
    use crate::config::CombatConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn colony(id: u64, population: u32) -> ColonySnapshot {
        let mut colony = ColonySnapshot::new(ColonyId(id), UserId(id));
        colony.population = population;
        colony
    }

    fn outcome_for(attacker: u32, defender: u32) -> BattleOutcome {
        simulate_battle(
            &Army::new().with(UnitType::Soldier, attacker),
            &Army::new().with(UnitType::Soldier, defender),
            &BattleConditions {
                defender_formation: crate::config::Formation::Balanced,
                ..BattleConditions::default()
            },
            &CombatConfig::default().with_randomness_band(0),
            &mut ChaCha8Rng::seed_from_u64(1),
        )
        .expect("valid battle")
    }

    #[test]
    fn test_no_victor_no_reward() {
        let outcome = outcome_for(1, 1);
        assert_eq!(outcome.victor, Victor::None);
        let reward = calculate_battle_rewards(&outcome, &colony(1, 500), &colony(2, 500));
        assert!(reward.is_empty());
    }

    #[test]
    fn test_brilliant_victory_against_large_colony() {
        let outcome = outcome_for(100, 1);
        assert_eq!(
            outcome.battle_efficiency.tactical_rating,
            TacticalRating::Brilliant
        );
        let reward = calculate_battle_rewards(&outcome, &colony(1, 50), &colony(2, 400));
        // 1.5x efficiency, 2.0x size cap.
        assert_eq!(reward, ResourceBundle::new(300, 150, 90, 60));
    }

    #[test]
    fn test_crushing_defence_is_rated_for_the_defender() {
        let outcome = outcome_for(1, 100);
        assert_eq!(outcome.victor, Victor::Defender);
        assert_eq!(
            outcome.battle_efficiency.tactical_rating,
            TacticalRating::Disastrous
        );
        let reward = calculate_battle_rewards(&outcome, &colony(2, 50), &colony(1, 400));
        assert_eq!(reward, ResourceBundle::new(300, 150, 90, 60));
    }

    #[test]
    fn test_mirrored_rating() {
        assert_eq!(TacticalRating::Good.mirrored(), TacticalRating::Poor);
        assert_eq!(TacticalRating::Fair.mirrored(), TacticalRating::Fair);
        assert_eq!(
            TacticalRating::Disastrous.mirrored(),
            TacticalRating::Brilliant
        );
    }

    #[test]
    fn test_victory_over_empty_colony_still_pays() {
        let outcome = outcome_for(100, 1);
        let reward = calculate_battle_rewards(&outcome, &colony(1, 50), &colony(2, 0));
        assert!(!reward.is_empty());
    }

    #[test]
    fn test_size_multiplier_bounds() {
        assert_eq!(loser_size_multiplier(0), MIN_LOSER_SIZE_MULTIPLIER);
        assert_eq!(loser_size_multiplier(50), 500);
        assert_eq!(loser_size_multiplier(100), 1000);
        assert_eq!(loser_size_multiplier(10_000), MAX_LOSER_SIZE_MULTIPLIER);
    }
}
