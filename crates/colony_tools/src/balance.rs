//! Monte-Carlo balance batches.
//!
//! Runs the same matchup across a range of seeds in parallel and reports
//! how often each side wins and how the battles were rated.

use colony_core::army::Army;
use colony_core::combat::{simulate_battle, BattleConditions, BattleOutcome, TacticalRating, Victor};
use colony_core::config::CombatConfig;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How many battles landed in each rating tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingCounts {
    /// Brilliant.
    pub brilliant: u32,
    /// Good.
    pub good: u32,
    /// Fair.
    pub fair: u32,
    /// Poor.
    pub poor: u32,
    /// Disastrous.
    pub disastrous: u32,
}

impl RatingCounts {
    fn record(&mut self, rating: TacticalRating) {
        let slot = match rating {
            TacticalRating::Brilliant => &mut self.brilliant,
            TacticalRating::Good => &mut self.good,
            TacticalRating::Fair => &mut self.fair,
            TacticalRating::Poor => &mut self.poor,
            TacticalRating::Disastrous => &mut self.disastrous,
        };
        *slot += 1;
    }

    fn merge(self, other: Self) -> Self {
        Self {
            brilliant: self.brilliant + other.brilliant,
            good: self.good + other.good,
            fair: self.fair + other.fair,
            poor: self.poor + other.poor,
            disastrous: self.disastrous + other.disastrous,
        }
    }
}

/// Aggregate results of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceReport {
    /// Battles fought.
    pub battles: u32,
    /// Attacker victories.
    pub attacker_wins: u32,
    /// Defender victories.
    pub defender_wins: u32,
    /// Both sides wiped out.
    pub mutual_destructions: u32,
    /// Phases fought across all battles.
    pub total_phases: u64,
    /// Units the attacker lost across all battles.
    pub attacker_units_lost: u64,
    /// Units the defender lost across all battles.
    pub defender_units_lost: u64,
    /// Rating distribution.
    pub ratings: RatingCounts,
}

impl BalanceReport {
    fn from_outcome(outcome: &BattleOutcome) -> Self {
        let mut report = Self {
            battles: 1,
            total_phases: u64::from(outcome.phases_fought()),
            attacker_units_lost: u64::from(outcome.total_casualties.attacker.total()),
            defender_units_lost: u64::from(outcome.total_casualties.defender.total()),
            ..Self::default()
        };
        match outcome.victor {
            Victor::Attacker => report.attacker_wins = 1,
            Victor::Defender => report.defender_wins = 1,
            Victor::None => report.mutual_destructions = 1,
        }
        report.ratings.record(outcome.battle_efficiency.tactical_rating);
        report
    }

    fn merge(self, other: Self) -> Self {
        Self {
            battles: self.battles + other.battles,
            attacker_wins: self.attacker_wins + other.attacker_wins,
            defender_wins: self.defender_wins + other.defender_wins,
            mutual_destructions: self.mutual_destructions + other.mutual_destructions,
            total_phases: self.total_phases + other.total_phases,
            attacker_units_lost: self.attacker_units_lost + other.attacker_units_lost,
            defender_units_lost: self.defender_units_lost + other.defender_units_lost,
            ratings: self.ratings.merge(other.ratings),
        }
    }

    /// Share of battles the attacker won.
    #[must_use]
    pub fn attacker_win_rate(&self) -> f64 {
        if self.battles == 0 {
            return 0.0;
        }
        f64::from(self.attacker_wins) / f64::from(self.battles)
    }

    /// Mean phases per battle.
    #[must_use]
    pub fn avg_phases(&self) -> f64 {
        if self.battles == 0 {
            return 0.0;
        }
        self.total_phases as f64 / f64::from(self.battles)
    }
}

/// Fight `battles` seeded battles in parallel, seeds `base_seed..base_seed + battles`.
///
/// The report does not depend on thread count or scheduling order.
///
/// # Errors
///
/// Returns an error if either army is empty.
pub fn run_balance(
    attacker: &Army,
    defender: &Army,
    conditions: &BattleConditions,
    config: &CombatConfig,
    battles: u32,
    base_seed: u64,
) -> Result<BalanceReport> {
    let report = (0..u64::from(battles))
        .into_par_iter()
        .map(|offset| {
            let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(offset));
            simulate_battle(attacker, defender, conditions, config, &mut rng)
                .map(|outcome| BalanceReport::from_outcome(&outcome))
        })
        .try_reduce(BalanceReport::default, |a, b| Ok(a.merge(b)))?;

    tracing::info!(
        battles = report.battles,
        attacker_win_rate = report.attacker_win_rate(),
        avg_phases = report.avg_phases(),
        "Balance batch complete"
    );
    Ok(report)
}
