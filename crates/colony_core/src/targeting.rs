//! Target selection for AI colonies.
//!
//! Every candidate colony gets a weighted score:
//!
//! ```text
//! score = (0.4 × strength + 0.3 × resources + 0.2 × distance + 0.1 × personality)
//!         × aggression
//! ```
//!
//! Each component lies in `[0, 1]`. The best candidate is attacked only if
//! its score reaches the configured minimum.

use serde::{Deserialize, Serialize};

use crate::colony::{ColonyId, ColonySnapshot, DifficultySettings, Personality};
use crate::config::CombatConfig;
use crate::math::{clamp_unit, fixed_serde, permille, ratio_or, Fixed};

/// Weight of the strength component (per-mille).
pub const STRENGTH_WEIGHT: u32 = 400;
/// Weight of the resource component (per-mille).
pub const RESOURCE_WEIGHT: u32 = 300;
/// Weight of the distance component (per-mille).
pub const DISTANCE_WEIGHT: u32 = 200;
/// Weight of the personality component (per-mille).
pub const PERSONALITY_WEIGHT: u32 = 100;

/// Strength ratio at which the strength component saturates.
pub const STRENGTH_RATIO_CAP: i32 = 3;
/// Stored resources at which the resource component saturates.
pub const RESOURCE_NORMALIZER: i32 = 5000;
/// Territory size at which the expansionist bonus saturates.
pub const TERRITORY_NORMALIZER: i32 = 100;

/// Thresholds for choosing and attacking a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetingRules {
    /// Colonies further away than this are never candidates.
    pub max_target_distance: u32,
    /// Minimum score (per-mille) for the best target to be attacked.
    pub min_score: u32,
    /// Minimum military strength before a colony may attack at all.
    pub min_military_strength: u32,
    /// Minimum time between two attacks launched by the same colony.
    pub min_cooldown_ms: u64,
}

impl Default for TargetingRules {
    fn default() -> Self {
        Self {
            max_target_distance: 500,
            min_score: 300,
            min_military_strength: 10,
            min_cooldown_ms: 60_000,
        }
    }
}

/// Why a colony may not attack right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligible {
    /// Already at the concurrent attack cap.
    TooManyAttacks {
        /// Attacks currently in flight.
        incoming: u32,
        /// Cap from the difficulty settings.
        max: u32,
    },
    /// Military below the minimum threshold.
    TooWeak {
        /// Current military strength.
        strength: Fixed,
    },
    /// Last attack was too recent.
    CoolingDown {
        /// Time left before the cooldown expires.
        remaining_ms: u64,
    },
}

impl std::fmt::Display for Ineligible {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooManyAttacks { incoming, max } => {
                write!(f, "{incoming} attacks in flight (max {max})")
            }
            Self::TooWeak { strength } => write!(f, "military strength {strength} too low"),
            Self::CoolingDown { remaining_ms } => write!(f, "cooling down for {remaining_ms}ms"),
        }
    }
}

/// Inputs to the eligibility gate.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityCheck<'a> {
    /// Incoming attacks this colony has launched.
    pub incoming_attacks: u32,
    /// The colony's difficulty settings.
    pub settings: &'a DifficultySettings,
    /// The colony's current military strength.
    pub military_strength: Fixed,
    /// When the colony last attacked, if ever.
    pub last_attack_ms: Option<u64>,
    /// Current time.
    pub now_ms: u64,
}

/// Run the eligibility gate, reporting the first failed condition.
///
/// The concurrency cap is checked first and is decisive on its own.
pub fn check_eligibility(
    check: &EligibilityCheck<'_>,
    rules: &TargetingRules,
) -> Result<(), Ineligible> {
    if check.incoming_attacks >= check.settings.max_concurrent_attacks {
        return Err(Ineligible::TooManyAttacks {
            incoming: check.incoming_attacks,
            max: check.settings.max_concurrent_attacks,
        });
    }
    if check.military_strength < Fixed::from_num(rules.min_military_strength) {
        return Err(Ineligible::TooWeak {
            strength: check.military_strength,
        });
    }
    if let Some(last) = check.last_attack_ms {
        let elapsed = check.now_ms.saturating_sub(last);
        if elapsed < rules.min_cooldown_ms {
            return Err(Ineligible::CoolingDown {
                remaining_ms: rules.min_cooldown_ms - elapsed,
            });
        }
    }
    Ok(())
}

/// Whether a colony may launch a new attack now.
#[must_use]
pub fn is_eligible_for_attack(check: &EligibilityCheck<'_>, rules: &TargetingRules) -> bool {
    check_eligibility(check, rules).is_ok()
}

/// Per-component breakdown of a target score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Favours targets weaker than the attacker.
    #[serde(with = "fixed_serde")]
    pub strength: Fixed,
    /// Favours resource-rich targets.
    #[serde(with = "fixed_serde")]
    pub resources: Fixed,
    /// Favours nearby targets.
    #[serde(with = "fixed_serde")]
    pub distance: Fixed,
    /// Bonus from the attacker's personality.
    #[serde(with = "fixed_serde")]
    pub personality: Fixed,
    /// Weighted sum times the aggression multiplier.
    #[serde(with = "fixed_serde")]
    pub total: Fixed,
}

/// A candidate target with its score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredTarget {
    /// Candidate colony.
    pub target_id: ColonyId,
    /// Distance between the two bases.
    #[serde(with = "fixed_serde")]
    pub distance: Fixed,
    /// Score components.
    pub score: ScoreBreakdown,
}

/// Personality bonus of `attacker` against a target of the given strength.
#[must_use]
pub fn personality_bonus(
    personality: Personality,
    attacker_strength: Fixed,
    target_strength: Fixed,
    target_territory: u32,
) -> Fixed {
    let relative = clamp_unit(ratio_or(target_strength, attacker_strength, Fixed::ONE));
    match personality {
        Personality::Aggressive => relative,
        Personality::Opportunist => Fixed::ONE - relative,
        Personality::Expansionist => clamp_unit(
            Fixed::from_num(target_territory) / Fixed::from_num(TERRITORY_NORMALIZER),
        ),
        Personality::Balanced => permille(500),
    }
}

/// Score one target from the attacker's point of view.
#[must_use]
pub fn score_target(
    attacker: &ColonySnapshot,
    target: &ColonySnapshot,
    aggression_multiplier: u32,
    combat: &CombatConfig,
    rules: &TargetingRules,
) -> ScoreBreakdown {
    let attacker_strength = attacker.military_strength(combat);
    let target_strength = target.military_strength(combat);
    let cap = Fixed::from_num(STRENGTH_RATIO_CAP);

    let ratio = ratio_or(attacker_strength, target_strength, cap);
    let strength = clamp_unit(ratio / cap);

    let resources = clamp_unit(
        Fixed::saturating_from_num(target.resources.total()) / Fixed::from_num(RESOURCE_NORMALIZER),
    );

    let distance_units = attacker.base_position.distance(target.base_position);
    let max_distance = Fixed::from_num(rules.max_target_distance);
    let distance = clamp_unit(Fixed::ONE - ratio_or(distance_units, max_distance, Fixed::ONE));

    let personality = personality_bonus(
        attacker.personality,
        attacker_strength,
        target_strength,
        target.territory_size,
    );

    let weighted = strength * permille(STRENGTH_WEIGHT)
        + resources * permille(RESOURCE_WEIGHT)
        + distance * permille(DISTANCE_WEIGHT)
        + personality * permille(PERSONALITY_WEIGHT);

    ScoreBreakdown {
        strength,
        resources,
        distance,
        personality,
        total: weighted.saturating_mul(permille(aggression_multiplier)),
    }
}

/// Other active colonies within range that have something to fight.
pub fn candidate_targets<'a>(
    attacker: &'a ColonySnapshot,
    colonies: &'a [ColonySnapshot],
    rules: &'a TargetingRules,
) -> impl Iterator<Item = &'a ColonySnapshot> + 'a {
    let max_distance = Fixed::from_num(rules.max_target_distance);
    let max_distance_sq = max_distance.saturating_mul(max_distance);
    colonies.iter().filter(move |colony| {
        colony.id != attacker.id
            && colony.is_active
            && !colony.army.is_empty()
            && attacker.base_position.distance_squared(colony.base_position) <= max_distance_sq
    })
}

/// Score every candidate, best first. Ties go to the lower colony id.
#[must_use]
pub fn rank_targets(
    attacker: &ColonySnapshot,
    colonies: &[ColonySnapshot],
    aggression_multiplier: u32,
    combat: &CombatConfig,
    rules: &TargetingRules,
) -> Vec<ScoredTarget> {
    let mut ranked: Vec<ScoredTarget> = candidate_targets(attacker, colonies, rules)
        .map(|target| ScoredTarget {
            target_id: target.id,
            distance: attacker.base_position.distance(target.base_position),
            score: score_target(attacker, target, aggression_multiplier, combat, rules),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total
            .cmp(&a.score.total)
            .then_with(|| a.target_id.cmp(&b.target_id))
    });
    ranked
}

/// Pick the best target, or `None` if no candidate reaches the minimum score.
#[must_use]
pub fn select_target(
    attacker: &ColonySnapshot,
    colonies: &[ColonySnapshot],
    aggression_multiplier: u32,
    combat: &CombatConfig,
    rules: &TargetingRules,
) -> Option<ScoredTarget> {
    rank_targets(attacker, colonies, aggression_multiplier, combat, rules)
        .into_iter()
        .next()
        .filter(|best| best.score.total >= permille(rules.min_score))
}
