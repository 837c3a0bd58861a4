//! Attack planning: decision cadence, force size, travel time, and stance.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::army::Army;
use crate::colony::{DifficultySettings, Personality};
use crate::config::Formation;
use crate::math::{ratio_or, Fixed};

/// Kind of attack, chosen from the force-to-target strength ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackType {
    /// Roughly even fight (ratio 1 to 2).
    Raid,
    /// Overwhelming force (ratio 2 or more).
    Assault,
    /// Outnumbered but in range (ratio 0.5 to 1).
    Skirmish,
    /// Testing the defences (ratio below 0.5).
    Probe,
}

impl AttackType {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raid => "raid",
            Self::Assault => "assault",
            Self::Skirmish => "skirmish",
            Self::Probe => "probe",
        }
    }
}

impl std::fmt::Display for AttackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tuning for attack cadence and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningRules {
    /// Shortest possible travel time.
    pub min_travel_ms: u64,
    /// Travel time per unit of distance.
    pub travel_ms_per_unit: u64,
    /// Smallest share of the military sent (per-mille).
    pub forces_min_permille: u32,
    /// Largest share of the military sent (per-mille).
    pub forces_max_permille: u32,
    /// Cap on the interval speed-up from colony age (per-mille).
    pub max_progression: u32,
}

impl Default for PlanningRules {
    fn default() -> Self {
        Self {
            min_travel_ms: 30_000,
            travel_ms_per_unit: 200,
            forces_min_permille: 600,
            forces_max_permille: 900,
            max_progression: 2000,
        }
    }
}

/// Progression factor (per-mille) for a colony of the given age.
///
/// `1 + (ticks / 1000) × scaling`, capped at `max_progression`.
#[must_use]
pub fn progression_permille(
    settings: &DifficultySettings,
    total_ticks: u64,
    rules: &PlanningRules,
) -> u64 {
    let growth = total_ticks.saturating_mul(u64::from(settings.progression_scaling)) / 1000;
    1000u64
        .saturating_add(growth)
        .min(u64::from(rules.max_progression.max(1000)))
}

/// Time between decision ticks for a colony of the given age.
#[must_use]
pub fn decision_interval_ms(
    settings: &DifficultySettings,
    total_ticks: u64,
    rules: &PlanningRules,
) -> u64 {
    let progression = progression_permille(settings, total_ticks, rules);
    (settings.base_attack_interval_ms.saturating_mul(1000) / progression).max(1)
}

/// Travel time to cover `distance`, never below the configured minimum
/// and never zero.
#[must_use]
pub fn travel_time_ms(distance: Fixed, rules: &PlanningRules) -> u64 {
    let units = distance.max(Fixed::ZERO).saturating_ceil().to_num::<u64>();
    units
        .saturating_mul(rules.travel_ms_per_unit)
        .max(rules.min_travel_ms)
        .max(1)
}

/// Pick the share of the military to send on an attack.
///
/// Workers always stay home. Every military type sends at least one unit
/// so the force is never empty while the colony has soldiers.
pub fn choose_forces<R: Rng + ?Sized>(army: &Army, rng: &mut R, rules: &PlanningRules) -> Army {
    let low = rules.forces_min_permille.min(1000);
    let high = rules.forces_max_permille.clamp(low, 1000);
    let share = rng.gen_range(low..=high);

    army.military()
        .iter()
        .filter(|&(_, count)| count > 0)
        .map(|(unit, count)| {
            let sent = u64::from(count) * u64::from(share) / 1000;
            let sent = u32::try_from(sent).unwrap_or(count).clamp(1, count);
            (unit, sent)
        })
        .collect()
}

/// Classify an attack by how the sent force compares to the target.
#[must_use]
pub fn attack_type_for(force_strength: Fixed, target_strength: Fixed) -> AttackType {
    let ratio = ratio_or(force_strength, target_strength, Fixed::MAX);
    if ratio >= Fixed::from_num(2) {
        AttackType::Assault
    } else if ratio >= Fixed::ONE {
        AttackType::Raid
    } else if ratio >= Fixed::ONE / Fixed::from_num(2) {
        AttackType::Skirmish
    } else {
        AttackType::Probe
    }
}

/// Attacker formation for a personality.
#[must_use]
pub const fn formation_for(personality: Personality) -> Formation {
    match personality {
        Personality::Aggressive => Formation::Aggressive,
        Personality::Opportunist => Formation::Guerrilla,
        Personality::Expansionist | Personality::Balanced => Formation::Balanced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::army::UnitType;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_interval_shrinks_with_age_and_caps() {
        let rules = PlanningRules::default();
        let settings = DifficultySettings {
            base_attack_interval_ms: 300_000,
            progression_scaling: 500,
            ..DifficultySettings::default()
        };
        assert_eq!(decision_interval_ms(&settings, 0, &rules), 300_000);
        // 1 + 1.0 × 0.5 = 1.5
        assert_eq!(decision_interval_ms(&settings, 1000, &rules), 200_000);
        // Capped at 2.0
        assert_eq!(decision_interval_ms(&settings, 1_000_000, &rules), 150_000);
    }

    #[test]
    fn test_interval_never_zero() {
        let settings = DifficultySettings {
            base_attack_interval_ms: 0,
            ..DifficultySettings::default()
        };
        assert_eq!(decision_interval_ms(&settings, 0, &PlanningRules::default()), 1);
    }

    #[test]
    fn test_travel_time_floor() {
        let rules = PlanningRules::default();
        assert_eq!(travel_time_ms(Fixed::from_num(10), &rules), 30_000);
        assert_eq!(travel_time_ms(Fixed::from_num(400), &rules), 80_000);
        assert_eq!(travel_time_ms(Fixed::ZERO, &rules), 30_000);
    }

    #[test]
    fn test_forces_leave_workers_home() {
        let army = Army::new()
            .with(UnitType::Worker, 50)
            .with(UnitType::Soldier, 100)
            .with(UnitType::Elite, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..50 {
            let forces = choose_forces(&army, &mut rng, &PlanningRules::default());
            assert_eq!(forces.count(UnitType::Worker), 0);
            let soldiers = forces.count(UnitType::Soldier);
            assert!((60..=90).contains(&soldiers), "sent {soldiers}");
            assert_eq!(forces.count(UnitType::Elite), 1);
            assert!(army.covers(&forces));
        }
    }

    #[test]
    fn test_forces_empty_without_military() {
        let army = Army::new().with(UnitType::Worker, 10);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(choose_forces(&army, &mut rng, &PlanningRules::default()).is_empty());
    }

    #[test]
    fn test_attack_type_thresholds() {
        let target = Fixed::from_num(100);
        assert_eq!(attack_type_for(Fixed::from_num(200), target), AttackType::Assault);
        assert_eq!(attack_type_for(Fixed::from_num(100), target), AttackType::Raid);
        assert_eq!(attack_type_for(Fixed::from_num(50), target), AttackType::Skirmish);
        assert_eq!(attack_type_for(Fixed::from_num(49), target), AttackType::Probe);
        assert_eq!(attack_type_for(Fixed::ONE, Fixed::ZERO), AttackType::Assault);
    }

    #[test]
    fn test_formation_by_personality() {
        assert_eq!(formation_for(Personality::Aggressive), Formation::Aggressive);
        assert_eq!(formation_for(Personality::Opportunist), Formation::Guerrilla);
        assert_eq!(formation_for(Personality::Expansionist), Formation::Balanced);
        assert_eq!(formation_for(Personality::Balanced), Formation::Balanced);
    }
}
