//! Retreating from a battle in progress.
//!
//! A retreat always costs the same fixed share of units and carried
//! resources, and puts the colony on an attack cooldown.

use serde::{Deserialize, Serialize};

use crate::army::Army;
use crate::colony::ResourceBundle;
use crate::error::{CombatError, Result};

/// Share of each unit type lost while retreating (per-mille).
pub const RETREAT_CASUALTY_RATE: u32 = 200;

/// Share of carried resources abandoned while retreating (per-mille).
pub const RETREAT_RESOURCE_LOSS: u32 = 100;

/// Cooldown before the retreating colony may attack again.
pub const RETREAT_COOLDOWN_MS: u64 = 300_000;

/// What is left after a retreat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetreatResult {
    /// Units that made it home.
    pub survivors: Army,
    /// Units lost on the way out.
    pub casualties: Army,
    /// Resources still carried.
    pub resources_kept: ResourceBundle,
    /// Resources abandoned.
    pub resources_lost: ResourceBundle,
    /// Time before the colony may attack again.
    pub cooldown_ms: u64,
}

/// Apply the retreat penalties to a remaining army and its cargo.
///
/// # Errors
///
/// Returns [`CombatError::Validation`] if the remaining army is empty.
pub fn retreat_from_battle(remaining: &Army, carried: ResourceBundle) -> Result<RetreatResult> {
    if remaining.is_empty() {
        return Err(CombatError::validation(
            "remaining_army",
            "nothing left to retreat",
        ));
    }

    let casualties = remaining.scaled_permille(RETREAT_CASUALTY_RATE);
    let mut survivors = remaining.clone();
    survivors.apply_casualties(&casualties);

    let resources_lost = carried.map(|amount| {
        let lost = u64::from(amount) * u64::from(RETREAT_RESOURCE_LOSS) / 1000;
        u32::try_from(lost).unwrap_or(amount)
    });

    Ok(RetreatResult {
        survivors,
        casualties,
        resources_kept: carried.saturating_sub(resources_lost),
        resources_lost,
        cooldown_ms: RETREAT_COOLDOWN_MS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::army::UnitType;

    #[test]
    fn test_retreat_penalties() {
        let army = Army::new()
            .with(UnitType::Soldier, 10)
            .with(UnitType::Scout, 4);
        let result =
            retreat_from_battle(&army, ResourceBundle::new(100, 55, 9, 0)).expect("valid retreat");

        assert_eq!(result.casualties.count(UnitType::Soldier), 2);
        assert_eq!(result.casualties.count(UnitType::Scout), 0);
        assert_eq!(result.survivors.count(UnitType::Soldier), 8);
        assert_eq!(result.survivors.count(UnitType::Scout), 4);
        assert_eq!(result.resources_lost, ResourceBundle::new(10, 5, 0, 0));
        assert_eq!(result.resources_kept, ResourceBundle::new(90, 50, 9, 0));
        assert_eq!(result.cooldown_ms, RETREAT_COOLDOWN_MS);
    }

    #[test]
    fn test_retreat_with_nothing_rejected() {
        let err = retreat_from_battle(&Army::new(), ResourceBundle::ZERO)
            .expect_err("empty army cannot retreat");
        assert_eq!(err.field(), Some("remaining_army"));
    }
}
