//! One-off battle simulation from the command line.

use colony_core::army::{Army, UnitType};
use colony_core::combat::{simulate_battle, BattleConditions, BattleOutcome};
use colony_core::config::CombatConfig;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::Result;

/// Parse an army written as `soldier=10,worker=5`.
///
/// Repeated unit types add up. Used as a clap value parser.
///
/// # Errors
///
/// Returns a message naming the bad entry.
pub fn parse_army(text: &str) -> std::result::Result<Army, String> {
    let mut army = Army::new();
    for entry in text.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (unit, count) = entry
            .split_once('=')
            .ok_or_else(|| format!("expected unit=count, got '{entry}'"))?;
        let unit: UnitType = unit.parse()?;
        let count: u32 = count
            .trim()
            .parse()
            .map_err(|_| format!("invalid count in '{entry}'"))?;
        army.add(unit, count);
    }
    Ok(army)
}

/// Fight one seeded battle.
///
/// # Errors
///
/// Returns an error if either army is empty.
pub fn run_simulation(
    attacker: &Army,
    defender: &Army,
    conditions: &BattleConditions,
    config: &CombatConfig,
    seed: u64,
) -> Result<BattleOutcome> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let outcome = simulate_battle(attacker, defender, conditions, config, &mut rng)?;
    tracing::info!(
        seed,
        victor = ?outcome.victor,
        rating = ?outcome.battle_efficiency.tactical_rating,
        phases = outcome.phases_fought(),
        "Battle simulated"
    );
    Ok(outcome)
}

/// Pretty JSON for an outcome.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_outcome(outcome: &BattleOutcome) -> Result<String> {
    Ok(serde_json::to_string_pretty(outcome)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_core::combat::Victor;
    use colony_core::config::{Formation, Terrain};
    use colony_core::error::CombatError;
    use crate::error::ToolError;

    #[test]
    fn test_parse_army() {
        let army = parse_army("soldier=10, worker=5,soldier=2").expect("valid");
        assert_eq!(army.count(UnitType::Soldier), 12);
        assert_eq!(army.count(UnitType::Worker), 5);
        assert!(parse_army("").expect("empty is allowed").is_empty());
    }

    #[test]
    fn test_parse_army_rejects_bad_entries() {
        assert!(parse_army("soldier").is_err());
        assert!(parse_army("dragon=3").is_err());
        assert!(parse_army("soldier=-1").is_err());
    }

    #[test]
    fn test_simulation_is_seeded() {
        let conditions = BattleConditions {
            terrain: Terrain::Forest,
            attacker_formation: Formation::Aggressive,
            defender_formation: Formation::Defensive,
        };
        let attacker = parse_army("soldier=10,worker=5").expect("valid");
        let defender = parse_army("soldier=8,guard=3").expect("valid");
        let config = CombatConfig::default();

        let a = run_simulation(&attacker, &defender, &conditions, &config, 42).expect("valid");
        let b = run_simulation(&attacker, &defender, &conditions, &config, 42).expect("valid");
        assert_eq!(a, b);

        let json = render_outcome(&a).expect("serializable");
        assert!(json.contains("\"victor\""));
    }

    #[test]
    fn test_overwhelming_attacker_wins() {
        let outcome = run_simulation(
            &parse_army("soldier=100").expect("valid"),
            &parse_army("soldier=1").expect("valid"),
            &BattleConditions::default(),
            &CombatConfig::default().with_randomness_band(0),
            1,
        )
        .expect("valid");
        assert_eq!(outcome.victor, Victor::Attacker);
    }

    #[test]
    fn test_empty_army_is_rejected() {
        let result = run_simulation(
            &Army::new(),
            &parse_army("soldier=5").expect("valid"),
            &BattleConditions::default(),
            &CombatConfig::default(),
            1,
        );
        assert!(matches!(
            result,
            Err(ToolError::Combat(CombatError::Validation { .. }))
        ));
    }
}
