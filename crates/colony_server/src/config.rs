//! Scheduler configuration.
//!
//! Loaded from RON the same way combat tables are. Every field is optional
//! in the file; omitted fields keep their built-in values.
//!
//! ```ron
//! SchedulerConfig(
//!     min_cooldown_ms: 30000,
//!     store_timeout_ms: 2000,
//!     combat: (randomness_band: 100),
//! )
//! ```

use std::path::Path;
use std::time::Duration;

use colony_core::config::CombatConfig;
use colony_core::planning::PlanningRules;
use colony_core::targeting::TargetingRules;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WarfareError};

/// Tuning for the attack scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Minimum military strength before a colony may attack.
    pub min_military_strength: u32,
    /// Minimum time between two attacks by the same colony.
    pub min_cooldown_ms: u64,
    /// Colonies further away are never targeted.
    pub max_target_distance: u32,
    /// Minimum target score (per-mille).
    pub min_score: u32,
    /// Shortest travel time.
    pub min_travel_ms: u64,
    /// Travel time per unit of distance.
    pub travel_ms_per_unit: u64,
    /// Smallest share of the military sent (per-mille).
    pub forces_min_permille: u32,
    /// Largest share of the military sent (per-mille).
    pub forces_max_permille: u32,
    /// Upper bound on every colony store call.
    pub store_timeout_ms: u64,
    /// Failed resolutions kept for reconciliation.
    pub dead_letter_capacity: usize,
    /// Cap on the decision interval speed-up (per-mille).
    pub max_progression: u32,
    /// Combat tables.
    pub combat: CombatConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let targeting = TargetingRules::default();
        let planning = PlanningRules::default();
        Self {
            min_military_strength: targeting.min_military_strength,
            min_cooldown_ms: targeting.min_cooldown_ms,
            max_target_distance: targeting.max_target_distance,
            min_score: targeting.min_score,
            min_travel_ms: planning.min_travel_ms,
            travel_ms_per_unit: planning.travel_ms_per_unit,
            forces_min_permille: planning.forces_min_permille,
            forces_max_permille: planning.forces_max_permille,
            store_timeout_ms: 5_000,
            dead_letter_capacity: 64,
            max_progression: planning.max_progression,
            combat: CombatConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Parse a config from RON text and validate it.
    pub fn from_ron_str(content: &str, source: &str) -> Result<Self> {
        let config: Self = ron::from_str(content)
            .map_err(|e| WarfareError::Config(format!("failed to parse '{source}': {e}")))?;

        let errors = config.validate();
        if !errors.is_empty() {
            return Err(WarfareError::Config(format!(
                "invalid '{source}': {}",
                errors.join("; ")
            )));
        }
        Ok(config)
    }

    /// Read and parse a RON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| WarfareError::Config(format!("failed to read {}: {e}", path.display())))?;
        let config = Self::from_ron_str(&content, &path.display().to_string())?;
        tracing::info!(path = %path.display(), "Loaded scheduler config");
        Ok(config)
    }

    /// Check internal consistency.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.combat.validate();
        if self.forces_min_permille > self.forces_max_permille {
            errors.push(format!(
                "forces_min_permille ({}) exceeds forces_max_permille ({})",
                self.forces_min_permille, self.forces_max_permille
            ));
        }
        if self.forces_max_permille > 1000 {
            errors.push(format!(
                "forces_max_permille must be at most 1000, got {}",
                self.forces_max_permille
            ));
        }
        if self.store_timeout_ms == 0 {
            errors.push("store_timeout_ms must be positive".to_string());
        }
        if self.max_progression < 1000 {
            errors.push(format!(
                "max_progression must be at least 1000, got {}",
                self.max_progression
            ));
        }
        errors
    }

    /// Targeting thresholds for the core selector.
    #[must_use]
    pub fn targeting_rules(&self) -> TargetingRules {
        TargetingRules {
            max_target_distance: self.max_target_distance,
            min_score: self.min_score,
            min_military_strength: self.min_military_strength,
            min_cooldown_ms: self.min_cooldown_ms,
        }
    }

    /// Dispatch tuning for the core planner.
    #[must_use]
    pub fn planning_rules(&self) -> PlanningRules {
        PlanningRules {
            min_travel_ms: self.min_travel_ms,
            travel_ms_per_unit: self.travel_ms_per_unit,
            forces_min_permille: self.forces_min_permille,
            forces_max_permille: self.forces_max_permille,
            max_progression: self.max_progression,
        }
    }

    /// Store call timeout.
    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid_and_match_rules() {
        let config = SchedulerConfig::default();
        assert!(config.validate().is_empty());
        assert_eq!(config.targeting_rules(), TargetingRules::default());
        assert_eq!(config.planning_rules(), PlanningRules::default());
        assert_eq!(config.store_timeout(), Duration::from_secs(5));
        assert_eq!(config.dead_letter_capacity, 64);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = SchedulerConfig::from_ron_str(
            include_str!("../../../assets/scheduler.ron"),
            "assets/scheduler.ron",
        )
        .expect("shipped config parses");
        assert_eq!(config, SchedulerConfig::default());
    }

    #[test]
    fn test_partial_ron_with_nested_combat() {
        let config = SchedulerConfig::from_ron_str(
            "(min_cooldown_ms: 1000, combat: (randomness_band: 0))",
            "inline",
        )
        .expect("parse");
        assert_eq!(config.min_cooldown_ms, 1000);
        assert_eq!(config.combat.randomness_band, 0);
        assert_eq!(config.max_target_distance, 500);
    }

    #[test]
    fn test_inverted_force_range_rejected() {
        let err = SchedulerConfig::from_ron_str(
            "(forces_min_permille: 900, forces_max_permille: 600)",
            "inline",
        )
        .expect_err("should fail");
        assert!(matches!(err, WarfareError::Config(msg) if msg.contains("forces_min_permille")));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = SchedulerConfig::load(Path::new("/nonexistent/scheduler.ron"))
            .expect_err("missing file");
        assert!(matches!(err, WarfareError::Config(_)));
    }
}
