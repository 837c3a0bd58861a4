//! # Colony Core
//!
//! Combat resolution and target selection for colony warfare.
//!
//! This crate contains **only** deterministic logic:
//! - No IO
//! - No clock (callers pass timestamps in)
//! - No system randomness (callers pass a seeded [`rand::Rng`])
//! - No floating-point math (uses fixed-point)
//!
//! Given the same armies, conditions, config, and RNG state, a battle
//! always produces the same outcome.
//!
//! ## Crate Structure
//!
//! - [`combat`] - Phased battle simulation
//! - [`targeting`] - Target scoring and attack eligibility
//! - [`planning`] - Decision cadence, force size, and travel time
//! - [`rewards`] - Resource rewards for the victor
//! - [`retreat`] - Retreat penalties
//! - [`config`] - Combat tables and RON loading
//! - [`army`] - Unit types and army composition
//! - [`colony`] - Colony snapshots and difficulty settings
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod army;
pub mod colony;
pub mod combat;
pub mod config;
pub mod error;
pub mod math;
pub mod planning;
pub mod retreat;
pub mod rewards;
pub mod targeting;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::army::{Army, UnitType};
    pub use crate::colony::{
        ColonyId, ColonySnapshot, DifficultySettings, Personality, ResourceBundle, UserId,
    };
    pub use crate::combat::{
        simulate_battle, BattleConditions, BattleOutcome, OutcomeKind, Side, TacticalRating,
        Victor,
    };
    pub use crate::config::{CombatConfig, Formation, Terrain};
    pub use crate::error::{CombatError, Result};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::planning::{AttackType, PlanningRules};
    pub use crate::retreat::{retreat_from_battle, RetreatResult};
    pub use crate::rewards::calculate_battle_rewards;
    pub use crate::targeting::{ScoreBreakdown, ScoredTarget, TargetingRules};
}
