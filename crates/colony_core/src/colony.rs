//! Colony snapshots and difficulty settings.
//!
//! These are read-only views of colony state owned by the external colony
//! store. Anything read into a [`ColonySnapshot`] may be stale by the time
//! it is used; nothing here assumes otherwise.

use serde::{Deserialize, Serialize};

use crate::army::{Army, UnitType};
use crate::combat::{raw_strength, Side};
use crate::config::{CombatConfig, Terrain};
use crate::math::{Fixed, Vec2Fixed};

/// Unique identifier for a colony.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColonyId(pub u64);

impl std::fmt::Display for ColonyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "colony#{}", self.0)
    }
}

/// Unique identifier for the user owning a colony.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Behavioural tag of an AI colony, used by target scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Personality {
    /// Picks fights with strong neighbours.
    Aggressive,
    /// Preys on the weak.
    Opportunist,
    /// Goes after large territories.
    Expansionist,
    /// No preference.
    #[default]
    Balanced,
}

/// Stored resources, or an amount of resources in transit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceBundle {
    /// Food.
    pub food: u32,
    /// Wood.
    pub wood: u32,
    /// Stone.
    pub stone: u32,
    /// Minerals.
    pub minerals: u32,
}

impl ResourceBundle {
    /// Empty bundle.
    pub const ZERO: Self = Self {
        food: 0,
        wood: 0,
        stone: 0,
        minerals: 0,
    };

    /// Create a new bundle.
    #[must_use]
    pub const fn new(food: u32, wood: u32, stone: u32, minerals: u32) -> Self {
        Self {
            food,
            wood,
            stone,
            minerals,
        }
    }

    /// Sum of all resources.
    #[must_use]
    pub fn total(&self) -> u64 {
        u64::from(self.food) + u64::from(self.wood) + u64::from(self.stone) + u64::from(self.minerals)
    }

    /// True when every resource is zero.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.food == 0 && self.wood == 0 && self.stone == 0 && self.minerals == 0
    }

    /// Apply `f` to every resource.
    #[must_use]
    pub fn map(self, f: impl Fn(u32) -> u32) -> Self {
        Self {
            food: f(self.food),
            wood: f(self.wood),
            stone: f(self.stone),
            minerals: f(self.minerals),
        }
    }

    /// Element-wise minimum (caps a transfer at what is actually stored).
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Self {
            food: self.food.min(other.food),
            wood: self.wood.min(other.wood),
            stone: self.stone.min(other.stone),
            minerals: self.minerals.min(other.minerals),
        }
    }

    /// Element-wise saturating subtraction.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        Self {
            food: self.food.saturating_sub(other.food),
            wood: self.wood.saturating_sub(other.wood),
            stone: self.stone.saturating_sub(other.stone),
            minerals: self.minerals.saturating_sub(other.minerals),
        }
    }

    /// Element-wise saturating addition.
    #[must_use]
    pub fn saturating_add(self, other: Self) -> Self {
        Self {
            food: self.food.saturating_add(other.food),
            wood: self.wood.saturating_add(other.wood),
            stone: self.stone.saturating_add(other.stone),
            minerals: self.minerals.saturating_add(other.minerals),
        }
    }
}

/// Point-in-time view of a colony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColonySnapshot {
    /// Colony identifier.
    pub id: ColonyId,
    /// Owning user.
    pub user_id: UserId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Whether the colony is AI controlled.
    #[serde(default)]
    pub is_ai: bool,
    /// Whether the colony is still in play.
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Total population.
    pub population: u32,
    /// Population slots currently used by military units.
    #[serde(default)]
    pub used_military_capacity: u32,
    /// Standing unit composition.
    #[serde(default)]
    pub army: Army,
    /// Stored resources.
    #[serde(default)]
    pub resources: ResourceBundle,
    /// Position of the colony's base.
    #[serde(default)]
    pub base_position: Vec2Fixed,
    /// Behaviour tag.
    #[serde(default)]
    pub personality: Personality,
    /// Simulated ticks since the colony was founded.
    #[serde(default)]
    pub total_ticks: u64,
    /// Claimed territory size.
    #[serde(default)]
    pub territory_size: u32,
    /// Terrain around the colony's base.
    #[serde(default)]
    pub terrain: Terrain,
}

const fn default_active() -> bool {
    true
}

impl ColonySnapshot {
    /// Create a minimal active colony at the origin.
    #[must_use]
    pub fn new(id: ColonyId, user_id: UserId) -> Self {
        Self {
            id,
            user_id,
            name: String::new(),
            is_ai: false,
            is_active: true,
            population: 0,
            used_military_capacity: 0,
            army: Army::new(),
            resources: ResourceBundle::ZERO,
            base_position: Vec2Fixed::ZERO,
            personality: Personality::Balanced,
            total_ticks: 0,
            territory_size: 0,
            terrain: Terrain::Grassland,
        }
    }

    /// Combat strength of the colony's military units, before any
    /// formation, terrain, or random modifiers.
    ///
    /// Colonies whose composition is not tracked fall back to their used
    /// military capacity, counted as soldiers.
    #[must_use]
    pub fn military_strength(&self, config: &CombatConfig) -> Fixed {
        let military = self.army.military();
        if military.is_empty() {
            let fallback = Army::new().with(UnitType::Soldier, self.used_military_capacity);
            return raw_strength(&fallback, Side::Attacker, config);
        }
        raw_strength(&military, Side::Attacker, config)
    }
}

/// Per-user attack tuning. Multipliers and chances are per-mille.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultySettings {
    /// Time between decision ticks for a fresh colony.
    pub base_attack_interval_ms: u64,
    /// Multiplier applied to every target score (1000 = 1.0).
    pub aggression_multiplier: u32,
    /// Chance to attack once a target is chosen (0..=1000).
    pub attack_chance: u32,
    /// Cap on simultaneous incoming attacks launched by one colony.
    pub max_concurrent_attacks: u32,
    /// How fast the decision interval shrinks with colony age (1000 = 1.0).
    pub progression_scaling: u32,
}

impl Default for DifficultySettings {
    fn default() -> Self {
        Self {
            base_attack_interval_ms: 300_000,
            aggression_multiplier: 1000,
            attack_chance: 300,
            max_concurrent_attacks: 2,
            progression_scaling: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_empty_and_total() {
        assert!(ResourceBundle::ZERO.is_empty());
        let bundle = ResourceBundle::new(1, 2, 3, 4);
        assert!(!bundle.is_empty());
        assert_eq!(bundle.total(), 10);
    }

    #[test]
    fn test_bundle_min_caps_transfer() {
        let reward = ResourceBundle::new(100, 50, 30, 20);
        let stored = ResourceBundle::new(40, 80, 0, 20);
        assert_eq!(reward.min(stored), ResourceBundle::new(40, 50, 0, 20));
    }

    #[test]
    fn test_military_strength_ignores_workers() {
        let config = CombatConfig::default();
        let mut colony = ColonySnapshot::new(ColonyId(1), UserId(1));
        colony.army = Army::new()
            .with(UnitType::Worker, 100)
            .with(UnitType::Soldier, 2);
        assert_eq!(colony.military_strength(&config), Fixed::from_num(6));
    }

    #[test]
    fn test_military_strength_falls_back_to_capacity() {
        let config = CombatConfig::default();
        let mut colony = ColonySnapshot::new(ColonyId(1), UserId(1));
        colony.used_military_capacity = 4;
        assert_eq!(colony.military_strength(&config), Fixed::from_num(12));
    }
}
