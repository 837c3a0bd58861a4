//! Static combat tables.
//!
//! All multipliers are stored as integer per-mille (1000 = 1.0) so a RON
//! file round-trips exactly. Every table is keyed by a closed enum and read
//! through an exhaustive `match`; there is no fallback entry.
//!
//! # Example RON
//!
//! ```ron
//! CombatConfig(
//!     base_casualty_rate: 150,
//!     max_casualty_rate: 400,
//!     phase_count: 3,
//!     randomness_band: 150,
//! )
//! ```
//!
//! Omitted fields keep their built-in values.

use serde::{Deserialize, Serialize};

use crate::army::UnitType;
use crate::error::{CombatError, Result};
use crate::math::{permille, Fixed};

/// Maximum number of combat phases in one battle.
pub const MAX_PHASES: u32 = 3;

/// Tactical stance of one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formation {
    /// Strong attack, weak defence.
    Aggressive,
    /// Strong defence, weak attack.
    Defensive,
    /// No modifiers.
    #[default]
    Balanced,
    /// Hit-and-run: slightly better attack, slightly worse defence.
    Guerrilla,
}

impl Formation {
    /// All formations.
    pub const ALL: [Formation; 4] = [
        Formation::Aggressive,
        Formation::Defensive,
        Formation::Balanced,
        Formation::Guerrilla,
    ];
}

impl std::str::FromStr for Formation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "aggressive" => Ok(Self::Aggressive),
            "defensive" => Ok(Self::Defensive),
            "balanced" => Ok(Self::Balanced),
            "guerrilla" => Ok(Self::Guerrilla),
            other => Err(format!("unknown formation '{other}'")),
        }
    }
}

/// Battlefield terrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    /// Open ground. Neutral.
    #[default]
    Grassland,
    /// Cover favours the defender.
    Forest,
    /// Exposed defenders, tiring approach.
    Desert,
    /// Steep approach, strong defensive positions.
    Mountain,
    /// Slows both sides, attacker more so.
    Swamp,
    /// Tunnels: very hard to assault.
    Underground,
}

impl Terrain {
    /// All terrains.
    pub const ALL: [Terrain; 6] = [
        Terrain::Grassland,
        Terrain::Forest,
        Terrain::Desert,
        Terrain::Mountain,
        Terrain::Swamp,
        Terrain::Underground,
    ];
}

impl std::str::FromStr for Terrain {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Terrain::ALL
            .into_iter()
            .find(|terrain| {
                let name = match terrain {
                    Terrain::Grassland => "grassland",
                    Terrain::Forest => "forest",
                    Terrain::Desert => "desert",
                    Terrain::Mountain => "mountain",
                    Terrain::Swamp => "swamp",
                    Terrain::Underground => "underground",
                };
                name == s.trim()
            })
            .ok_or_else(|| format!("unknown terrain '{s}'"))
    }
}

/// One per-mille value per unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTable {
    /// Worker value.
    pub worker: u32,
    /// Soldier value.
    pub soldier: u32,
    /// Scout value.
    pub scout: u32,
    /// Guard value.
    pub guard: u32,
    /// Elite value.
    pub elite: u32,
}

impl UnitTable {
    /// Raw per-mille value for a unit type.
    #[must_use]
    pub const fn get(&self, unit: UnitType) -> u32 {
        match unit {
            UnitType::Worker => self.worker,
            UnitType::Soldier => self.soldier,
            UnitType::Scout => self.scout,
            UnitType::Guard => self.guard,
            UnitType::Elite => self.elite,
        }
    }

    /// Value for a unit type as fixed-point.
    #[must_use]
    pub fn fixed(&self, unit: UnitType) -> Fixed {
        permille(self.get(unit))
    }
}

/// Attack and defence multipliers of a formation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormationModifier {
    /// Applied when the formation is used by the attacker.
    pub attack: u32,
    /// Applied when the formation is used by the defender.
    pub defense: u32,
}

/// Modifiers for every formation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormationTable {
    /// Aggressive stance.
    pub aggressive: FormationModifier,
    /// Defensive stance.
    pub defensive: FormationModifier,
    /// Balanced stance.
    pub balanced: FormationModifier,
    /// Guerrilla stance.
    pub guerrilla: FormationModifier,
}

impl FormationTable {
    /// Modifier for a formation.
    #[must_use]
    pub const fn get(&self, formation: Formation) -> FormationModifier {
        match formation {
            Formation::Aggressive => self.aggressive,
            Formation::Defensive => self.defensive,
            Formation::Balanced => self.balanced,
            Formation::Guerrilla => self.guerrilla,
        }
    }
}

/// Attacker and defender multipliers of a terrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainModifier {
    /// Applied to the attacking side.
    pub attacker: u32,
    /// Applied to the defending side.
    pub defender: u32,
}

/// Modifiers for every terrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainTable {
    /// Grassland.
    pub grassland: TerrainModifier,
    /// Forest.
    pub forest: TerrainModifier,
    /// Desert.
    pub desert: TerrainModifier,
    /// Mountain.
    pub mountain: TerrainModifier,
    /// Swamp.
    pub swamp: TerrainModifier,
    /// Underground.
    pub underground: TerrainModifier,
}

impl TerrainTable {
    /// Modifier for a terrain.
    #[must_use]
    pub const fn get(&self, terrain: Terrain) -> TerrainModifier {
        match terrain {
            Terrain::Grassland => self.grassland,
            Terrain::Forest => self.forest,
            Terrain::Desert => self.desert,
            Terrain::Mountain => self.mountain,
            Terrain::Swamp => self.swamp,
            Terrain::Underground => self.underground,
        }
    }
}

/// Complete set of combat tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Strength contributed by one unit of each type.
    pub base_strength: UnitTable,
    /// Extra strength each unit type gets when defending its home.
    pub defender_survivability: UnitTable,
    /// Casualty multiplier per unit type; higher dies faster.
    pub survival_modifier: UnitTable,
    /// Formation modifiers.
    pub formations: FormationTable,
    /// Terrain modifiers.
    pub terrains: TerrainTable,
    /// Share of a unit type lost per phase at full disadvantage.
    pub base_casualty_rate: u32,
    /// Per-phase cap on the share of a unit type that can be lost.
    pub max_casualty_rate: u32,
    /// Number of phases fought (at most [`MAX_PHASES`]).
    pub phase_count: u32,
    /// Casualty escalation added per phase after the first.
    pub phase_escalation_step: u32,
    /// Half-width of the random strength factor around 1.0.
    pub randomness_band: u32,
}

const fn modifier(attack: u32, defense: u32) -> FormationModifier {
    FormationModifier { attack, defense }
}

const fn terrain(attacker: u32, defender: u32) -> TerrainModifier {
    TerrainModifier { attacker, defender }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            base_strength: UnitTable {
                worker: 1000,
                soldier: 3000,
                scout: 2000,
                guard: 4000,
                elite: 6000,
            },
            defender_survivability: UnitTable {
                worker: 1000,
                soldier: 1200,
                scout: 900,
                guard: 1500,
                elite: 1300,
            },
            survival_modifier: UnitTable {
                worker: 1200,
                soldier: 1000,
                scout: 1100,
                guard: 800,
                elite: 600,
            },
            formations: FormationTable {
                aggressive: modifier(1300, 800),
                defensive: modifier(800, 1300),
                balanced: modifier(1000, 1000),
                guerrilla: modifier(1150, 900),
            },
            terrains: TerrainTable {
                grassland: terrain(1000, 1000),
                forest: terrain(900, 1200),
                desert: terrain(1100, 900),
                mountain: terrain(800, 1400),
                swamp: terrain(850, 1100),
                underground: terrain(750, 1500),
            },
            base_casualty_rate: 150,
            max_casualty_rate: 400,
            phase_count: MAX_PHASES,
            phase_escalation_step: 250,
            randomness_band: 150,
        }
    }
}

impl CombatConfig {
    /// Parse a config from RON text and validate it.
    ///
    /// `source` labels the text in error messages (usually a file path).
    pub fn from_ron_str(content: &str, source: &str) -> Result<Self> {
        let config: CombatConfig = ron::from_str(content).map_err(|e| CombatError::ConfigParse {
            path: source.to_string(),
            message: e.to_string(),
        })?;

        let errors = config.validate();
        if !errors.is_empty() {
            return Err(CombatError::ConfigInvalid(errors));
        }
        tracing::debug!(source, "Loaded combat config");
        Ok(config)
    }

    /// Builder method to set the randomness band (0 pins every roll to 1.0).
    #[must_use]
    pub fn with_randomness_band(mut self, band: u32) -> Self {
        self.randomness_band = band;
        self
    }

    /// Check internal consistency of the tables.
    ///
    /// Returns a list of validation errors.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for unit in UnitType::ALL {
            if self.base_strength.get(unit) == 0 {
                errors.push(format!("base_strength for '{unit}' must be positive"));
            }
            if self.defender_survivability.get(unit) == 0 {
                errors.push(format!(
                    "defender_survivability for '{unit}' must be positive"
                ));
            }
        }

        if self.phase_count == 0 || self.phase_count > MAX_PHASES {
            errors.push(format!(
                "phase_count must be between 1 and {MAX_PHASES}, got {}",
                self.phase_count
            ));
        }
        if self.base_casualty_rate > self.max_casualty_rate {
            errors.push(format!(
                "base_casualty_rate ({}) exceeds max_casualty_rate ({})",
                self.base_casualty_rate, self.max_casualty_rate
            ));
        }
        if self.max_casualty_rate > 1000 {
            errors.push(format!(
                "max_casualty_rate must be at most 1000, got {}",
                self.max_casualty_rate
            ));
        }
        if self.randomness_band >= 1000 {
            errors.push(format!(
                "randomness_band must be below 1000, got {}",
                self.randomness_band
            ));
        }

        errors
    }
}
