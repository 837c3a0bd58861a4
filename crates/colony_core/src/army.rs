//! Unit types and army compositions.
//!
//! An [`Army`] is a count per [`UnitType`]. The set of keys is preserved
//! through casualty application, so a casualty map built from an army
//! always covers exactly the unit types that army was created with.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fixed set of colony unit types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    /// Foragers and builders. Fight poorly, die first.
    Worker,
    /// Line combat unit.
    Soldier,
    /// Fast, lightly armoured.
    Scout,
    /// Heavy defensive unit.
    Guard,
    /// Veteran unit. Hardest to kill.
    Elite,
}

impl UnitType {
    /// All unit types in declaration order.
    pub const ALL: [UnitType; 5] = [
        UnitType::Worker,
        UnitType::Soldier,
        UnitType::Scout,
        UnitType::Guard,
        UnitType::Elite,
    ];

    /// Lowercase name as used on the wire and in CLI arguments.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Worker => "worker",
            Self::Soldier => "soldier",
            Self::Scout => "scout",
            Self::Guard => "guard",
            Self::Elite => "elite",
        }
    }

    /// Whether this unit type is sent on attacks.
    #[must_use]
    pub const fn is_military(self) -> bool {
        !matches!(self, Self::Worker)
    }
}

impl std::str::FromStr for UnitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UnitType::ALL
            .into_iter()
            .find(|unit| unit.as_str() == s.trim())
            .ok_or_else(|| format!("unknown unit type '{s}'"))
    }
}

impl std::fmt::Display for UnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit counts keyed by type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Army {
    counts: BTreeMap<UnitType, u32>,
}

impl Army {
    /// Create an empty army.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the count of one unit type.
    #[must_use]
    pub fn with(mut self, unit: UnitType, count: u32) -> Self {
        self.counts.insert(unit, count);
        self
    }

    /// Army with the same unit types as `self`, all at zero.
    #[must_use]
    pub fn zeroed_like(&self) -> Self {
        Self {
            counts: self.counts.keys().map(|&unit| (unit, 0)).collect(),
        }
    }

    /// Count of a unit type (zero when absent).
    #[must_use]
    pub fn count(&self, unit: UnitType) -> u32 {
        self.counts.get(&unit).copied().unwrap_or(0)
    }

    /// Whether the unit type is a key of this army, even with a zero count.
    #[must_use]
    pub fn contains_type(&self, unit: UnitType) -> bool {
        self.counts.contains_key(&unit)
    }

    /// Total number of units.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.counts
            .values()
            .fold(0u32, |acc, &count| acc.saturating_add(count))
    }

    /// True when the army has no units at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Iterate `(unit type, count)` pairs in unit type order.
    pub fn iter(&self) -> impl Iterator<Item = (UnitType, u32)> + '_ {
        self.counts.iter().map(|(&unit, &count)| (unit, count))
    }

    /// Add units of a type, creating the key if needed.
    pub fn add(&mut self, unit: UnitType, count: u32) {
        let entry = self.counts.entry(unit).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    /// Remove casualties from this army.
    ///
    /// Counts never go below zero; keys are kept even when a type is wiped out.
    pub fn apply_casualties(&mut self, casualties: &Army) {
        for (unit, lost) in casualties.iter() {
            if let Some(count) = self.counts.get_mut(&unit) {
                *count = count.saturating_sub(lost);
            }
        }
    }

    /// Army containing only the non-worker unit types.
    #[must_use]
    pub fn military(&self) -> Self {
        Self {
            counts: self
                .counts
                .iter()
                .filter(|(unit, _)| unit.is_military())
                .map(|(&unit, &count)| (unit, count))
                .collect(),
        }
    }

    /// Scale every count by a per-mille factor, rounding down.
    #[must_use]
    pub fn scaled_permille(&self, factor: u32) -> Self {
        Self {
            counts: self
                .counts
                .iter()
                .map(|(&unit, &count)| {
                    let scaled = u64::from(count) * u64::from(factor) / 1000;
                    (unit, u32::try_from(scaled).unwrap_or(u32::MAX))
                })
                .collect(),
        }
    }

    /// Whether every count in `other` is available in `self`.
    #[must_use]
    pub fn covers(&self, other: &Army) -> bool {
        other.iter().all(|(unit, count)| self.count(unit) >= count)
    }
}

impl FromIterator<(UnitType, u32)> for Army {
    fn from_iter<I: IntoIterator<Item = (UnitType, u32)>>(iter: I) -> Self {
        let mut army = Army::new();
        for (unit, count) in iter {
            army.add(unit, count);
        }
        army
    }
}
