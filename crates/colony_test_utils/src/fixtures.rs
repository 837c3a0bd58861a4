//! Test fixtures and helpers.
//!
//! Pre-built armies, colonies, and RNGs for consistent testing.

use colony_core::army::{Army, UnitType};
use colony_core::colony::{ColonyId, ColonySnapshot, Personality, ResourceBundle, UserId};
use colony_core::config::Terrain;
use colony_core::math::Vec2Fixed;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Seeded RNG so every test run rolls the same numbers.
#[must_use]
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Army of only soldiers.
#[must_use]
pub fn soldiers(count: u32) -> Army {
    Army::new().with(UnitType::Soldier, count)
}

/// Typical raiding party: soldiers backed by a few workers.
#[must_use]
pub fn raiding_party() -> Army {
    Army::new()
        .with(UnitType::Soldier, 10)
        .with(UnitType::Worker, 5)
}

/// Typical home guard: soldiers behind guards.
#[must_use]
pub fn home_guard() -> Army {
    Army::new()
        .with(UnitType::Soldier, 8)
        .with(UnitType::Guard, 3)
}

/// Builder for colony snapshots in tests.
#[derive(Debug, Clone)]
pub struct ColonyBuilder {
    snapshot: ColonySnapshot,
}

impl ColonyBuilder {
    /// Start an active, player-owned colony at the origin.
    #[must_use]
    pub fn new(id: u64) -> Self {
        let mut snapshot = ColonySnapshot::new(ColonyId(id), UserId(id));
        snapshot.name = format!("colony-{id}");
        snapshot.population = 100;
        Self { snapshot }
    }

    /// Mark the colony as AI controlled.
    #[must_use]
    pub fn ai(mut self) -> Self {
        self.snapshot.is_ai = true;
        self
    }

    /// Mark the colony as no longer in play.
    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.snapshot.is_active = false;
        self
    }

    /// Set the owning user.
    #[must_use]
    pub fn owner(mut self, user: u64) -> Self {
        self.snapshot.user_id = UserId(user);
        self
    }

    /// Set the standing army.
    #[must_use]
    pub fn army(mut self, army: Army) -> Self {
        self.snapshot.army = army;
        self
    }

    /// Set stored resources.
    #[must_use]
    pub fn resources(mut self, resources: ResourceBundle) -> Self {
        self.snapshot.resources = resources;
        self
    }

    /// Set the base position.
    #[must_use]
    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.snapshot.base_position = Vec2Fixed::from_ints(x, y);
        self
    }

    /// Set the population.
    #[must_use]
    pub fn population(mut self, population: u32) -> Self {
        self.snapshot.population = population;
        self
    }

    /// Set the personality.
    #[must_use]
    pub fn personality(mut self, personality: Personality) -> Self {
        self.snapshot.personality = personality;
        self
    }

    /// Set the home terrain.
    #[must_use]
    pub fn terrain(mut self, terrain: Terrain) -> Self {
        self.snapshot.terrain = terrain;
        self
    }

    /// Set the colony age in ticks.
    #[must_use]
    pub fn ticks(mut self, total_ticks: u64) -> Self {
        self.snapshot.total_ticks = total_ticks;
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> ColonySnapshot {
        self.snapshot
    }
}
