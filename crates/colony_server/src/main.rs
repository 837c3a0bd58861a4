//! Colony Warfare - Attack Scheduler Server
//!
//! Runs the attack scheduler against a seeded in-memory world for a fixed
//! time, then shuts down and prints statistics.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use colony_core::army::{Army, UnitType};
use colony_core::colony::{
    ColonyId, ColonySnapshot, DifficultySettings, Personality, ResourceBundle, UserId,
};
use colony_core::config::Terrain;
use colony_core::math::Vec2Fixed;
use colony_server::config::SchedulerConfig;
use colony_server::scheduler::AttackScheduler;
use colony_server::service::WarfareService;
use colony_server::store::MemoryColonyStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CONFIG_ENV: &str = "COLONY_SERVER_CONFIG";
const RUN_SECS_ENV: &str = "COLONY_SERVER_RUN_SECS";
const DEFAULT_RUN_SECS: u64 = 60;
const DEMO_SEED: u64 = 0x00C0_104F;

fn load_config() -> colony_server::error::Result<SchedulerConfig> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) => SchedulerConfig::load(Path::new(&path)),
        Err(_) => Ok(SchedulerConfig::default()),
    }
}

fn run_duration() -> Duration {
    let secs = std::env::var(RUN_SECS_ENV)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(DEFAULT_RUN_SECS);
    Duration::from_secs(secs)
}

fn demo_colony(
    id: u64,
    name: &str,
    position: (i32, i32),
    army: Army,
    personality: Personality,
    terrain: Terrain,
) -> ColonySnapshot {
    let mut colony = ColonySnapshot::new(ColonyId(id), UserId(id));
    colony.name = name.to_string();
    colony.is_ai = id <= 2;
    colony.population = 250;
    colony.army = army;
    colony.resources = ResourceBundle::new(1500, 1200, 800, 300);
    colony.base_position = Vec2Fixed::from_ints(position.0, position.1);
    colony.personality = personality;
    colony.terrain = terrain;
    colony.total_ticks = 4_000;
    colony.territory_size = 40;
    colony
}

/// Two AI colonies and two player colonies within striking distance.
fn demo_store() -> MemoryColonyStore {
    let store = MemoryColonyStore::new();
    let fast = DifficultySettings {
        base_attack_interval_ms: 20_000,
        attack_chance: 800,
        ..DifficultySettings::default()
    };

    store.upsert_colony(demo_colony(
        1,
        "Red Hive",
        (0, 0),
        Army::new()
            .with(UnitType::Soldier, 80)
            .with(UnitType::Elite, 6)
            .with(UnitType::Worker, 40),
        Personality::Aggressive,
        Terrain::Desert,
    ));
    store.upsert_colony(demo_colony(
        2,
        "Black Mound",
        (150, 80),
        Army::new()
            .with(UnitType::Soldier, 50)
            .with(UnitType::Scout, 20)
            .with(UnitType::Worker, 60),
        Personality::Opportunist,
        Terrain::Forest,
    ));
    store.upsert_colony(demo_colony(
        3,
        "Garden Nest",
        (90, -40),
        Army::new()
            .with(UnitType::Soldier, 25)
            .with(UnitType::Guard, 10)
            .with(UnitType::Worker, 50),
        Personality::Balanced,
        Terrain::Grassland,
    ));
    store.upsert_colony(demo_colony(
        4,
        "Stone Hollow",
        (220, 30),
        Army::new()
            .with(UnitType::Soldier, 40)
            .with(UnitType::Guard, 25),
        Personality::Balanced,
        Terrain::Mountain,
    ));
    store.set_difficulty(UserId(1), fast);
    store.set_difficulty(UserId(2), fast);
    store
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Colony Warfare attack scheduler");

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    let store = Arc::new(demo_store());
    let service = WarfareService::new(AttackScheduler::new(Arc::clone(&store), config, DEMO_SEED));

    match service.start().await {
        Ok(started) => tracing::info!("Scheduling {started} AI colonies"),
        Err(e) => {
            tracing::error!("Failed to start scheduler: {e}");
            std::process::exit(1);
        }
    }

    let duration = run_duration();
    tracing::info!("Running for {}s", duration.as_secs());
    tokio::time::sleep(duration).await;

    let abandoned = service.stop().await;
    let stats = service.statistics().await;
    tracing::info!(
        scheduled = stats.totals.scheduled,
        resolved = stats.totals.resolved,
        failed = stats.totals.failed_resolutions,
        abandoned = abandoned.len(),
        battles = store.battles().len(),
        "Scheduler stopped"
    );
}
