//! Combat benchmarks for colony_core.
//!
//! Run with: `cargo bench -p colony_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use colony_core::combat::{simulate_battle, BattleConditions};
use colony_core::config::{CombatConfig, Formation, Terrain};
use colony_core::prelude::{Army, UnitType};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Benchmarks one full battle between mixed armies.
pub fn combat_benchmark(c: &mut Criterion) {
    let attacker = Army::new()
        .with(UnitType::Soldier, 400)
        .with(UnitType::Scout, 120)
        .with(UnitType::Elite, 30);
    let defender = Army::new()
        .with(UnitType::Worker, 600)
        .with(UnitType::Guard, 250)
        .with(UnitType::Soldier, 150);
    let conditions = BattleConditions {
        terrain: Terrain::Forest,
        attacker_formation: Formation::Aggressive,
        defender_formation: Formation::Defensive,
    };
    let config = CombatConfig::default();

    c.bench_function("simulate_battle_mixed", |b| {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        b.iter(|| {
            simulate_battle(
                black_box(&attacker),
                black_box(&defender),
                &conditions,
                &config,
                &mut rng,
            )
        })
    });
}

criterion_group!(benches, combat_benchmark);
criterion_main!(benches);
