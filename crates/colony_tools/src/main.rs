//! Colony Warfare - Development Tools

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colony_core::army::Army;
use colony_core::combat::BattleConditions;
use colony_core::config::{CombatConfig, Formation, Terrain};
use colony_tools::error::Result;
use colony_tools::simulate::parse_army;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "colony-tools")]
#[command(about = "Development tools for Colony Warfare combat tuning")]
struct Cli {
    /// Combat config RON file (built-in tables if omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Matchup {
    /// Attacking army, e.g. "soldier=10,worker=5"
    #[arg(long, value_parser = parse_army)]
    attacker: Army,
    /// Defending army, e.g. "soldier=8,guard=3"
    #[arg(long, value_parser = parse_army)]
    defender: Army,
    /// Battlefield terrain
    #[arg(long, default_value = "grassland")]
    terrain: Terrain,
    /// Attacker formation
    #[arg(long, default_value = "balanced")]
    attacker_formation: Formation,
    /// Defender formation
    #[arg(long, default_value = "defensive")]
    defender_formation: Formation,
}

impl Matchup {
    fn conditions(&self) -> BattleConditions {
        BattleConditions {
            terrain: self.terrain,
            attacker_formation: self.attacker_formation,
            defender_formation: self.defender_formation,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fight one battle and print the outcome as JSON
    Simulate {
        #[command(flatten)]
        matchup: Matchup,
        /// RNG seed
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Validate combat config files
    Validate {
        /// Config file or directory of config files
        #[arg(default_value = "assets/combat")]
        path: PathBuf,
    },
    /// Fight a batch of seeded battles and print aggregate statistics as JSON
    Balance {
        #[command(flatten)]
        matchup: Matchup,
        /// Number of battles
        #[arg(long, default_value_t = 1000)]
        battles: u32,
        /// First seed of the batch
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

fn combat_config(path: Option<&Path>) -> Result<CombatConfig> {
    match path {
        Some(path) => colony_tools::validate::load_combat_config(path),
        None => Ok(CombatConfig::default()),
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Simulate { matchup, seed } => {
            let config = combat_config(cli.config.as_deref())?;
            let outcome = colony_tools::simulate::run_simulation(
                &matchup.attacker,
                &matchup.defender,
                &matchup.conditions(),
                &config,
                seed,
            )?;
            println!("{}", colony_tools::simulate::render_outcome(&outcome)?);
        }
        Commands::Validate { path } => {
            tracing::info!("Validating combat configs in: {}", path.display());
            let checked = colony_tools::validate::validate_combat_configs(&path)?;
            tracing::info!("Validation passed ({checked} files)");
        }
        Commands::Balance {
            matchup,
            battles,
            seed,
        } => {
            let config = combat_config(cli.config.as_deref())?;
            let report = colony_tools::balance::run_balance(
                &matchup.attacker,
                &matchup.defender,
                &matchup.conditions(),
                &config,
                battles,
                seed,
            )?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run(Cli::parse()) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
