#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a Rampart scenario headlessly.

mod content;
mod scenario;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rampart_core::{Command, Difficulty, Event, WorldPoint};
use rampart_engine::Simulation;
use rampart_system_spawning::{Config as SpawnConfig, Spawning};
use rampart_world::{query, snapshot, World};
use tracing_subscriber::EnvFilter;

use crate::scenario::Scenario;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DifficultyArg {
    Easy,
    Medium,
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(value: DifficultyArg) -> Self {
        match value {
            DifficultyArg::Easy => Difficulty::Easy,
            DifficultyArg::Medium => Difficulty::Medium,
            DifficultyArg::Hard => Difficulty::Hard,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "rampart")]
#[command(about = "Runs a headless tower-defense simulation")]
struct Args {
    /// Scenario file in TOML; the built-in scenario runs when omitted.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Maximum number of ticks to simulate.
    #[arg(long, default_value_t = 5_000)]
    ticks: u64,

    /// Difficulty overriding the scenario's.
    #[arg(long, value_enum)]
    difficulty: Option<DifficultyArg>,

    /// Wave shuffle seed overriding the scenario's.
    #[arg(long)]
    seed: Option<u64>,

    /// JSON snapshot restored instead of the scenario's opening placements.
    #[arg(long)]
    restore: Option<PathBuf>,

    /// Path receiving a JSON snapshot of the final state.
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct Summary {
    spawned: usize,
    kills: usize,
    leaks: usize,
    rounds: u32,
    gold_granted: u64,
    rejections: usize,
    config_errors: usize,
    defeated: bool,
}

impl Summary {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::EnemySpawned { .. } => self.spawned += 1,
                Event::EnemyKilled { reward, .. } => {
                    self.kills += 1;
                    self.gold_granted += u64::from(*reward);
                }
                Event::EnemyLeaked { .. } => self.leaks += 1,
                Event::GoldGranted { amount, .. } => self.gold_granted += u64::from(*amount),
                Event::RoundEnded { round } => {
                    self.rounds = *round;
                    tracing::info!(round, "round complete");
                }
                Event::PurchaseRejected { .. }
                | Event::UpgradeRejected { .. }
                | Event::AbilityRejected { .. } => self.rejections += 1,
                Event::ConfigurationError { .. } => self.config_errors += 1,
                Event::PlayerDefeated => self.defeated = true,
                _ => {}
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::builtin(),
    };
    let difficulty = args.difficulty.map_or(scenario.difficulty, Difficulty::from);
    let seed = args.seed.unwrap_or(scenario.seed);

    let world = World::new(scenario.world_config(), content::catalog(), content::hooks());
    let spawning = Spawning::new(
        SpawnConfig::new(scenario.waves.clone(), seed).with_round_gap(scenario.round_gap),
    );
    let mut simulation = Simulation::new(world).with_spawning(spawning);
    let mut summary = Summary::default();
    summary.record(&simulation.apply_now(Command::ResetGame { difficulty }));

    match &args.restore {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read snapshot {}", path.display()))?;
            let saved: snapshot::WorldSnapshot = serde_json::from_str(&text)
                .with_context(|| format!("invalid snapshot {}", path.display()))?;
            summary.record(&simulation.restore(&saved));
        }
        None => {
            for placement in &scenario.towers {
                summary.record(&simulation.apply_now(Command::PlaceTower {
                    kind: placement.kind.clone(),
                    position: WorldPoint::new(placement.x, placement.y),
                }));
            }
        }
    }

    tracing::info!(
        ?difficulty,
        seed,
        towers = query::tower_view(simulation.world()).iter().count(),
        gold = query::gold(simulation.world()),
        "simulation starting"
    );

    let ticks = simulation.run(args.ticks, |events| summary.record(events));
    let world = simulation.world();
    let completed = simulation
        .spawning()
        .map_or(0, |spawning| spawning.completed_waves());

    println!("ticks simulated: {ticks}");
    println!("waves completed: {completed}/{}", scenario.waves.len());
    println!("rounds ended: {}", summary.rounds);
    println!(
        "enemies: {} spawned, {} killed, {} leaked",
        summary.spawned, summary.kills, summary.leaks
    );
    println!(
        "player: {} hp, {} gold ({} earned)",
        query::player_hp(world),
        query::gold(world),
        summary.gold_granted
    );
    println!(
        "rejections: {}, configuration errors: {}",
        summary.rejections, summary.config_errors
    );
    println!(
        "outcome: {}",
        if summary.defeated { "defeat" } else if simulation.is_over() { "victory" } else { "unfinished" }
    );

    if let Some(path) = &args.snapshot {
        let json = serde_json::to_string_pretty(&snapshot::extract(world))
            .context("failed to serialize snapshot")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;
        tracing::info!(path = %path.display(), "snapshot written");
    }

    Ok(())
}
