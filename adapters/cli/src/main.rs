#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that stages a squad assault and prints it as it unfolds.

mod frame;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use warbots_core::WELCOME_BANNER;
use warbots_runtime::SimulationConfig;

/// Command-line options for the warbots simulation.
#[derive(Debug, Parser)]
#[command(name = "warbots", version, about = "Simulates an autonomous warbot squad assault")]
struct Cli {
    /// TOML file with simulation settings.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seed for terrain and spawn placement.
    #[arg(long)]
    seed: Option<u64>,

    /// Map columns.
    #[arg(long)]
    width: Option<u32>,

    /// Map rows.
    #[arg(long)]
    height: Option<u32>,

    /// Warbots in the squad.
    #[arg(long)]
    warbots: Option<u8>,

    /// Hostiles guarding the objective.
    #[arg(long)]
    opfor: Option<u8>,

    /// Rounds played before the run is abandoned.
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Radio receive cycle in milliseconds.
    #[arg(long)]
    cycle_ms: Option<u64>,

    /// Reply timeout per round in milliseconds.
    #[arg(long)]
    turn_timeout_ms: Option<u64>,

    /// Pause between rounds in milliseconds.
    #[arg(long)]
    turn_delay_ms: Option<u64>,

    /// Print the map every N rounds; 0 prints only the final frame.
    #[arg(long, default_value_t = 0, value_name = "N")]
    frame_every: u32,

    /// Log level used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn apply_overrides(&self, config: &mut SimulationConfig) {
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(warbots) = self.warbots {
            config.warbots = warbots;
        }
        if let Some(opfor) = self.opfor {
            config.opfor = opfor;
        }
        if let Some(max_rounds) = self.max_rounds {
            config.max_rounds = max_rounds;
        }
        if let Some(cycle_ms) = self.cycle_ms {
            config.cycle_ms = cycle_ms;
        }
        if let Some(turn_timeout_ms) = self.turn_timeout_ms {
            config.turn_timeout_ms = turn_timeout_ms;
        }
        if let Some(turn_delay_ms) = self.turn_delay_ms {
            config.turn_delay_ms = turn_delay_ms;
        }
    }
}

/// Entry point for the warbots command-line interface.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SimulationConfig::default(),
    };
    cli.apply_overrides(&mut config);
    config.validate().context("invalid simulation settings")?;

    println!("{WELCOME_BANNER}");
    let mut neutralized = 0;
    let outcome = warbots_runtime::run(&config, |report| {
        neutralized += frame::neutralized(report);
        if cli.frame_every > 0 && report.round % cli.frame_every == 0 {
            println!("{}", frame::render(report.round, report.map));
        }
    })
    .await
    .context("simulation failed")?;

    println!("{}", frame::render(outcome.rounds, &outcome.map));
    println!(
        "{}",
        frame::summary(
            outcome.rounds,
            outcome.completed,
            neutralized,
            outcome.lost.len()
        )
    );
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level {level:?}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
    Ok(())
}

fn load_config(path: &Path) -> Result<SimulationConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse config file {}", path.display()))
}
