//! Headless naval battle runner.
//!
//! # Usage
//!
//! ```bash
//! # Play a scenario and print snapshots
//! cargo run -p naval_headless -- run --scenario battle.ron --ticks 2000 --every 100
//!
//! # Pace the battle at the configured tick period
//! cargo run -p naval_headless -- run --scenario battle.ron --ticks 400 --realtime
//!
//! # Validate a ship catalog
//! cargo run -p naval_headless -- validate --catalog ships.ron
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use naval_headless::{load_catalog, run, RunOptions, Scenario, ScenarioError};

#[derive(Parser)]
#[command(name = "naval_headless")]
#[command(about = "Headless naval battle runner", version)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scenario and write JSON snapshots to stdout
    Run {
        /// Scenario file (RON)
        #[arg(short, long)]
        scenario: PathBuf,

        /// Maximum ticks to simulate
        #[arg(short, long, default_value = "2000")]
        ticks: u64,

        /// Pace ticks at the configured wall-clock period
        #[arg(long)]
        realtime: bool,

        /// Ticks between snapshots (0 for summary only)
        #[arg(short, long, default_value = "100")]
        every: u64,
    },

    /// Parse and validate a ship catalog
    Validate {
        /// Catalog file (RON)
        #[arg(short, long)]
        catalog: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr, stdout carries JSON
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Run {
            scenario,
            ticks,
            realtime,
            every,
        } => cmd_run(scenario, RunOptions { ticks, every, realtime }),
        Commands::Validate { catalog } => cmd_validate(catalog),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "Command failed");
            eprintln!("FATAL: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Build a scenario and play it.
fn cmd_run(path: PathBuf, options: RunOptions) -> Result<(), ScenarioError> {
    tracing::info!(path = %path.display(), "Loading scenario");
    let loaded = Scenario::load_with_data(&path)?;
    let mut sim = loaded.scenario.build(loaded.catalog, &loaded.doctrines)?;

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    run(&mut sim, options, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Parse a catalog and report its classes.
fn cmd_validate(path: PathBuf) -> Result<(), ScenarioError> {
    let catalog = load_catalog(&path)?;
    for class in &catalog.classes {
        tracing::info!(
            tag = class.tag(),
            turrets = class.weapons.len(),
            cost = class.cost,
            "Class ok"
        );
    }
    println!(
        "{}",
        serde_json::json!({
            "catalog": path.display().to_string(),
            "valid": true,
            "classes": catalog.tags().collect::<Vec<_>>(),
        })
    );
    Ok(())
}
