#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a scripted Delve dig simulation.

mod config;
mod simulation;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use delve_world::parse_layout;
use tracing_subscriber::EnvFilter;

use crate::simulation::Simulation;

const DEFAULT_MAP: &str = include_str!("../maps/quarry.txt");

/// Runs agents against the dig sites of an ASCII map.
#[derive(Debug, Parser)]
#[command(name = "delve", version)]
struct Args {
    /// ASCII map to load; the bundled quarry is used when omitted.
    #[arg(long)]
    map: Option<PathBuf>,
    /// TOML file overriding scheduler and run settings.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Maximum number of ticks to simulate.
    #[arg(long, default_value_t = 500)]
    ticks: u64,
    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Entry point for the Delve command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = config::load(args.config.as_deref())?;
    let map = match &args.map {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read map at {}", path.display()))?,
        None => DEFAULT_MAP.to_owned(),
    };
    let layout = parse_layout(&map).context("failed to decode map")?;

    let mut simulation = Simulation::new(layout, &config);
    let report = simulation.run(args.ticks);
    println!(
        "ticks: {}, tasks completed: {}, dig sites remaining: {}, order finished: {}",
        report.ticks, report.tasks_completed, report.sites_remaining, report.order_finished
    );
    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
