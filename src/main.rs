//! Headless tick driver for the channel arbitration simulator.
//!
//! Loads a TOML configuration, builds the simulation, advances it at a fixed
//! simulated cadence, and writes the final render snapshot as JSON to
//! stdout. All status lines go through the logger.

use anyhow::Context;
use env_logger::Builder;
use log::{LevelFilter, info, warn};
use std::path::Path;

use wsn_channel_simulator::{Simulation, load_config};

/// Upper bound on driver ticks when no session cap is configured, so a
/// pathological backoff loop cannot spin the process forever.
const TICK_SAFETY_CAP: u64 = 1_000_000;

fn main() -> anyhow::Result<()> {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let config_path = std::env::args()
        .nth(1)
        .context("usage: wsn-channel-simulator <config.toml>")?;
    let config = load_config(Path::new(&config_path))
        .with_context(|| format!("invalid configuration: {}", config_path))?;
    info!("Loaded configuration file: {}", config_path);

    if config.max_sessions.is_none() {
        warn!(
            "No max_sessions configured; stopping after {} ticks",
            TICK_SAFETY_CAP
        );
    }

    let mut sim = Simulation::from_config(&config)?;

    let mut now = 0.0;
    let mut ticks: u64 = 0;
    while !sim.is_finished() && ticks < TICK_SAFETY_CAP {
        sim.advance(now);
        now += config.tick_interval;
        ticks += 1;
    }

    info!(
        "Simulation finished after {} ticks ({} time units), {} completed",
        ticks,
        now,
        sim.completed()
    );
    println!("{}", serde_json::to_string_pretty(&sim.snapshot())?);
    Ok(())
}
