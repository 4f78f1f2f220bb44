//! # Holdout Simulator
//!
//! Runs a level headlessly: `holdout-sim [config.toml]`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use anyhow::{Context, Result};
use holdout_engine::{logging, LevelDescription, SimConfig, Simulation, CONFIG_FILE};
use std::path::PathBuf;
use tracing::info;

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    let log_filter = logging::init()?;

    info!("Holdout simulator starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let config = SimConfig::load_from(&config_path);
    logging::apply_filter(&log_filter, &config.log_filter)
        .with_context(|| format!("applying log filter {:?}", config.log_filter))?;
    info!("Config: {}", config_path.display());

    let level = LevelDescription::load(&config.level_path)
        .with_context(|| format!("loading level {}", config.level_path.display()))?;
    let mut sim = Simulation::build(config.clone(), &level)?;
    let report = sim.run();

    if let Some(path) = &config.report_path {
        report.write_json(path)?;
    }

    for agent in &report.agents {
        info!(
            agent = %agent.entity_id,
            state = ?agent.state,
            x = agent.position.x,
            y = agent.position.y,
            rounds = agent.rounds,
            "final agent state"
        );
    }

    info!("Holdout simulator shutdown complete");
    Ok(())
}
