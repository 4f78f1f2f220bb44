//! Holdout Engine - headless simulation host for the hostile NPC AI.
//!
//! This crate loads a TOML configuration and a RON level, builds the
//! navigation grid and NPC roster, and steps everything with a fixed tick.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

/// Simulation configuration
pub mod config;
/// Level descriptions
pub mod level;
/// Tracing subscriber setup
pub mod logging;
/// Fixed-tick simulation and run report
pub mod sim;

pub use config::{SimConfig, CONFIG_FILE};
pub use level::{LevelDescription, LevelError, NpcDescription, PlayerScript, ScriptedNoise};
pub use sim::{EngineError, EngineResult, RunReport, ScriptedPlayer, Simulation};
