//! Simulation configuration.
//!
//! Provides tick rate, run length, seeding, logging and agent tuning.
//! Configuration can be loaded from and saved to a TOML file.

use holdout_common::ConfigError;
use holdout_gameplay::AgentTuning;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "holdout.toml";

/// Simulation configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === Timing ===
    /// Fixed simulation ticks per second
    pub tick_rate: u32,
    /// Simulated seconds to run
    pub duration_secs: f32,

    // === Level ===
    /// RON level description
    pub level_path: PathBuf,
    /// Base seed; each NPC without its own seed derives one from it
    pub seed: u64,

    // === Output ===
    /// Default tracing directive, combined with `RUST_LOG`
    pub log_filter: String,
    /// Where to write the JSON run report, if anywhere
    pub report_path: Option<PathBuf>,
    /// Capacity of the agent event bus
    pub event_capacity: usize,

    // === Agents ===
    /// Tuning shared by every spawned agent
    pub agent: AgentTuning,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: 30,
            duration_secs: 60.0,
            level_path: PathBuf::from("assets/levels/outpost.ron"),
            seed: 0x5eed,
            log_filter: "holdout=info".to_string(),
            report_path: None,
            event_capacity: 4096,
            agent: AgentTuning::default(),
        }
    }
}

impl SimConfig {
    /// Parses a TOML document.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match Self::parse(&contents) {
            Ok(mut config) => {
                info!("Loaded config from {}", path.display());
                config.validate();
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_rate = self.tick_rate.clamp(1, 240);
        if !self.duration_secs.is_finite() {
            self.duration_secs = Self::default().duration_secs;
        }
        self.duration_secs = self.duration_secs.clamp(0.0, 3600.0);
        self.event_capacity = self.event_capacity.clamp(16, 1 << 20);
        if self.log_filter.trim().is_empty() {
            self.log_filter = Self::default().log_filter;
        }
        if let Err(e) = self.agent.validate() {
            warn!("Invalid agent tuning ({e}), using defaults");
            self.agent = AgentTuning::default();
        }
    }

    /// Seconds per tick.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Ticks needed to cover the configured duration.
    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        (self.duration_secs.max(0.0) * self.tick_rate as f32).ceil() as u64
    }
}
