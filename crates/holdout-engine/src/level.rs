//! RON level descriptions.
//!
//! A level lists obstacles, hostile NPCs and an optional scripted player.
//! The grid defaults to the standard layout unless the level overrides it.

use glam::Vec2;
use holdout_common::GridLayout;
use holdout_gameplay::{AgentSpawn, AgentTuning, FirearmSpec, Obstacle};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Level loading errors.
#[derive(Debug, Error)]
pub enum LevelError {
    /// File could not be read or written
    #[error("level I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// RON syntax or shape error
    #[error("failed to parse level: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// RON serialization error
    #[error("failed to serialize level: {0}")]
    Serialize(#[from] ron::Error),
    /// Content that parses but cannot be simulated
    #[error("invalid level: {0}")]
    Invalid(String),
}

/// Result type for level operations.
pub type LevelResult<T> = Result<T, LevelError>;

/// One hostile NPC placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcDescription {
    /// Spawn point
    pub spawn: Vec2,
    /// Initial heading in degrees
    #[serde(default)]
    pub facing_degrees: f32,
    /// Patrol route
    #[serde(default)]
    pub patrol: Vec<Vec2>,
    /// Weapon; an NPC without one is rejected
    #[serde(default)]
    pub weapon: Option<FirearmSpec>,
    /// Private RNG seed; derived from the run seed when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

impl NpcDescription {
    /// Spawn parameters for this NPC.
    #[must_use]
    pub fn to_spawn(&self, tuning: AgentTuning, fallback_seed: u64) -> AgentSpawn {
        let mut spawn = AgentSpawn::new(self.spawn)
            .with_facing(self.facing_degrees.to_radians())
            .with_patrol(self.patrol.clone())
            .with_tuning(tuning)
            .with_seed(self.seed.unwrap_or(fallback_seed));
        spawn.weapon = self.weapon;
        spawn
    }
}

/// A noise the scripted player makes at a given time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptedNoise {
    /// Simulation time in seconds
    pub at_secs: f32,
    /// Radius within which NPCs hear it
    pub radius: f32,
}

/// Scripted player movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerScript {
    /// Route walked in a loop
    pub route: Vec<Vec2>,
    /// Walking speed
    #[serde(default = "default_player_speed")]
    pub speed: f32,
    /// Whether the player moves crouched
    #[serde(default)]
    pub crouched: bool,
    /// Noises made at the player's position
    #[serde(default)]
    pub noises: Vec<ScriptedNoise>,
}

fn default_player_speed() -> f32 {
    15.0
}

/// A complete level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelDescription {
    /// Grid placement; standard layout when absent
    #[serde(default)]
    pub grid: Option<GridLayout>,
    /// Static geometry and doors
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
    /// Hostile NPCs
    #[serde(default)]
    pub npcs: Vec<NpcDescription>,
    /// Scripted player; no player when absent
    #[serde(default)]
    pub player: Option<PlayerScript>,
}

impl LevelDescription {
    /// Parses and validates a level from RON text.
    pub fn from_ron_str(contents: &str) -> LevelResult<Self> {
        let level: Self = ron::from_str(contents)?;
        level.validate()?;
        Ok(level)
    }

    /// Loads and validates a level file.
    pub fn load<P: AsRef<Path>>(path: P) -> LevelResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let level = Self::from_ron_str(&contents)?;
        info!(
            "Loaded level from {} ({} obstacles, {} npcs)",
            path.display(),
            level.obstacles.len(),
            level.npcs.len()
        );
        Ok(level)
    }

    /// Writes the level as pretty RON.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> LevelResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, contents)?;
        info!("Saved level to {}", path.display());
        Ok(())
    }

    /// Grid layout for this level.
    #[must_use]
    pub fn layout(&self) -> GridLayout {
        self.grid.unwrap_or_default()
    }

    /// Rejects content the simulation cannot run.
    pub fn validate(&self) -> LevelResult<()> {
        let layout = self.layout();
        if layout.width == 0 || layout.height == 0 {
            return Err(LevelError::Invalid(format!(
                "grid must be non-empty, got {}x{}",
                layout.width, layout.height
            )));
        }
        for (index, npc) in self.npcs.iter().enumerate() {
            if npc.weapon.is_none() {
                return Err(LevelError::Invalid(format!("npc {index} has no weapon")));
            }
            if !layout.contains(layout.world_to_grid(npc.spawn)) {
                return Err(LevelError::Invalid(format!(
                    "npc {index} spawns off the grid at {:?}",
                    npc.spawn
                )));
            }
            for waypoint in &npc.patrol {
                if !layout.contains(layout.world_to_grid(*waypoint)) {
                    warn!(npc = index, ?waypoint, "patrol waypoint off the grid");
                }
            }
        }
        if let Some(player) = &self.player {
            if player.route.is_empty() {
                return Err(LevelError::Invalid("player route is empty".into()));
            }
            if !(player.speed.is_finite() && player.speed >= 0.0) {
                return Err(LevelError::Invalid(format!(
                    "player speed must be non-negative, got {}",
                    player.speed
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holdout_gameplay::{Aabb, ObstacleKind};
    use tempfile::TempDir;

    const SMALL_LEVEL: &str = r#"(
        grid: Some((width: 40, height: 40, cell_size: 10.0, offset: 200.0)),
        obstacles: [
            (kind: Full, bounds: (min: (50.0, -50.0), max: (58.0, 50.0))),
            (kind: Door, bounds: (min: (50.0, 50.0), max: (58.0, 70.0)), active: false),
        ],
        npcs: [
            (spawn: (0.0, 0.0), patrol: [(0.0, 60.0), (-60.0, 60.0)], weapon: Some((magazine_size: 12))),
        ],
        player: Some((route: [(100.0, 0.0), (100.0, 100.0)], crouched: true)),
    )"#;

    #[test]
    fn test_parse_small_level() {
        let level = LevelDescription::from_ron_str(SMALL_LEVEL).expect("valid level");
        assert_eq!(level.layout().width, 40);
        assert_eq!(level.obstacles.len(), 2);
        assert!(level.obstacles[0].active);
        assert!(!level.obstacles[1].active);
        assert_eq!(level.obstacles[1].kind, ObstacleKind::Door);
        assert_eq!(level.npcs[0].weapon, Some(FirearmSpec::default()));
        let player = level.player.as_ref().expect("player present");
        assert!(player.crouched);
        assert!((player.speed - 15.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_weapon_rejected() {
        let level = LevelDescription {
            npcs: vec![NpcDescription {
                spawn: Vec2::ZERO,
                facing_degrees: 0.0,
                patrol: Vec::new(),
                weapon: None,
                seed: None,
            }],
            ..LevelDescription::default()
        };
        assert!(matches!(level.validate(), Err(LevelError::Invalid(_))));
    }

    #[test]
    fn test_off_grid_spawn_rejected() {
        let level = LevelDescription {
            npcs: vec![NpcDescription {
                spawn: Vec2::new(5000.0, 0.0),
                facing_degrees: 0.0,
                patrol: Vec::new(),
                weapon: Some(FirearmSpec::default()),
                seed: Some(1),
            }],
            ..LevelDescription::default()
        };
        assert!(matches!(level.validate(), Err(LevelError::Invalid(_))));
    }

    #[test]
    fn test_bad_ron_is_parse_error() {
        let result = LevelDescription::from_ron_str("(obstacles: [");
        assert!(matches!(result, Err(LevelError::Parse(_))));
    }

    #[test]
    fn test_level_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("levels").join("test.ron");

        let level = LevelDescription {
            grid: Some(GridLayout::with_size(50, 50)),
            obstacles: vec![Obstacle::new(
                ObstacleKind::Half,
                Aabb::from_corners(Vec2::new(-900.0, -900.0), Vec2::new(-880.0, -890.0)),
            )],
            npcs: vec![NpcDescription {
                spawn: Vec2::new(-950.0, -950.0),
                facing_degrees: 90.0,
                patrol: vec![Vec2::new(-920.0, -950.0)],
                weapon: Some(FirearmSpec::default()),
                seed: Some(4),
            }],
            player: None,
        };
        level.save_to(&path).expect("Failed to save level");

        let loaded = LevelDescription::load(&path).expect("Failed to load level");
        assert_eq!(loaded, level);
    }

    #[test]
    fn test_to_spawn_derives_seed_and_facing() {
        let npc = NpcDescription {
            spawn: Vec2::new(1.0, 2.0),
            facing_degrees: 180.0,
            patrol: Vec::new(),
            weapon: Some(FirearmSpec::default()),
            seed: None,
        };
        let spawn = npc.to_spawn(AgentTuning::default(), 77);
        assert_eq!(spawn.seed, 77);
        assert!((spawn.facing - std::f32::consts::PI).abs() < 1e-5);
        assert_eq!(spawn.weapon, Some(FirearmSpec::default()));
    }
}
