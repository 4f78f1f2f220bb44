//! Headless fixed-tick simulation.
//!
//! Builds the navigation grid and roster from a level, walks the scripted
//! player along its route and steps every agent once per tick. Agent events
//! are drained after each tick and folded into a [`RunReport`].

use glam::Vec2;
use holdout_common::{EntityId, GridError};
use holdout_gameplay::{
    rasterize, AgentError, AgentSnapshot, EventBus, NpcEvent, NpcRoster, NpcState,
    ObstacleScene, PathFinder, TargetSnapshot,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::config::SimConfig;
use crate::level::{LevelDescription, LevelError, PlayerScript};

/// Raw id of the scripted player.
const PLAYER_ENTITY: u64 = 1;

/// Simulation setup and output errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Level content rejected
    #[error("Level error: {0}")]
    Level(#[from] LevelError),
    /// Grid could not be built
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),
    /// Agent could not be spawned
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),
    /// Report serialization failed
    #[error("Report error: {0}")]
    Report(#[from] serde_json::Error),
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Player driven along a looping route.
#[derive(Debug, Clone)]
pub struct ScriptedPlayer {
    entity: EntityId,
    script: PlayerScript,
    position: Vec2,
    next: usize,
    noises_fired: Vec<bool>,
}

impl ScriptedPlayer {
    /// Places the player on the first route point.
    #[must_use]
    pub fn new(entity: EntityId, script: PlayerScript) -> Self {
        let position = script.route.first().copied().unwrap_or(Vec2::ZERO);
        let next = usize::from(script.route.len() > 1);
        let noises_fired = vec![false; script.noises.len()];
        Self {
            entity,
            script,
            position,
            next,
            noises_fired,
        }
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// What perception sees this tick.
    #[must_use]
    pub const fn snapshot(&self) -> TargetSnapshot {
        TargetSnapshot {
            entity: self.entity,
            position: self.position,
            crouched: self.script.crouched,
        }
    }

    /// Walks toward the next route point, looping at the end.
    pub fn advance(&mut self, dt: f32) {
        let Some(&target) = self.script.route.get(self.next) else {
            return;
        };
        let to_target = target - self.position;
        let step = self.script.speed * dt;
        if to_target.length() <= step {
            self.position = target;
            self.next = (self.next + 1) % self.script.route.len();
        } else {
            self.position += to_target.normalize_or_zero() * step;
        }
    }

    /// Noises whose time has come, each returned once.
    pub fn due_noises(&mut self, elapsed: f32) -> Vec<f32> {
        let mut due = Vec::new();
        for (noise, fired) in self.script.noises.iter().zip(self.noises_fired.iter_mut()) {
            if !*fired && noise.at_secs <= elapsed {
                *fired = true;
                due.push(noise.radius);
            }
        }
        due
    }
}

/// Summary of a run, written as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Ticks simulated
    pub ticks: u64,
    /// Simulated seconds
    pub simulated_secs: f32,
    /// Shots fired by all agents
    pub shots_fired: u64,
    /// State transitions across all agents
    pub state_changes: u64,
    /// Transitions into Attack
    pub engagements: u64,
    /// Path requests that found nothing
    pub path_failures: u64,
    /// Search locations cleared
    pub search_locations_cleared: u64,
    /// Events drained from the bus
    pub events_seen: u64,
    /// Final state of every agent
    pub agents: Vec<AgentSnapshot>,
}

impl RunReport {
    /// Writes the report as pretty JSON.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> EngineResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Wrote run report to {}", path.display());
        Ok(())
    }

    fn record(&mut self, event: &NpcEvent) {
        self.events_seen += 1;
        match event {
            NpcEvent::StateChanged { entity_id, from, to } => {
                debug!(agent = %entity_id, ?from, ?to, "state changed");
                self.state_changes += 1;
                if *to == NpcState::Attack {
                    self.engagements += 1;
                }
            },
            NpcEvent::ShotFired { .. } => self.shots_fired += 1,
            NpcEvent::PathFailed { .. } => self.path_failures += 1,
            NpcEvent::SearchLocationCleared { .. } => self.search_locations_cleared += 1,
            NpcEvent::WeaponEquipped { .. }
            | NpcEvent::WeaponUnequipped { .. }
            | NpcEvent::Despawned { .. } => trace!(?event, "agent event"),
        }
    }
}

/// A level loaded and ready to step.
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    scene: ObstacleScene,
    nav: PathFinder,
    roster: NpcRoster,
    events: EventBus,
    player: Option<ScriptedPlayer>,
    tick: u64,
    report: RunReport,
}

impl Simulation {
    /// Rasterizes the level, builds the grid and spawns every NPC.
    pub fn build(config: SimConfig, level: &LevelDescription) -> EngineResult<Self> {
        level.validate()?;
        let layout = level.layout();
        let mask = rasterize(&layout, &level.obstacles);
        let nav = PathFinder::new(layout, &mask)?;

        let mut roster = NpcRoster::new(PLAYER_ENTITY + 1);
        for (index, npc) in level.npcs.iter().enumerate() {
            let seed = config.seed.wrapping_add(index as u64);
            roster.spawn(npc.to_spawn(config.agent, seed))?;
        }

        let player = level
            .player
            .clone()
            .map(|script| ScriptedPlayer::new(EntityId::from_raw(PLAYER_ENTITY), script));

        info!(
            npcs = roster.len(),
            obstacles = level.obstacles.len(),
            player = player.is_some(),
            "Simulation built"
        );

        Ok(Self {
            events: EventBus::new(config.event_capacity),
            config,
            scene: ObstacleScene::new(level.obstacles.clone()),
            nav,
            roster,
            player,
            tick: 0,
            report: RunReport::default(),
        })
    }

    /// Ticks simulated so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds so far.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.tick as f32 * self.config.fixed_dt()
    }

    /// All agents.
    #[must_use]
    pub const fn roster(&self) -> &NpcRoster {
        &self.roster
    }

    /// Grid and path finder.
    #[must_use]
    pub const fn nav(&self) -> &PathFinder {
        &self.nav
    }

    /// Scripted player, if the level has one.
    #[must_use]
    pub const fn player(&self) -> Option<&ScriptedPlayer> {
        self.player.as_ref()
    }

    /// Opens or closes a door (or any obstacle) by index.
    pub fn set_obstacle_active(&mut self, index: usize, active: bool) -> bool {
        self.scene.set_active(index, active)
    }

    /// Removes an agent from the level.
    pub fn despawn(&mut self, entity: EntityId) -> EngineResult<()> {
        self.roster.despawn(entity, &mut self.nav, &self.events)?;
        self.drain_events();
        Ok(())
    }

    /// Advances one fixed tick.
    pub fn step(&mut self) {
        let dt = self.config.fixed_dt();
        let elapsed = self.elapsed();

        if let Some(player) = &mut self.player {
            player.advance(dt);
            let position = player.position();
            for radius in player.due_noises(elapsed) {
                let heard = self.roster.emit_noise(position, radius);
                debug!(?position, radius, heard, "player made a noise");
            }
        }

        let snapshot = self.player.as_ref().map(ScriptedPlayer::snapshot);
        self.roster
            .update(dt, &mut self.nav, &self.scene, snapshot.as_ref(), &self.events);
        self.tick += 1;
        self.drain_events();
    }

    /// Runs for the configured duration and returns the report.
    pub fn run(&mut self) -> RunReport {
        let total = self.config.total_ticks();
        info!(ticks = total, dt = self.config.fixed_dt(), "Simulation starting");
        for _ in 0..total {
            self.step();
        }
        let report = self.report();
        info!(
            ticks = report.ticks,
            shots = report.shots_fired,
            engagements = report.engagements,
            path_failures = report.path_failures,
            "Simulation finished"
        );
        report
    }

    /// Report of everything so far.
    #[must_use]
    pub fn report(&self) -> RunReport {
        RunReport {
            ticks: self.tick,
            simulated_secs: self.elapsed(),
            agents: self.roster.iter().map(|agent| agent.snapshot()).collect(),
            ..self.report.clone()
        }
    }

    fn drain_events(&mut self) {
        for event in self.events.drain() {
            self.report.record(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DUEL: &str = r#"(
        grid: Some((width: 40, height: 40, cell_size: 10.0, offset: 200.0)),
        npcs: [(spawn: (0.0, 0.0), weapon: Some((magazine_size: 6)), seed: Some(3))],
        player: Some((route: [(40.0, 0.0), (40.0, 10.0)], speed: 2.0)),
    )"#;

    const NOISE: &str = r#"(
        grid: Some((width: 40, height: 40, cell_size: 10.0, offset: 200.0)),
        npcs: [(spawn: (0.0, 0.0), weapon: Some((magazine_size: 12)))],
        player: Some((
            route: [(150.0, 150.0)],
            noises: [(at_secs: 0.5, radius: 500.0)],
        )),
    )"#;

    fn config(duration_secs: f32) -> SimConfig {
        SimConfig {
            duration_secs,
            ..SimConfig::default()
        }
    }

    fn level(text: &str) -> LevelDescription {
        LevelDescription::from_ron_str(text).expect("valid level")
    }

    #[test]
    fn test_visible_player_gets_engaged() {
        let mut sim = Simulation::build(config(10.0), &level(DUEL)).expect("build");
        let report = sim.run();

        assert_eq!(report.ticks, 300);
        assert!(report.engagements >= 1);
        assert!(report.shots_fired > 0);
        assert_eq!(report.agents.len(), 1);
        assert_eq!(report.agents[0].state, NpcState::Attack);
        assert!(report.agents[0].weapon_equipped);
    }

    #[test]
    fn test_noise_sends_agent_investigating() {
        let mut sim = Simulation::build(config(1.0), &level(NOISE)).expect("build");
        sim.run();
        let agent = sim.roster().iter().next().expect("one agent");
        assert_ne!(agent.state(), NpcState::Idle);
        assert!(agent.weapon().is_equipped());
    }

    #[test]
    fn test_player_loops_route() {
        let mut player = ScriptedPlayer::new(
            EntityId::from_raw(1),
            PlayerScript {
                route: vec![Vec2::ZERO, Vec2::new(10.0, 0.0)],
                speed: 10.0,
                crouched: false,
                noises: Vec::new(),
            },
        );
        player.advance(1.0);
        assert_eq!(player.position(), Vec2::new(10.0, 0.0));
        player.advance(0.5);
        assert_eq!(player.position(), Vec2::new(5.0, 0.0));
        player.advance(0.5);
        assert_eq!(player.position(), Vec2::ZERO);
    }

    #[test]
    fn test_despawn_releases_cells() {
        let mut sim = Simulation::build(config(1.0), &level(DUEL)).expect("build");
        sim.step();
        assert!(sim.nav().grid().occupied_count() > 0);

        let id = sim.roster().iter().next().map(|a| a.id()).expect("one agent");
        sim.despawn(id).expect("despawn");
        assert_eq!(sim.nav().grid().occupied_count(), 0);
        assert!(sim.roster().is_empty());
        assert!(sim.despawn(id).is_err());
    }

    #[test]
    fn test_report_round_trips_through_json() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("out").join("report.json");

        let mut sim = Simulation::build(config(0.5), &level(DUEL)).expect("build");
        let report = sim.run();
        report.write_json(&path).expect("write report");

        let text = fs::read_to_string(&path).expect("read report");
        let loaded: RunReport = serde_json::from_str(&text).expect("parse report");
        assert_eq!(loaded, report);
    }

    #[test]
    fn test_level_without_weapon_fails_to_build() {
        let level = LevelDescription {
            npcs: vec![crate::level::NpcDescription {
                spawn: Vec2::ZERO,
                facing_degrees: 0.0,
                patrol: Vec::new(),
                weapon: None,
                seed: None,
            }],
            ..LevelDescription::default()
        };
        let result = Simulation::build(SimConfig::default(), &level);
        assert!(matches!(result, Err(EngineError::Level(_))));
    }
}
