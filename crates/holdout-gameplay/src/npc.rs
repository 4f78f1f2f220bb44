//! Hostile agent state machine.
//!
//! An agent is Idle or Patrols until it sees the player, Attacks while the
//! player is in sight, Chases to the last known position once sight is lost
//! and Searches the surroundings before going back to its default state.
//!
//! Everything that took wall-clock delays (patrol pauses, search dwell,
//! look-around cooldown, weapon timers) is a [`Countdown`] advanced by
//! [`HostileAgent::update`]. Path failures never raise: each state has its own
//! recovery and the next attempt happens on a later tick.

use fastrand::Rng;
use glam::Vec2;
use holdout_common::{EntityId, GridCoord};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use thiserror::Error;
use tracing::{debug, trace};

use crate::events::{EventBus, NpcEvent};
use crate::grid::NavGrid;
use crate::pathfinding::PathFinder;
use crate::perception::{PerceptionSensor, Sighting, TargetSnapshot};
use crate::scene::{LayerMask, SceneQuery};
use crate::steering::{follow_path, heading_of, rotate_toward, LookAround, Pose};
use crate::timer::Countdown;
use crate::tuning::AgentTuning;
use crate::weapon::{Firearm, FirearmSpec};

/// Minimum displacement per tick that counts as moving.
const MOVING_EPSILON: f32 = 1e-4;

/// Error types for agent setup and roster operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Agent spawned without a weapon
    #[error("agent {0} has no weapon configured")]
    MissingWeapon(EntityId),
    /// Weapon parameters rejected
    #[error("agent {entity} has an invalid weapon: {reason}")]
    InvalidWeapon {
        /// Agent
        entity: EntityId,
        /// What was wrong
        reason: String,
    },
    /// Tuning value out of range
    #[error("invalid tuning value for {field}: {value}")]
    InvalidTuning {
        /// Offending field
        field: &'static str,
        /// Offending value
        value: f32,
    },
    /// Agent not found
    #[error("agent not found: {0}")]
    NotFound(EntityId),
    /// Agent already registered
    #[error("agent already registered: {0}")]
    AlreadyRegistered(EntityId),
}

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Behaviour state of a hostile agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NpcState {
    /// Standing at the spawn point, looking around
    Idle,
    /// Walking the patrol route
    Patrol,
    /// Heading for the last known target position
    Chase,
    /// Engaging a visible target
    Attack,
    /// Checking random spots after losing the target
    Search,
}

/// Movement an engaged agent makes once it is positioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Maneuver {
    /// Closing in on a target beyond fire range
    Approach,
    /// Backing away from a target behind cover
    FallBack,
}

/// Everything needed to put an agent into the level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpawn {
    /// Spawn point, also the Idle home position
    pub position: Vec2,
    /// Initial heading in radians
    #[serde(default)]
    pub facing: f32,
    /// Patrol route, visited in order with wrap-around
    #[serde(default)]
    pub patrol: Vec<Vec2>,
    /// Weapon; required
    #[serde(default)]
    pub weapon: Option<FirearmSpec>,
    /// Behaviour tuning
    #[serde(default)]
    pub tuning: AgentTuning,
    /// Seed for the agent's private RNG
    #[serde(default)]
    pub seed: u64,
}

impl AgentSpawn {
    /// Spawn description with defaults and no weapon.
    #[must_use]
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            facing: 0.0,
            patrol: Vec::new(),
            weapon: None,
            tuning: AgentTuning::default(),
            seed: 0,
        }
    }

    /// Sets the initial heading.
    #[must_use]
    pub fn with_facing(mut self, facing: f32) -> Self {
        self.facing = facing;
        self
    }

    /// Sets the patrol route.
    #[must_use]
    pub fn with_patrol(mut self, waypoints: Vec<Vec2>) -> Self {
        self.patrol = waypoints;
        self
    }

    /// Sets the weapon.
    #[must_use]
    pub fn with_weapon(mut self, weapon: FirearmSpec) -> Self {
        self.weapon = Some(weapon);
        self
    }

    /// Sets the tuning.
    #[must_use]
    pub fn with_tuning(mut self, tuning: AgentTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Sets the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Serializable view of an agent for reports and debugging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// Agent
    pub entity_id: EntityId,
    /// Current state
    pub state: NpcState,
    /// World position
    pub position: Vec2,
    /// Heading in radians
    pub facing: f32,
    /// Whether the target is in sight
    pub target_visible: bool,
    /// Whether the agent moved last tick
    pub moving: bool,
    /// Waypoints left on the current path
    pub path_len: usize,
    /// Weapon drawn
    pub weapon_equipped: bool,
    /// Rounds in the magazine
    pub rounds: u32,
}

/// A hostile NPC: perception, state machine, movement and weapon.
#[derive(Debug, Clone)]
pub struct HostileAgent {
    id: EntityId,
    pose: Pose,
    crouched: bool,
    spawn_point: Vec2,
    state: NpcState,
    tuning: AgentTuning,
    rng: Rng,

    sensor: PerceptionSensor,
    target_visible: bool,
    target: Option<TargetSnapshot>,
    last_known_target_position: Option<Vec2>,

    weapon: Firearm,
    drew_weapon: bool,

    current_path: Vec<Vec2>,
    chase_request: Option<Vec2>,
    moving: bool,

    patrol: Vec<Vec2>,
    patrol_index: usize,
    returning_home: bool,
    attack_position_set: bool,
    positioned_for_attack: bool,
    maneuver: Option<Maneuver>,
    search_locations: Vec<Vec2>,
    dwell: Countdown,
    look: LookAround,

    occupied_cell: Option<GridCoord>,
    reserved_destination: Option<GridCoord>,

    outbox: Vec<NpcEvent>,
}

impl HostileAgent {
    /// Creates an agent, failing fast on missing or invalid configuration.
    pub fn spawn(id: EntityId, spawn: AgentSpawn) -> AgentResult<Self> {
        let spec = spawn.weapon.ok_or(AgentError::MissingWeapon(id))?;
        spec.validate()
            .map_err(|reason| AgentError::InvalidWeapon { entity: id, reason })?;
        spawn.tuning.validate()?;

        let state = if spawn.patrol.is_empty() {
            NpcState::Idle
        } else {
            NpcState::Patrol
        };
        let mut look = LookAround::default();
        look.begin(spawn.facing);

        debug!(agent = %id, ?state, position = ?spawn.position, "agent spawned");

        Ok(Self {
            id,
            pose: Pose::new(spawn.position, spawn.facing),
            crouched: false,
            spawn_point: spawn.position,
            state,
            tuning: spawn.tuning,
            rng: Rng::with_seed(spawn.seed),
            sensor: PerceptionSensor::new(spawn.tuning.sensor_radius),
            target_visible: false,
            target: None,
            last_known_target_position: None,
            weapon: Firearm::new(spec),
            drew_weapon: false,
            current_path: Vec::new(),
            chase_request: None,
            moving: false,
            patrol: spawn.patrol,
            patrol_index: 0,
            returning_home: false,
            attack_position_set: false,
            positioned_for_attack: false,
            maneuver: None,
            search_locations: Vec::new(),
            dwell: Countdown::idle(),
            look,
            occupied_cell: None,
            reserved_destination: None,
            outbox: Vec::new(),
        })
    }

    /// Agent id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> NpcState {
        self.state
    }

    /// Whether the agent moved during the last update.
    #[must_use]
    pub const fn is_moving(&self) -> bool {
        self.moving
    }

    /// Position and heading.
    #[must_use]
    pub const fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Moves the agent without pathing (host physics, teleports).
    pub fn set_position(&mut self, position: Vec2) {
        self.pose.position = position;
    }

    /// Sets the agent's own stance, which affects its sight lines.
    pub fn set_crouched(&mut self, crouched: bool) {
        self.crouched = crouched;
    }

    /// Spawn point.
    #[must_use]
    pub const fn spawn_point(&self) -> Vec2 {
        self.spawn_point
    }

    /// Behaviour tuning.
    #[must_use]
    pub const fn tuning(&self) -> &AgentTuning {
        &self.tuning
    }

    /// Whether the target is currently in sight.
    #[must_use]
    pub const fn target_visible(&self) -> bool {
        self.target_visible
    }

    /// Last position the target was seen or heard at.
    #[must_use]
    pub const fn last_known_target_position(&self) -> Option<Vec2> {
        self.last_known_target_position
    }

    /// Remaining waypoints.
    #[must_use]
    pub fn current_path(&self) -> &[Vec2] {
        &self.current_path
    }

    /// Search locations still to visit.
    #[must_use]
    pub fn search_locations(&self) -> &[Vec2] {
        &self.search_locations
    }

    /// Index of the patrol waypoint being walked to.
    #[must_use]
    pub const fn patrol_index(&self) -> usize {
        self.patrol_index
    }

    /// Whether an Idle agent is walking back to spawn.
    #[must_use]
    pub const fn is_returning_home(&self) -> bool {
        self.returning_home
    }

    /// Whether the sideways attack step is done.
    #[must_use]
    pub const fn positioned_for_attack(&self) -> bool {
        self.positioned_for_attack
    }

    /// The agent's weapon.
    #[must_use]
    pub const fn weapon(&self) -> &Firearm {
        &self.weapon
    }

    /// Sight sensor.
    #[must_use]
    pub const fn sensor(&self) -> &PerceptionSensor {
        &self.sensor
    }

    /// Cell marked occupied by the agent's body.
    #[must_use]
    pub const fn occupied_cell(&self) -> Option<GridCoord> {
        self.occupied_cell
    }

    /// Cell reserved as the current path's destination.
    #[must_use]
    pub const fn reserved_destination(&self) -> Option<GridCoord> {
        self.reserved_destination
    }

    /// Serializable view of the agent.
    #[must_use]
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            entity_id: self.id,
            state: self.state,
            position: self.pose.position,
            facing: self.pose.facing,
            target_visible: self.target_visible,
            moving: self.moving,
            path_len: self.current_path.len(),
            weapon_equipped: self.weapon.is_equipped(),
            rounds: self.weapon.rounds(),
        }
    }

    /// Runs the sight sensor and forwards what it reports.
    pub fn perceive<S>(&mut self, player: Option<&TargetSnapshot>, scene: &S)
    where
        S: SceneQuery + ?Sized,
    {
        match self
            .sensor
            .observe(self.pose.position, self.crouched, player, scene)
        {
            Some(Sighting::Visible(target)) => self.saw_target(target),
            Some(Sighting::Lost) => self.lost_target(),
            None => {},
        }
    }

    /// The target is in sight.
    pub fn saw_target(&mut self, target: TargetSnapshot) {
        self.target_visible = true;
        self.target = Some(target);
        self.last_known_target_position = Some(target.position);

        match self.state {
            NpcState::Idle | NpcState::Patrol => {
                self.draw_weapon();
                self.enter_attack();
            },
            NpcState::Chase | NpcState::Search => {
                self.draw_weapon();
                self.weapon.notify_target_spotted();
                self.enter_attack();
            },
            NpcState::Attack => {},
        }
    }

    /// The target left sight.
    pub fn lost_target(&mut self) {
        self.target_visible = false;
        if self.state == NpcState::Attack && self.positioned_for_attack {
            self.enter_chase();
        }
    }

    /// A noise worth investigating was made at `position`.
    pub fn heard_noise(&mut self, position: Vec2) {
        match self.state {
            NpcState::Idle | NpcState::Patrol | NpcState::Search => {
                debug!(agent = %self.id, ?position, "investigating noise");
                self.last_known_target_position = Some(position);
                self.draw_weapon();
                self.enter_chase();
            },
            NpcState::Attack | NpcState::Chase => {},
        }
    }

    /// Advances the agent by one tick.
    ///
    /// Weapon timers run first, then the current state's behaviour, then
    /// occupancy bookkeeping. Queued events are published at the end.
    pub fn update<S>(&mut self, dt: f32, nav: &mut PathFinder, scene: &S, events: &EventBus)
    where
        S: SceneQuery + ?Sized,
    {
        let start = self.pose.position;
        self.weapon.tick(dt);

        match self.state {
            NpcState::Idle => self.idle(dt, nav, scene),
            NpcState::Patrol => self.patrol(dt, nav, scene),
            NpcState::Attack => self.attack(dt, nav, scene),
            NpcState::Chase => self.chase(dt, nav, scene),
            NpcState::Search => self.search(dt, nav, scene),
        }

        self.moving = self.pose.position.distance(start) > MOVING_EPSILON;
        self.update_occupancy(nav.grid_mut());

        for event in self.outbox.drain(..) {
            events.publish(event);
        }
    }

    /// Clears both occupancy channels; called when the agent is removed.
    pub fn release_occupancy(&mut self, grid: &mut NavGrid) {
        if let Some(cell) = self.occupied_cell.take() {
            grid.unoccupy_node(cell);
        }
        if let Some(cell) = self.reserved_destination.take() {
            grid.unoccupy_node(cell);
        }
    }

    fn idle<S>(&mut self, dt: f32, nav: &mut PathFinder, scene: &S)
    where
        S: SceneQuery + ?Sized,
    {
        if self.returning_home {
            if self.walk(self.tuning.move_speed, self.tuning.rotation_speed, dt) {
                self.returning_home = false;
                self.look.begin(self.pose.facing);
            }
            return;
        }

        if self.pose.position.distance(self.spawn_point) > self.tuning.return_home_distance {
            // A failed request is retried next tick.
            if self.request_path(self.spawn_point, nav, scene) {
                self.returning_home = true;
            }
            return;
        }

        self.look_around(dt);
    }

    fn patrol<S>(&mut self, dt: f32, nav: &mut PathFinder, scene: &S)
    where
        S: SceneQuery + ?Sized,
    {
        if self.patrol.is_empty() {
            self.set_state(NpcState::Idle);
            return;
        }

        if self.dwell.is_running() {
            self.look_around(dt);
            if self.dwell.tick(dt) {
                self.advance_patrol();
            }
            return;
        }

        if self.current_path.is_empty() {
            let destination = self.patrol[self.patrol_index];
            if !self.request_path(destination, nav, scene) {
                self.advance_patrol();
                return;
            }
        }

        if self.walk(self.tuning.move_speed, self.tuning.rotation_speed, dt) {
            self.dwell.start(self.tuning.patrol_pause);
            self.look.begin(self.pose.facing);
        }
    }

    fn attack<S>(&mut self, dt: f32, nav: &mut PathFinder, scene: &S)
    where
        S: SceneQuery + ?Sized,
    {
        if self.target_visible {
            if let Some(target) = self.target {
                let aim = heading_of(target.position - self.pose.position);
                self.pose.facing = rotate_toward(self.pose.facing, aim, self.tuning.aim_speed * dt);
            }
        }

        if !self.attack_position_set {
            self.attack_position_set = true;
            let destination = self.pose.position + self.pose.right() * self.tuning.attack_offset;
            if !self.request_path(destination, nav, scene) {
                self.positioned_for_attack = true;
            }
        }

        if !self.positioned_for_attack {
            if !self.walk(self.tuning.move_speed, 0.0, dt) {
                return;
            }
            self.positioned_for_attack = true;
        }

        if !self.target_visible {
            self.enter_chase();
            return;
        }
        let Some(target) = self.target else {
            return;
        };

        let position = self.pose.position;
        let to_target = target.position - position;
        if to_target.length() > self.tuning.fire_range {
            self.run_maneuver(Maneuver::Approach, target.position, nav, scene, dt);
            return;
        }

        if scene.linecast(position, target.position, LayerMask::FIRE_BLOCKING) {
            let away = (-to_target).normalize_or_zero();
            let destination = position + away * self.tuning.fallback_distance;
            self.run_maneuver(Maneuver::FallBack, destination, nav, scene, dt);
            return;
        }

        self.maneuver = None;
        self.current_path.clear();
        if self.weapon.try_fire() {
            trace!(agent = %self.id, rounds = self.weapon.rounds(), "shot fired");
            self.outbox.push(NpcEvent::ShotFired {
                entity_id: self.id,
                from: position,
                to: target.position,
            });
        }
    }

    /// Walks the current maneuver's path, replanning when the maneuver
    /// changes or its path runs out.
    fn run_maneuver<S>(
        &mut self,
        kind: Maneuver,
        destination: Vec2,
        nav: &mut PathFinder,
        scene: &S,
        dt: f32,
    ) where
        S: SceneQuery + ?Sized,
    {
        if self.maneuver != Some(kind) || self.current_path.is_empty() {
            self.maneuver = Some(kind);
            if !self.request_path(destination, nav, scene) {
                return;
            }
        }
        if self.walk(self.tuning.move_speed, 0.0, dt) {
            self.maneuver = None;
        }
    }

    fn chase<S>(&mut self, dt: f32, nav: &mut PathFinder, scene: &S)
    where
        S: SceneQuery + ?Sized,
    {
        if let Some(destination) = self.chase_request.take() {
            if !self.request_path(destination, nav, scene) {
                self.begin_search();
                return;
            }
        }

        if self.walk(self.tuning.chase_speed, self.tuning.rotation_speed, dt) && !self.target_visible
        {
            self.begin_search();
        }
    }

    fn search<S>(&mut self, dt: f32, nav: &mut PathFinder, scene: &S)
    where
        S: SceneQuery + ?Sized,
    {
        if self.search_locations.is_empty() {
            self.finish_search();
            return;
        }

        if self.dwell.is_running() {
            self.look_around(dt);
            if self.dwell.tick(dt) {
                self.search_locations.remove(0);
                self.outbox.push(NpcEvent::SearchLocationCleared {
                    entity_id: self.id,
                    remaining: self.search_locations.len(),
                });
                if self.search_locations.is_empty() {
                    self.finish_search();
                }
            }
            return;
        }

        if self.current_path.is_empty() {
            let destination = self.search_locations[0];
            if !self.request_path(destination, nav, scene) {
                self.search_locations.remove(0);
                if self.search_locations.is_empty() {
                    self.finish_search();
                }
                return;
            }
        }

        if self.walk(self.tuning.move_speed, self.tuning.rotation_speed, dt) {
            self.dwell.start(self.tuning.search_dwell);
            self.look.begin(self.pose.facing);
        }
    }

    fn enter_attack(&mut self) {
        self.attack_position_set = false;
        self.positioned_for_attack = false;
        self.maneuver = None;
        self.returning_home = false;
        self.current_path.clear();
        self.chase_request = None;
        self.search_locations.clear();
        self.dwell.cancel();
        self.set_state(NpcState::Attack);
    }

    fn enter_chase(&mut self) {
        let Some(destination) = self.last_known_target_position else {
            self.begin_search();
            return;
        };
        self.returning_home = false;
        self.current_path.clear();
        self.search_locations.clear();
        self.dwell.cancel();
        self.chase_request = Some(destination);
        self.set_state(NpcState::Chase);
    }

    fn begin_search(&mut self) {
        let origin = self.pose.position;
        let radius = self.tuning.search_radius;
        let rng = &mut self.rng;
        let locations: Vec<Vec2> = (0..self.tuning.search_locations)
            .map(|_| {
                let angle = rng.f32() * TAU;
                let distance = radius * rng.f32().sqrt();
                origin + Vec2::from_angle(angle) * distance
            })
            .collect();

        self.search_locations = locations;
        self.current_path.clear();
        self.chase_request = None;
        self.dwell.cancel();
        self.set_state(NpcState::Search);
    }

    fn finish_search(&mut self) {
        self.search_locations.clear();
        self.current_path.clear();
        self.dwell.cancel();
        if std::mem::take(&mut self.drew_weapon) && self.weapon.unequip() {
            self.outbox
                .push(NpcEvent::WeaponUnequipped { entity_id: self.id });
        }
        self.look.begin(self.pose.facing);
        let next = self.default_state();
        self.set_state(next);
    }

    fn default_state(&self) -> NpcState {
        if self.patrol.is_empty() {
            NpcState::Idle
        } else {
            NpcState::Patrol
        }
    }

    fn advance_patrol(&mut self) {
        if !self.patrol.is_empty() {
            self.patrol_index = (self.patrol_index + 1) % self.patrol.len();
        }
    }

    fn draw_weapon(&mut self) {
        if self.weapon.equip() {
            self.drew_weapon = true;
            self.outbox
                .push(NpcEvent::WeaponEquipped { entity_id: self.id });
        }
    }

    fn set_state(&mut self, next: NpcState) {
        if next == self.state {
            return;
        }
        debug!(agent = %self.id, from = ?self.state, to = ?next, "state change");
        self.outbox.push(NpcEvent::StateChanged {
            entity_id: self.id,
            from: self.state,
            to: next,
        });
        self.state = next;
    }

    fn look_around(&mut self, dt: f32) {
        self.look.tick(
            &mut self.pose.facing,
            dt,
            &self.tuning.look_around,
            &mut self.rng,
        );
    }

    fn walk(&mut self, speed: f32, rotation_speed: f32, dt: f32) -> bool {
        follow_path(
            &mut self.pose,
            &mut self.current_path,
            speed,
            rotation_speed,
            self.tuning.waypoint_reach,
            dt,
        )
    }

    /// Replaces the current path. On failure the path is left empty and a
    /// `PathFailed` event is queued.
    fn request_path<S>(&mut self, destination: Vec2, nav: &mut PathFinder, scene: &S) -> bool
    where
        S: SceneQuery + ?Sized,
    {
        match nav.find_ideal_path(self.pose.position, destination, scene, &mut self.rng) {
            Some(path) => {
                self.current_path = path;
                true
            },
            None => {
                debug!(agent = %self.id, state = ?self.state, ?destination, "no path");
                self.current_path.clear();
                self.outbox.push(NpcEvent::PathFailed {
                    entity_id: self.id,
                    destination,
                });
                false
            },
        }
    }

    fn update_occupancy(&mut self, grid: &mut NavGrid) {
        let cell = grid.world_to_grid(self.pose.position);
        if self.occupied_cell != Some(cell) {
            grid.occupy_node(cell);
            if let Some(previous) = self.occupied_cell.replace(cell) {
                grid.unoccupy_node(previous);
            }
        }

        if let Some(&destination) = self.current_path.last() {
            let cell = grid.world_to_grid(destination);
            if self.reserved_destination != Some(cell) {
                grid.occupy_node(cell);
                if let Some(previous) = self.reserved_destination.replace(cell) {
                    grid.unoccupy_node(previous);
                }
            }
        }
    }
}
