//! Roster of hostile agents in a level.

use ahash::AHashMap;
use glam::Vec2;
use holdout_common::EntityId;
use tracing::{debug, info};

use crate::events::{EventBus, NpcEvent};
use crate::npc::{AgentError, AgentResult, AgentSpawn, HostileAgent, NpcState};
use crate::pathfinding::PathFinder;
use crate::perception::TargetSnapshot;
use crate::scene::SceneQuery;

/// Owns every hostile agent and ticks them in spawn order.
#[derive(Debug)]
pub struct NpcRoster {
    /// Agents by id
    agents: AHashMap<EntityId, HostileAgent>,
    /// Spawn order, which is also update order
    order: Vec<EntityId>,
    /// Next entity ID for spawning
    next_id: u64,
}

impl Default for NpcRoster {
    fn default() -> Self {
        Self::new(1)
    }
}

impl NpcRoster {
    /// Creates an empty roster. Spawned ids start at `first_id`.
    #[must_use]
    pub fn new(first_id: u64) -> Self {
        Self {
            agents: AHashMap::new(),
            order: Vec::new(),
            next_id: first_id.max(1),
        }
    }

    /// Returns the number of agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns whether there are no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Gets an agent.
    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<&HostileAgent> {
        self.agents.get(&entity)
    }

    /// Gets an agent mutably.
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut HostileAgent> {
        self.agents.get_mut(&entity)
    }

    /// Spawns an agent under a fresh id.
    pub fn spawn(&mut self, spawn: AgentSpawn) -> AgentResult<EntityId> {
        let mut id = EntityId::from_raw(self.next_id);
        while self.agents.contains_key(&id) {
            self.next_id += 1;
            id = EntityId::from_raw(self.next_id);
        }
        self.register(id, spawn)?;
        self.next_id += 1;
        Ok(id)
    }

    /// Spawns an agent under an id chosen by the caller.
    pub fn register(&mut self, entity: EntityId, spawn: AgentSpawn) -> AgentResult<()> {
        if self.agents.contains_key(&entity) {
            return Err(AgentError::AlreadyRegistered(entity));
        }
        let agent = HostileAgent::spawn(entity, spawn)?;
        self.agents.insert(entity, agent);
        self.order.push(entity);
        info!(agent = %entity, total = self.order.len(), "agent registered");
        Ok(())
    }

    /// Removes an agent, releasing the grid cells it held.
    pub fn despawn(
        &mut self,
        entity: EntityId,
        nav: &mut PathFinder,
        events: &EventBus,
    ) -> AgentResult<HostileAgent> {
        let mut agent = self
            .agents
            .remove(&entity)
            .ok_or(AgentError::NotFound(entity))?;
        self.order.retain(|id| *id != entity);
        agent.release_occupancy(nav.grid_mut());
        events.publish(NpcEvent::Despawned { entity_id: entity });
        debug!(agent = %entity, "agent despawned");
        Ok(agent)
    }

    /// Runs perception then behaviour for every agent.
    pub fn update<S>(
        &mut self,
        dt: f32,
        nav: &mut PathFinder,
        scene: &S,
        player: Option<&TargetSnapshot>,
        events: &EventBus,
    ) where
        S: SceneQuery + ?Sized,
    {
        for id in &self.order {
            if let Some(agent) = self.agents.get_mut(id) {
                agent.perceive(player, scene);
                agent.update(dt, nav, scene, events);
            }
        }
    }

    /// Lets every agent within `radius` of `position` hear a noise.
    /// Returns how many agents heard it.
    pub fn emit_noise(&mut self, position: Vec2, radius: f32) -> usize {
        let mut heard = 0;
        for id in &self.order {
            if let Some(agent) = self.agents.get_mut(id) {
                if agent.pose().position.distance(position) <= radius {
                    agent.heard_noise(position);
                    heard += 1;
                }
            }
        }
        heard
    }

    /// Agents in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &HostileAgent> {
        self.order.iter().filter_map(|id| self.agents.get(id))
    }

    /// Agents currently in a given state.
    pub fn in_state(&self, state: NpcState) -> Vec<EntityId> {
        self.iter()
            .filter(|agent| agent.state() == state)
            .map(HostileAgent::id)
            .collect()
    }
}
