//! # Holdout Gameplay
//!
//! Tactical AI for hostile NPCs.
//!
//! This crate provides:
//! - Navigation grid with per-cell walkability and occupancy
//! - Obstacle rasterizer building the walkability mask from level geometry
//! - Scene line queries with layer masks
//! - A* path finder with goal substitution and path straightening
//! - Movement along a path and idle look-around
//! - Firearm with magazine, reload and reaction delay
//! - Perception sensor with stance-dependent sight lines
//! - Hostile agent state machine (Idle, Patrol, Attack, Chase, Search)
//! - Roster owning all agents of a level
//! - Event bus for animation, audio and weapon presentation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod events;
pub mod grid;
pub mod npc;
pub mod pathfinding;
pub mod perception;
pub mod rasterizer;
pub mod roster;
pub mod scene;
pub mod steering;
pub mod timer;
pub mod tuning;
pub mod weapon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::events::*;
    pub use crate::grid::*;
    pub use crate::npc::*;
    pub use crate::pathfinding::*;
    pub use crate::perception::*;
    pub use crate::rasterizer::*;
    pub use crate::roster::*;
    pub use crate::scene::*;
    pub use crate::steering::*;
    pub use crate::timer::*;
    pub use crate::tuning::*;
    pub use crate::weapon::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use holdout_common::{EntityId, GridLayout};

    fn level() -> (GridLayout, ObstacleScene) {
        let layout = GridLayout {
            width: 40,
            height: 40,
            cell_size: 10.0,
            offset: 200.0,
        };
        // A wall with a gap at the top, plus a door that stays out of the mask.
        let scene = ObstacleScene::new(vec![
            Obstacle::new(
                ObstacleKind::Full,
                Aabb::from_corners(Vec2::new(50.0, -200.0), Vec2::new(58.0, 100.0)),
            ),
            Obstacle::new(
                ObstacleKind::Door,
                Aabb::from_corners(Vec2::new(50.0, 100.0), Vec2::new(58.0, 120.0)),
            ),
        ]);
        (layout, scene)
    }

    #[test]
    fn test_level_build_and_path_around_wall() {
        let (layout, scene) = level();
        let mask = rasterize(&layout, scene.obstacles());
        let mut nav = PathFinder::new(layout, &mask).expect("valid grid");

        let start = Vec2::new(0.0, 0.0);
        let end = Vec2::new(100.0, 0.0);
        let raw = nav.find_path(start, end).expect("path around the wall");
        for waypoint in &raw {
            assert!(nav.grid().is_walkable(nav.grid().world_to_grid(*waypoint)));
        }
        assert!(raw.iter().any(|p| p.y > 100.0));

        let mut rng = fastrand::Rng::with_seed(5);
        let ideal = nav
            .find_ideal_path(start, end, &scene, &mut rng)
            .expect("ideal path");
        assert!(ideal.len() <= raw.len());
    }

    #[test]
    fn test_roster_engages_visible_player() {
        let (layout, scene) = level();
        let mask = rasterize(&layout, scene.obstacles());
        let mut nav = PathFinder::new(layout, &mask).expect("valid grid");
        let bus = EventBus::default();
        let mut roster = NpcRoster::default();
        let id = roster
            .spawn(
                AgentSpawn::new(Vec2::new(-50.0, 0.0))
                    .with_patrol(vec![Vec2::new(-50.0, -80.0), Vec2::new(-50.0, 80.0)])
                    .with_weapon(FirearmSpec::default()),
            )
            .expect("spawn");

        // Behind the wall: no sight.
        let hidden = TargetSnapshot {
            entity: EntityId::from_raw(500),
            position: Vec2::new(80.0, 0.0),
            crouched: false,
        };
        roster.update(0.05, &mut nav, &scene, Some(&hidden), &bus);
        assert_eq!(roster.get(id).map(HostileAgent::state), Some(NpcState::Patrol));

        let exposed = TargetSnapshot {
            position: Vec2::new(-20.0, 0.0),
            ..hidden
        };
        roster.update(0.05, &mut nav, &scene, Some(&exposed), &bus);
        assert_eq!(roster.get(id).map(HostileAgent::state), Some(NpcState::Attack));
        assert!(bus
            .drain()
            .iter()
            .any(|e| matches!(e, NpcEvent::StateChanged { to: NpcState::Attack, .. })));
    }
}
