//! Static scene geometry and line queries against it.
//!
//! Obstacles are axis-aligned boxes on one of three layers. Queries take a
//! [`LayerMask`] so callers pick which layers block them: standing sight
//! passes over half obstacles, crouched sight and path smoothing do not.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::ops::BitOr;

/// Bit set of obstacle layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(u32);

impl LayerMask {
    /// No layers.
    pub const NONE: Self = Self(0);
    /// Walls and other obstacles that block in every stance.
    pub const FULL_OBSTACLE: Self = Self(1 << 0);
    /// Low cover that only blocks crouched sight lines.
    pub const HALF_OBSTACLE: Self = Self(1 << 1);
    /// Doors; toggled at runtime and kept out of the walkability mask.
    pub const DOOR: Self = Self(1 << 2);

    /// Layers a straightened path segment must not cross.
    pub const PATH_BLOCKING: Self =
        Self(Self::FULL_OBSTACLE.0 | Self::HALF_OBSTACLE.0 | Self::DOOR.0);
    /// Layers that block sight when both parties stand.
    pub const SIGHT_STANDING: Self = Self(Self::FULL_OBSTACLE.0 | Self::DOOR.0);
    /// Layers that block sight when either party crouches.
    pub const SIGHT_CROUCHED: Self =
        Self(Self::FULL_OBSTACLE.0 | Self::HALF_OBSTACLE.0 | Self::DOOR.0);
    /// Layers that stop a shot; low cover stops bullets but not sight.
    pub const FIRE_BLOCKING: Self =
        Self(Self::FULL_OBSTACLE.0 | Self::HALF_OBSTACLE.0 | Self::DOOR.0);

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if any layer is shared.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for LayerMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl Aabb {
    /// Creates a box from two corners in any order.
    #[must_use]
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// The four corners, counter-clockwise from `min`.
    #[must_use]
    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }

    /// Whether the segment `from -> to` touches the box (slab test).
    #[must_use]
    pub fn intersects_segment(&self, from: Vec2, to: Vec2) -> bool {
        let delta = to - from;
        let mut t_enter = 0.0_f32;
        let mut t_exit = 1.0_f32;

        for (origin, dir, lo, hi) in [
            (from.x, delta.x, self.min.x, self.max.x),
            (from.y, delta.y, self.min.y, self.max.y),
        ] {
            if dir.abs() < f32::EPSILON {
                if origin < lo || origin > hi {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / dir;
            let mut t0 = (lo - origin) * inv;
            let mut t1 = (hi - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return false;
            }
        }
        true
    }
}

/// Obstacle classes found in level geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Blocks movement and sight in every stance
    Full,
    /// Blocks movement; sight only when crouched
    Half,
    /// Toggled at runtime, never rasterized
    Door,
}

impl ObstacleKind {
    /// Layer this kind of obstacle lives on.
    #[must_use]
    pub const fn layer(self) -> LayerMask {
        match self {
            Self::Full => LayerMask::FULL_OBSTACLE,
            Self::Half => LayerMask::HALF_OBSTACLE,
            Self::Door => LayerMask::DOOR,
        }
    }
}

/// One piece of static (or door) geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Obstacle class
    pub kind: ObstacleKind,
    /// World-space bounds
    pub bounds: Aabb,
    /// Inactive obstacles are ignored by queries and rasterization
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Obstacle {
    /// Creates an active obstacle.
    #[must_use]
    pub const fn new(kind: ObstacleKind, bounds: Aabb) -> Self {
        Self {
            kind,
            bounds,
            active: true,
        }
    }
}

/// Line queries the AI needs from the scene layer.
pub trait SceneQuery {
    /// Returns true if the segment `from -> to` hits anything on `layers`.
    fn linecast(&self, from: Vec2, to: Vec2, layers: LayerMask) -> bool;
}

/// Scene built from a flat obstacle list.
#[derive(Debug, Clone, Default)]
pub struct ObstacleScene {
    obstacles: Vec<Obstacle>,
}

impl ObstacleScene {
    /// Creates a scene from obstacles.
    #[must_use]
    pub fn new(obstacles: Vec<Obstacle>) -> Self {
        Self { obstacles }
    }

    /// All obstacles, including inactive ones.
    #[must_use]
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Adds an obstacle and returns its index.
    pub fn push(&mut self, obstacle: Obstacle) -> usize {
        self.obstacles.push(obstacle);
        self.obstacles.len() - 1
    }

    /// Activates or deactivates an obstacle (opening a door, for instance).
    /// Returns false if the index is unknown.
    pub fn set_active(&mut self, index: usize, active: bool) -> bool {
        match self.obstacles.get_mut(index) {
            Some(obstacle) => {
                obstacle.active = active;
                true
            },
            None => false,
        }
    }
}

impl SceneQuery for ObstacleScene {
    fn linecast(&self, from: Vec2, to: Vec2, layers: LayerMask) -> bool {
        self.obstacles.iter().any(|obstacle| {
            obstacle.active
                && layers.intersects(obstacle.kind.layer())
                && obstacle.bounds.intersects_segment(from, to)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall() -> Obstacle {
        Obstacle::new(
            ObstacleKind::Full,
            Aabb::from_corners(Vec2::new(10.0, -10.0), Vec2::new(12.0, 10.0)),
        )
    }

    #[test]
    fn test_segment_crossing_box() {
        let bounds = wall().bounds;
        assert!(bounds.intersects_segment(Vec2::new(0.0, 0.0), Vec2::new(20.0, 0.0)));
        assert!(!bounds.intersects_segment(Vec2::new(0.0, 0.0), Vec2::new(9.0, 0.0)));
        assert!(!bounds.intersects_segment(Vec2::new(0.0, 20.0), Vec2::new(20.0, 20.0)));
    }

    #[test]
    fn test_vertical_segment_uses_parallel_branch() {
        let bounds = wall().bounds;
        assert!(bounds.intersects_segment(Vec2::new(11.0, -20.0), Vec2::new(11.0, 20.0)));
        assert!(!bounds.intersects_segment(Vec2::new(13.0, -20.0), Vec2::new(13.0, 20.0)));
    }

    #[test]
    fn test_linecast_respects_layers() {
        let half = Obstacle::new(
            ObstacleKind::Half,
            Aabb::from_corners(Vec2::new(10.0, -10.0), Vec2::new(12.0, 10.0)),
        );
        let scene = ObstacleScene::new(vec![half]);
        let (a, b) = (Vec2::ZERO, Vec2::new(20.0, 0.0));
        assert!(!scene.linecast(a, b, LayerMask::SIGHT_STANDING));
        assert!(scene.linecast(a, b, LayerMask::SIGHT_CROUCHED));
        assert!(scene.linecast(a, b, LayerMask::PATH_BLOCKING));
    }

    #[test]
    fn test_inactive_door_does_not_block() {
        let door = Obstacle::new(
            ObstacleKind::Door,
            Aabb::from_corners(Vec2::new(10.0, -10.0), Vec2::new(12.0, 10.0)),
        );
        let mut scene = ObstacleScene::new(vec![door]);
        let (a, b) = (Vec2::ZERO, Vec2::new(20.0, 0.0));
        assert!(scene.linecast(a, b, LayerMask::FIRE_BLOCKING));
        assert!(scene.set_active(0, false));
        assert!(!scene.linecast(a, b, LayerMask::FIRE_BLOCKING));
        assert!(!scene.set_active(5, false));
    }

    #[test]
    fn test_layer_mask_union() {
        let mask = LayerMask::FULL_OBSTACLE | LayerMask::HALF_OBSTACLE;
        assert!(mask.intersects(LayerMask::HALF_OBSTACLE));
        assert!(!mask.intersects(LayerMask::DOOR));
        assert_eq!(LayerMask::NONE.bits(), 0);
    }
}
