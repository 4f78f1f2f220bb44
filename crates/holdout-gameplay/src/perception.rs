//! Trigger-volume sight sensor.
//!
//! A player entering the sensor volume becomes a tentative target. While one
//! is recorded, every tick casts a line to it; a hit reports the target lost,
//! a clear line reports it visible. Crouching on either side makes half
//! obstacles block the line.

use glam::Vec2;
use holdout_common::EntityId;
use serde::{Deserialize, Serialize};

use crate::scene::{LayerMask, SceneQuery};

/// Tag carried by anything that can touch a sensor volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactTag {
    /// The player
    Player,
    /// Anything else
    Other,
}

/// Where a target is this tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetSnapshot {
    /// Target entity
    pub entity: EntityId,
    /// Root position
    pub position: Vec2,
    /// Whether the target is crouching
    pub crouched: bool,
}

/// Outcome of a sensor tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sighting {
    /// Line of sight is clear
    Visible(TargetSnapshot),
    /// Line of sight is blocked or the target left the volume
    Lost,
}

/// Sight mask for a pair of stances.
#[must_use]
pub const fn sight_mask(observer_crouched: bool, target_crouched: bool) -> LayerMask {
    if observer_crouched || target_crouched {
        LayerMask::SIGHT_CROUCHED
    } else {
        LayerMask::SIGHT_STANDING
    }
}

/// Circular trigger volume with line-of-sight confirmation.
#[derive(Debug, Clone)]
pub struct PerceptionSensor {
    radius: f32,
    tentative: Option<EntityId>,
    exited: bool,
}

impl PerceptionSensor {
    /// Creates a sensor with the given volume radius.
    #[must_use]
    pub const fn new(radius: f32) -> Self {
        Self {
            radius,
            tentative: None,
            exited: false,
        }
    }

    /// Volume radius.
    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.radius
    }

    /// Currently recorded target, if any.
    #[must_use]
    pub const fn tentative_target(&self) -> Option<EntityId> {
        self.tentative
    }

    /// Something entered the volume. Only players are recorded.
    pub fn on_trigger_enter(&mut self, tag: ContactTag, entity: EntityId) {
        if tag == ContactTag::Player {
            self.tentative = Some(entity);
            self.exited = false;
        }
    }

    /// Something left the volume.
    pub fn on_trigger_exit(&mut self, entity: EntityId) {
        if self.tentative == Some(entity) {
            self.tentative = None;
            self.exited = true;
        }
    }

    /// Runs the volume test and sight check for one tick.
    ///
    /// Returns `None` when there is nothing to report.
    pub fn observe<S>(
        &mut self,
        sensor_position: Vec2,
        sensor_crouched: bool,
        player: Option<&TargetSnapshot>,
        scene: &S,
    ) -> Option<Sighting>
    where
        S: SceneQuery + ?Sized,
    {
        match player {
            Some(target) if target.position.distance(sensor_position) <= self.radius => {
                if self.tentative != Some(target.entity) {
                    self.on_trigger_enter(ContactTag::Player, target.entity);
                }
            },
            Some(target) => self.on_trigger_exit(target.entity),
            None => {
                if let Some(entity) = self.tentative {
                    self.on_trigger_exit(entity);
                }
            },
        }
        self.sense(sensor_position, sensor_crouched, player, scene)
    }

    /// Sight check against the recorded target.
    pub fn sense<S>(
        &mut self,
        sensor_position: Vec2,
        sensor_crouched: bool,
        player: Option<&TargetSnapshot>,
        scene: &S,
    ) -> Option<Sighting>
    where
        S: SceneQuery + ?Sized,
    {
        if std::mem::take(&mut self.exited) {
            return Some(Sighting::Lost);
        }
        let entity = self.tentative?;
        let target = player.filter(|t| t.entity == entity)?;
        let mask = sight_mask(sensor_crouched, target.crouched);
        if scene.linecast(sensor_position, target.position, mask) {
            Some(Sighting::Lost)
        } else {
            Some(Sighting::Visible(*target))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Aabb, Obstacle, ObstacleKind, ObstacleScene};

    fn player_at(x: f32, crouched: bool) -> TargetSnapshot {
        TargetSnapshot {
            entity: EntityId::from_raw(1),
            position: Vec2::new(x, 0.0),
            crouched,
        }
    }

    fn scene_with(kind: ObstacleKind) -> ObstacleScene {
        ObstacleScene::new(vec![Obstacle::new(
            kind,
            Aabb::from_corners(Vec2::new(20.0, -5.0), Vec2::new(22.0, 5.0)),
        )])
    }

    #[test]
    fn test_no_report_outside_volume() {
        let mut sensor = PerceptionSensor::new(50.0);
        let scene = ObstacleScene::default();
        let player = player_at(80.0, false);
        assert_eq!(sensor.observe(Vec2::ZERO, false, Some(&player), &scene), None);
        assert_eq!(sensor.tentative_target(), None);
    }

    #[test]
    fn test_visible_inside_volume() {
        let mut sensor = PerceptionSensor::new(50.0);
        let scene = ObstacleScene::default();
        let player = player_at(30.0, false);
        assert_eq!(
            sensor.observe(Vec2::ZERO, false, Some(&player), &scene),
            Some(Sighting::Visible(player))
        );
    }

    #[test]
    fn test_wall_blocks_sight() {
        let mut sensor = PerceptionSensor::new(50.0);
        let scene = scene_with(ObstacleKind::Full);
        let player = player_at(30.0, false);
        assert_eq!(
            sensor.observe(Vec2::ZERO, false, Some(&player), &scene),
            Some(Sighting::Lost)
        );
    }

    #[test]
    fn test_half_cover_only_hides_crouched_target() {
        let scene = scene_with(ObstacleKind::Half);
        let mut sensor = PerceptionSensor::new(50.0);
        let standing = player_at(30.0, false);
        let crouched = player_at(30.0, true);
        assert!(matches!(
            sensor.observe(Vec2::ZERO, false, Some(&standing), &scene),
            Some(Sighting::Visible(_))
        ));
        assert_eq!(
            sensor.observe(Vec2::ZERO, false, Some(&crouched), &scene),
            Some(Sighting::Lost)
        );
        assert_eq!(
            sensor.observe(Vec2::ZERO, true, Some(&standing), &scene),
            Some(Sighting::Lost)
        );
    }

    #[test]
    fn test_leaving_volume_reports_lost_once() {
        let mut sensor = PerceptionSensor::new(50.0);
        let scene = ObstacleScene::default();
        let near = player_at(30.0, false);
        let far = player_at(90.0, false);
        sensor.observe(Vec2::ZERO, false, Some(&near), &scene);
        assert_eq!(
            sensor.observe(Vec2::ZERO, false, Some(&far), &scene),
            Some(Sighting::Lost)
        );
        assert_eq!(sensor.observe(Vec2::ZERO, false, Some(&far), &scene), None);
    }

    #[test]
    fn test_non_player_contacts_ignored() {
        let mut sensor = PerceptionSensor::new(50.0);
        sensor.on_trigger_enter(ContactTag::Other, EntityId::from_raw(4));
        assert_eq!(sensor.tentative_target(), None);
        sensor.on_trigger_enter(ContactTag::Player, EntityId::from_raw(4));
        assert_eq!(sensor.tentative_target(), Some(EntityId::from_raw(4)));
        sensor.on_trigger_exit(EntityId::from_raw(5));
        assert_eq!(sensor.tentative_target(), Some(EntityId::from_raw(4)));
    }
}
