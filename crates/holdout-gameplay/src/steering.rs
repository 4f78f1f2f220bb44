//! Low-level motion: walking a waypoint list and idle look-around.

use fastrand::Rng;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

use crate::timer::Countdown;

/// Heading error below which a moving agent snaps to face straight ahead.
pub const FACING_SNAP_ANGLE: f32 = 5.0 * PI / 180.0;

/// Heading error below which a look-around turn counts as finished.
pub const LOOK_REACHED_ANGLE: f32 = 3.0 * PI / 180.0;

/// Position and heading of an agent. Heading is radians from +X.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// World position
    pub position: Vec2,
    /// Heading in radians
    pub facing: f32,
}

impl Pose {
    /// Creates a pose.
    #[must_use]
    pub const fn new(position: Vec2, facing: f32) -> Self {
        Self { position, facing }
    }

    /// Unit vector along the heading.
    #[must_use]
    pub fn forward(&self) -> Vec2 {
        Vec2::from_angle(self.facing)
    }

    /// Unit vector pointing to the right of the heading.
    #[must_use]
    pub fn right(&self) -> Vec2 {
        let f = self.forward();
        Vec2::new(f.y, -f.x)
    }
}

/// Wraps an angle into `(-PI, PI]`.
#[must_use]
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Absolute angular difference, in `[0, PI]`.
#[must_use]
pub fn angle_between(a: f32, b: f32) -> f32 {
    wrap_angle(b - a).abs()
}

/// Heading of a direction vector.
#[must_use]
pub fn heading_of(direction: Vec2) -> f32 {
    direction.y.atan2(direction.x)
}

/// Spherical interpolation between headings by factor `t` (clamped to 0..1).
#[must_use]
pub fn rotate_toward(current: f32, target: f32, t: f32) -> f32 {
    wrap_angle(current + wrap_angle(target - current) * t.clamp(0.0, 1.0))
}

/// Moves along `path`, popping waypoints as they are reached.
///
/// Moves at most `speed * dt` toward the head waypoint. With a positive
/// `rotation_speed` the heading turns toward the travel direction. The head
/// waypoint is popped once within `reach_distance`. Returns true when the
/// path is empty.
pub fn follow_path(
    pose: &mut Pose,
    path: &mut Vec<Vec2>,
    speed: f32,
    rotation_speed: f32,
    reach_distance: f32,
    dt: f32,
) -> bool {
    let Some(&waypoint) = path.first() else {
        return true;
    };

    let to_waypoint = waypoint - pose.position;
    let distance = to_waypoint.length();
    let step = speed * dt;
    if distance <= step {
        pose.position = waypoint;
    } else {
        pose.position += to_waypoint / distance * step;
    }

    if rotation_speed > 0.0 && distance > f32::EPSILON {
        let target = heading_of(to_waypoint);
        pose.facing = rotate_toward(pose.facing, target, rotation_speed * dt);
        if angle_between(pose.facing, target) < FACING_SNAP_ANGLE {
            pose.facing = target;
        }
    }

    if pose.position.distance(waypoint) < reach_distance {
        path.remove(0);
    }
    path.is_empty()
}

/// Look-around tuning. Angles in degrees, times in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookAroundTuning {
    /// Smallest turn away from the resting heading
    pub min_angle: f32,
    /// Largest turn away from the resting heading
    pub max_angle: f32,
    /// Shortest pause between look-around cycles
    pub wait_min: f32,
    /// Longest pause between look-around cycles
    pub wait_max: f32,
    /// Interpolation rate per second
    pub turn_speed: f32,
}

impl Default for LookAroundTuning {
    fn default() -> Self {
        Self {
            min_angle: 30.0,
            max_angle: 100.0,
            wait_min: 2.0,
            wait_max: 5.0,
            turn_speed: 3.0,
        }
    }
}

/// Idle head-turning around a resting heading.
#[derive(Debug, Clone, Default)]
pub struct LookAround {
    rest: f32,
    target: f32,
    cooldown: Countdown,
}

impl LookAround {
    /// Anchors the look-around on the current heading.
    pub fn begin(&mut self, facing: f32) {
        self.rest = facing;
        self.target = facing;
        self.cooldown.cancel();
    }

    /// Resting heading.
    #[must_use]
    pub const fn rest(&self) -> f32 {
        self.rest
    }

    /// Heading currently turned toward.
    #[must_use]
    pub const fn target(&self) -> f32 {
        self.target
    }

    /// Whether the look-around is pausing between cycles.
    #[must_use]
    pub const fn is_cooling_down(&self) -> bool {
        self.cooldown.is_running()
    }

    /// Advances one tick, turning `facing`.
    pub fn tick(&mut self, facing: &mut f32, dt: f32, tuning: &LookAroundTuning, rng: &mut Rng) {
        if self.cooldown.is_running() {
            if self.cooldown.tick(dt) {
                let side = if rng.bool() { 1.0 } else { -1.0 };
                self.target = wrap_angle(self.rest + side * Self::random_turn(tuning, rng));
            }
            return;
        }

        // Sweep the offset from rest so a side switch passes through the front.
        let from = wrap_angle(*facing - self.rest);
        let to = wrap_angle(self.target - self.rest);
        let t = (tuning.turn_speed * dt).clamp(0.0, 1.0);
        *facing = wrap_angle(self.rest + from + (to - from) * t);
        if angle_between(*facing, self.target) >= LOOK_REACHED_ANGLE {
            return;
        }
        *facing = self.target;

        let deviation = wrap_angle(self.target - self.rest);
        if deviation.abs() < LOOK_REACHED_ANGLE {
            self.cooldown
                .start_random(tuning.wait_min, tuning.wait_max, rng);
        } else if rng.bool() {
            self.target = self.rest;
        } else {
            let side = -deviation.signum();
            self.target = wrap_angle(self.rest + side * Self::random_turn(tuning, rng));
        }
    }

    fn random_turn(tuning: &LookAroundTuning, rng: &mut Rng) -> f32 {
        let (lo, hi) = if tuning.min_angle <= tuning.max_angle {
            (tuning.min_angle, tuning.max_angle)
        } else {
            (tuning.max_angle, tuning.min_angle)
        };
        (lo + (hi - lo) * rng.f32()).to_radians()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_angle_range() {
        assert!((wrap_angle(3.0 * PI) - PI).abs() < 1e-5);
        assert!((wrap_angle(-PI / 2.0) + PI / 2.0).abs() < 1e-5);
        assert!(wrap_angle(-PI) > 0.0);
        assert!((angle_between(PI - 0.1, -PI + 0.1) - 0.2).abs() < 1e-4);
    }

    #[test]
    fn test_rotate_toward_takes_short_way() {
        let result = rotate_toward(PI - 0.1, -PI + 0.1, 0.5);
        assert!(angle_between(result, PI) < 1e-4);
    }

    #[test]
    fn test_follow_path_pops_reached_waypoints() {
        let mut pose = Pose::new(Vec2::ZERO, 0.0);
        let mut path = vec![Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0)];

        assert!(!follow_path(&mut pose, &mut path, 5.0, 0.0, 3.0, 1.0));
        assert_eq!(path.len(), 2);
        assert!(!follow_path(&mut pose, &mut path, 5.0, 0.0, 3.0, 1.0));
        assert_eq!(path.len(), 1);
        assert!((pose.position - Vec2::new(10.0, 0.0)).length() < 1e-4);

        let mut done = false;
        for _ in 0..5 {
            done = follow_path(&mut pose, &mut path, 5.0, 0.0, 3.0, 1.0);
        }
        assert!(done);
    }

    #[test]
    fn test_follow_path_pops_within_reach_distance() {
        let mut pose = Pose::new(Vec2::ZERO, 0.0);
        let mut path = vec![Vec2::new(4.0, 0.0)];
        assert!(follow_path(&mut pose, &mut path, 2.0, 0.0, 3.0, 1.0));
        assert!((pose.position.x - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_follow_path_turns_and_snaps() {
        let mut pose = Pose::new(Vec2::ZERO, 0.0);
        let mut path = vec![Vec2::new(0.0, 100.0)];
        follow_path(&mut pose, &mut path, 1.0, 2.0, 3.0, 0.1);
        assert!(pose.facing > 0.0 && pose.facing < PI / 2.0);
        for _ in 0..60 {
            follow_path(&mut pose, &mut path, 1.0, 2.0, 3.0, 0.1);
        }
        assert!((pose.facing - PI / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_follow_path_without_rotation_keeps_heading() {
        let mut pose = Pose::new(Vec2::ZERO, 1.0);
        let mut path = vec![Vec2::new(0.0, 100.0)];
        follow_path(&mut pose, &mut path, 1.0, 0.0, 3.0, 0.1);
        assert!((pose.facing - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_empty_path_is_done() {
        let mut pose = Pose::new(Vec2::ZERO, 0.0);
        let mut path = Vec::new();
        assert!(follow_path(&mut pose, &mut path, 1.0, 1.0, 3.0, 0.1));
        assert_eq!(pose.position, Vec2::ZERO);
    }

    #[test]
    fn test_look_around_stays_within_range_and_returns() {
        let tuning = LookAroundTuning::default();
        let mut rng = Rng::with_seed(11);
        let mut look = LookAround::default();
        let mut facing = 0.5;
        look.begin(facing);

        let mut saw_turn = false;
        let mut saw_cooldown = false;
        for _ in 0..2000 {
            look.tick(&mut facing, 0.05, &tuning, &mut rng);
            let deviation = angle_between(look.rest(), facing);
            assert!(deviation <= tuning.max_angle.to_radians() + 1e-3);
            if deviation > tuning.min_angle.to_radians() * 0.9 {
                saw_turn = true;
            }
            if look.is_cooling_down() {
                saw_cooldown = true;
                assert!(angle_between(facing, look.rest()) < 1e-5);
            }
        }
        assert!(saw_turn);
        assert!(saw_cooldown);
    }

    #[test]
    fn test_look_around_side_switch_sweeps_through_front() {
        let tuning = LookAroundTuning {
            min_angle: 100.0,
            max_angle: 100.0,
            ..LookAroundTuning::default()
        };
        let mut rng = Rng::with_seed(3);
        let mut look = LookAround::default();
        let rest = 0.0;
        let mut facing = 100.0_f32.to_radians();
        look.begin(rest);
        look.target = -100.0_f32.to_radians();

        let mut crossed_front = false;
        for _ in 0..200 {
            look.tick(&mut facing, 0.05, &tuning, &mut rng);
            let deviation = angle_between(rest, facing);
            assert!(deviation <= 100.0_f32.to_radians() + 1e-3);
            if deviation < 0.2 {
                crossed_front = true;
            }
            if angle_between(facing, -100.0_f32.to_radians()) < 1e-5 {
                break;
            }
        }
        assert!(crossed_front);
    }

    #[test]
    fn test_look_around_begins_with_cooldown() {
        let tuning = LookAroundTuning::default();
        let mut rng = Rng::with_seed(1);
        let mut look = LookAround::default();
        let mut facing = 1.0;
        look.begin(facing);
        look.tick(&mut facing, 0.016, &tuning, &mut rng);
        assert!(look.is_cooling_down());
        assert!((facing - 1.0).abs() < 1e-6);
    }
}
