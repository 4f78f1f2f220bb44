//! Per-agent behaviour tuning.

use serde::{Deserialize, Serialize};

use crate::npc::{AgentError, AgentResult};
use crate::steering::LookAroundTuning;

/// Speeds, distances and timings that drive a hostile agent.
///
/// Distances are world units, times are seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentTuning {
    /// Walking speed
    pub move_speed: f32,
    /// Speed while chasing
    pub chase_speed: f32,
    /// Turn interpolation rate while walking
    pub rotation_speed: f32,
    /// Turn interpolation rate while aiming
    pub aim_speed: f32,
    /// A waypoint counts as reached within this distance
    pub waypoint_reach: f32,
    /// Idle agents walk home when farther than this from spawn
    pub return_home_distance: f32,
    /// Sideways step taken before engaging
    pub attack_offset: f32,
    /// Maximum firing distance
    pub fire_range: f32,
    /// Distance to back off when the shot is blocked
    pub fallback_distance: f32,
    /// Number of locations generated per search
    pub search_locations: usize,
    /// Radius of the disc search locations are drawn from
    pub search_radius: f32,
    /// Time spent looking around at each search location
    pub search_dwell: f32,
    /// Time spent looking around at each patrol waypoint
    pub patrol_pause: f32,
    /// Sight sensor radius
    pub sensor_radius: f32,
    /// Look-around behaviour
    pub look_around: LookAroundTuning,
}

impl Default for AgentTuning {
    fn default() -> Self {
        Self {
            move_speed: 12.0,
            chase_speed: 20.0,
            rotation_speed: 8.0,
            aim_speed: 10.0,
            waypoint_reach: 3.0,
            return_home_distance: 10.0,
            attack_offset: 20.0,
            fire_range: 30.0,
            fallback_distance: 10.0,
            search_locations: 5,
            search_radius: 40.0,
            search_dwell: 10.0,
            patrol_pause: 3.0,
            sensor_radius: 80.0,
            look_around: LookAroundTuning::default(),
        }
    }
}

impl AgentTuning {
    /// Rejects values that would stall or break the state machine.
    pub fn validate(&self) -> AgentResult<()> {
        for (field, value) in [
            ("move_speed", self.move_speed),
            ("chase_speed", self.chase_speed),
            ("waypoint_reach", self.waypoint_reach),
            ("fire_range", self.fire_range),
            ("sensor_radius", self.sensor_radius),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(AgentError::InvalidTuning { field, value });
            }
        }
        for (field, value) in [
            ("rotation_speed", self.rotation_speed),
            ("aim_speed", self.aim_speed),
            ("return_home_distance", self.return_home_distance),
            ("attack_offset", self.attack_offset),
            ("fallback_distance", self.fallback_distance),
            ("search_radius", self.search_radius),
            ("search_dwell", self.search_dwell),
            ("patrol_pause", self.patrol_pause),
            ("look_around.wait_min", self.look_around.wait_min),
            ("look_around.wait_max", self.look_around.wait_max),
            ("look_around.turn_speed", self.look_around.turn_speed),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(AgentError::InvalidTuning { field, value });
            }
        }
        if self.search_locations == 0 {
            return Err(AgentError::InvalidTuning {
                field: "search_locations",
                value: 0.0,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let tuning = AgentTuning::default();
        assert!(tuning.validate().is_ok());
        assert_eq!(tuning.search_locations, 5);
        assert!((tuning.waypoint_reach - 3.0).abs() < f32::EPSILON);
        assert!((tuning.search_dwell - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_rejects_non_positive_speed() {
        let tuning = AgentTuning {
            move_speed: 0.0,
            ..AgentTuning::default()
        };
        assert!(matches!(
            tuning.validate(),
            Err(AgentError::InvalidTuning {
                field: "move_speed",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_nan_and_empty_search() {
        let nan = AgentTuning {
            search_dwell: f32::NAN,
            ..AgentTuning::default()
        };
        assert!(nan.validate().is_err());

        let empty = AgentTuning {
            search_locations: 0,
            ..AgentTuning::default()
        };
        assert!(empty.validate().is_err());
    }
}
