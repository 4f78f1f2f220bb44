//! Firearm carried by hostile agents.
//!
//! Reload, fire interval, muzzle flash and the post-sighting reaction delay
//! are countdowns advanced by [`Firearm::tick`].

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::timer::Countdown;

/// Static weapon parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirearmSpec {
    /// Rounds per magazine
    pub magazine_size: u32,
    /// Seconds between shots
    pub fire_interval: f32,
    /// Seconds to reload an empty magazine
    pub reload_time: f32,
    /// Seconds before firing after the target is spotted again
    pub spotted_delay: f32,
    /// Seconds the muzzle flash stays visible
    pub muzzle_flash: f32,
}

impl Default for FirearmSpec {
    fn default() -> Self {
        Self {
            magazine_size: 12,
            fire_interval: 0.4,
            reload_time: 2.0,
            spotted_delay: 0.6,
            muzzle_flash: 0.05,
        }
    }
}

impl FirearmSpec {
    /// Checks for values that would break the weapon loop.
    pub fn validate(&self) -> Result<(), String> {
        if self.magazine_size == 0 {
            return Err("magazine_size must be at least 1".into());
        }
        for (name, value) in [
            ("fire_interval", self.fire_interval),
            ("reload_time", self.reload_time),
            ("spotted_delay", self.spotted_delay),
            ("muzzle_flash", self.muzzle_flash),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(format!("{name} must be a non-negative number, got {value}"));
            }
        }
        Ok(())
    }
}

/// A firearm instance with its magazine and timers.
#[derive(Debug, Clone)]
pub struct Firearm {
    spec: FirearmSpec,
    equipped: bool,
    rounds: u32,
    fire_cooldown: Countdown,
    reload: Countdown,
    reaction: Countdown,
    muzzle_flash: Countdown,
}

impl Firearm {
    /// Creates a holstered, fully loaded firearm.
    #[must_use]
    pub fn new(spec: FirearmSpec) -> Self {
        Self {
            spec,
            equipped: false,
            rounds: spec.magazine_size,
            fire_cooldown: Countdown::idle(),
            reload: Countdown::idle(),
            reaction: Countdown::idle(),
            muzzle_flash: Countdown::idle(),
        }
    }

    /// Weapon parameters.
    #[must_use]
    pub const fn spec(&self) -> &FirearmSpec {
        &self.spec
    }

    /// Draws the weapon. Returns true if it was holstered.
    pub fn equip(&mut self) -> bool {
        let changed = !self.equipped;
        self.equipped = true;
        changed
    }

    /// Holsters the weapon. Returns true if it was drawn.
    pub fn unequip(&mut self) -> bool {
        let changed = self.equipped;
        self.equipped = false;
        self.reaction.cancel();
        changed
    }

    /// Whether the weapon is drawn.
    #[must_use]
    pub const fn is_equipped(&self) -> bool {
        self.equipped
    }

    /// Delays the next shot after the target reappears.
    pub fn notify_target_spotted(&mut self) {
        self.reaction.start(self.spec.spotted_delay);
    }

    /// Rounds left in the magazine.
    #[must_use]
    pub const fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Whether a reload is in progress.
    #[must_use]
    pub const fn is_reloading(&self) -> bool {
        self.reload.is_running()
    }

    /// Whether the muzzle flash is showing.
    #[must_use]
    pub const fn is_flashing(&self) -> bool {
        self.muzzle_flash.is_running()
    }

    /// Whether a shot would leave the barrel right now.
    #[must_use]
    pub const fn can_fire(&self) -> bool {
        self.equipped
            && self.rounds > 0
            && !self.reload.is_running()
            && !self.reaction.is_running()
            && !self.fire_cooldown.is_running()
    }

    /// Advances all weapon timers.
    pub fn tick(&mut self, dt: f32) {
        self.fire_cooldown.tick(dt);
        self.reaction.tick(dt);
        self.muzzle_flash.tick(dt);
        if self.reload.tick(dt) {
            self.rounds = self.spec.magazine_size;
            trace!(rounds = self.rounds, "reload complete");
        }
    }

    /// Fires one round if possible. Returns true when a shot was fired.
    pub fn try_fire(&mut self) -> bool {
        if !self.can_fire() {
            return false;
        }
        self.rounds -= 1;
        self.fire_cooldown.start(self.spec.fire_interval);
        self.muzzle_flash.start(self.spec.muzzle_flash);
        if self.rounds == 0 {
            self.reload.start(self.spec.reload_time);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> FirearmSpec {
        FirearmSpec {
            magazine_size: 2,
            fire_interval: 0.5,
            reload_time: 1.0,
            spotted_delay: 0.3,
            muzzle_flash: 0.1,
        }
    }

    #[test]
    fn test_holstered_weapon_does_not_fire() {
        let mut gun = Firearm::new(spec());
        assert!(!gun.try_fire());
        assert!(gun.equip());
        assert!(!gun.equip());
        assert!(gun.try_fire());
        assert!(gun.is_flashing());
    }

    #[test]
    fn test_fire_interval_and_reload() {
        let mut gun = Firearm::new(spec());
        gun.equip();
        assert!(gun.try_fire());
        assert!(!gun.try_fire());
        gun.tick(0.6);
        assert!(gun.try_fire());
        assert_eq!(gun.rounds(), 0);
        assert!(gun.is_reloading());
        gun.tick(0.6);
        assert!(!gun.try_fire());
        gun.tick(0.6);
        assert_eq!(gun.rounds(), 2);
        assert!(gun.try_fire());
    }

    #[test]
    fn test_spotted_delay_blocks_fire() {
        let mut gun = Firearm::new(spec());
        gun.equip();
        gun.notify_target_spotted();
        assert!(!gun.try_fire());
        gun.tick(0.31);
        assert!(gun.try_fire());
    }

    #[test]
    fn test_spec_validation() {
        assert!(spec().validate().is_ok());
        let empty = FirearmSpec {
            magazine_size: 0,
            ..spec()
        };
        assert!(empty.validate().is_err());
        let negative = FirearmSpec {
            reload_time: -1.0,
            ..spec()
        };
        assert!(negative.validate().is_err());
    }
}
