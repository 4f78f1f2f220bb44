//! Event bus carrying agent notifications to presentation layers.
//!
//! Animation, audio and weapon presentation listen here; the AI itself
//! never reads the bus.

use crossbeam_channel::{bounded, Receiver, Sender};
use glam::Vec2;
use serde::{Deserialize, Serialize};

use holdout_common::EntityId;

use crate::npc::NpcState;

/// Notifications emitted by hostile agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NpcEvent {
    /// Agent switched state
    StateChanged {
        /// Agent
        entity_id: EntityId,
        /// Previous state
        from: NpcState,
        /// New state
        to: NpcState,
    },
    /// Agent drew its weapon
    WeaponEquipped {
        /// Agent
        entity_id: EntityId,
    },
    /// Agent holstered its weapon
    WeaponUnequipped {
        /// Agent
        entity_id: EntityId,
    },
    /// Agent fired a shot
    ShotFired {
        /// Agent
        entity_id: EntityId,
        /// Muzzle position
        from: Vec2,
        /// Aim point
        to: Vec2,
    },
    /// A path request found nothing
    PathFailed {
        /// Agent
        entity_id: EntityId,
        /// Requested destination
        destination: Vec2,
    },
    /// Agent finished dwelling at a search location
    SearchLocationCleared {
        /// Agent
        entity_id: EntityId,
        /// Locations left to visit
        remaining: usize,
    },
    /// Agent was removed from the roster
    Despawned {
        /// Agent
        entity_id: EntityId,
    },
}

impl NpcEvent {
    /// Agent the event concerns.
    #[must_use]
    pub const fn entity_id(&self) -> EntityId {
        match self {
            Self::StateChanged { entity_id, .. }
            | Self::WeaponEquipped { entity_id }
            | Self::WeaponUnequipped { entity_id }
            | Self::ShotFired { entity_id, .. }
            | Self::PathFailed { entity_id, .. }
            | Self::SearchLocationCleared { entity_id, .. }
            | Self::Despawned { entity_id } => *entity_id,
        }
    }
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<NpcEvent>,
    /// Receiver for collecting events
    receiver: Receiver<NpcEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: NpcEvent) {
        // Non-blocking send - if full, event is dropped
        let _ = self.sender.try_send(event);
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<NpcEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain() {
        let bus = EventBus::new(4);
        let id = EntityId::from_raw(9);
        bus.publish(NpcEvent::WeaponEquipped { entity_id: id });
        bus.publish(NpcEvent::Despawned { entity_id: id });
        assert_eq!(bus.pending_count(), 2);
        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.entity_id() == id));
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops_events() {
        let bus = EventBus::new(1);
        let id = EntityId::from_raw(1);
        bus.publish(NpcEvent::WeaponEquipped { entity_id: id });
        bus.publish(NpcEvent::WeaponUnequipped { entity_id: id });
        let events = bus.drain();
        assert_eq!(events, vec![NpcEvent::WeaponEquipped { entity_id: id }]);
        assert_eq!(bus.capacity(), 1);
    }
}
