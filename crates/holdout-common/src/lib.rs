//! # Holdout Common
//!
//! Common types, utilities, and shared abstractions for Holdout.
//!
//! This crate provides foundational types used across all Holdout subsystems:
//! - Grid coordinates and the world <-> grid layout
//! - ID types (EntityId)
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_validity() {
        let id = EntityId::from_raw(7);
        assert!(id.is_valid());
        assert_eq!(id.raw(), 7);
        assert_eq!(id.to_string(), "#7");
        assert!(!EntityId::NULL.is_valid());
    }

    #[test]
    fn test_grid_error_messages() {
        let err = GridError::MaskSizeMismatch {
            expected: 4,
            actual: 3,
        };
        assert!(err.to_string().contains("grid needs 4"));
        let err = GridError::InvalidCellSize(-1.0);
        assert!(err.to_string().contains("-1"));
    }
}
