//! Error types shared across Holdout crates.

use thiserror::Error;

/// Navigation grid construction errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    /// Grid has no cells
    #[error("grid dimensions must be non-zero, got {width}x{height}")]
    EmptyGrid {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// Walkability mask does not cover the grid
    #[error("walkable mask has {actual} cells, grid needs {expected}")]
    MaskSizeMismatch {
        /// Cells required by the layout
        expected: usize,
        /// Cells in the supplied mask
        actual: usize,
    },

    /// Cell size is zero, negative or not finite
    #[error("cell size must be positive, got {0}")]
    InvalidCellSize(f32),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Parsing failed
    #[error("failed to parse config: {0}")]
    Parse(String),
}
