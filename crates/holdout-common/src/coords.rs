//! Coordinate types for world positions and navigation grid cells.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Default offset added to world positions before cell division.
pub const DEFAULT_GRID_OFFSET: f32 = 1000.0;

/// Default edge length of one grid cell in world units.
pub const DEFAULT_CELL_SIZE: f32 = 10.0;

/// Default grid width in cells.
pub const DEFAULT_GRID_WIDTH: u32 = 200;

/// Default grid height in cells.
pub const DEFAULT_GRID_HEIGHT: u32 = 200;

/// Integer cell coordinate on the navigation grid.
///
/// Coordinates may lie outside a particular grid; bounds are checked by
/// whoever owns the cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl GridCoord {
    /// Creates a new grid coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the coordinate shifted by the given cell offsets.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Returns the eight surrounding coordinates (cardinal and diagonal).
    ///
    /// Order is row by row from the lower-left neighbour, skipping self.
    #[must_use]
    pub const fn neighbors_8(self) -> [Self; 8] {
        [
            self.offset(-1, -1),
            self.offset(0, -1),
            self.offset(1, -1),
            self.offset(-1, 0),
            self.offset(1, 0),
            self.offset(-1, 1),
            self.offset(0, 1),
            self.offset(1, 1),
        ]
    }

    /// Returns true if `other` is one of the eight neighbours of this cell.
    #[must_use]
    pub fn is_adjacent_8(self, other: Self) -> bool {
        self != other && (self.x - other.x).abs() <= 1 && (self.y - other.y).abs() <= 1
    }
}

/// Placement and extent of a navigation grid in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridLayout {
    /// Width in cells
    pub width: u32,
    /// Height in cells
    pub height: u32,
    /// Edge length of a cell in world units
    pub cell_size: f32,
    /// Offset added to world positions before division
    pub offset: f32,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            width: DEFAULT_GRID_WIDTH,
            height: DEFAULT_GRID_HEIGHT,
            cell_size: DEFAULT_CELL_SIZE,
            offset: DEFAULT_GRID_OFFSET,
        }
    }
}

impl GridLayout {
    /// Creates a layout with the default cell size and offset.
    #[must_use]
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Total number of cells.
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Converts a world position into the cell that contains it.
    #[must_use]
    pub fn world_to_grid(&self, world: Vec2) -> GridCoord {
        GridCoord {
            x: ((world.x + self.offset) / self.cell_size).floor() as i32,
            y: ((world.y + self.offset) / self.cell_size).floor() as i32,
        }
    }

    /// Returns the world position of a cell's center.
    #[must_use]
    pub fn grid_to_world(&self, coord: GridCoord) -> Vec2 {
        let half = self.cell_size * 0.5;
        Vec2::new(
            coord.x as f32 * self.cell_size - self.offset + half,
            coord.y as f32 * self.cell_size - self.offset + half,
        )
    }

    /// Checks whether a coordinate lies inside `[0, width) x [0, height)`.
    #[must_use]
    pub const fn contains(&self, coord: GridCoord) -> bool {
        coord.x >= 0 && coord.y >= 0 && (coord.x as u32) < self.width && (coord.y as u32) < self.height
    }

    /// Converts to linear index for array access, `None` when out of range.
    #[must_use]
    pub const fn index_of(&self, coord: GridCoord) -> Option<usize> {
        if self.contains(coord) {
            Some(coord.y as usize * self.width as usize + coord.x as usize)
        } else {
            None
        }
    }

    /// Creates a coordinate from a linear index.
    #[must_use]
    pub const fn coord_of(&self, index: usize) -> GridCoord {
        let width = self.width as usize;
        GridCoord {
            x: (index % width) as i32,
            y: (index / width) as i32,
        }
    }
}
