//! Navigation grid: dense cell storage with walkability and occupancy.
//!
//! The grid is built once per level from a rasterized walkability mask and
//! then shared by every agent. `walkable` never changes after construction.
//! `occupied` is a plain flag: occupying twice and releasing once leaves the
//! cell free, so callers pair their own calls.

use glam::Vec2;
use holdout_common::{GridCoord, GridError, GridLayout};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Result type for grid construction.
pub type GridResult<T> = Result<T, GridError>;

/// Row-major walkability flags covering a whole grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkableMask {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl WalkableMask {
    /// Creates a mask with every cell walkable.
    #[must_use]
    pub fn all_walkable(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![true; width as usize * height as usize],
        }
    }

    /// Creates a mask from raw row-major flags.
    pub fn from_cells(width: u32, height: u32, cells: Vec<bool>) -> GridResult<Self> {
        let expected = width as usize * height as usize;
        if cells.len() != expected {
            return Err(GridError::MaskSizeMismatch {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Mask width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Mask height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Walkability of a cell; out-of-range cells read as blocked.
    #[must_use]
    pub fn is_walkable(&self, coord: GridCoord) -> bool {
        self.index_of(coord)
            .and_then(|index| self.cells.get(index))
            .copied()
            .unwrap_or(false)
    }

    /// Marks a cell as blocked. Out-of-range cells are ignored.
    pub fn block(&mut self, coord: GridCoord) {
        if let Some(index) = self.index_of(coord) {
            self.cells[index] = false;
        }
    }

    /// Number of blocked cells.
    #[must_use]
    pub fn blocked_count(&self) -> usize {
        self.cells.iter().filter(|walkable| !**walkable).count()
    }

    fn index_of(&self, coord: GridCoord) -> Option<usize> {
        if coord.x < 0 || coord.y < 0 {
            return None;
        }
        let (x, y) = (coord.x as u32, coord.y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }
}

/// A single grid cell with its search bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathNode {
    coord: GridCoord,
    walkable: bool,
    occupied: bool,
    /// Cost from the search start, `u32::MAX` when unreached
    pub(crate) g_cost: u32,
    /// Heuristic cost to the search goal
    pub(crate) h_cost: u32,
    /// Index of the node this one was reached from
    pub(crate) predecessor: Option<usize>,
}

impl PathNode {
    fn new(coord: GridCoord, walkable: bool) -> Self {
        Self {
            coord,
            walkable,
            occupied: false,
            g_cost: u32::MAX,
            h_cost: 0,
            predecessor: None,
        }
    }

    /// Cell coordinate.
    #[must_use]
    pub const fn coord(&self) -> GridCoord {
        self.coord
    }

    /// Whether static geometry allows standing here.
    #[must_use]
    pub const fn is_walkable(&self) -> bool {
        self.walkable
    }

    /// Whether an agent currently claims this cell.
    #[must_use]
    pub const fn is_occupied(&self) -> bool {
        self.occupied
    }

    /// Walkable and not claimed.
    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.walkable && !self.occupied
    }

    /// Cost from the last search's start.
    #[must_use]
    pub const fn g_cost(&self) -> u32 {
        self.g_cost
    }

    /// Heuristic cost to the last search's goal.
    #[must_use]
    pub const fn h_cost(&self) -> u32 {
        self.h_cost
    }

    /// Total estimated cost, `g + h`.
    #[must_use]
    pub const fn f_cost(&self) -> u32 {
        self.g_cost.saturating_add(self.h_cost)
    }

    fn reset_search(&mut self) {
        self.g_cost = u32::MAX;
        self.h_cost = 0;
        self.predecessor = None;
    }
}

/// Dense 2D array of path nodes shared by every agent on a level.
#[derive(Debug, Clone)]
pub struct NavGrid {
    layout: GridLayout,
    nodes: Vec<PathNode>,
}

impl NavGrid {
    /// Builds the grid from a layout and a precomputed walkability mask.
    pub fn new(layout: GridLayout, mask: &WalkableMask) -> GridResult<Self> {
        if layout.width == 0 || layout.height == 0 {
            return Err(GridError::EmptyGrid {
                width: layout.width,
                height: layout.height,
            });
        }
        if !(layout.cell_size.is_finite() && layout.cell_size > 0.0) {
            return Err(GridError::InvalidCellSize(layout.cell_size));
        }
        if mask.width != layout.width || mask.height != layout.height {
            return Err(GridError::MaskSizeMismatch {
                expected: layout.cell_count(),
                actual: mask.cells.len(),
            });
        }

        let nodes = mask
            .cells
            .iter()
            .enumerate()
            .map(|(index, walkable)| PathNode::new(layout.coord_of(index), *walkable))
            .collect();

        info!(
            width = layout.width,
            height = layout.height,
            blocked = mask.blocked_count(),
            "navigation grid built"
        );

        Ok(Self { layout, nodes })
    }

    /// Builds an all-walkable grid.
    pub fn open(layout: GridLayout) -> GridResult<Self> {
        Self::new(layout, &WalkableMask::all_walkable(layout.width, layout.height))
    }

    /// Grid placement and extent.
    #[must_use]
    pub const fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.layout.width
    }

    /// Height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.layout.height
    }

    /// Converts a world position into its cell coordinate.
    #[must_use]
    pub fn world_to_grid(&self, world: Vec2) -> GridCoord {
        self.layout.world_to_grid(world)
    }

    /// Returns the world-space center of a cell.
    #[must_use]
    pub fn grid_to_world(&self, coord: GridCoord) -> Vec2 {
        self.layout.grid_to_world(coord)
    }

    /// Looks up a node, `None` outside `[0, width) x [0, height)`.
    #[must_use]
    pub fn node(&self, coord: GridCoord) -> Option<&PathNode> {
        self.layout.index_of(coord).and_then(|index| self.nodes.get(index))
    }

    /// Marks a cell as claimed. No-op out of range.
    pub fn occupy_node(&mut self, coord: GridCoord) {
        if let Some(node) = self.node_mut(coord) {
            node.occupied = true;
        }
    }

    /// Clears a cell's claim. No-op out of range.
    pub fn unoccupy_node(&mut self, coord: GridCoord) {
        if let Some(node) = self.node_mut(coord) {
            node.occupied = false;
        }
    }

    /// Whether the cell exists and is walkable.
    #[must_use]
    pub fn is_walkable(&self, coord: GridCoord) -> bool {
        self.node(coord).is_some_and(PathNode::is_walkable)
    }

    /// Whether the cell exists, is walkable and unclaimed.
    #[must_use]
    pub fn is_free(&self, coord: GridCoord) -> bool {
        self.node(coord).is_some_and(PathNode::is_free)
    }

    /// Number of claimed cells.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.occupied).count()
    }

    pub(crate) fn index_of(&self, coord: GridCoord) -> Option<usize> {
        self.layout.index_of(coord)
    }

    pub(crate) fn node_at(&self, index: usize) -> &PathNode {
        &self.nodes[index]
    }

    pub(crate) fn node_at_mut(&mut self, index: usize) -> &mut PathNode {
        &mut self.nodes[index]
    }

    /// Clears search scratch on every node.
    pub(crate) fn reset_search_state(&mut self) {
        for node in &mut self.nodes {
            node.reset_search();
        }
    }

    fn node_mut(&mut self, coord: GridCoord) -> Option<&mut PathNode> {
        let index = self.layout.index_of(coord)?;
        self.nodes.get_mut(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_layout() -> GridLayout {
        GridLayout::with_size(8, 6)
    }

    #[test]
    fn test_grid_rejects_mismatched_mask() {
        let mask = WalkableMask::all_walkable(4, 4);
        let err = NavGrid::new(small_layout(), &mask).expect_err("size mismatch");
        assert!(matches!(err, GridError::MaskSizeMismatch { expected: 48, .. }));
    }

    #[test]
    fn test_grid_rejects_empty_layout() {
        let layout = GridLayout::with_size(0, 3);
        let err = NavGrid::open(layout).expect_err("empty grid");
        assert!(matches!(err, GridError::EmptyGrid { .. }));
    }

    #[test]
    fn test_mask_from_cells_checks_length() {
        assert!(WalkableMask::from_cells(2, 2, vec![true; 3]).is_err());
        let mask = WalkableMask::from_cells(2, 2, vec![true, false, true, true]).expect("mask");
        assert!(!mask.is_walkable(GridCoord::new(1, 0)));
        assert!(mask.is_walkable(GridCoord::new(0, 1)));
    }

    #[test]
    fn test_node_lookup_out_of_range() {
        let grid = NavGrid::open(small_layout()).expect("grid");
        assert!(grid.node(GridCoord::new(0, 0)).is_some());
        assert!(grid.node(GridCoord::new(7, 5)).is_some());
        assert!(grid.node(GridCoord::new(8, 0)).is_none());
        assert!(grid.node(GridCoord::new(0, -1)).is_none());
    }

    #[test]
    fn test_walkable_flags_follow_mask() {
        let mut mask = WalkableMask::all_walkable(8, 6);
        mask.block(GridCoord::new(2, 3));
        let grid = NavGrid::new(small_layout(), &mask).expect("grid");
        assert!(!grid.is_walkable(GridCoord::new(2, 3)));
        assert!(grid.is_walkable(GridCoord::new(3, 2)));
    }

    #[test]
    fn test_occupancy_is_flag_not_counter() {
        let mut grid = NavGrid::open(small_layout()).expect("grid");
        let cell = GridCoord::new(3, 3);
        grid.occupy_node(cell);
        grid.occupy_node(cell);
        assert!(grid.node(cell).expect("node").is_occupied());
        grid.unoccupy_node(cell);
        assert!(!grid.node(cell).expect("node").is_occupied());
        assert_eq!(grid.occupied_count(), 0);
    }

    #[test]
    fn test_occupancy_out_of_range_is_noop() {
        let mut grid = NavGrid::open(small_layout()).expect("grid");
        grid.occupy_node(GridCoord::new(-4, 2));
        grid.occupy_node(GridCoord::new(100, 100));
        grid.unoccupy_node(GridCoord::new(100, 100));
        assert_eq!(grid.occupied_count(), 0);
    }

    #[test]
    fn test_f_cost_is_sum() {
        let mut grid = NavGrid::open(small_layout()).expect("grid");
        let index = grid.index_of(GridCoord::new(1, 1)).expect("index");
        let node = grid.node_at_mut(index);
        node.g_cost = 24;
        node.h_cost = 30;
        assert_eq!(grid.node_at(index).f_cost(), 54);
        grid.reset_search_state();
        assert_eq!(grid.node_at(index).g_cost(), u32::MAX);
        assert!(grid.node_at(index).predecessor.is_none());
    }
}
