//! A* search over the navigation grid.
//!
//! The search is 8-connected and uses the octile distance both as edge cost
//! and as heuristic (10 per cardinal step, 14 per diagonal step). The open
//! set is a plain list scanned for the lowest f-cost; ties go to the lower
//! h-cost, then to the node that entered the list first.
//!
//! Paths leave out the start cell: the caller is already standing in it.
//!
//! Occupancy only matters for the goal: a blocked or claimed goal is swapped
//! for a free neighbour before searching. Cells along the way are judged on
//! walkability alone.

use ahash::AHashSet;
use fastrand::Rng;
use glam::Vec2;
use holdout_common::{GridCoord, GridLayout};
use tracing::{debug, trace};

use crate::grid::{GridResult, NavGrid, WalkableMask};
use crate::scene::{LayerMask, SceneQuery};

/// Cost of one cardinal step.
pub const CARDINAL_COST: u32 = 10;

/// Cost of one diagonal step.
pub const DIAGONAL_COST: u32 = 14;

/// Maximum per-axis jitter applied to the last waypoint of an ideal path.
pub const GOAL_JITTER: f32 = 0.5;

/// Octile distance between two cells.
#[must_use]
pub fn octile_distance(a: GridCoord, b: GridCoord) -> u32 {
    let dx = a.x.abs_diff(b.x);
    let dy = a.y.abs_diff(b.y);
    dx.min(dy) * DIAGONAL_COST + dx.abs_diff(dy) * CARDINAL_COST
}

/// Grid plus search: one instance per level, handed to every agent.
#[derive(Debug, Clone)]
pub struct PathFinder {
    grid: NavGrid,
}

impl PathFinder {
    /// Builds the level's grid from its dimensions and walkability mask.
    pub fn new(layout: GridLayout, mask: &WalkableMask) -> GridResult<Self> {
        Ok(Self {
            grid: NavGrid::new(layout, mask)?,
        })
    }

    /// Wraps an existing grid.
    #[must_use]
    pub fn from_grid(grid: NavGrid) -> Self {
        Self { grid }
    }

    /// The underlying grid.
    #[must_use]
    pub fn grid(&self) -> &NavGrid {
        &self.grid
    }

    /// Mutable access for occupancy updates.
    pub fn grid_mut(&mut self) -> &mut NavGrid {
        &mut self.grid
    }

    /// Picks the cell a search should actually head for.
    ///
    /// A free goal is kept. Otherwise the first free 8-neighbour is used.
    /// Returns `None` when the goal is off the grid or boxed in.
    #[must_use]
    pub fn resolve_goal(&self, goal: GridCoord) -> Option<GridCoord> {
        self.grid.node(goal)?;
        if self.grid.is_free(goal) {
            return Some(goal);
        }
        goal.neighbors_8()
            .into_iter()
            .find(|neighbor| self.grid.is_free(*neighbor))
    }

    /// Finds a cell path from the cell after `start` to the goal.
    ///
    /// When start and goal are the same cell the path is that single cell.
    pub fn find_cell_path(&mut self, start: GridCoord, goal: GridCoord) -> Option<Vec<GridCoord>> {
        let Some(start_index) = self.grid.index_of(start) else {
            debug!(?start, "path start off grid");
            return None;
        };
        if !self.grid.node_at(start_index).is_walkable() {
            debug!(?start, "path start not walkable");
            return None;
        }
        let Some(goal) = self.resolve_goal(goal) else {
            debug!(?goal, "path goal has no free cell");
            return None;
        };
        let goal_index = self.grid.index_of(goal)?;

        self.grid.reset_search_state();
        {
            let node = self.grid.node_at_mut(start_index);
            node.g_cost = 0;
            node.h_cost = octile_distance(start, goal);
        }

        let mut open: Vec<usize> = vec![start_index];
        let mut closed: AHashSet<usize> = AHashSet::new();

        while !open.is_empty() {
            let best = self.lowest_f_cost(&open);
            let current_index = open[best];
            if current_index == goal_index {
                let path = self.reconstruct(start_index, goal_index);
                trace!(?start, ?goal, cells = path.as_ref().map_or(0, Vec::len), "path found");
                return path;
            }

            open.remove(best);
            closed.insert(current_index);

            let current = self.grid.node_at(current_index);
            let current_coord = current.coord();
            let current_g = current.g_cost;

            for neighbor in current_coord.neighbors_8() {
                let Some(neighbor_index) = self.grid.index_of(neighbor) else {
                    continue;
                };
                if closed.contains(&neighbor_index) {
                    continue;
                }
                if !self.grid.node_at(neighbor_index).is_walkable() {
                    closed.insert(neighbor_index);
                    continue;
                }

                let tentative_g = current_g.saturating_add(octile_distance(current_coord, neighbor));
                let node = self.grid.node_at_mut(neighbor_index);
                if tentative_g < node.g_cost {
                    node.predecessor = Some(current_index);
                    node.g_cost = tentative_g;
                    node.h_cost = octile_distance(neighbor, goal);
                    if !open.contains(&neighbor_index) {
                        open.push(neighbor_index);
                    }
                }
            }
        }

        debug!(?start, ?goal, "open set exhausted, goal unreachable");
        None
    }

    /// Finds a grid-aligned path between two world positions.
    ///
    /// Waypoints are cell centers from the first step to the (possibly
    /// substituted) goal cell.
    pub fn find_path(&mut self, start: Vec2, end: Vec2) -> Option<Vec<Vec2>> {
        let start_cell = self.grid.world_to_grid(start);
        let end_cell = self.grid.world_to_grid(end);
        let cells = self.find_cell_path(start_cell, end_cell)?;
        Some(cells.into_iter().map(|c| self.grid.grid_to_world(c)).collect())
    }

    /// Finds a path, straightens it against the scene and jitters the goal.
    pub fn find_ideal_path<S>(
        &mut self,
        start: Vec2,
        end: Vec2,
        scene: &S,
        rng: &mut Rng,
    ) -> Option<Vec<Vec2>>
    where
        S: SceneQuery + ?Sized,
    {
        let mut path = self.find_path(start, end)?;
        smooth_path(&mut path, scene);
        if let Some(last) = path.last_mut() {
            *last += Vec2::new(
                (rng.f32() * 2.0 - 1.0) * GOAL_JITTER,
                (rng.f32() * 2.0 - 1.0) * GOAL_JITTER,
            );
        }
        Some(path)
    }

    fn lowest_f_cost(&self, open: &[usize]) -> usize {
        let mut best = 0;
        for (position, index) in open.iter().enumerate().skip(1) {
            let node = self.grid.node_at(*index);
            let current = self.grid.node_at(open[best]);
            if node.f_cost() < current.f_cost()
                || (node.f_cost() == current.f_cost() && node.h_cost() < current.h_cost())
            {
                best = position;
            }
        }
        best
    }

    fn reconstruct(&self, start_index: usize, goal_index: usize) -> Option<Vec<GridCoord>> {
        let limit = self.grid.layout().cell_count();
        let mut cursor = goal_index;
        let mut cells = vec![self.grid.node_at(cursor).coord()];
        while cursor != start_index {
            cursor = self.grid.node_at(cursor).predecessor?;
            if cursor == start_index {
                break;
            }
            cells.push(self.grid.node_at(cursor).coord());
            if cells.len() > limit {
                return None;
            }
        }
        cells.reverse();
        Some(cells)
    }
}

/// Removes waypoints that a straight segment can skip.
///
/// Tries a clear line from each waypoint in turn to the last one; the first
/// clear line replaces everything between its ends.
pub fn smooth_path<S>(path: &mut Vec<Vec2>, scene: &S)
where
    S: SceneQuery + ?Sized,
{
    if path.len() < 3 {
        return;
    }
    let last = path.len() - 1;
    for from in 0..last - 1 {
        if !scene.linecast(path[from], path[last], LayerMask::PATH_BLOCKING) {
            path.drain(from + 1..last);
            return;
        }
    }
}
