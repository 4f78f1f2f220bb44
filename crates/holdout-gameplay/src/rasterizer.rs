//! One-shot conversion of static obstacle bounds into a walkability mask.
//!
//! Runs once at level load. Each active full or half obstacle blocks every
//! cell in the rectangle spanned by its bounding box corners. Doors stay
//! walkable; they are handled by line queries instead.

use holdout_common::{GridCoord, GridLayout};
use tracing::{debug, info};

use crate::grid::WalkableMask;
use crate::scene::{Obstacle, ObstacleKind};

/// Inclusive cell span covered by an obstacle, clamped to the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSpan {
    /// Lower-left cell
    pub min: GridCoord,
    /// Upper-right cell
    pub max: GridCoord,
}

impl CellSpan {
    /// Number of cells in the span.
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        ((self.max.x - self.min.x + 1) * (self.max.y - self.min.y + 1)) as usize
    }
}

/// Computes the cell span of an obstacle, `None` if it misses the grid.
#[must_use]
pub fn obstacle_span(layout: &GridLayout, obstacle: &Obstacle) -> Option<CellSpan> {
    let cells = obstacle.bounds.corners().map(|corner| layout.world_to_grid(corner));
    let min_x = cells.iter().map(|c| c.x).min()?;
    let max_x = cells.iter().map(|c| c.x).max()?;
    let min_y = cells.iter().map(|c| c.y).min()?;
    let max_y = cells.iter().map(|c| c.y).max()?;

    let last_x = layout.width as i32 - 1;
    let last_y = layout.height as i32 - 1;
    if max_x < 0 || max_y < 0 || min_x > last_x || min_y > last_y {
        return None;
    }

    Some(CellSpan {
        min: GridCoord::new(min_x.max(0), min_y.max(0)),
        max: GridCoord::new(max_x.min(last_x), max_y.min(last_y)),
    })
}

/// Whether an obstacle takes part in rasterization.
#[must_use]
pub fn blocks_walking(obstacle: &Obstacle) -> bool {
    obstacle.active && matches!(obstacle.kind, ObstacleKind::Full | ObstacleKind::Half)
}

/// Builds the walkability mask for a level.
#[must_use]
pub fn rasterize<'a, I>(layout: &GridLayout, obstacles: I) -> WalkableMask
where
    I: IntoIterator<Item = &'a Obstacle>,
{
    let mut mask = WalkableMask::all_walkable(layout.width, layout.height);
    let mut rasterized = 0usize;

    for obstacle in obstacles.into_iter().filter(|o| blocks_walking(o)) {
        let Some(span) = obstacle_span(layout, obstacle) else {
            debug!(?obstacle.bounds, "obstacle outside grid, skipped");
            continue;
        };
        for y in span.min.y..=span.max.y {
            for x in span.min.x..=span.max.x {
                mask.block(GridCoord::new(x, y));
            }
        }
        rasterized += 1;
    }

    info!(
        obstacles = rasterized,
        blocked = mask.blocked_count(),
        "walkability mask rasterized"
    );
    mask
}
