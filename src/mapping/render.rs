//! Text rendering of the occupancy grid.
//!
//! Occupancy shows as a block-glyph ramp, unobserved cells as `░`, the
//! recorded path as heading arrows, and the world origin as `X`. Rows print
//! top-down with +y at the top.

use super::{OccupancyGrid, UNKNOWN_EPSILON};
use crate::types::CellIndex;

const RAMP: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const UNKNOWN: char = '░';

fn glyph(grid: &OccupancyGrid, cell: CellIndex) -> char {
    if grid.log_odds(cell).abs() < UNKNOWN_EPSILON {
        return UNKNOWN;
    }
    let level = (grid.probability(cell) * RAMP.len() as f32) as usize;
    RAMP[level.min(RAMP.len() - 1)]
}

/// Render the whole stored grid as one multi-line string.
pub fn render_map(grid: &OccupancyGrid) -> String {
    let (rows, cols) = (grid.rows(), grid.cols());
    let min = grid.min_cell();
    let mut canvas = vec![vec![UNKNOWN; cols]; rows];

    for (r, canvas_row) in canvas.iter_mut().enumerate() {
        for (c, slot) in canvas_row.iter_mut().enumerate() {
            *slot = glyph(grid, CellIndex::new(min.row + r as i32, min.col + c as i32));
        }
    }

    for pose in grid.path() {
        let cell = grid.cell_at(pose.x(), pose.y());
        if let Some((r, c)) = grid.storage_offset(cell) {
            canvas[r][c] = pose.heading_arrow();
        }
    }

    if let Some((r, c)) = grid.storage_offset(CellIndex::new(0, 0)) {
        canvas[r][c] = 'X';
    }

    let mut out = String::with_capacity(rows * (cols * 3 + 1));
    for row in canvas.iter().rev() {
        out.extend(row.iter());
        out.push('\n');
    }
    out
}
