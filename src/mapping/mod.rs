//! Log-odds occupancy grid
//!
//! The map keeps one dense grid of log-odds occupancy values and grows it in
//! whole blocks whenever an update touches cells outside the current bounds,
//! so world coordinates are unbounded in every direction without
//! preallocating memory. Cell (0, 0) contains the world origin.
//!
//! # Coordinate System
//!
//! World positions are in centimeters, +x right and +y up. Cells are
//! addressed by absolute [`CellIndex`] (row = y, col = x, both signed);
//! `cell_at` / `cell_center` convert between the two and are exact inverses
//! on cell centers.

mod render;

pub use render::render_map;

use nalgebra::Vector2;

use crate::error::ConfigError;
use crate::types::{CellIndex, Pose, wrap_pi};

/// Log-odds magnitude below which a cell counts as unobserved.
pub const UNKNOWN_EPSILON: f32 = 1e-3;

/// Grid geometry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridConfig {
    /// Growth granularity in centimeters. The grid is extended by whole
    /// blocks at a time.
    pub block_size_cm: u32,
    /// Edge length of one cell in centimeters.
    pub cell_size_cm: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        // Blocks of 1 m, cells of 5 cm.
        Self {
            block_size_cm: 100,
            cell_size_cm: 5,
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size_cm <= 1 {
            return Err(ConfigError("block size must be > 1 cm".into()));
        }
        if self.cell_size_cm == 0 {
            return Err(ConfigError("cell size must be > 0 cm".into()));
        }
        if self.block_size_cm <= self.cell_size_cm {
            return Err(ConfigError("block size must be larger than cell size".into()));
        }
        if self.block_size_cm % self.cell_size_cm != 0 {
            return Err(ConfigError(
                "block size must be a multiple of cell size".into(),
            ));
        }
        Ok(())
    }

    fn cells_per_block(&self) -> i32 {
        (self.block_size_cm / self.cell_size_cm) as i32
    }
}

/// Growable log-odds occupancy grid with the recorded robot path.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    config: GridConfig,
    cells: Vec<f32>,
    rows: usize,
    cols: usize,
    /// Absolute coordinates of the storage cell at row 0, col 0.
    min_cell: CellIndex,
    path: Vec<Pose>,
}

impl OccupancyGrid {
    /// Create an empty grid covering one block in every direction around the
    /// origin.
    pub fn new(config: GridConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let cpb = config.cells_per_block();
        let rows = (2 * cpb) as usize;
        Ok(Self {
            config,
            cells: vec![0.0; rows * rows],
            rows,
            cols: rows,
            min_cell: CellIndex::new(-cpb, -cpb),
            path: Vec::new(),
        })
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn min_cell(&self) -> CellIndex {
        self.min_cell
    }

    fn cell_size(&self) -> f32 {
        self.config.cell_size_cm as f32
    }

    /// Cell containing the world position (nearest cell center).
    pub fn cell_at(&self, x_cm: f32, y_cm: f32) -> CellIndex {
        CellIndex::new(
            (y_cm / self.cell_size()).round() as i32,
            (x_cm / self.cell_size()).round() as i32,
        )
    }

    /// World position of a cell center.
    pub fn cell_center(&self, cell: CellIndex) -> Vector2<f32> {
        Vector2::new(
            cell.col as f32 * self.cell_size(),
            cell.row as f32 * self.cell_size(),
        )
    }

    pub(crate) fn storage_offset(&self, cell: CellIndex) -> Option<(usize, usize)> {
        let r = cell.row - self.min_cell.row;
        let c = cell.col - self.min_cell.col;
        if r < 0 || c < 0 || r as usize >= self.rows || c as usize >= self.cols {
            return None;
        }
        Some((r as usize, c as usize))
    }

    fn index(&self, cell: CellIndex) -> Option<usize> {
        self.storage_offset(cell).map(|(r, c)| r * self.cols + c)
    }

    /// Log-odds occupancy of a cell. Cells outside the stored area are
    /// unobserved and read as 0.0.
    pub fn log_odds(&self, cell: CellIndex) -> f32 {
        self.index(cell).map_or(0.0, |i| self.cells[i])
    }

    /// Occupancy probability of a cell.
    pub fn probability(&self, cell: CellIndex) -> f32 {
        // Clamp before exp so saturated cells don't overflow.
        1.0 - 1.0 / (1.0 + self.log_odds(cell).min(500.0).exp())
    }

    /// Accumulate a log-odds delta, growing the grid if needed.
    pub fn add_log_odds(&mut self, cell: CellIndex, delta: f32) {
        self.ensure_contains(cell);
        let i = self.index(cell).expect("cell present after growth");
        self.cells[i] += delta;
    }

    /// Grow the grid so the disc of `radius_cm` around `center` is stored.
    pub fn ensure_covers(&mut self, center: Vector2<f32>, radius_cm: f32) {
        let margin = radius_cm + self.cell_size();
        self.ensure_contains(self.cell_at(center.x - margin, center.y - margin));
        self.ensure_contains(self.cell_at(center.x + margin, center.y + margin));
    }

    fn ensure_contains(&mut self, cell: CellIndex) {
        if self.index(cell).is_some() {
            return;
        }
        let cpb = self.config.cells_per_block();
        let block_floor = |v: i32| v.div_euclid(cpb) * cpb;

        let old_max_row = self.min_cell.row + self.rows as i32;
        let old_max_col = self.min_cell.col + self.cols as i32;
        let new_min = CellIndex::new(
            self.min_cell.row.min(block_floor(cell.row)),
            self.min_cell.col.min(block_floor(cell.col)),
        );
        let new_max_row = old_max_row.max(block_floor(cell.row) + cpb);
        let new_max_col = old_max_col.max(block_floor(cell.col) + cpb);

        let new_rows = (new_max_row - new_min.row) as usize;
        let new_cols = (new_max_col - new_min.col) as usize;
        let mut new_cells = vec![0.0; new_rows * new_cols];

        let row_offset = (self.min_cell.row - new_min.row) as usize;
        let col_offset = (self.min_cell.col - new_min.col) as usize;
        for r in 0..self.rows {
            let src = r * self.cols;
            let dst = (r + row_offset) * new_cols + col_offset;
            new_cells[dst..dst + self.cols].copy_from_slice(&self.cells[src..src + self.cols]);
        }

        self.cells = new_cells;
        self.rows = new_rows;
        self.cols = new_cols;
        self.min_cell = new_min;
    }

    /// Cells whose center lies inside the view cone, with their distance to
    /// the apex.
    ///
    /// The cone opens `cone_angle / 2` radians to each side of the pose
    /// heading and reaches `radius_cm` from the apex. Pure geometry: the
    /// result may name cells the grid does not store yet (those read as
    /// unobserved).
    pub fn cells_in_cone(
        &self,
        pose: &Pose,
        cone_angle: f32,
        radius_cm: f32,
    ) -> Vec<(CellIndex, f32)> {
        let half_angle = cone_angle / 2.0;
        let margin = radius_cm + self.cell_size();
        let lo = self.cell_at(pose.x() - margin, pose.y() - margin);
        let hi = self.cell_at(pose.x() + margin, pose.y() + margin);

        let mut cells = Vec::new();
        for row in lo.row..=hi.row {
            for col in lo.col..=hi.col {
                let cell = CellIndex::new(row, col);
                let rel = self.cell_center(cell) - pose.position;
                let distance = rel.norm();
                if distance > radius_cm {
                    continue;
                }
                let rel_angle = wrap_pi(rel.y.atan2(rel.x) - pose.theta);
                if rel_angle.abs() <= half_angle {
                    cells.push((cell, distance));
                }
            }
        }
        cells
    }

    /// Pareto front of `(distance, log_odds)` over the view cone, sorted by
    /// distance with strictly increasing log-odds. Unobserved cells are
    /// skipped. The first entry with positive log-odds is the nearest thing
    /// that looks like an obstacle.
    pub fn nearest_obstacles(
        &self,
        pose: &Pose,
        cone_angle: f32,
        radius_cm: f32,
    ) -> Vec<(f32, f32)> {
        let mut cells = self.cells_in_cone(pose, cone_angle, radius_cm);
        cells.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut front = Vec::new();
        let mut best = f32::NEG_INFINITY;
        for (cell, distance) in cells {
            let l = self.log_odds(cell);
            if l.abs() < UNKNOWN_EPSILON {
                continue;
            }
            if l > best {
                best = l;
                front.push((distance, l));
            }
        }
        front
    }

    /// Record a pose on the robot path (drawn by the renderer).
    pub fn record_pose(&mut self, pose: Pose) {
        self.path.push(pose);
    }

    pub fn path(&self) -> &[Pose] {
        &self.path
    }
}
