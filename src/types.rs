//! Shared vocabulary types: robot pose and grid cell coordinates.

use core::f32::consts::{PI, TAU};
use core::fmt;

use nalgebra::Vector2;

/// Robot pose in world coordinates.
///
/// Positions are in centimeters, headings in radians. Heading 0 points along
/// +x, increasing counter-clockwise (+y at π/2).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Position in centimeters.
    pub position: Vector2<f32>,
    /// Heading in radians.
    pub theta: f32,
}

impl Pose {
    pub fn new(x_cm: f32, y_cm: f32, theta: f32) -> Self {
        Self {
            position: Vector2::new(x_cm, y_cm),
            theta,
        }
    }

    /// Pose at the world origin, facing +x.
    pub fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn x(&self) -> f32 {
        self.position.x
    }

    pub fn y(&self) -> f32 {
        self.position.y
    }

    /// Same position with the heading rotated by `delta` radians.
    pub fn rotated(&self, delta: f32) -> Self {
        Self {
            position: self.position,
            theta: wrap_pi(self.theta + delta),
        }
    }

    /// Arrow glyph for the nearest of the eight compass directions,
    /// used by the map renderer to draw the recorded path.
    pub fn heading_arrow(&self) -> char {
        const ARROWS: [char; 8] = ['→', '↗', '↑', '↖', '←', '↙', '↓', '↘'];
        let sector = (self.theta.rem_euclid(TAU) / (TAU / 8.0)).round() as usize % 8;
        ARROWS[sector]
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.1}cm, {:.1}cm, {:.0}°)",
            self.x(),
            self.y(),
            self.theta.to_degrees()
        )
    }
}

/// Wrap an angle to [-π, π].
pub fn wrap_pi(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI { wrapped - TAU } else { wrapped }
}

/// Absolute grid cell coordinates (row = y axis, col = x axis).
///
/// Cell (0, 0) contains the world origin. Negative rows and columns are
/// valid; the grid grows to cover them on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellIndex {
    pub row: i32,
    pub col: i32,
}

impl CellIndex {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for CellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
