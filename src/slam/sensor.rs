//! Sonar sensor model
//!
//! Three fixed-mount sonars: left (+90°), front (0°), right (−90°). The
//! inverse model (`update_map`) carves free space and marks obstacles in the
//! occupancy grid; the forward model (`likelihood`) scores a range frame
//! against the map for particle weighting.

use core::f32::consts::{FRAC_PI_2, PI};

use crate::error::ConfigError;
use crate::mapping::OccupancyGrid;
use crate::telemetry::SensorFrame;
use crate::types::Pose;

/// Sonar beam and map-update configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorConfig {
    /// Trustworthy measurement range in centimeters.
    pub max_range_cm: f32,
    /// How far a single frame updates the map, in centimeters.
    pub update_range_cm: f32,
    /// Sonar beam opening angle in radians.
    pub cone_angle_rad: f32,
    /// Measurement noise (standard deviation) in centimeters.
    pub sigma_cm: f32,
    /// Fraction of the measured range carved as free space.
    pub free_band: f32,
    /// Log-odds delta for cells at the measured range.
    pub log_odds_hit: f32,
    /// Log-odds delta for cells inside the free band.
    pub log_odds_miss: f32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            max_range_cm: 100.0,
            update_range_cm: 130.0,
            // 50° beam
            cone_angle_rad: 0.872_664_6,
            sigma_cm: 5.0,
            free_band: 0.8,
            // ln(0.7 / 0.3)
            log_odds_hit: 0.847_298,
            log_odds_miss: -0.847_298,
        }
    }
}

impl SensorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_range_cm <= 0.0 || self.update_range_cm <= 0.0 {
            return Err(ConfigError("sensor ranges must be positive".into()));
        }
        if self.cone_angle_rad <= 0.0 || self.cone_angle_rad > 2.0 * PI {
            return Err(ConfigError("cone angle must be in (0, 2π]".into()));
        }
        if self.sigma_cm <= 0.0 {
            return Err(ConfigError("sensor sigma must be positive".into()));
        }
        if !(0.0..1.0).contains(&self.free_band) {
            return Err(ConfigError("free band must be in [0, 1)".into()));
        }
        Ok(())
    }
}

/// Mount angle of each sonar relative to the robot heading, paired with its
/// reading from a frame.
fn measurements(frame: &SensorFrame) -> [(f32, Option<f32>); 3] {
    [
        (FRAC_PI_2, frame.left),
        (0.0, frame.front),
        (-FRAC_PI_2, frame.right),
    ]
}

/// Inverse and forward sonar model.
#[derive(Debug, Clone)]
pub struct SensorModel {
    config: SensorConfig,
}

impl SensorModel {
    pub fn new(config: SensorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Fold one range frame into the map from the given pose.
    ///
    /// Per sonar: an out-of-range or beyond-update-range reading is truncated
    /// to the update range and treated as a miss. Cells closer than
    /// `free_band` of the range are carved free; the remaining cone cells are
    /// marked occupied only for a real hit.
    pub fn update_map(&self, grid: &mut OccupancyGrid, pose: &Pose, frame: &SensorFrame) {
        for (mount_angle, reading) in measurements(frame) {
            let sensor_pose = pose.rotated(mount_angle);
            let (range, hit) = match reading {
                Some(d) if d <= self.config.update_range_cm => (d, true),
                _ => (self.config.update_range_cm, false),
            };

            grid.ensure_covers(sensor_pose.position, range);
            for (cell, distance) in
                grid.cells_in_cone(&sensor_pose, self.config.cone_angle_rad, range)
            {
                if distance < self.config.free_band * range {
                    grid.add_log_odds(cell, self.config.log_odds_miss);
                } else if hit {
                    grid.add_log_odds(cell, self.config.log_odds_hit);
                }
            }
        }
    }

    /// Probability of observing this frame from the given pose.
    ///
    /// Per sonar the expected range is the nearest occupied cell on the
    /// map raytrace. Sonars with no expectation contribute neutrally; an
    /// out-of-range reading against an expectation beyond the sensor reach
    /// is also neutral, otherwise it is scored as a reading at max range.
    pub fn likelihood(&self, grid: &OccupancyGrid, pose: &Pose, frame: &SensorFrame) -> f32 {
        let mut probability = 1.0;
        for (mount_angle, reading) in measurements(frame) {
            let sensor_pose = pose.rotated(mount_angle);
            let front = grid.nearest_obstacles(
                &sensor_pose,
                self.config.cone_angle_rad,
                self.config.update_range_cm,
            );
            let Some(expected) = front.iter().find(|(_, l)| *l > 0.0).map(|(d, _)| *d) else {
                continue;
            };

            let measured = match reading {
                Some(d) => d,
                None if expected > self.config.max_range_cm => continue,
                None => self.config.max_range_cm,
            };
            probability *= normal_pdf(measured, expected, self.config.sigma_cm);
        }
        probability
    }
}

fn normal_pdf(x: f32, mean: f32, sigma: f32) -> f32 {
    let z = (x - mean) / sigma;
    (-0.5 * z * z).exp() / ((2.0 * PI).sqrt() * sigma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::GridConfig;

    fn grid() -> OccupancyGrid {
        OccupancyGrid::new(GridConfig::default()).unwrap()
    }

    fn model() -> SensorModel {
        SensorModel::new(SensorConfig::default()).unwrap()
    }

    fn front_only(range: Option<f32>) -> SensorFrame {
        SensorFrame {
            left: None,
            front: range,
            right: None,
            dt_ms: 50,
        }
    }

    // ========== Inverse Model Tests ==========

    #[test]
    fn hit_marks_cells_at_the_measured_range() {
        let mut g = grid();
        let m = model();
        m.update_map(&mut g, &Pose::origin(), &front_only(Some(50.0)));

        let at_range = g.cell_at(50.0, 0.0);
        assert!(
            g.log_odds(at_range) > 0.0,
            "cell at the echo should be occupied, log-odds {}",
            g.log_odds(at_range)
        );
    }

    #[test]
    fn hit_carves_free_space_in_front_of_the_echo() {
        let mut g = grid();
        let m = model();
        m.update_map(&mut g, &Pose::origin(), &front_only(Some(50.0)));

        let near = g.cell_at(20.0, 0.0);
        assert!(
            g.log_odds(near) < 0.0,
            "cells well inside the range should be free, log-odds {}",
            g.log_odds(near)
        );
    }

    #[test]
    fn out_of_range_carves_without_marking() {
        let mut g = grid();
        let m = model();
        m.update_map(&mut g, &Pose::origin(), &front_only(None));

        let near = g.cell_at(40.0, 0.0);
        assert!(g.log_odds(near) < 0.0, "free band should still be carved");

        let config = m.config();
        let far = g.cell_at(config.update_range_cm - 2.0, 0.0);
        assert!(
            g.log_odds(far) <= 0.0,
            "no obstacle may be marked without an echo"
        );
    }

    #[test]
    fn side_sensors_update_to_the_sides() {
        let mut g = grid();
        let m = model();
        let frame = SensorFrame {
            left: Some(40.0),
            front: None,
            right: Some(40.0),
            dt_ms: 50,
        };
        m.update_map(&mut g, &Pose::origin(), &frame);

        // Left sonar looks along +y, right along -y
        assert!(g.log_odds(g.cell_at(0.0, 40.0)) > 0.0);
        assert!(g.log_odds(g.cell_at(0.0, -40.0)) > 0.0);
    }

    #[test]
    fn repeated_hits_accumulate() {
        let mut g = grid();
        let m = model();
        for _ in 0..3 {
            m.update_map(&mut g, &Pose::origin(), &front_only(Some(50.0)));
        }
        let l = g.log_odds(g.cell_at(50.0, 0.0));
        assert!(
            l > 2.0 * m.config().log_odds_hit,
            "three hits should stack, log-odds {l}"
        );
    }

    // ========== Forward Model Tests ==========

    #[test]
    fn likelihood_is_neutral_on_an_empty_map() {
        let g = grid();
        let m = model();
        let p = m.likelihood(&g, &Pose::origin(), &front_only(Some(50.0)));
        assert!((p - 1.0).abs() < 1e-6, "no expectation, no penalty: {p}");
    }

    #[test]
    fn matching_measurement_beats_a_conflicting_one() {
        let mut g = grid();
        let m = model();
        // Teach the map an obstacle 50cm ahead
        for _ in 0..3 {
            m.update_map(&mut g, &Pose::origin(), &front_only(Some(50.0)));
        }

        let good = m.likelihood(&g, &Pose::origin(), &front_only(Some(50.0)));
        let bad = m.likelihood(&g, &Pose::origin(), &front_only(Some(90.0)));
        assert!(
            good > bad,
            "agreeing frame must score higher ({good} vs {bad})"
        );
    }

    #[test]
    fn out_of_range_with_far_expectation_is_neutral() {
        let mut g = grid();
        let m = model();
        // Obstacle beyond the sensor's trusted range
        let cell = g.cell_at(120.0, 0.0);
        g.add_log_odds(cell, 2.0);

        let p = m.likelihood(&g, &Pose::origin(), &front_only(None));
        assert!(
            (p - 1.0).abs() < 1e-6,
            "an echo the sensor cannot see should not be penalized: {p}"
        );
    }

    #[test]
    fn out_of_range_with_near_expectation_is_penalized() {
        let mut g = grid();
        let m = model();
        for _ in 0..3 {
            m.update_map(&mut g, &Pose::origin(), &front_only(Some(40.0)));
        }

        let p = m.likelihood(&g, &Pose::origin(), &front_only(None));
        assert!(
            p < 1e-6,
            "seeing nothing where the map has a close wall is unlikely: {p}"
        );
    }

    #[test]
    fn likelihood_is_always_positive() {
        let mut g = grid();
        let m = model();
        for _ in 0..3 {
            m.update_map(&mut g, &Pose::origin(), &front_only(Some(30.0)));
        }
        let frame = SensorFrame {
            left: Some(10.0),
            front: Some(40.0),
            right: Some(10.0),
            dt_ms: 10,
        };
        let p = m.likelihood(&g, &Pose::origin(), &frame);
        assert!(p > 0.0 && p.is_finite());
    }

    // ========== pdf ==========

    #[test]
    fn normal_pdf_peaks_at_the_mean() {
        let peak = normal_pdf(50.0, 50.0, 5.0);
        assert!(peak > normal_pdf(55.0, 50.0, 5.0));
        assert!(peak > normal_pdf(45.0, 50.0, 5.0));
        assert!((peak - 1.0 / ((2.0 * PI).sqrt() * 5.0)).abs() < 1e-6);
    }
}
