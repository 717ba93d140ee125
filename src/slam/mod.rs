//! SLAM subsystem
//!
//! Combines the occupancy grid, the sampled motion model, the sonar sensor
//! model, and the particle filter into one pipeline fed by telemetry frames:
//!
//! ```text
//!            TelemetryFrame
//!                  │
//!       ┌──────────┴──────────┐
//!       ▼ Motion              ▼ Sensor
//!  filter.predict()      filter.weigh() ──▶ estimate ──▶ map update
//! ```
//!
//! Odometry frames move the particles; range frames weigh them against the
//! map, and the map is then updated from the estimated pose.

pub mod filter;
pub mod motion;
pub mod sensor;

pub use filter::{FilterConfig, Particle, ParticleFilter};
pub use motion::{MotionConfig, MotionModel};
pub use sensor::{SensorConfig, SensorModel};

use crate::error::ConfigError;
use crate::mapping::{GridConfig, OccupancyGrid, render_map};
use crate::telemetry::TelemetryFrame;
use crate::types::Pose;

/// Top-level SLAM configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlamConfig {
    pub grid: GridConfig,
    pub sensor: SensorConfig,
    pub motion: MotionConfig,
    pub filter: FilterConfig,
}

impl SlamConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        self.sensor.validate()?;
        self.motion.validate()?;
        self.filter.validate()
    }
}

/// Frame counters for the console status line.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlamStats {
    /// Sonar range frames processed.
    pub sensor_frames: u64,
    /// Odometry frames processed.
    pub motion_frames: u64,
    /// Particle resampling events.
    pub resamples: u64,
}

/// The SLAM pipeline: owns the map, the particle filter, and the sensor
/// model, and consumes parsed telemetry frames.
#[derive(Debug)]
pub struct SlamPipeline {
    grid: OccupancyGrid,
    filter: ParticleFilter,
    sensors: SensorModel,
    stats: SlamStats,
}

impl SlamPipeline {
    pub fn new(config: SlamConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            grid: OccupancyGrid::new(config.grid)?,
            filter: ParticleFilter::new(config.filter, config.motion)?,
            sensors: SensorModel::new(config.sensor)?,
            stats: SlamStats::default(),
        })
    }

    /// Feed one telemetry frame through the pipeline.
    pub fn handle(&mut self, frame: &TelemetryFrame) {
        match frame {
            TelemetryFrame::Motion(motion) => {
                self.filter.predict(motion);
                self.stats.motion_frames += 1;
            }
            TelemetryFrame::Sensor(sensor) => {
                self.filter.weigh(&self.grid, &self.sensors, sensor);
                let estimate = self.filter.estimate();
                self.sensors.update_map(&mut self.grid, &estimate, sensor);
                self.grid.record_pose(estimate);
                self.stats.sensor_frames += 1;
            }
        }
        self.stats.resamples = self.filter.resamples();
    }

    /// Current pose estimate.
    pub fn estimate(&self) -> Pose {
        self.filter.estimate()
    }

    pub fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    pub fn stats(&self) -> SlamStats {
        self.stats
    }

    /// Render the current map with the traveled path.
    pub fn render_map(&self) -> String {
        render_map(&self.grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{MotionFrame, SensorFrame};

    fn pipeline() -> SlamPipeline {
        let config = SlamConfig {
            filter: FilterConfig {
                particle_count: 40,
                seed: Some(7),
                ..FilterConfig::default()
            },
            ..SlamConfig::default()
        };
        SlamPipeline::new(config).unwrap()
    }

    fn sensor(front: Option<f32>) -> TelemetryFrame {
        TelemetryFrame::Sensor(SensorFrame {
            left: None,
            front,
            right: None,
            dt_ms: 50,
        })
    }

    fn motion(ticks: i32) -> TelemetryFrame {
        TelemetryFrame::Motion(MotionFrame {
            left_ticks: ticks,
            right_ticks: ticks,
            correction: 0,
            dt_ms: 100,
        })
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SlamConfig {
            grid: GridConfig {
                block_size_cm: 100,
                cell_size_cm: 7,
            },
            ..SlamConfig::default()
        };
        assert!(SlamPipeline::new(config).is_err());
    }

    #[test]
    fn sensor_frames_build_the_map() {
        let mut p = pipeline();
        p.handle(&sensor(Some(50.0)));

        let grid = p.grid();
        let wall = grid.cell_at(50.0, 0.0);
        assert!(grid.log_odds(wall) > 0.0, "wall should appear on the map");
        assert_eq!(p.stats().sensor_frames, 1);
    }

    #[test]
    fn motion_frames_advance_the_estimate() {
        let mut p = pipeline();
        p.handle(&motion(300));
        let estimate = p.estimate();
        assert!(
            (estimate.x() - 30.0).abs() < 5.0,
            "estimate x = {}",
            estimate.x()
        );
        assert_eq!(p.stats().motion_frames, 1);
    }

    #[test]
    fn sensor_frames_record_the_path() {
        let mut p = pipeline();
        p.handle(&sensor(Some(60.0)));
        p.handle(&motion(200));
        p.handle(&sensor(Some(40.0)));
        assert_eq!(p.grid().path().len(), 2, "one path pose per sensor frame");
    }

    #[test]
    fn rendered_map_shows_origin_and_wall() {
        let mut p = pipeline();
        for _ in 0..3 {
            p.handle(&sensor(Some(50.0)));
        }
        let map = p.render_map();
        assert!(map.contains('X'));
        assert!(
            map.chars().any(|c| "▅▆▇█".contains(c)),
            "occupied cells should be visible:\n{map}"
        );
    }

    #[test]
    fn drive_toward_wall_shrinks_the_front_distance() {
        let mut p = pipeline();
        // Map the wall at 80cm, drive 30cm toward it, report it at 50cm
        p.handle(&sensor(Some(80.0)));
        p.handle(&motion(300));
        p.handle(&sensor(Some(50.0)));

        let estimate = p.estimate();
        assert!(
            estimate.x() > 15.0,
            "pose should have moved toward the wall, x = {}",
            estimate.x()
        );
        assert_eq!(p.stats().sensor_frames, 2);
        assert_eq!(p.stats().motion_frames, 1);
    }
}
