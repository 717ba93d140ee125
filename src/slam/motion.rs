//! Differential-drive odometry
//!
//! Converts wheel encoder frames into pose updates. `apply` is the
//! deterministic kinematic update; `sample` adds zero-mean Gaussian noise
//! scaled by the motion magnitudes and is what the particle filter uses.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::ConfigError;
use crate::telemetry::MotionFrame;
use crate::types::{Pose, wrap_pi};

/// Robot geometry and odometry noise configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionConfig {
    /// Encoder ticks per centimeter of wheel travel.
    pub ticks_per_cm: f32,
    /// Distance between the drive wheels in centimeters.
    pub track_width_cm: f32,
    /// Translation noise per centimeter traveled.
    pub alpha_trans: f32,
    /// Rotation noise per radian turned.
    pub alpha_rot: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            ticks_per_cm: 10.0,
            track_width_cm: 15.0,
            alpha_trans: 0.1,
            alpha_rot: 0.05,
        }
    }
}

impl MotionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticks_per_cm <= 0.0 {
            return Err(ConfigError("ticks per cm must be positive".into()));
        }
        if self.track_width_cm <= 0.0 {
            return Err(ConfigError("track width must be positive".into()));
        }
        if self.alpha_trans < 0.0 || self.alpha_rot < 0.0 {
            return Err(ConfigError("noise parameters must be non-negative".into()));
        }
        Ok(())
    }
}

/// Odometry motion model.
#[derive(Debug, Clone)]
pub struct MotionModel {
    config: MotionConfig,
}

impl MotionModel {
    pub fn new(config: MotionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Arc length and heading change described by an odometry frame.
    fn displacement(&self, frame: &MotionFrame) -> (f32, f32) {
        let left = frame.left_ticks as f32 / self.config.ticks_per_cm;
        let right = frame.right_ticks as f32 / self.config.ticks_per_cm;
        let distance = (left + right) / 2.0;
        let dtheta = (right - left) / self.config.track_width_cm;
        (distance, dtheta)
    }

    /// Deterministic odometry update.
    pub fn apply(&self, pose: &Pose, frame: &MotionFrame) -> Pose {
        let (distance, dtheta) = self.displacement(frame);
        advance(pose, distance, dtheta)
    }

    /// Odometry update with sampled noise.
    ///
    /// Translation noise grows with distance traveled; heading noise grows
    /// with the turn plus a wheel-slip term proportional to travel.
    pub fn sample<R: Rng>(&self, pose: &Pose, frame: &MotionFrame, rng: &mut R) -> Pose {
        let (distance, dtheta) = self.displacement(frame);
        let sigma_trans = self.config.alpha_trans * distance.abs();
        let sigma_rot = self.config.alpha_rot
            * (dtheta.abs() + distance.abs() / self.config.track_width_cm);
        advance(
            pose,
            distance + gauss(rng, sigma_trans),
            dtheta + gauss(rng, sigma_rot),
        )
    }
}

/// Advance a pose along an arc, turning through the mean heading.
fn advance(pose: &Pose, distance: f32, dtheta: f32) -> Pose {
    let heading = pose.theta + dtheta / 2.0;
    Pose::new(
        pose.x() + distance * heading.cos(),
        pose.y() + distance * heading.sin(),
        wrap_pi(pose.theta + dtheta),
    )
}

fn gauss<R: Rng>(rng: &mut R, sigma: f32) -> f32 {
    if sigma <= 0.0 {
        return 0.0;
    }
    match Normal::new(0.0, sigma) {
        Ok(normal) => normal.sample(rng),
        Err(_) => 0.0,
    }
}
