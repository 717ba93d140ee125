//! Particle filter for pose tracking
//!
//! Bootstrap filter over the odometry and sonar streams: every particle is a
//! pose hypothesis, moved through the sampled motion model and weighted by
//! the sonar likelihood against the shared map. Low-variance resampling
//! keeps the particle set healthy. Seeded runs are fully deterministic.

use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ConfigError;
use crate::mapping::OccupancyGrid;
use crate::telemetry::{MotionFrame, SensorFrame};
use crate::types::Pose;

use super::motion::{MotionConfig, MotionModel};
use super::sensor::SensorModel;

/// Particle filter configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterConfig {
    /// Number of pose hypotheses.
    pub particle_count: usize,
    /// RNG seed for deterministic runs. `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Resample when the effective sample size drops below this fraction of
    /// the particle count.
    pub resample_threshold: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            particle_count: 50,
            seed: None,
            resample_threshold: 0.5,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.particle_count == 0 {
            return Err(ConfigError("particle count must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.resample_threshold) {
            return Err(ConfigError("resample threshold must be in [0, 1]".into()));
        }
        Ok(())
    }
}

/// One pose hypothesis.
#[derive(Debug, Clone, Copy)]
pub struct Particle {
    pub pose: Pose,
    pub weight: f32,
}

/// Bootstrap particle filter.
#[derive(Debug)]
pub struct ParticleFilter {
    particles: Vec<Particle>,
    rng: StdRng,
    motion: MotionModel,
    config: FilterConfig,
    resamples: u64,
}

impl ParticleFilter {
    /// All particles start at the origin pose with uniform weights; mapping
    /// begins in the robot's own frame.
    pub fn new(config: FilterConfig, motion: MotionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let motion = MotionModel::new(motion)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let weight = 1.0 / config.particle_count as f32;
        let particles = vec![
            Particle {
                pose: Pose::origin(),
                weight,
            };
            config.particle_count
        ];
        Ok(Self {
            particles,
            rng,
            motion,
            config,
            resamples: 0,
        })
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Times the particle set has been resampled.
    pub fn resamples(&self) -> u64 {
        self.resamples
    }

    /// Move every particle through the sampled motion model.
    pub fn predict(&mut self, frame: &MotionFrame) {
        for particle in &mut self.particles {
            particle.pose = self.motion.sample(&particle.pose, frame, &mut self.rng);
        }
    }

    /// Reweigh particles against a sonar frame and resample if the set has
    /// degenerated.
    pub fn weigh(&mut self, grid: &OccupancyGrid, sensors: &SensorModel, frame: &SensorFrame) {
        for particle in &mut self.particles {
            particle.weight *= sensors.likelihood(grid, &particle.pose, frame);
        }
        self.normalize();

        let threshold = self.config.resample_threshold * self.particles.len() as f32;
        if self.effective_sample_size() < threshold {
            self.resample();
        }
    }

    fn normalize(&mut self) {
        let sum: f32 = self.particles.iter().map(|p| p.weight).sum();
        if sum > 0.0 && sum.is_finite() {
            for particle in &mut self.particles {
                particle.weight /= sum;
            }
        } else {
            // Every hypothesis scored zero; start over from uniform weights.
            warn!("particle weights collapsed, resetting to uniform");
            let weight = 1.0 / self.particles.len() as f32;
            for particle in &mut self.particles {
                particle.weight = weight;
            }
        }
    }

    /// Effective sample size of the normalized weights (1/Σw²).
    fn effective_sample_size(&self) -> f32 {
        let sum_sq: f32 = self.particles.iter().map(|p| p.weight * p.weight).sum();
        if sum_sq > 0.0 { 1.0 / sum_sq } else { 0.0 }
    }

    /// Low-variance (systematic) resampling.
    fn resample(&mut self) {
        let n = self.particles.len();
        let step = 1.0 / n as f32;
        let mut target = self.rng.random::<f32>() * step;

        let mut resampled = Vec::with_capacity(n);
        let mut cumulative = self.particles[0].weight;
        let mut source = 0;
        for _ in 0..n {
            while cumulative < target && source < n - 1 {
                source += 1;
                cumulative += self.particles[source].weight;
            }
            resampled.push(Particle {
                pose: self.particles[source].pose,
                weight: step,
            });
            target += step;
        }

        self.particles = resampled;
        self.resamples += 1;
    }

    /// Weighted mean pose (heading via circular mean).
    pub fn estimate(&self) -> Pose {
        let mut x = 0.0;
        let mut y = 0.0;
        let mut sin = 0.0;
        let mut cos = 0.0;
        for particle in &self.particles {
            x += particle.weight * particle.pose.x();
            y += particle.weight * particle.pose.y();
            sin += particle.weight * particle.pose.theta.sin();
            cos += particle.weight * particle.pose.theta.cos();
        }
        Pose::new(x, y, sin.atan2(cos))
    }
}
