//! sonar_slam - Host-side SLAM console for a sonar-equipped rover
//!
//! This library provides the telemetry line protocol, transport links,
//! occupancy grid mapping, and particle-filter localization for a small
//! differential-drive robot that streams range and odometry frames over a
//! serial link.

pub mod error;
pub mod link;
pub mod mapping;
pub mod slam;
pub mod telemetry;
pub mod types;

pub use error::{ConfigError, LinkError};
pub use link::{ReplayLink, SerialConfig, SerialLink, TelemetryLink};
pub use mapping::{GridConfig, OccupancyGrid, render_map};
pub use slam::{FilterConfig, MotionConfig, SensorConfig, SlamConfig, SlamPipeline, SlamStats};
pub use telemetry::{
    DriveCommand, LineParser, MotionFrame, ParseError, ParserStats, SensorFrame, TelemetryFrame,
};
pub use types::{CellIndex, Pose};
