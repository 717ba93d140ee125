//! Telemetry transport links
//!
//! A [`TelemetryLink`] delivers raw telemetry lines from the robot and
//! carries drive commands back. Two transports are provided: a live serial
//! port ([`SerialLink`], optionally capturing traffic to a log file) and a
//! recorded-log replay ([`ReplayLink`]).

mod replay;
mod serial;

pub use replay::ReplayLink;
pub use serial::{SerialConfig, SerialLink};

use async_trait::async_trait;

use crate::error::LinkError;
use crate::telemetry::DriveCommand;

/// Transport carrying telemetry lines in and drive commands out.
#[async_trait]
pub trait TelemetryLink: Send {
    /// Human-readable name for this link instance.
    fn name(&self) -> &str;

    /// Receive the next telemetry line, without its line terminator.
    ///
    /// Returns `Ok(None)` when the stream has ended. Cancellation-safe: a
    /// line is never lost when the returned future is dropped mid-read.
    async fn recv_line(&mut self) -> Result<Option<String>, LinkError>;

    /// Send a drive command to the robot.
    async fn send_command(&mut self, command: DriveCommand) -> Result<(), LinkError>;
}
