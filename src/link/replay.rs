//! Replay of a recorded telemetry log.

use async_trait::async_trait;
use log::debug;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

use super::TelemetryLink;
use crate::error::LinkError;
use crate::telemetry::DriveCommand;

/// Telemetry from a recorded log file. Drive commands are accepted and
/// dropped, since there is no robot on the other end.
pub struct ReplayLink {
    name: String,
    lines: Lines<BufReader<File>>,
}

impl ReplayLink {
    pub async fn open(path: &str) -> Result<Self, LinkError> {
        let file = File::open(path).await?;
        Ok(Self {
            name: path.to_string(),
            lines: BufReader::new(file).lines(),
        })
    }
}

#[async_trait]
impl TelemetryLink for ReplayLink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn recv_line(&mut self) -> Result<Option<String>, LinkError> {
        Ok(self.lines.next_line().await?)
    }

    async fn send_command(&mut self, command: DriveCommand) -> Result<(), LinkError> {
        debug!("replay link ignoring command {command:?}");
        Ok(())
    }
}
