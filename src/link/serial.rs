//! Live serial link to the robot.

use async_trait::async_trait;
use log::{debug, info};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, ReadHalf, WriteHalf};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use super::TelemetryLink;
use crate::error::LinkError;
use crate::telemetry::DriveCommand;

/// Serial link configuration.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/rfcomm0`.
    pub path: String,
    /// Baud rate.
    pub baud: u32,
    /// Capture received lines to this file (append) for later replay.
    pub capture: Option<String>,
}

impl SerialConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud: 9600,
            capture: None,
        }
    }
}

/// Telemetry over a serial port.
pub struct SerialLink {
    name: String,
    lines: Lines<BufReader<ReadHalf<SerialStream>>>,
    writer: WriteHalf<SerialStream>,
    capture: Option<File>,
}

impl SerialLink {
    /// Open the serial device and, if configured, the capture file.
    pub async fn open(config: SerialConfig) -> Result<Self, LinkError> {
        let stream = tokio_serial::new(config.path.as_str(), config.baud)
            .open_native_async()
            .map_err(|e| LinkError::Serial(e.to_string()))?;
        let (read_half, writer) = tokio::io::split(stream);

        let capture = match &config.capture {
            Some(path) => {
                info!("capturing telemetry to {path}");
                Some(
                    OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(path)
                        .await?,
                )
            }
            None => None,
        };

        info!("serial link open on {} at {} baud", config.path, config.baud);
        Ok(Self {
            name: config.path,
            lines: BufReader::new(read_half).lines(),
            writer,
            capture,
        })
    }
}

#[async_trait]
impl TelemetryLink for SerialLink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn recv_line(&mut self) -> Result<Option<String>, LinkError> {
        let Some(line) = self.lines.next_line().await? else {
            return Ok(None);
        };
        if let Some(capture) = &mut self.capture {
            capture.write_all(line.as_bytes()).await?;
            capture.write_all(b"\n").await?;
        }
        Ok(Some(line))
    }

    async fn send_command(&mut self, command: DriveCommand) -> Result<(), LinkError> {
        let mut buf = [0u8; 4];
        let encoded = command.wire_char().encode_utf8(&mut buf);
        debug!("sending {command:?} ({encoded:?})");
        self.writer.write_all(encoded.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
