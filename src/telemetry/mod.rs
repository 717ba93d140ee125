//! Telemetry line protocol
//!
//! The robot firmware streams newline-terminated ASCII frames:
//!
//! - `L30F15R9999t5` — range readings from the left, front and right sonar
//!   in centimeters, plus the time since the previous frame in milliseconds.
//!   `9999` means the sensor saw nothing in range.
//! - `el300er-300cor50t500` — signed encoder tick counts for the left and
//!   right wheel since the previous frame, the firmware's heading-correction
//!   term, and the time delta in milliseconds.
//! - Lines starting with `#` are comments.
//!
//! Parsing never aborts the stream: a malformed line is reported as a
//! [`ParseError`], counted in [`ParserStats`], and the caller moves on to the
//! next line.

mod command;

pub use command::DriveCommand;

use core::fmt;

/// Wire sentinel for a range reading with no echo.
pub const OUT_OF_RANGE: u32 = 9999;

/// One frame of sonar range readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorFrame {
    /// Left sonar distance in cm, `None` when out of range.
    pub left: Option<f32>,
    /// Front sonar distance in cm, `None` when out of range.
    pub front: Option<f32>,
    /// Right sonar distance in cm, `None` when out of range.
    pub right: Option<f32>,
    /// Time since the previous frame in milliseconds.
    pub dt_ms: u32,
}

impl fmt::Display for SensorFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = |d: Option<f32>| d.map_or(OUT_OF_RANGE, |v| v as u32);
        write!(
            f,
            "SensorFrame(Left: {}cm, Front: {}cm, Right: {}cm, Timedelta: {}ms)",
            raw(self.left),
            raw(self.front),
            raw(self.right),
            self.dt_ms
        )
    }
}

/// One frame of wheel odometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionFrame {
    /// Left wheel encoder ticks since the previous frame (signed).
    pub left_ticks: i32,
    /// Right wheel encoder ticks since the previous frame (signed).
    pub right_ticks: i32,
    /// Firmware heading-correction term; diagnostic only.
    pub correction: i32,
    /// Time since the previous frame in milliseconds.
    pub dt_ms: u32,
}

impl fmt::Display for MotionFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MotionFrame(Left: {}, Right: {}, Correction: {}, Timedelta: {}ms)",
            self.left_ticks, self.right_ticks, self.correction, self.dt_ms
        )
    }
}

/// A parsed telemetry frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryFrame {
    Sensor(SensorFrame),
    Motion(MotionFrame),
}

/// Telemetry line that could not be parsed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("telemetry line not in a known format: {line:?}")]
    Unrecognized { line: String },

    #[error("malformed {kind} frame: {line:?}")]
    Malformed { kind: &'static str, line: String },
}

/// Parser counters for monitoring and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserStats {
    /// Frames successfully parsed.
    pub frames_parsed: u64,
    /// Lines rejected as malformed or unrecognized.
    pub parse_errors: u64,
    /// Comment lines skipped.
    pub comments_skipped: u64,
}

/// Line parser with running statistics.
#[derive(Debug, Default)]
pub struct LineParser {
    stats: ParserStats,
}

impl LineParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> ParserStats {
        self.stats
    }

    /// Parse a single telemetry line.
    ///
    /// Returns `Ok(None)` for comments and blank lines. Errors are counted
    /// and returned; the stream itself stays usable.
    pub fn parse_line(&mut self, line: &str) -> Result<Option<TelemetryFrame>, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        if line.starts_with('#') {
            self.stats.comments_skipped += 1;
            return Ok(None);
        }
        match parse_frame(line) {
            Ok(frame) => {
                self.stats.frames_parsed += 1;
                Ok(Some(frame))
            }
            Err(e) => {
                self.stats.parse_errors += 1;
                Err(e)
            }
        }
    }
}

/// Parse a non-comment, non-blank telemetry line.
pub fn parse_frame(line: &str) -> Result<TelemetryFrame, ParseError> {
    if line.starts_with("el") {
        parse_motion(line).map(TelemetryFrame::Motion)
    } else if line.starts_with('L') {
        parse_sensor(line).map(TelemetryFrame::Sensor)
    } else {
        Err(ParseError::Unrecognized {
            line: line.to_string(),
        })
    }
}

fn parse_sensor(line: &str) -> Result<SensorFrame, ParseError> {
    let malformed = || ParseError::Malformed {
        kind: "sensor",
        line: line.to_string(),
    };
    let mut scan = Scanner::new(line);
    scan.tag("L").ok_or_else(malformed)?;
    let left = scan.unsigned().ok_or_else(malformed)?;
    scan.tag("F").ok_or_else(malformed)?;
    let front = scan.unsigned().ok_or_else(malformed)?;
    scan.tag("R").ok_or_else(malformed)?;
    let right = scan.unsigned().ok_or_else(malformed)?;
    scan.tag("t").ok_or_else(malformed)?;
    let dt_ms = scan.unsigned().ok_or_else(malformed)?;
    if !scan.is_done() {
        return Err(malformed());
    }

    let range = |raw: u32| (raw != OUT_OF_RANGE).then_some(raw as f32);
    Ok(SensorFrame {
        left: range(left),
        front: range(front),
        right: range(right),
        dt_ms,
    })
}

fn parse_motion(line: &str) -> Result<MotionFrame, ParseError> {
    let malformed = || ParseError::Malformed {
        kind: "motion",
        line: line.to_string(),
    };
    let mut scan = Scanner::new(line);
    scan.tag("el").ok_or_else(malformed)?;
    let el = scan.signed().ok_or_else(malformed)?;
    scan.tag("er").ok_or_else(malformed)?;
    let er = scan.signed().ok_or_else(malformed)?;
    scan.tag("cor").ok_or_else(malformed)?;
    let correction = scan.signed().ok_or_else(malformed)?;
    scan.tag("t").ok_or_else(malformed)?;
    let dt_ms = scan.unsigned().ok_or_else(malformed)?;
    if !scan.is_done() {
        return Err(malformed());
    }

    // The firmware emits the encoder fields swapped: `el` carries the right
    // wheel and `er` the left. Undo that here so the frame reads correctly.
    Ok(MotionFrame {
        left_ticks: er,
        right_ticks: el,
        correction,
        dt_ms,
    })
}

/// Minimal cursor over an ASCII line.
struct Scanner<'a> {
    rest: &'a str,
}

impl<'a> Scanner<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    fn tag(&mut self, prefix: &str) -> Option<()> {
        self.rest = self.rest.strip_prefix(prefix)?;
        Some(())
    }

    fn unsigned(&mut self) -> Option<u32> {
        let digits = self.take_while(|c| c.is_ascii_digit());
        digits.parse().ok()
    }

    fn signed(&mut self) -> Option<i32> {
        let start = self.rest;
        let negative = self.rest.starts_with('-');
        if negative {
            self.rest = &self.rest[1..];
        }
        let digits = self.take_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            self.rest = start;
            return None;
        }
        let magnitude: i32 = digits.parse().ok()?;
        Some(if negative { -magnitude } else { magnitude })
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| !pred(*c))
            .map_or(self.rest.len(), |(i, _)| i);
        let (taken, rest) = self.rest.split_at(end);
        self.rest = rest;
        taken
    }

    fn is_done(&self) -> bool {
        self.rest.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Sensor Frame Tests ==========

    #[test]
    fn parses_sensor_frame() {
        let frame = parse_frame("L30F15R9999t5").unwrap();
        assert_eq!(
            frame,
            TelemetryFrame::Sensor(SensorFrame {
                left: Some(30.0),
                front: Some(15.0),
                right: None,
                dt_ms: 5,
            })
        );
    }

    #[test]
    fn out_of_range_only_applies_to_distances() {
        let frame = parse_frame("L9999F9999R9999t9999").unwrap();
        let TelemetryFrame::Sensor(sensor) = frame else {
            panic!("expected sensor frame");
        };
        assert_eq!(sensor.left, None);
        assert_eq!(sensor.front, None);
        assert_eq!(sensor.right, None);
        assert_eq!(sensor.dt_ms, 9999, "timedelta has no out-of-range meaning");
    }

    #[test]
    fn sensor_zero_distances() {
        let frame = parse_frame("L0F0R0t0").unwrap();
        let TelemetryFrame::Sensor(sensor) = frame else {
            panic!("expected sensor frame");
        };
        assert_eq!(sensor.left, Some(0.0));
        assert_eq!(sensor.dt_ms, 0);
    }

    #[test]
    fn sensor_rejects_negative_distance() {
        assert!(parse_frame("L-3F15R20t5").is_err());
    }

    #[test]
    fn sensor_rejects_trailing_garbage() {
        assert!(parse_frame("L30F15R20t5xyz").is_err());
        assert!(parse_frame("L30F15R20t5 L1F1R1t1").is_err());
    }

    #[test]
    fn sensor_rejects_missing_fields() {
        assert!(parse_frame("L30F15t5").is_err());
        assert!(parse_frame("L30F15R20").is_err());
        assert!(parse_frame("LFRt").is_err());
    }

    // ========== Motion Frame Tests ==========

    #[test]
    fn parses_motion_frame_and_unswaps_encoders() {
        let frame = parse_frame("el300er-300cor50t500").unwrap();
        // el carries the right wheel on the wire
        assert_eq!(
            frame,
            TelemetryFrame::Motion(MotionFrame {
                left_ticks: -300,
                right_ticks: 300,
                correction: 50,
                dt_ms: 500,
            })
        );
    }

    #[test]
    fn motion_all_fields_signed_except_time() {
        let frame = parse_frame("el-1er-2cor-3t4").unwrap();
        let TelemetryFrame::Motion(motion) = frame else {
            panic!("expected motion frame");
        };
        assert_eq!(motion.left_ticks, -2);
        assert_eq!(motion.right_ticks, -1);
        assert_eq!(motion.correction, -3);
        assert_eq!(motion.dt_ms, 4);
    }

    #[test]
    fn motion_rejects_signed_time() {
        assert!(parse_frame("el1er2cor3t-4").is_err());
    }

    #[test]
    fn motion_rejects_bare_minus() {
        assert!(parse_frame("el-er2cor3t4").is_err());
    }

    // ========== Line Handling Tests ==========

    #[test]
    fn comments_and_blanks_are_skipped() {
        let mut parser = LineParser::new();
        assert!(parser.parse_line("# calibration run 3").unwrap().is_none());
        assert!(parser.parse_line("").unwrap().is_none());
        assert!(parser.parse_line("   ").unwrap().is_none());
        assert_eq!(parser.stats().comments_skipped, 1);
        assert_eq!(parser.stats().frames_parsed, 0);
        assert_eq!(parser.stats().parse_errors, 0);
    }

    #[test]
    fn unrecognized_lines_are_counted_not_fatal() {
        let mut parser = LineParser::new();
        assert!(parser.parse_line("hello world").is_err());
        let frame = parser.parse_line("L1F2R3t4").unwrap();
        assert!(frame.is_some(), "parser must keep working after an error");
        assert_eq!(parser.stats().parse_errors, 1);
        assert_eq!(parser.stats().frames_parsed, 1);
    }

    #[test]
    fn parse_line_trims_line_endings() {
        let mut parser = LineParser::new();
        let frame = parser.parse_line("L1F2R3t4\r").unwrap();
        assert!(frame.is_some());
    }

    // ========== Display Tests ==========

    #[test]
    fn sensor_display_renders_out_of_range_as_wire_value() {
        let frame = SensorFrame {
            left: Some(30.0),
            front: Some(15.0),
            right: None,
            dt_ms: 5,
        };
        assert_eq!(
            frame.to_string(),
            "SensorFrame(Left: 30cm, Front: 15cm, Right: 9999cm, Timedelta: 5ms)"
        );
    }

    #[test]
    fn motion_display() {
        let frame = MotionFrame {
            left_ticks: -300,
            right_ticks: 300,
            correction: 50,
            dt_ms: 500,
        };
        assert_eq!(
            frame.to_string(),
            "MotionFrame(Left: -300, Right: 300, Correction: 50, Timedelta: 500ms)"
        );
    }
}
