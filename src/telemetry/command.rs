//! Outbound drive commands.
//!
//! The firmware takes single-character commands on the serial line. The
//! characters follow the AZERTY layout of the original console (`z` forward,
//! `s` backward, `q` left, `d` right).

/// A teleoperation command for the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveCommand {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

impl DriveCommand {
    /// The single character the firmware expects on the wire.
    pub fn wire_char(&self) -> char {
        match self {
            DriveCommand::Forward => 'z',
            DriveCommand::Backward => 's',
            DriveCommand::Left => 'q',
            DriveCommand::Right => 'd',
            DriveCommand::Stop => 'x',
        }
    }

    /// Map raw key input to a command.
    ///
    /// Accepts the wire characters themselves, the ANSI arrow-key escape
    /// sequences, and space for stop. Anything else is `None`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "z" | "\x1b[A" => Some(DriveCommand::Forward),
            "s" | "\x1b[B" => Some(DriveCommand::Backward),
            "q" | "\x1b[D" => Some(DriveCommand::Left),
            "d" | "\x1b[C" => Some(DriveCommand::Right),
            "x" | " " => Some(DriveCommand::Stop),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_chars_match_firmware_layout() {
        assert_eq!(DriveCommand::Forward.wire_char(), 'z');
        assert_eq!(DriveCommand::Backward.wire_char(), 's');
        assert_eq!(DriveCommand::Left.wire_char(), 'q');
        assert_eq!(DriveCommand::Right.wire_char(), 'd');
    }

    #[test]
    fn wire_chars_round_trip_through_from_key() {
        for cmd in [
            DriveCommand::Forward,
            DriveCommand::Backward,
            DriveCommand::Left,
            DriveCommand::Right,
            DriveCommand::Stop,
        ] {
            let key = cmd.wire_char().to_string();
            assert_eq!(DriveCommand::from_key(&key), Some(cmd));
        }
    }

    #[test]
    fn arrow_escape_sequences_map_to_commands() {
        assert_eq!(DriveCommand::from_key("\x1b[A"), Some(DriveCommand::Forward));
        assert_eq!(DriveCommand::from_key("\x1b[B"), Some(DriveCommand::Backward));
        assert_eq!(DriveCommand::from_key("\x1b[D"), Some(DriveCommand::Left));
        assert_eq!(DriveCommand::from_key("\x1b[C"), Some(DriveCommand::Right));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        assert_eq!(DriveCommand::from_key("p"), None);
        assert_eq!(DriveCommand::from_key(""), None);
        assert_eq!(DriveCommand::from_key("zz"), None);
    }
}
