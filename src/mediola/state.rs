use strum::Display;

/// Semantic blind state as published to the state topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum BlindState {
    Open,
    Closed,
    Opening,
    Closing,
    Stopped,
    Unknown,
}

/// Decoded status report of an ER actuator: semantic state plus a position
/// when the status code pins one down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub state: BlindState,
    pub position: Option<u8>,
}

impl StatusReport {
    /// Maps a two-hex-character status code. Total: codes outside the table
    /// come back as `Unknown` without a position.
    pub fn from_code(code: &str) -> Self {
        use BlindState::*;

        let (state, position) = match code.to_ascii_lowercase().as_str() {
            "01" | "0e" => (Open, Some(100)),
            "02" | "0f" => (Closed, Some(0)),
            "08" | "0a" => (Opening, None),
            "09" | "0b" => (Closing, None),
            // stopped mid-travel, actual position unknown; 42 marks that
            "0d" | "05" => (Stopped, Some(42)),
            // intermediate preset positions, down and up
            "03" => (Closed, Some(10)),
            "04" => (Open, Some(50)),
            _ => (Unknown, None),
        };
        Self { state, position }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_table() {
        let cases = [
            ("01", BlindState::Open, Some(100)),
            ("0e", BlindState::Open, Some(100)),
            ("02", BlindState::Closed, Some(0)),
            ("0f", BlindState::Closed, Some(0)),
            ("08", BlindState::Opening, None),
            ("0a", BlindState::Opening, None),
            ("09", BlindState::Closing, None),
            ("0b", BlindState::Closing, None),
            ("0d", BlindState::Stopped, Some(42)),
            ("05", BlindState::Stopped, Some(42)),
            ("03", BlindState::Closed, Some(10)),
            ("04", BlindState::Open, Some(50)),
        ];
        for (code, state, position) in cases {
            let report = StatusReport::from_code(code);
            assert_eq!(report.state, state, "code {code}");
            assert_eq!(report.position, position, "code {code}");
        }
    }

    #[test]
    fn test_unknown_codes() {
        for code in ["00", "ff", "7c", ""] {
            let report = StatusReport::from_code(code);
            assert_eq!(report.state, BlindState::Unknown);
            assert_eq!(report.position, None);
        }
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(StatusReport::from_code("0E"), StatusReport::from_code("0e"));
    }

    #[test]
    fn test_wire_form() {
        assert_eq!(BlindState::Open.to_string(), "open");
        assert_eq!(BlindState::Closing.to_string(), "closing");
        assert_eq!(BlindState::Unknown.to_string(), "unknown");
    }
}
