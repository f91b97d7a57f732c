pub mod address;
pub mod frame;
pub mod state;

use std::str::FromStr;

use serde::Deserialize;
use strum::{Display, EnumString};

/// Device families addressed by the gateway. Buttons may report arbitrary
/// family strings, carried verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Deserialize)]
#[serde(from = "String")]
pub enum DeviceType {
    /// Roller-shutter actuator; command codes are prefixed to the address.
    #[strum(serialize = "RT")]
    Rt,

    /// Venetian/awning actuator with state feedback and double-tap presets.
    #[strum(serialize = "ER")]
    Er,

    #[strum(default)]
    Other(String),
}

impl FromStr for DeviceType {
    type Err = std::convert::Infallible;

    // Mirrors the strum `EnumString` derive (serialize "RT"/"ER", `default`
    // carries the raw string verbatim); a separate hand-written impl avoids the
    // generated `TryFrom<&str>` clashing with the blanket impl from `From<&str>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "RT" => Self::Rt,
            "ER" => Self::Er,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<String> for DeviceType {
    fn from(s: String) -> Self {
        // EnumString with a default variant cannot fail, but don't panic on it
        Self::from_str(&s).unwrap_or(Self::Other(s))
    }
}

impl From<&str> for DeviceType {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

/// Actuator commands with an outbound encoding. The double-tap presets are
/// only reachable through the synthetic `-doubleup`/`-doubledown` sub-topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum BlindCommand {
    Open,
    Close,
    Stop,
    DoubleUp,
    DoubleDown,
}
