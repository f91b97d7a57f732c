use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;

/// Marker in front of event datagrams pushed by the gateway.
pub const EVENT_MARKER: &[u8] = b"{XC_EVT}";

/// Marker in front of successful command/poll replies.
pub const SUCCESS_MARKER: &[u8] = b"{XC_SUC}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Live state push over UDP.
    Event,
    /// Reply to a `GetStates` poll.
    PollReply,
}

/// A marker-classified gateway frame. The payload is the raw JSON remainder;
/// it is kept unparsed so the debug mirror can forward it verbatim.
#[derive(Debug, Clone)]
pub struct Frame {
    pub kind: FrameKind,
    pub payload: Bytes,
}

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("frame starts with neither {{XC_EVT}} nor {{XC_SUC}}")]
    UnknownMarker,

    #[error("frame payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Frame {
    pub fn classify(raw: &[u8]) -> Result<Self, FrameError> {
        if let Some(rest) = raw.strip_prefix(EVENT_MARKER) {
            Ok(Self { kind: FrameKind::Event, payload: Bytes::copy_from_slice(rest) })
        } else if let Some(rest) = raw.strip_prefix(SUCCESS_MARKER) {
            Ok(Self { kind: FrameKind::PollReply, payload: Bytes::copy_from_slice(rest) })
        } else {
            Err(FrameError::UnknownMarker)
        }
    }

    /// Parses the payload into device records. A single JSON object is
    /// normalized to a one-element batch.
    pub fn records(&self) -> Result<Vec<DeviceRecord>, FrameError> {
        Ok(match serde_json::from_slice(&self.payload)? {
            Records::One(record) => vec![record],
            Records::Many(records) => records,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Records {
    Many(Vec<DeviceRecord>),
    One(DeviceRecord),
}

/// One device entry of a frame. Either `data` embeds the address and status
/// in one hex string, or `adr` carries the address separately with the
/// status in `state`; the two encodings are not interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceRecord {
    #[serde(rename = "type")]
    pub device_type: String,
    pub adr: Option<String>,
    pub data: Option<String>,
    pub state: Option<String>,
}

impl DeviceRecord {
    /// The hex field carrying the status tail. `state` wins when a record
    /// has both.
    pub fn payload_field(&self) -> Option<&str> {
        self.state.as_deref().or(self.data.as_deref())
    }

    /// Infrared traffic and the gateway's own EVENT chatter are not device
    /// state; skipped, not errors.
    pub fn is_ignored(&self) -> bool {
        self.device_type == "IR" || self.device_type == "EVENT"
    }
}
