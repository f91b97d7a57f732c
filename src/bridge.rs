use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::mediola::address;
use crate::mediola::frame::DeviceRecord;
use crate::mediola::state::{BlindState, StatusReport};
use crate::mediola::{BlindCommand, DeviceType};
use crate::registry::DeviceRegistry;

/// Where a batch of records came from; changes log wording only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Event,
    Refresh,
}

impl Origin {
    fn verb(self) -> &'static str {
        match self {
            Origin::Event => "Publish",
            Origin::Refresh => "Refresh",
        }
    }
}

/// An outbound MQTT message produced by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub topic: String,
    pub payload: Bytes,
    pub retain: bool,
}

/// An outbound `SendSC` request for the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubRequest {
    pub device_type: DeviceType,
    pub data: String,
}

/// The pure translation core: device records in, publications out;
/// command topics in, hub requests out. No I/O happens here.
pub struct Bridge {
    registry: DeviceRegistry,
}

impl Bridge {
    pub fn new(registry: DeviceRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Translates a batch of device records into publications. Buttons are
    /// tried first, then ER blinds; an unmatched or malformed record is
    /// logged and never aborts its siblings.
    pub fn handle_records(&self, records: &[DeviceRecord], origin: Origin) -> Vec<Publication> {
        let mut out = Vec::new();
        for record in records {
            if record.is_ignored() {
                continue;
            }

            let matched = self
                .match_button(record)
                .map(|p| vec![p])
                .or_else(|| self.match_blind(record));

            match matched {
                Some(publications) => {
                    for p in &publications {
                        info!(
                            "{}ing to {}: {}",
                            origin.verb(),
                            p.topic,
                            String::from_utf8_lossy(&p.payload)
                        );
                    }
                    out.extend(publications);
                }
                None => match origin {
                    Origin::Event => warn!("received unknown message: {record:?}"),
                    Origin::Refresh => warn!("received unknown state: {record:?}"),
                },
            }
        }
        out
    }

    /// Translates an inbound command into a gateway request, or nothing:
    /// unknown targets and unsupported verbs are logged no-ops.
    pub fn handle_command(&self, topic: &str, payload: &[u8]) -> Option<HubRequest> {
        let (device_type, addr, sub) = parse_command_topic(topic)?;
        let Some(blind) = self.registry.lookup_blind(&device_type, &addr) else {
            debug!("no configured blind behind command topic {topic}");
            return None;
        };

        let command = match sub {
            // double-tap sub-topics fire on any payload
            Some(sub) => match sub.parse::<BlindCommand>() {
                Ok(cmd @ (BlindCommand::DoubleUp | BlindCommand::DoubleDown)) => cmd,
                _ => {
                    debug!("unknown sub-identifier {sub:?} on {topic}");
                    return None;
                }
            },
            None => {
                let verb = std::str::from_utf8(payload)
                    .ok()
                    .and_then(|s| s.parse::<BlindCommand>().ok());
                match verb {
                    Some(cmd @ (BlindCommand::Open | BlindCommand::Close | BlindCommand::Stop)) => {
                        cmd
                    }
                    _ => {
                        warn!(
                            "wrong command {:?} for {topic}",
                            String::from_utf8_lossy(payload)
                        );
                        return None;
                    }
                }
            }
        };

        match address::encode_command(&blind.device_type, &blind.addr, command) {
            Ok(data) => Some(HubRequest { device_type: blind.device_type.clone(), data }),
            Err(e) => {
                warn!("wrong command: {e}");
                None
            }
        }
    }

    fn match_button(&self, record: &DeviceRecord) -> Option<Publication> {
        let device_type = DeviceType::from(record.device_type.as_str());
        let field = record.payload_field()?;

        let addr = match &record.adr {
            Some(adr) => match address::address_from_adr(adr) {
                Ok(addr) => addr,
                Err(e) => {
                    debug!("unusable adr field in {record:?}: {e}");
                    return None;
                }
            },
            None => address::button_address_from_data(field),
        };
        let button = self.registry.lookup_button(&device_type, &addr)?;

        let tail = field.len().saturating_sub(2);
        let payload = field.get(tail..).unwrap_or(field);
        Some(Publication {
            topic: self.registry.button_topic(button),
            payload: Bytes::copy_from_slice(payload.as_bytes()),
            retain: false,
        })
    }

    fn match_blind(&self, record: &DeviceRecord) -> Option<Vec<Publication>> {
        // only the ER family reports blind state
        let device_type = DeviceType::from(record.device_type.as_str());
        if device_type != DeviceType::Er {
            return None;
        }
        let field = record.payload_field()?;

        let addr = match &record.adr {
            Some(adr) => address::address_from_adr(adr),
            None => address::blind_address_from_data(field),
        };
        let addr = match addr {
            Ok(addr) => addr,
            Err(e) => {
                debug!("unusable address in {record:?}: {e}");
                return None;
            }
        };
        let blind = self.registry.lookup_blind(&device_type, &addr)?;

        let tail = field.len().saturating_sub(2);
        let code = field.get(tail..).unwrap_or(field);
        let report = StatusReport::from_code(code);
        if report.state == BlindState::Unknown {
            warn!("received unknown state code {code:?} in {record:?}");
        }

        let topic = self.registry.blind_topic(blind);
        let mut out = vec![Publication {
            topic: format!("{topic}/state"),
            payload: Bytes::from(report.state.to_string()),
            retain: true,
        }];
        if let Some(position) = report.position {
            out.push(Publication {
                topic: format!("{topic}/position"),
                payload: Bytes::from(position.to_string()),
                retain: true,
            });
        }
        Some(out)
    }
}

/// Splits `…/<TYPE>_<addr>[-<sub>]/set` into its parts: type is the segment
/// after the last `/` before the first `_`, the address runs to the next
/// `/`, optionally carrying a `-` sub-identifier.
fn parse_command_topic(topic: &str) -> Option<(DeviceType, String, Option<String>)> {
    let (head, tail) = topic.split_once('_')?;
    let device_type = DeviceType::from(head.rsplit('/').next().unwrap_or(head));
    let addr_segment = tail.split('/').next().unwrap_or(tail);
    Some(match addr_segment.split_once('-') {
        Some((addr, sub)) => (device_type, addr.to_string(), Some(sub.to_string())),
        None => (device_type, addr_segment.to_string(), None),
    })
}
