use bytes::Bytes;
use serde::Serialize;

use crate::bridge::Publication;
use crate::config::{BlindConfig, ButtonConfig, Config};
use crate::mediola::{BlindCommand, DeviceType};

/// The configured device list, loaded once at startup and read-only
/// thereafter. Lookups are linear scans; the configured fleet is tens of
/// devices at most and first match wins.
pub struct DeviceRegistry {
    buttons: Vec<ButtonConfig>,
    blinds: Vec<BlindConfig>,
    base_topic: String,
    discovery_prefix: String,
}

impl DeviceRegistry {
    pub fn from_config(config: &Config) -> Self {
        Self {
            buttons: config.buttons.clone(),
            blinds: config.blinds.clone(),
            base_topic: config.mqtt.topic.clone(),
            discovery_prefix: config.mqtt.discovery_prefix.clone(),
        }
    }

    pub fn lookup_button(&self, device_type: &DeviceType, addr: &str) -> Option<&ButtonConfig> {
        self.buttons
            .iter()
            .find(|b| &b.device_type == device_type && b.addr.eq_ignore_ascii_case(addr))
    }

    pub fn lookup_blind(&self, device_type: &DeviceType, addr: &str) -> Option<&BlindConfig> {
        self.blinds
            .iter()
            .find(|b| &b.device_type == device_type && b.addr.eq_ignore_ascii_case(addr))
    }

    /// Stable `<TYPE>_<addr>` identifier, with the synthetic double-tap
    /// suffix where applicable.
    fn identifier(device_type: &DeviceType, addr: &str, sub: Option<BlindCommand>) -> String {
        match sub {
            Some(sub) => format!("{device_type}_{addr}-{sub}"),
            None => format!("{device_type}_{addr}"),
        }
    }

    pub fn button_topic(&self, button: &ButtonConfig) -> String {
        let id = Self::identifier(&button.device_type, &button.addr, None);
        format!("{}/buttons/{id}", self.base_topic)
    }

    pub fn blind_topic(&self, blind: &BlindConfig) -> String {
        let id = Self::identifier(&blind.device_type, &blind.addr, None);
        format!("{}/blinds/{id}", self.base_topic)
    }

    /// Every `/set` topic the bridge listens on: one per button, one per
    /// blind, two per ER blind for the double-tap presets.
    pub fn subscriptions(&self) -> Vec<String> {
        let mut topics = Vec::new();
        for button in &self.buttons {
            topics.push(format!("{}/set", self.button_topic(button)));
        }
        for blind in &self.blinds {
            topics.push(format!("{}/set", self.blind_topic(blind)));
            if blind.device_type == DeviceType::Er {
                for sub in [BlindCommand::DoubleUp, BlindCommand::DoubleDown] {
                    let id = Self::identifier(&blind.device_type, &blind.addr, Some(sub));
                    topics.push(format!("{}/buttons/{id}/set", self.base_topic));
                }
            }
        }
        topics
    }

    /// Retained Home Assistant discovery documents: a switch per button
    /// (plus the two synthetic double-tap buttons per ER blind) and a cover
    /// per blind.
    pub fn discovery_documents(&self) -> anyhow::Result<Vec<Publication>> {
        let mut docs = Vec::new();
        for button in &self.buttons {
            docs.push(self.button_document(
                &button.device_type,
                &button.addr,
                button.name.as_deref(),
                None,
            )?);
        }
        for blind in &self.blinds {
            docs.push(self.blind_document(blind)?);

            // ER double taps drive the blind to preset positions; they get
            // their own button entities
            if blind.device_type == DeviceType::Er {
                for (sub, sub_name) in [
                    (BlindCommand::DoubleUp, "double up"),
                    (BlindCommand::DoubleDown, "double down"),
                ] {
                    docs.push(self.button_document(
                        &blind.device_type,
                        &blind.addr,
                        blind.name.as_deref(),
                        Some((sub, sub_name)),
                    )?);
                }
            }
        }
        Ok(docs)
    }

    fn button_document(
        &self,
        device_type: &DeviceType,
        addr: &str,
        name: Option<&str>,
        sub: Option<(BlindCommand, &str)>,
    ) -> anyhow::Result<Publication> {
        let identifier = Self::identifier(device_type, addr, sub.map(|(s, _)| s));
        let topic = format!("{}/buttons/{identifier}", self.base_topic);

        let mut display_name = String::from("Button");
        if let Some(name) = name {
            display_name.push(' ');
            display_name.push_str(name);
        }
        if let Some((_, sub_name)) = sub {
            display_name.push(' ');
            display_name.push_str(sub_name);
        }

        let document = ButtonDocument {
            command_topic: format!("{topic}/set"),
            optimistic: true,
            unique_id: identifier.clone(),
            name: display_name,
            device: DeviceInfo {
                identifiers: identifier.clone(),
                manufacturer: "Mediola",
                name: "Button",
                suggested_area: name.map(str::to_string),
            },
        };

        Ok(Publication {
            topic: format!("{}/switch/{identifier}/config", self.discovery_prefix),
            payload: Bytes::from(serde_json::to_string(&document)?),
            retain: true,
        })
    }

    fn blind_document(&self, blind: &BlindConfig) -> anyhow::Result<Publication> {
        let identifier = Self::identifier(&blind.device_type, &blind.addr, None);
        let topic = self.blind_topic(blind);

        let mut display_name = String::from("Blind");
        if let Some(name) = &blind.name {
            display_name.push(' ');
            display_name.push_str(name);
        }

        // only ER actuators report state back, RT covers stay command-only
        let (state_topic, position_topic) = if blind.device_type == DeviceType::Er {
            (Some(format!("{topic}/state")), Some(format!("{topic}/position")))
        } else {
            (None, None)
        };

        let document = BlindDocument {
            command_topic: format!("{topic}/set"),
            payload_open: "open",
            payload_close: "close",
            payload_stop: "stop",
            optimistic: true,
            device_class: "blind",
            unique_id: identifier.clone(),
            name: display_name,
            device: DeviceInfo {
                identifiers: identifier.clone(),
                manufacturer: "Mediola",
                name: "Blind",
                suggested_area: blind.name.clone(),
            },
            state_topic,
            position_topic,
        };

        Ok(Publication {
            topic: format!("{}/cover/{identifier}/config", self.discovery_prefix),
            payload: Bytes::from(serde_json::to_string(&document)?),
            retain: true,
        })
    }
}

#[derive(Serialize)]
struct DeviceInfo {
    identifiers: String,
    manufacturer: &'static str,
    name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggested_area: Option<String>,
}

#[derive(Serialize)]
struct ButtonDocument {
    command_topic: String,
    optimistic: bool,
    unique_id: String,
    name: String,
    device: DeviceInfo,
}

#[derive(Serialize)]
struct BlindDocument {
    command_topic: String,
    payload_open: &'static str,
    payload_close: &'static str,
    payload_stop: &'static str,
    optimistic: bool,
    device_class: &'static str,
    unique_id: String,
    name: String,
    device: DeviceInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    state_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    position_topic: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn registry() -> DeviceRegistry {
        DeviceRegistry {
            buttons: vec![ButtonConfig {
                device_type: DeviceType::Other("IT".into()),
                addr: "0b44fa".into(),
                name: Some("Doorbell".into()),
            }],
            blinds: vec![
                BlindConfig {
                    device_type: DeviceType::Er,
                    addr: "10".into(),
                    name: Some("Living room".into()),
                },
                BlindConfig {
                    device_type: DeviceType::Rt,
                    addr: "05".into(),
                    name: None,
                },
            ],
            base_topic: "mediola2mqtt".into(),
            discovery_prefix: "homeassistant".into(),
        }
    }

    #[test]
    fn test_lookup() {
        let registry = registry();
        let it = DeviceType::Other("IT".into());
        assert!(registry.lookup_button(&it, "0b44fa").is_some());
        assert!(registry.lookup_button(&it, "0B44FA").is_some());
        assert!(registry.lookup_button(&DeviceType::Er, "0b44fa").is_none());

        assert!(registry.lookup_blind(&DeviceType::Er, "10").is_some());
        assert!(registry.lookup_blind(&DeviceType::Er, "05").is_none());
        assert!(registry.lookup_blind(&DeviceType::Rt, "05").is_some());
    }

    #[test]
    fn test_topics() {
        let registry = registry();
        assert_eq!(
            registry.blind_topic(&registry.blinds[0]),
            "mediola2mqtt/blinds/ER_10"
        );
        assert_eq!(
            registry.button_topic(&registry.buttons[0]),
            "mediola2mqtt/buttons/IT_0b44fa"
        );
    }

    #[test]
    fn test_subscriptions() {
        let topics = registry().subscriptions();
        assert_eq!(
            topics,
            vec![
                "mediola2mqtt/buttons/IT_0b44fa/set",
                "mediola2mqtt/blinds/ER_10/set",
                "mediola2mqtt/buttons/ER_10-doubleup/set",
                "mediola2mqtt/buttons/ER_10-doubledown/set",
                "mediola2mqtt/blinds/RT_05/set",
            ]
        );
    }

    #[test]
    fn test_er_cover_document() {
        let docs = registry().discovery_documents().unwrap();
        let cover = docs
            .iter()
            .find(|d| d.topic == "homeassistant/cover/ER_10/config")
            .unwrap();
        assert!(cover.retain);

        let doc: Value = serde_json::from_slice(&cover.payload).unwrap();
        assert_eq!(doc["command_topic"], "mediola2mqtt/blinds/ER_10/set");
        assert_eq!(doc["state_topic"], "mediola2mqtt/blinds/ER_10/state");
        assert_eq!(doc["position_topic"], "mediola2mqtt/blinds/ER_10/position");
        assert_eq!(doc["payload_stop"], "stop");
        assert_eq!(doc["device_class"], "blind");
        assert_eq!(doc["name"], "Blind Living room");
        assert_eq!(doc["device"]["manufacturer"], "Mediola");
        assert_eq!(doc["device"]["suggested_area"], "Living room");
    }

    #[test]
    fn test_rt_cover_has_no_state_topics() {
        let docs = registry().discovery_documents().unwrap();
        let cover = docs
            .iter()
            .find(|d| d.topic == "homeassistant/cover/RT_05/config")
            .unwrap();
        let doc: Value = serde_json::from_slice(&cover.payload).unwrap();
        assert!(doc.get("state_topic").is_none());
        assert!(doc.get("position_topic").is_none());
        // nameless device gets no suggested_area either
        assert!(doc["device"].get("suggested_area").is_none());
        assert_eq!(doc["name"], "Blind");
    }

    #[test]
    fn test_double_tap_documents() {
        let docs = registry().discovery_documents().unwrap();
        let up = docs
            .iter()
            .find(|d| d.topic == "homeassistant/switch/ER_10-doubleup/config")
            .unwrap();
        let doc: Value = serde_json::from_slice(&up.payload).unwrap();
        assert_eq!(doc["command_topic"], "mediola2mqtt/buttons/ER_10-doubleup/set");
        assert_eq!(doc["unique_id"], "ER_10-doubleup");
        assert_eq!(doc["name"], "Button Living room double up");

        assert!(docs
            .iter()
            .any(|d| d.topic == "homeassistant/switch/ER_10-doubledown/config"));
        // RT blinds get no synthetic buttons
        assert!(!docs.iter().any(|d| d.topic.contains("RT_05-double")));
    }
}
