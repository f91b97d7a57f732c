use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::mediola::DeviceType;

/// Paths probed when no config file is given on the command line: the
/// add-on mount first, then the working directory.
const SEARCH_PATHS: &[&str] = &["/config/mediola2mqtt.yaml", "mediola2mqtt.yaml"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mediola: MediolaConfig,
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub buttons: Vec<ButtonConfig>,
    #[serde(default)]
    pub blinds: Vec<BlindConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediolaConfig {
    /// Hostname or IP of the gateway's HTTP interface.
    pub host: String,
    /// Local port the gateway pushes event datagrams to.
    pub udp_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Base topic all runtime publishes go under.
    #[serde(default = "default_base_topic")]
    pub topic: String,
    /// Home Assistant discovery prefix.
    #[serde(default = "default_discovery_prefix")]
    pub discovery_prefix: String,
    /// Raises log verbosity and mirrors raw frames to the base topic.
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ButtonConfig {
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub addr: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlindConfig {
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub addr: String,
    pub name: Option<String>,
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_base_topic() -> String {
    "mediola2mqtt".to_string()
}

fn default_discovery_prefix() -> String {
    "homeassistant".to_string()
}

impl Config {
    /// Loads the configuration, fatal when nothing readable is found.
    pub fn load(cli_path: Option<&Path>) -> anyhow::Result<(Self, PathBuf)> {
        if let Some(path) = cli_path {
            return Ok((Self::from_file(path)?, path.to_path_buf()));
        }
        for candidate in SEARCH_PATHS {
            let path = Path::new(candidate);
            if path.is_file() {
                return Ok((Self::from_file(path)?, path.to_path_buf()));
            }
        }
        anyhow::bail!(
            "no configuration file found (looked for {})",
            SEARCH_PATHS.join(", ")
        )
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_yaml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }
}
