use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::channel::SignalSettings;

const CONFIG_DIR: &str = "radiomux";
const CONFIG_FILE: &str = "driver.toml";

/// Signal kind that supports toggle-bit emulation
pub const PRONTO_HEX: &str = "prontohex";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Radio-level options of a signal definition
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct SignalOptions {
    /// Prefix of numeric key commands (`number_0` ... `number_9`)
    pub cmd_number_prefix: String,

    /// Minimum spacing between two transmissions, in milliseconds
    pub min_tx_interval_ms: u64,

    /// Alternate between the base code and its `_1_` variant on every send
    pub emulate_toggle_bits: bool,
}

impl Default for SignalOptions {
    fn default() -> Self {
        Self {
            cmd_number_prefix: "number_".to_string(),
            min_tx_interval_ms: 100,
            emulate_toggle_bits: false,
        }
    }
}

/// The radio configuration and command list of a device family
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SignalDefinition {
    /// Channel key shared by every driver using this radio configuration
    pub id: String,

    /// Signal kind, e.g. `ir`, `433`, `prontohex`
    #[serde(rename = "type")]
    pub kind: String,

    pub cmds: Vec<String>,

    #[serde(default)]
    pub options: SignalOptions,

    /// Reference order of bare commands; empty keeps list order
    #[serde(default)]
    pub cmd_order: Vec<String>,
}

/// Configuration of one command driver
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DriverConfig {
    /// Driver family name, also the label namespace
    pub id: String,

    /// Default device type for devices added without one
    #[serde(default)]
    pub cmd_type: Option<String>,

    #[serde(default)]
    pub cmd_sub_type: Option<String>,

    /// Debounce timeout of inbound commands, in milliseconds
    #[serde(default = "default_debounce_time_ms")]
    pub debounce_time_ms: u64,

    pub signal: SignalDefinition,
}

fn default_debounce_time_ms() -> u64 {
    500
}

impl DriverConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        debug!(
            "Parsed driver config {} with {} commands",
            config.id,
            config.signal.cmds.len()
        );
        Ok(config)
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading driver config from {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&content)
    }

    /// `<config dir>/radiomux/driver.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn signal_settings(&self) -> SignalSettings {
        SignalSettings {
            debounce_time: Duration::from_millis(self.debounce_time_ms),
            min_tx_interval: Duration::from_millis(self.signal.options.min_tx_interval_ms),
        }
    }

    pub fn emulates_toggle_bits(&self) -> bool {
        self.signal.kind == PRONTO_HEX && self.signal.options.emulate_toggle_bits
    }

    /// The numeric key commands present in the list, in list order
    pub fn number_commands(&self) -> Vec<&str> {
        let prefix = self.signal.options.cmd_number_prefix.as_str();
        self.signal
            .cmds
            .iter()
            .map(String::as_str)
            .filter(|cmd| {
                cmd.strip_prefix(prefix)
                    .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        id = "lg_tv"

        [signal]
        id = "nec"
        type = "ir"
        cmds = ["POWER_ON", "number_1", "number_2", "number_x"]
    "#;

    #[test]
    fn defaults_apply() {
        let config = DriverConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.debounce_time_ms, 500);
        assert_eq!(config.cmd_type, None);
        assert_eq!(config.signal.options, SignalOptions::default());

        let settings = config.signal_settings();
        assert_eq!(settings.debounce_time, Duration::from_millis(500));
        assert_eq!(settings.min_tx_interval, Duration::from_millis(100));
        assert!(!config.emulates_toggle_bits());
    }

    #[test]
    fn number_commands_use_prefix() {
        let config = DriverConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.number_commands(), vec!["number_1", "number_2"]);
    }

    #[test]
    fn toggle_bits_need_prontohex() {
        let config = DriverConfig::from_toml_str(
            r#"
            id = "philips"
            cmd_type = "tv"
            debounce_time_ms = 250

            [signal]
            id = "rc5"
            type = "prontohex"
            cmds = ["tv$~POWER", "tv$~POWER_1_"]

            [signal.options]
            min_tx_interval_ms = 250
            emulate_toggle_bits = true
            "#,
        )
        .unwrap();
        assert!(config.emulates_toggle_bits());
        assert_eq!(config.signal.options.cmd_number_prefix, "number_");
        assert_eq!(config.signal_settings().debounce_time, Duration::from_millis(250));
    }

    #[test]
    fn parse_errors_surface() {
        assert!(matches!(
            DriverConfig::from_toml_str("id = 3"),
            Err(ConfigError::Parse(_))
        ));
    }
}
