//! # Configuration Management Module
//!
//! Persistent application settings stored in platform-appropriate locations.
//! Handles loading, saving, and providing defaults for configuration options.
//!
//! ## Settings
//! - `device_host`: Host (and optional port) serving the `/ws` telemetry socket
//! - `serial_baud_rate`: Baud rate used when a USB serial port is opened
//! - `enable_autoconnect`: Start the WebSocket channel at launch
//! - `sample_frequency_hz`: Initial value of the device frequency control
//!
//! ## Storage Location
//! - macOS: ~/Library/Application Support/pulse-scope/config.toml
//! - Linux: ~/.config/pulse-scope/config.toml
//! - Windows: %APPDATA%\pulse-scope\config.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use crate::error::ConfigError;
use crate::sample::{MAX_FREQUENCY_HZ, MIN_FREQUENCY_HZ};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device_host: String,
    pub serial_baud_rate: u32,
    pub enable_autoconnect: bool,
    pub sample_frequency_hz: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Soft-AP address of the sensor board
            device_host: "192.168.4.1".to_string(),
            serial_baud_rate: 115_200,
            enable_autoconnect: true,
            sample_frequency_hz: 25,
        }
    }
}

impl Config {
    /// Get the path to the config file
    fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("pulse-scope").join("config.toml")
    }

    /// Load config from the platform location, or create default if it doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from an explicit path, writing the defaults there if missing
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config = toml::from_str(&contents)
                    .map_err(ConfigError::ParseFailed)?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.save_to(path)?;
                Ok(config)
            }
            Err(e) => Err(ConfigError::ReadFailed(e)),
        }
    }

    /// Save config to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(ConfigError::WriteFailed)?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(ConfigError::SerializeFailed)?;
        fs::write(path, toml_string)
            .map_err(ConfigError::WriteFailed)?;

        Ok(())
    }

    /// Frequency clamped to the range the firmware accepts
    pub fn initial_frequency(&self) -> u8 {
        self.sample_frequency_hz.clamp(MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ)
    }
}
