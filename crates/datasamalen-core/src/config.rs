//! Configuration defaults and settings loading.
//!
//! Settings come from, in increasing priority: built-in defaults, a TOML file,
//! environment variables. Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Default values.
pub mod defaults {
    /// Column where the comma-separated probe list starts on a client line.
    pub const PROBE_COLUMN: usize = 90;
    /// Exclusive lower bound of a usable power reading (dBm).
    pub const POWER_MIN: i32 = -127;
    /// Exclusive upper bound of a usable power reading (dBm).
    pub const POWER_MAX: i32 = -1;
    /// Trailing window for bearing queries.
    pub const WINDOW_SECS: u64 = 10;
    /// How long a sensor read may block before it counts as "no reading".
    pub const SENSOR_TIMEOUT_MS: u64 = 1000;
    /// Database file used when nothing else is configured.
    pub const DB_PATH: &str = "data/datasamalen.redb";
    /// Config file picked up from the working directory if present.
    pub const CONFIG_FILE: &str = "datasamalen.toml";
}

/// Environment variable names.
pub mod env_vars {
    pub const DB_PATH: &str = "DATASAMALEN_DB";
    pub const SENSOR: &str = "DATASAMALEN_SENSOR";
    pub const SENSOR_TIMEOUT_MS: &str = "DATASAMALEN_SENSOR_TIMEOUT_MS";
    pub const WINDOW_SECS: &str = "DATASAMALEN_WINDOW_SECS";
    pub const LOG_JSON: &str = "DATASAMALEN_LOG_JSON";
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Path of the observation database.
    pub db_path: PathBuf,
    pub sensor: SensorSettings,
    pub query: QuerySettings,
    pub capture: CaptureSettings,
}

/// Directional sensor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    /// Device or file that yields one angle line per capture line.
    /// Unset means angle-free operation.
    pub device: Option<PathBuf>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    pub window_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Abort the capture on the first malformed line instead of skipping it.
    pub strict: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(defaults::DB_PATH),
            sensor: SensorSettings::default(),
            query: QuerySettings::default(),
            capture: CaptureSettings::default(),
        }
    }
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            device: None,
            timeout_ms: defaults::SENSOR_TIMEOUT_MS,
        }
    }
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            window_secs: defaults::WINDOW_SECS,
        }
    }
}

impl Settings {
    /// Parse settings from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load settings from `explicit` (which must exist), or from
    /// [`defaults::CONFIG_FILE`] if present, then apply the environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut settings = match explicit {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                info!(category = "config", "Loading config from: {}", path.display());
                Self::from_toml_str(&content)?
            }
            None => match std::fs::read_to_string(defaults::CONFIG_FILE) {
                Ok(content) => {
                    info!(category = "config", "Loading config from: {}", defaults::CONFIG_FILE);
                    Self::from_toml_str(&content)?
                }
                Err(_) => {
                    debug!(category = "config", "No config file, using defaults");
                    Self::default()
                }
            },
        };
        settings.apply_env_from(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    /// Override fields from environment-style lookups.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(env_vars::DB_PATH) {
            self.db_path = PathBuf::from(path);
        }
        if let Some(device) = lookup(env_vars::SENSOR) {
            self.sensor.device = if device.is_empty() {
                None
            } else {
                Some(PathBuf::from(device))
            };
        }
        if let Some(value) = lookup(env_vars::SENSOR_TIMEOUT_MS) {
            self.sensor.timeout_ms = parse_env(env_vars::SENSOR_TIMEOUT_MS, &value)?;
        }
        if let Some(value) = lookup(env_vars::WINDOW_SECS) {
            self.query.window_secs = parse_env(env_vars::WINDOW_SECS, &value)?;
        }
        Ok(())
    }
}

fn parse_env(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a non-negative integer, got `{}`", name, value)))
}
