//! Irrigation rig configuration.
//!
//! Read once at startup from a JSON file and never mutated afterwards.
//! Every entity the controller drives (the shared pump and one valve per
//! plant) is addressed by a [`GpioRef`].

use core::fmt;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

/// Default location of the rig description, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "api/plants.json";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default consumer label attached to requested lines.
pub const DEFAULT_CONSUMER: &str = "irrigator";

// ---------------------------------------------------------------------------
// Physical addressing
// ---------------------------------------------------------------------------

/// One physical GPIO line: chip identifier plus line offset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GpioRef {
    /// Chip name (`gpiochip0`) or device path (`/dev/gpiochip0`).
    /// An integer `N` in the file is read as `gpiochipN`.
    #[serde(deserialize_with = "chip_id")]
    pub chip: String,
    /// Line offset on the chip.
    #[serde(rename = "gpio")]
    pub line: u32,
}

impl GpioRef {
    pub fn new(chip: impl Into<String>, line: u32) -> Self {
        Self {
            chip: chip.into(),
            line,
        }
    }
}

impl fmt::Display for GpioRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chip, self.line)
    }
}

fn chip_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Name(String),
        Index(u32),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Name(name) => name,
        Raw::Index(index) => format!("gpiochip{index}"),
    })
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// The shared water-supply relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PumpConfig {
    #[serde(flatten)]
    pub gpio: GpioRef,
}

/// One irrigation zone: a valve relay with its own HTTP trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantConfig {
    pub name: String,
    /// Exact HTTP path that triggers this zone.
    pub path: String,
    /// Watering time in seconds.
    pub duration: u64,
    #[serde(flatten)]
    pub gpio: GpioRef,
}

impl PlantConfig {
    /// Watering time as a [`Duration`].
    pub fn hold(&self) -> Duration {
        Duration::from_secs(self.duration)
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
        }
    }
}

// ---------------------------------------------------------------------------
// Rig configuration
// ---------------------------------------------------------------------------

/// Complete rig description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrrigationConfig {
    pub pump: PumpConfig,
    /// Zones in configuration order; lines are requested in this order.
    pub plants: Vec<PlantConfig>,
    #[serde(default)]
    pub server: ServerConfig,
    /// Relay boards energize on a low line (the common opto-isolated kind).
    #[serde(default = "default_active_low")]
    pub active_low: bool,
    /// Consumer label reported to the kernel for every requested line.
    #[serde(default = "default_consumer")]
    pub consumer: String,
}

fn default_active_low() -> bool {
    true
}

fn default_consumer() -> String {
    DEFAULT_CONSUMER.to_owned()
}

impl IrrigationConfig {
    /// Read, parse, and validate the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&raw)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        for path in config.duplicate_paths() {
            warn!("config: path {path} is defined more than once, first plant wins");
        }
        Ok(config)
    }

    /// Range and consistency checks.
    ///
    /// Duplicate HTTP paths are tolerated (see [`duplicate_paths`](Self::duplicate_paths));
    /// duplicate line addresses are not, since a line can only be held once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.plants.is_empty() {
            return Err(ConfigError::Invalid("no plants configured".into()));
        }

        let mut seen = BTreeSet::new();
        seen.insert(&self.pump.gpio);

        for plant in &self.plants {
            if plant.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "plant on {} has an empty name",
                    plant.gpio
                )));
            }
            if !plant.path.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "plant '{}': path {:?} must start with '/'",
                    plant.name, plant.path
                )));
            }
            if plant.duration == 0 {
                return Err(ConfigError::Invalid(format!(
                    "plant '{}': duration must be at least one second",
                    plant.name
                )));
            }
            if !seen.insert(&plant.gpio) {
                return Err(ConfigError::Invalid(format!(
                    "plant '{}': line {} is already assigned",
                    plant.name, plant.gpio
                )));
            }
        }
        Ok(())
    }

    /// HTTP paths configured for more than one plant.
    pub fn duplicate_paths(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        let mut dupes = BTreeSet::new();
        for plant in &self.plants {
            if !seen.insert(plant.path.as_str()) {
                dupes.insert(plant.path.as_str());
            }
        }
        dupes.into_iter().collect()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from loading the rig description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The file could not be read.
    Unreadable { path: String, reason: String },
    /// The file is not valid JSON or does not match the schema.
    Malformed(String),
    /// A value failed validation.  The message names the field.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable { path, reason } => write!(f, "cannot read {path}: {reason}"),
            Self::Malformed(msg) => write!(f, "malformed: {msg}"),
            Self::Invalid(msg) => write!(f, "invalid: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
