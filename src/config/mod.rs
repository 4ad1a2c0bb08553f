//! Configuration system
//!
//! Handles TOML config file parsing and CLI argument merging.

pub mod builder;
pub mod file;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;

use crate::dl::LibraryLoader;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// Where to find the NVML library
    pub library: LibraryConfig,
    /// Event watching settings
    pub events: EventsConfig,
}

impl Config {
    /// Check values serde cannot check on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(index) = self.library.paths.iter().position(|p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                key: format!("library.paths[{}]", index),
                message: "path must not be empty".to_string(),
            });
        }

        if self.events.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "events.timeout_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Loader trying the configured paths before the default sonames
    pub fn loader(&self) -> LibraryLoader {
        LibraryLoader::new().with_paths(self.library.paths.iter().cloned())
    }
}

/// General configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,
}

/// Library location configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Explicit library paths, tried in order
    pub paths: Vec<String>,
}

/// Event watching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// How long one wait blocks, in milliseconds
    pub timeout_ms: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { timeout_ms: 1000 }
    }
}

impl EventsConfig {
    /// Wait timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
