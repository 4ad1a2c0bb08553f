//! Configuration builder
//!
//! Merges configuration from files and CLI arguments.

use crate::config::{Config, ConfigFile};
use crate::error::ConfigError;

/// Builder for merging configuration sources
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Load configuration from `path`, or from the default locations
    ///
    /// An explicit path must exist; missing default files are not an error.
    pub fn with_file(mut self, path: Option<&str>) -> Result<Self, ConfigError> {
        let file_config = match path {
            Some(path) => Some(ConfigFile::load(path)?),
            None => ConfigFile::load_default()?,
        };

        if let Some(cfg) = file_config {
            self.config = cfg;
        }

        Ok(self)
    }

    /// Override with CLI verbose flag
    pub fn with_verbose(mut self, verbose: Option<bool>) -> Self {
        if let Some(v) = verbose {
            self.config.general.verbose = v;
        }
        self
    }

    /// Put a CLI library path ahead of the configured ones
    pub fn with_library(mut self, path: Option<String>) -> Self {
        if let Some(p) = path {
            self.config.library.paths.retain(|existing| existing != &p);
            self.config.library.paths.insert(0, p);
        }
        self
    }

    /// Override with CLI event timeout
    pub fn with_event_timeout(mut self, timeout_ms: Option<u64>) -> Self {
        if let Some(t) = timeout_ms {
            self.config.events.timeout_ms = t;
        }
        self
    }

    /// Build and validate the final configuration
    pub fn build(self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
