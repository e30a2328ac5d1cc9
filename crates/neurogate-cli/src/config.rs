//! Configuration management for the neurogate CLI

use std::path::Path;

use neurogate_runtime::RuntimeConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CliError, CliResult};

/// CLI configuration file contents
///
/// ```toml
/// log_level = "debug"
///
/// [runtime]
/// initial_neuron_capacity = 100
/// initial_synapse_capacity = 500
///
/// [runtime.arena]
/// byte_limit = 1048576
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Log filter used when neither RUST_LOG nor --verbose is given
    pub log_level: Option<String>,

    /// Runtime settings
    pub runtime: RuntimeConfig,
}

impl CliConfig {
    /// Load configuration from a TOML file; a missing file yields defaults
    pub fn load_from_file(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| CliError::config(format!("Invalid config file: {}", e)))?;
        config.runtime.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise use defaults
    pub fn resolve(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Render as TOML
    pub fn to_toml(&self) -> CliResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CliError::config(format!("Failed to serialize config: {}", e)))
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> CliResult<()> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}
