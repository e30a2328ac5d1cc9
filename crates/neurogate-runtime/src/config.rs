//! Runtime configuration

use crate::error::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default number of neuron slots reserved at init
pub const DEFAULT_NEURON_CAPACITY: usize = 100;

/// Default number of synapse slots reserved at init
pub const DEFAULT_SYNAPSE_CAPACITY: usize = 500;

/// Tracked arena configuration
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ArenaConfig {
    /// Upper bound on live bytes (None = unlimited)
    pub byte_limit: Option<usize>,
}

impl ArenaConfig {
    /// Create an arena configuration with a byte limit
    pub fn with_limit(byte_limit: usize) -> Result<Self> {
        let config = Self {
            byte_limit: Some(byte_limit),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if self.byte_limit == Some(0) {
            return Err(RuntimeError::invalid_parameter("byte_limit", "0", "> 0"));
        }
        Ok(())
    }
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RuntimeConfig {
    /// Neuron slots reserved at init
    pub initial_neuron_capacity: usize,
    /// Synapse slots reserved at init
    pub initial_synapse_capacity: usize,
    /// Arena settings
    pub arena: ArenaConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            initial_neuron_capacity: DEFAULT_NEURON_CAPACITY,
            initial_synapse_capacity: DEFAULT_SYNAPSE_CAPACITY,
            arena: ArenaConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Set initial collection capacities
    pub fn with_capacities(mut self, neurons: usize, synapses: usize) -> Self {
        self.initial_neuron_capacity = neurons;
        self.initial_synapse_capacity = synapses;
        self
    }

    /// Set the arena configuration
    pub fn with_arena(mut self, arena: ArenaConfig) -> Self {
        self.arena = arena;
        self
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if self.initial_neuron_capacity == 0 {
            return Err(RuntimeError::invalid_parameter(
                "initial_neuron_capacity",
                "0",
                "> 0",
            ));
        }
        if self.initial_synapse_capacity == 0 {
            return Err(RuntimeError::invalid_parameter(
                "initial_synapse_capacity",
                "0",
                "> 0",
            ));
        }
        self.arena.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.initial_neuron_capacity, 100);
        assert_eq!(config.initial_synapse_capacity, 500);
        assert_eq!(config.arena.byte_limit, None);
    }

    #[test]
    fn test_config_validation() {
        let config = RuntimeConfig::default().with_capacities(0, 10);
        assert!(config.validate().is_err());

        let config = RuntimeConfig::default().with_capacities(10, 0);
        assert!(config.validate().is_err());

        assert!(ArenaConfig::with_limit(0).is_err());
        assert!(ArenaConfig::with_limit(4096).is_ok());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{ "initial_neuron_capacity": 8 }"#).unwrap();
        assert_eq!(config.initial_neuron_capacity, 8);
        assert_eq!(config.initial_synapse_capacity, DEFAULT_SYNAPSE_CAPACITY);
    }
}
