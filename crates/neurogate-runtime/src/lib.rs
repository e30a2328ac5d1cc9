//! Spiking neural network runtime behind a command interface
//!
//! This crate hosts a single-node network of leaky neurons connected by
//! delay-gated, optionally plastic synapses. Every object draws its storage
//! from a tracked arena that can report usage and leaks at any time. Callers
//! drive the network through [`Command`]s, either directly or as checksummed
//! binary frames via [`codec`].

#![deny(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod arena;
pub mod codec;
pub mod command;
pub mod config;
pub mod error;
pub mod ids;
pub mod neuron;
pub mod plasticity;
pub mod registry;
pub mod runtime;
pub mod simulation;
pub mod synapse;

// Re-export essential types
pub use arena::{BlockHandle, LeakReport, TrackedArena};
pub use command::{Command, CommandKind, CommandParams, CommandResult};
pub use config::{ArenaConfig, RuntimeConfig};
pub use error::{Result, RuntimeError, STATUS_ERROR, STATUS_OK};
pub use ids::{NeuronId, SynapseId};
pub use neuron::{ActivationFunction, Neuron, NeuronParam, NeuronType};
pub use plasticity::{PlasticityMode, PlasticityRule, StdpParams, StdpRule};
pub use registry::Registry;
pub use runtime::{MemoryStats, Runtime};
pub use simulation::{RunParams, RunSummary, SimulationClock, Spike};
pub use synapse::{Synapse, SynapseType};

/// Binary frame format version, see [`codec`]
pub const FRAME_VERSION: u8 = codec::FRAME_VERSION;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_integration() {
        let config = RuntimeConfig::default();
        assert_eq!(config.initial_neuron_capacity, 100);
        assert_eq!(config.initial_synapse_capacity, 500);

        let stdp = StdpParams::default();
        assert!(stdp.learning_rate > 0.0);

        let params = RunParams::default();
        assert!(params.time_step > 0.0);

        let mut runtime = Runtime::new(config);
        runtime.init().unwrap();
        assert!(runtime.execute(&Command::new(CommandKind::Noop)).is_ok());
    }
}
