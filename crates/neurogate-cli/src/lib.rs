//! neurogate CLI crate
//!
//! The binary (src/main.rs) wires up logging and argument parsing and calls
//! [`NeurogateCli::execute`]. The command modules are public so integration
//! tests and automation can drive them without spawning a process.
//!
//! Commands (see [commands]):
//! - run: execute a TOML or JSON command script, one JSON result line per command.
//! - scenario: build the two-neuron demo network and trace it step by step.
//! - config: print the effective runtime configuration.

pub mod commands;
pub mod config;
pub mod error;

pub use commands::NeurogateCli;
