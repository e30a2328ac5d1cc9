//! CLI command implementations for neurogate

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::{config::CliConfig, error::CliResult};

pub mod config;
pub mod run;
pub mod scenario;

/// neurogate - drive a spiking network runtime from the command line
#[derive(Parser, Debug)]
#[command(
    name = "neurogate",
    version,
    about = "Drive a spiking network runtime from the command line",
    long_about = "neurogate hosts a single-node spiking network runtime in process. Feed it \
                  command scripts, trace the built-in scenario, or inspect the effective \
                  configuration."
)]
pub struct NeurogateCli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "NEUROGATE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a command script
    Run(run::RunCommand),

    /// Trace the two-neuron demo network
    Scenario(scenario::ScenarioCommand),

    /// Show the effective configuration
    Config(config::ConfigCommand),
}

impl NeurogateCli {
    /// Load the configuration named by `--config`
    pub fn load_config(&self) -> CliResult<CliConfig> {
        CliConfig::resolve(self.config.as_deref())
    }

    /// Execute the CLI command
    pub fn execute(self) -> CliResult<()> {
        let config = self.load_config()?;
        match self.command {
            Commands::Run(cmd) => cmd.execute(&config),
            Commands::Scenario(cmd) => cmd.execute(&config),
            Commands::Config(cmd) => cmd.execute(&config),
        }
    }
}
