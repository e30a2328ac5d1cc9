//! Configuration inspection

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::{config::CliConfig, error::CliResult};

/// Show the effective configuration
#[derive(Args, Debug)]
pub struct ConfigCommand {
    /// Print built-in defaults instead of the loaded file
    #[arg(long)]
    pub defaults: bool,

    /// Also write the configuration to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ConfigCommand {
    pub fn execute(self, config: &CliConfig) -> CliResult<()> {
        let config = if self.defaults {
            CliConfig::default()
        } else {
            config.clone()
        };

        print!("{}", config.to_toml()?);
        if let Some(path) = &self.output {
            config.save_to_file(path)?;
            info!("Configuration written to {}", path.display());
        }
        Ok(())
    }
}
