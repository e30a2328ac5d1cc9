//! Command script execution

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, ValueEnum};
use neurogate_runtime::{codec, Command, CommandKind, CommandResult, Runtime};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    config::CliConfig,
    error::{CliError, CliResult},
};

/// Script file format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptFormat {
    /// TOML with a `[[commands]]` array
    Toml,
    /// JSON object with a `commands` array
    Json,
}

impl ScriptFormat {
    /// Guess from the file extension; anything but `.json` is TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// A command script
///
/// ```toml
/// [[commands]]
/// kind = "create_neuron"
/// neuron_id = 1
/// neuron_type = "excitatory"
/// activation = "sigmoid"
///
/// [[commands]]
/// kind = "run_simulation"
/// time_step = 1.0
/// num_steps = 10
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Script {
    /// Commands in execution order
    #[serde(default)]
    pub commands: Vec<Command>,
}

impl Script {
    /// Parse script text
    pub fn parse(text: &str, format: ScriptFormat) -> CliResult<Self> {
        Ok(match format {
            ScriptFormat::Toml => toml::from_str(text)?,
            ScriptFormat::Json => serde_json::from_str(text)?,
        })
    }

    /// Read and parse a script file
    pub fn load(path: &Path, format: Option<ScriptFormat>) -> CliResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        Self::parse(&text, format.unwrap_or_else(|| ScriptFormat::from_path(path)))
    }
}

/// One line of `run` output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultLine {
    /// Position in the script
    pub index: usize,
    /// Command kind
    pub kind: CommandKind,
    /// Status code
    pub status: i32,
    /// Result identifier
    pub id: u32,
    /// Result value
    pub value: f32,
}

impl ResultLine {
    fn new(index: usize, kind: CommandKind, result: CommandResult) -> Self {
        Self {
            index,
            kind,
            status: result.status,
            id: result.id,
            value: result.value,
        }
    }
}

/// Execute a command script
#[derive(Args, Debug)]
pub struct RunCommand {
    /// Script file (TOML or JSON)
    pub script: PathBuf,

    /// Script format (guessed from the extension by default)
    #[arg(long, value_enum)]
    pub format: Option<ScriptFormat>,

    /// Send every command through the binary frame codec
    #[arg(long)]
    pub frames: bool,

    /// Exit with an error if any command fails
    #[arg(long)]
    pub strict: bool,
}

impl RunCommand {
    pub fn execute(self, config: &CliConfig) -> CliResult<()> {
        let script = Script::load(&self.script, self.format)?;
        info!(
            "Running {} commands from {}",
            script.commands.len(),
            self.script.display()
        );

        let mut runtime = Runtime::new(config.runtime.clone());
        runtime.init()?;

        let lines = run_script(&mut runtime, &script, self.frames)?;
        for line in &lines {
            println!("{}", serde_json::to_string(line)?);
        }

        let failed = lines.iter().filter(|line| line.status != 0).count();
        if let Some(report) = runtime.teardown() {
            if !report.is_clean() {
                warn!(
                    "Teardown reclaimed {} leaked blocks ({} bytes)",
                    report.blocks, report.bytes
                );
            }
        }
        info!("{} of {} commands succeeded", lines.len() - failed, lines.len());

        if self.strict && failed > 0 {
            return Err(CliError::CommandsFailed {
                failed,
                total: lines.len(),
            });
        }
        Ok(())
    }
}

/// Execute every command in order; a failed command does not stop the script
pub fn run_script(
    runtime: &mut Runtime,
    script: &Script,
    frames: bool,
) -> CliResult<Vec<ResultLine>> {
    script
        .commands
        .iter()
        .enumerate()
        .map(|(index, command)| {
            let result = if frames {
                let reply = runtime.process_frame(&codec::encode_command(command));
                match reply {
                    Ok(reply) => codec::decode_result(&reply)?,
                    Err(e) => {
                        warn!("Frame for command {} rejected: {}", index, e);
                        CommandResult::error(e.status())
                    }
                }
            } else {
                runtime.execute(command)
            };
            Ok(ResultLine::new(index, command.kind, result))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurogate_runtime::STATUS_ERROR;

    const SCRIPT: &str = r#"
        [[commands]]
        kind = "create_neuron"
        neuron_id = 1
        neuron_type = "excitatory"
        activation = "linear"

        [[commands]]
        kind = "create_neuron"
        neuron_id = 1
        neuron_type = "inhibitory"
        activation = "linear"

        [[commands]]
        kind = "get_neuron_state"
        neuron_id = 1

        [[commands]]
        kind = "shutdown"

        [[commands]]
        kind = "noop"
    "#;

    #[test]
    fn test_format_from_path() {
        assert_eq!(ScriptFormat::from_path(Path::new("a.JSON")), ScriptFormat::Json);
        assert_eq!(ScriptFormat::from_path(Path::new("a.toml")), ScriptFormat::Toml);
        assert_eq!(ScriptFormat::from_path(Path::new("script")), ScriptFormat::Toml);
    }

    #[test]
    fn test_failures_do_not_stop_the_script() {
        let script = Script::parse(SCRIPT, ScriptFormat::Toml).unwrap();
        for frames in [false, true] {
            let mut runtime = Runtime::default();
            runtime.init().unwrap();
            let lines = run_script(&mut runtime, &script, frames).unwrap();

            let statuses: Vec<i32> = lines.iter().map(|line| line.status).collect();
            assert_eq!(statuses, vec![0, STATUS_ERROR, 0, 0, STATUS_ERROR]);
            assert_eq!(lines[0].id, 1);
            assert_eq!(lines[2].value, -70.0);
            assert_eq!(lines[4].kind, CommandKind::Noop);
        }
    }

    #[test]
    fn test_json_script() {
        let script = Script::parse(
            r#"{"commands":[{"kind":"run_simulation","time_step":0.5,"num_steps":2}]}"#,
            ScriptFormat::Json,
        )
        .unwrap();
        let mut runtime = Runtime::default();
        runtime.init().unwrap();
        let lines = run_script(&mut runtime, &script, false).unwrap();
        assert_eq!(lines[0].value, 1.0);
    }
}
