//! Two-neuron demo scenario
//!
//! Builds neurons 1 and 2, the edge 1 -> 2 and excitatory synapse 1, then
//! drives neuron 1 with a constant input and prints one JSON line per step.

use clap::Args;
use neurogate_runtime::{
    ActivationFunction, Command, NeuronId, NeuronType, Runtime, SynapseType,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    config::CliConfig,
    error::{CliError, CliResult},
};

const SOURCE: u32 = 1;
const TARGET: u32 = 2;
const SYNAPSE: u32 = 1;

/// Trace the two-neuron demo network
#[derive(Args, Debug)]
pub struct ScenarioCommand {
    /// Number of steps
    #[arg(short, long, default_value_t = 10)]
    pub steps: u32,

    /// Input added to neuron 1 before every step
    #[arg(short, long, default_value_t = 10.0, allow_negative_numbers = true)]
    pub input: f32,

    /// Step size
    #[arg(long, default_value_t = 1.0)]
    pub dt: f32,
}

/// One line of `scenario` output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepLine {
    /// Step number, from 1
    pub step: u32,
    /// Clock after the step
    pub time: f32,
    /// Potential of neuron 1
    pub source_potential: f32,
    /// Potential of neuron 2
    pub target_potential: f32,
    /// Whether neuron 1 fired during the step
    pub source_fired: bool,
}

impl ScenarioCommand {
    pub fn execute(self, config: &CliConfig) -> CliResult<()> {
        if self.steps == 0 {
            return Err(CliError::invalid_args("--steps must be at least 1"));
        }

        let mut runtime = Runtime::new(config.runtime.clone());
        runtime.init()?;
        let lines = trace(&mut runtime, self.steps, self.input, self.dt)?;
        for line in &lines {
            println!("{}", serde_json::to_string(line)?);
        }

        let spikes = lines.iter().filter(|line| line.source_fired).count();
        info!("Neuron {} fired {} times in {} steps", SOURCE, spikes, self.steps);
        runtime.teardown();
        Ok(())
    }
}

/// Build the demo network on an initialized runtime
pub fn build(runtime: &mut Runtime) -> CliResult<()> {
    for id in [SOURCE, TARGET] {
        runtime.dispatch(&Command::create_neuron(
            id,
            NeuronType::Excitatory,
            ActivationFunction::Sigmoid,
        ))?;
    }
    runtime.dispatch(&Command::connect_neurons(SOURCE, TARGET))?;
    runtime.dispatch(&Command::create_synapse(
        SYNAPSE,
        SOURCE,
        TARGET,
        SynapseType::Excitatory,
    ))?;
    Ok(())
}

/// Build the network and run `steps` steps, driving neuron 1 with `input`
pub fn trace(runtime: &mut Runtime, steps: u32, input: f32, dt: f32) -> CliResult<Vec<StepLine>> {
    build(runtime)?;

    let mut lines = Vec::new();
    for step in 1..=steps {
        runtime.step_with_inputs(&[input], dt)?;
        let time = runtime.time();
        let potential = |id| {
            runtime
                .neuron(NeuronId::new(id))
                .map(|neuron| neuron.potential)
                .unwrap_or(f32::NAN)
        };
        let source_fired = runtime
            .neuron(NeuronId::new(SOURCE))
            .is_some_and(|neuron| neuron.last_fired() == time);

        lines.push(StepLine {
            step,
            time,
            source_potential: potential(SOURCE),
            target_potential: potential(TARGET),
            source_fired,
        });
    }
    Ok(lines)
}
