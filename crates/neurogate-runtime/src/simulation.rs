//! Discrete-time step executor
//!
//! One step advances the clock by `dt`, then visits every neuron in registry
//! order: integrate and leak with no external input, try to fire, and on a
//! spike push a unit signal through each outbound edge. A signal reaches its
//! target through the first synapse carrying that (pre, post) pair and is
//! added straight to the target's potential. Targets later in the order see
//! that input within the same step; earlier ones see it on the next.

use crate::{error::*, registry::Registry, NeuronId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Signal carried into a synapse when its presynaptic neuron fires
pub const SPIKE_AMPLITUDE: f32 = 1.0;

/// Simulation clock, starting at zero
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulationClock {
    time: f32,
}

impl SimulationClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulation time
    pub fn now(&self) -> f32 {
        self.time
    }

    /// Advance by `dt` and return the new time
    pub fn advance(&mut self, dt: f32) -> f32 {
        self.time += dt;
        self.time
    }

    /// Rewind to zero
    pub fn reset(&mut self) {
        self.time = 0.0;
    }
}

/// Parameters for a multi-step run
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunParams {
    /// Step size (time units)
    pub time_step: f32,
    /// Number of steps
    pub num_steps: u32,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            time_step: 1.0,
            num_steps: 1,
        }
    }
}

impl RunParams {
    /// Create run parameters with validation
    pub fn new(time_step: f32, num_steps: u32) -> Result<Self> {
        if !time_step.is_finite() || time_step <= 0.0 {
            return Err(RuntimeError::invalid_parameter(
                "time_step",
                time_step.to_string(),
                "finite and > 0",
            ));
        }
        if num_steps == 0 {
            return Err(RuntimeError::invalid_parameter("num_steps", "0", "> 0"));
        }
        Ok(Self {
            time_step,
            num_steps,
        })
    }

    /// Replace a non-positive step size with 1.0 and a zero step count with 1
    pub fn normalized(time_step: f32, num_steps: u32) -> Self {
        let defaults = Self::default();
        Self {
            time_step: if time_step > 0.0 {
                time_step
            } else {
                defaults.time_step
            },
            num_steps: if num_steps > 0 {
                num_steps
            } else {
                defaults.num_steps
            },
        }
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        Self::new(self.time_step, self.num_steps)?;
        Ok(())
    }
}

/// A recorded spike
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Spike {
    /// Neuron that fired
    pub neuron_id: NeuronId,
    /// Time of the spike
    pub time: f32,
}

/// Outcome of a single step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Clock value the step ran at
    pub time: f32,
    /// Neurons that fired, in visit order
    pub fired: Vec<NeuronId>,
}

/// Outcome of a multi-step run
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunSummary {
    /// All spikes, in order
    pub spikes: Vec<Spike>,
    /// Number of steps executed
    pub steps_executed: u32,
    /// Clock value after the last step
    pub final_time: f32,
    /// Total spike count
    pub total_spikes: usize,
}

impl RunSummary {
    /// Spikes emitted by one neuron
    pub fn spikes_for_neuron(&self, neuron_id: NeuronId) -> Vec<&Spike> {
        self.spikes
            .iter()
            .filter(|spike| spike.neuron_id == neuron_id)
            .collect()
    }

    /// Spikes per time unit for one neuron over the run
    pub fn firing_rate(&self, neuron_id: NeuronId, time_step: f32) -> f32 {
        let duration = self.steps_executed as f32 * time_step;
        if duration <= 0.0 {
            return 0.0;
        }
        self.spikes_for_neuron(neuron_id).len() as f32 / duration
    }

    /// Export spikes as `(time, neuron_id)` pairs
    pub fn export_spikes(&self) -> Vec<(f32, u32)> {
        self.spikes
            .iter()
            .map(|spike| (spike.time, spike.neuron_id.raw()))
            .collect()
    }
}

/// Run one step
pub fn step(registry: &mut Registry, clock: &mut SimulationClock, dt: f32) -> StepReport {
    advance(registry, clock, dt, None)
}

/// Add `inputs[i]` to the potential of the `i`-th live neuron, then run one step
///
/// Returns one activation per live neuron in registry order. Inputs past the
/// live neuron count are ignored.
pub fn step_with_inputs(
    registry: &mut Registry,
    clock: &mut SimulationClock,
    inputs: &[f32],
    dt: f32,
) -> (StepReport, Vec<f32>) {
    for (neuron, &input) in registry.neurons_mut().iter_mut().zip(inputs) {
        neuron.potential += input;
    }

    let mut outputs = Vec::with_capacity(registry.neurons().len());
    let report = advance(registry, clock, dt, Some(&mut outputs));
    (report, outputs)
}

/// Run `params.num_steps` steps
pub fn run(registry: &mut Registry, clock: &mut SimulationClock, params: RunParams) -> RunSummary {
    log::info!(
        "Running simulation for {} steps with time step {:.2}",
        params.num_steps,
        params.time_step
    );

    let mut summary = RunSummary::default();
    for _ in 0..params.num_steps {
        let report = step(registry, clock, params.time_step);
        summary.spikes.extend(report.fired.into_iter().map(|neuron_id| Spike {
            neuron_id,
            time: report.time,
        }));
    }

    summary.steps_executed = params.num_steps;
    summary.final_time = clock.now();
    summary.total_spikes = summary.spikes.len();

    log::info!("Simulation completed at time {:.2}", summary.final_time);
    summary
}

fn advance(
    registry: &mut Registry,
    clock: &mut SimulationClock,
    dt: f32,
    mut outputs: Option<&mut Vec<f32>>,
) -> StepReport {
    let time = clock.advance(dt);
    let mut fired = Vec::new();

    for index in 0..registry.neurons().slot_count() {
        let Some(neuron) = registry.neurons_mut().at_mut(index) else {
            continue;
        };

        let activation = neuron.compute(0.0, dt);
        if let Some(outputs) = outputs.as_deref_mut() {
            outputs.push(activation);
        }
        if !neuron.fire(time) {
            continue;
        }

        let source = neuron.id();
        let targets = neuron.connections().to_vec();
        fired.push(source);
        propagate(registry, source, &targets, time);
    }

    log::trace!("Step at {:.2}: {} spikes", time, fired.len());
    StepReport { time, fired }
}

fn propagate(registry: &mut Registry, source: NeuronId, targets: &[NeuronId], time: f32) {
    for &target in targets {
        let Some(target_index) = registry.neurons().position(target) else {
            log::trace!("Skipping edge {} -> {}: target not found", source, target);
            continue;
        };
        let Some(synapse_index) = registry.synapse_between(source, target) else {
            log::trace!("Skipping edge {} -> {}: no synapse", source, target);
            continue;
        };

        let signal = registry
            .synapses_mut()
            .at_mut(synapse_index)
            .map_or(0.0, |synapse| synapse.activate(SPIKE_AMPLITUDE, time));
        if let Some(neuron) = registry.neurons_mut().at_mut(target_index) {
            neuron.potential += signal;
        }
    }
}
