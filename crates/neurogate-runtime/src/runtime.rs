//! Runtime context and command dispatcher
//!
//! A [`Runtime`] owns the arena, the registry and the clock. Commands are
//! validated in a fixed order: initialized, running, required parameters
//! present, referenced objects exist, then uniqueness. The first failure wins
//! and nothing is mutated.

use crate::{
    arena::{LeakReport, TrackedArena},
    codec,
    command::{Command, CommandKind, CommandResult},
    config::RuntimeConfig,
    error::*,
    neuron::Neuron,
    plasticity::PlasticityMode,
    registry::Registry,
    simulation::{self, RunParams, RunSummary, SimulationClock},
    synapse::Synapse,
    NeuronId, SynapseId,
};

/// Arena usage snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Live bytes
    pub used_bytes: usize,
    /// Live blocks
    pub live_blocks: usize,
}

#[derive(Debug)]
struct Core {
    arena: TrackedArena,
    registry: Registry,
    clock: SimulationClock,
}

/// Simulation runtime
///
/// Starts uninitialized; [`Runtime::init`] builds the arena and registry and
/// [`Runtime::teardown`] releases them again.
#[derive(Debug)]
pub struct Runtime {
    config: RuntimeConfig,
    core: Option<Core>,
    running: bool,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl Runtime {
    /// Create an uninitialized runtime
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            core: None,
            running: false,
        }
    }

    /// Configuration this runtime initializes with
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Build the arena and registry and start accepting commands
    ///
    /// Calling this on an initialized runtime only logs a warning.
    pub fn init(&mut self) -> Result<()> {
        if self.core.is_some() {
            log::warn!("Runtime already initialized");
            return Ok(());
        }
        self.config.validate()?;

        let mut arena = TrackedArena::new(self.config.arena.clone())?;
        let registry = Registry::new(&mut arena, &self.config)?;
        self.core = Some(Core {
            arena,
            registry,
            clock: SimulationClock::new(),
        });
        self.running = true;

        log::info!(
            "Runtime initialized with capacity for {} neurons and {} synapses",
            self.config.initial_neuron_capacity,
            self.config.initial_synapse_capacity
        );
        Ok(())
    }

    /// Destroy everything and reclaim the arena
    ///
    /// Returns `None` if the runtime was not initialized. The runtime can be
    /// initialized again afterwards.
    pub fn teardown(&mut self) -> Option<LeakReport> {
        let Core {
            mut arena,
            registry,
            ..
        } = self.core.take()?;
        self.running = false;

        if let Err(e) = registry.destroy(&mut arena) {
            log::error!("Error while destroying registry: {}", e);
        }
        let report = arena.cleanup();
        log::info!("Runtime cleaned up");
        Some(report)
    }

    /// Whether `init` has run without a later teardown
    pub fn is_initialized(&self) -> bool {
        self.core.is_some()
    }

    /// Whether commands are being accepted
    pub fn is_running(&self) -> bool {
        self.core.is_some() && self.running
    }

    /// Execute a command, mapping any failure to an error status
    pub fn execute(&mut self, command: &Command) -> CommandResult {
        match self.dispatch(command) {
            Ok(result) => result,
            Err(e) => {
                log::error!("Command {} failed: {}", command.kind, e);
                CommandResult::error(e.status())
            }
        }
    }

    /// Execute a command, keeping the error
    pub fn dispatch(&mut self, command: &Command) -> Result<CommandResult> {
        self.live_core()?;
        if command.kind == CommandKind::Shutdown {
            self.running = false;
            log::info!("Runtime shutdown requested");
            return Ok(CommandResult::ok());
        }

        let core = self.live_core()?;
        match command.kind {
            CommandKind::Noop | CommandKind::Shutdown => Ok(CommandResult::ok()),
            CommandKind::CreateNeuron => core.create_neuron(command),
            CommandKind::DeleteNeuron => core.delete_neuron(command),
            CommandKind::ConnectNeurons => core.connect_neurons(command),
            CommandKind::CreateSynapse => core.create_synapse(command),
            CommandKind::RunSimulation => core.run_simulation(command),
            CommandKind::GetNeuronState => core.get_neuron_state(command),
            CommandKind::SetNeuronParam => core.set_neuron_param(command),
            CommandKind::ResetSimulation => {
                core.reset();
                Ok(CommandResult::ok())
            }
            CommandKind::GetMemoryStats => {
                let used = core.arena.used_bytes();
                log::info!("Memory in use: {} bytes", used);
                Ok(CommandResult::with_value(0, used as f32))
            }
        }
    }

    /// Decode a command frame, execute it and encode the result
    ///
    /// Malformed or corrupted frames are rejected with an error. A well-formed
    /// frame always produces a result frame, carrying an error status if the
    /// command failed or named an unknown enum code.
    pub fn process_frame(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
        self.live_core()?;
        let result = match codec::decode_command(frame) {
            Ok(command) => self.execute(&command),
            Err(e @ (RuntimeError::InvalidFrame { .. } | RuntimeError::ChecksumMismatch { .. })) => {
                log::error!("Rejected frame: {}", e);
                return Err(e);
            }
            Err(e) => {
                log::error!("Rejected command: {}", e);
                CommandResult::error(e.status())
            }
        };
        Ok(codec::encode_result(&result))
    }

    /// Add `inputs[i]` to the `i`-th live neuron, step once and return one
    /// activation per live neuron
    pub fn step_with_inputs(&mut self, inputs: &[f32], time_step: f32) -> Result<Vec<f32>> {
        let core = self.live_core()?;
        let params = RunParams::normalized(time_step, 1);
        let (_, outputs) = simulation::step_with_inputs(
            &mut core.registry,
            &mut core.clock,
            inputs,
            params.time_step,
        );
        Ok(outputs)
    }

    /// Run a simulation and return every spike it produced
    pub fn run(&mut self, params: RunParams) -> Result<RunSummary> {
        let core = self.live_core()?;
        params.validate()?;
        Ok(simulation::run(&mut core.registry, &mut core.clock, params))
    }

    /// Remove the edge `source -> target`
    ///
    /// Returns `false` if there was no such edge.
    pub fn disconnect_neurons(&mut self, source: NeuronId, target: NeuronId) -> Result<bool> {
        let core = self.live_core()?;
        core.registry.disconnect(&mut core.arena, source, target)
    }

    /// Destroy a synapse
    pub fn delete_synapse(&mut self, id: SynapseId) -> Result<()> {
        let core = self.live_core()?;
        core.registry.remove_synapse(&mut core.arena, id)
    }

    /// Change a synapse's plasticity mode
    pub fn set_synapse_plasticity(&mut self, id: SynapseId, mode: PlasticityMode) -> Result<()> {
        self.live_synapse_mut(id)?.plasticity = mode;
        Ok(())
    }

    /// Apply one spike pairing to a synapse's weight; returns the new weight
    pub fn apply_spike_timing(
        &mut self,
        id: SynapseId,
        pre_spike_time: f32,
        post_spike_time: f32,
    ) -> Result<f32> {
        self.live_core()?;
        finite("pre_spike_time", pre_spike_time)?;
        finite("post_spike_time", post_spike_time)?;
        let synapse = self.live_synapse_mut(id)?;
        synapse.update_weight(pre_spike_time, post_spike_time);
        Ok(synapse.weight())
    }

    /// Neuron with `id`
    pub fn neuron(&self, id: NeuronId) -> Option<&Neuron> {
        self.core.as_ref()?.registry.neuron(id)
    }

    /// Synapse with `id`
    pub fn synapse(&self, id: SynapseId) -> Option<&Synapse> {
        self.core.as_ref()?.registry.synapse(id)
    }

    /// Live neuron count
    pub fn neuron_count(&self) -> usize {
        self.core.as_ref().map_or(0, |core| core.registry.neurons().len())
    }

    /// Live synapse count
    pub fn synapse_count(&self) -> usize {
        self.core.as_ref().map_or(0, |core| core.registry.synapses().len())
    }

    /// Current simulation time
    pub fn time(&self) -> f32 {
        self.core.as_ref().map_or(0.0, |core| core.clock.now())
    }

    /// Arena usage
    pub fn memory_stats(&self) -> MemoryStats {
        self.core.as_ref().map_or_else(MemoryStats::default, |core| MemoryStats {
            used_bytes: core.arena.used_bytes(),
            live_blocks: core.arena.live_block_count(),
        })
    }

    /// Registry access for inspection
    pub fn registry(&self) -> Option<&Registry> {
        self.core.as_ref().map(|core| &core.registry)
    }

    /// Arena access for inspection
    pub fn arena(&self) -> Option<&TrackedArena> {
        self.core.as_ref().map(|core| &core.arena)
    }

    fn live_core(&mut self) -> Result<&mut Core> {
        let core = self.core.as_mut().ok_or(RuntimeError::NotInitialized)?;
        if !self.running {
            return Err(RuntimeError::NotRunning);
        }
        Ok(core)
    }

    fn live_synapse_mut(&mut self, id: SynapseId) -> Result<&mut Synapse> {
        self.live_core()?
            .registry
            .synapse_mut(id)
            .ok_or(RuntimeError::SynapseNotFound { synapse_id: id.raw() })
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if let Some(report) = self.teardown() {
            if !report.is_clean() {
                log::warn!("Runtime dropped with {} live blocks", report.blocks);
            }
        }
    }
}

fn finite(name: &str, value: f32) -> Result<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RuntimeError::invalid_parameter(name, value.to_string(), "finite"))
    }
}

impl Core {
    fn create_neuron(&mut self, command: &Command) -> Result<CommandResult> {
        let p = &command.params;
        let id = NeuronId::new(command.require(p.neuron_id, "neuron_id")?);
        let kind = command.require(p.neuron_type, "neuron_type")?;
        let activation = command.require(p.activation, "activation")?;

        let neuron = self.registry.add_neuron(&mut self.arena, id, kind, activation)?;
        if let Some(threshold) = p.threshold {
            neuron.threshold = threshold;
        }
        if let Some(rest_potential) = p.rest_potential {
            neuron.rest_potential = rest_potential;
        }
        if let Some(refractory_period) = p.refractory_period {
            neuron.refractory_period = refractory_period;
        }

        Ok(CommandResult::with_id(id.raw()))
    }

    fn delete_neuron(&mut self, command: &Command) -> Result<CommandResult> {
        let id = NeuronId::new(command.require(command.params.neuron_id, "neuron_id")?);
        self.registry.remove_neuron(&mut self.arena, id)?;
        Ok(CommandResult::ok())
    }

    fn connect_neurons(&mut self, command: &Command) -> Result<CommandResult> {
        let p = &command.params;
        let source = NeuronId::new(command.require(p.neuron_id, "neuron_id")?);
        let target = NeuronId::new(command.require(p.target_id, "target_id")?);
        self.registry.connect(&mut self.arena, source, target)?;
        Ok(CommandResult::ok())
    }

    fn create_synapse(&mut self, command: &Command) -> Result<CommandResult> {
        let p = &command.params;
        let id = SynapseId::new(command.require(p.synapse_id, "synapse_id")?);
        let pre = NeuronId::new(command.require(p.neuron_id, "neuron_id")?);
        let post = NeuronId::new(command.require(p.target_id, "target_id")?);
        let kind = command.require(p.synapse_type, "synapse_type")?;
        let weight = p.weight.map(|w| finite("weight", w)).transpose()?;
        let delay = p.delay.map(|d| finite("delay", d)).transpose()?;

        for endpoint in [pre, post] {
            if self.registry.neuron(endpoint).is_none() {
                return Err(RuntimeError::NeuronNotFound {
                    neuron_id: endpoint.raw(),
                });
            }
        }

        let synapse = self
            .registry
            .add_synapse(&mut self.arena, id, pre, post, kind)?;
        if let Some(weight) = weight {
            synapse.set_weight(weight);
        }
        if let Some(delay) = delay {
            synapse.delay = delay;
        }

        Ok(CommandResult::with_id(id.raw()))
    }

    fn run_simulation(&mut self, command: &Command) -> Result<CommandResult> {
        let p = &command.params;
        let time_step = command.require(p.time_step, "time_step")?;
        let num_steps = command.require(p.num_steps, "num_steps")?;

        let params = RunParams::normalized(time_step, num_steps);
        simulation::run(&mut self.registry, &mut self.clock, params);
        Ok(CommandResult::with_value(0, self.clock.now()))
    }

    fn get_neuron_state(&mut self, command: &Command) -> Result<CommandResult> {
        let id = NeuronId::new(command.require(command.params.neuron_id, "neuron_id")?);
        let neuron = self
            .registry
            .neuron(id)
            .ok_or(RuntimeError::NeuronNotFound { neuron_id: id.raw() })?;
        Ok(CommandResult::with_value(id.raw(), neuron.potential))
    }

    fn set_neuron_param(&mut self, command: &Command) -> Result<CommandResult> {
        let p = &command.params;
        let id = NeuronId::new(command.require(p.neuron_id, "neuron_id")?);
        let parameter = command.require(p.parameter, "parameter")?;
        let value = command.require(p.value, "value")?;

        self.registry
            .neuron_mut(id)
            .ok_or(RuntimeError::NeuronNotFound { neuron_id: id.raw() })?
            .set_param(parameter, value);
        Ok(CommandResult::ok())
    }

    fn reset(&mut self) {
        self.registry.reset();
        self.clock.reset();
        log::info!("Network reset");
    }
}
