//! Command model for the dispatcher
//!
//! A [`Command`] is a kind plus a flat record of optional parameters; each kind
//! reads only the fields it needs. Every command yields a [`CommandResult`].

use crate::{
    error::*,
    neuron::{ActivationFunction, NeuronParam, NeuronType},
    synapse::SynapseType,
};
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Command kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum CommandKind {
    /// Does nothing; succeeds while running
    Noop,
    /// Create a neuron
    CreateNeuron,
    /// Destroy a neuron
    DeleteNeuron,
    /// Add an adjacency edge
    ConnectNeurons,
    /// Create a synapse
    CreateSynapse,
    /// Run the simulation
    RunSimulation,
    /// Read a neuron's potential
    GetNeuronState,
    /// Overwrite a neuron parameter
    SetNeuronParam,
    /// Reset all neurons, synapses and the clock
    ResetSimulation,
    /// Report arena usage
    GetMemoryStats,
    /// Stop accepting commands
    Shutdown,
}

impl CommandKind {
    /// Every kind, in wire-code order
    pub const ALL: [CommandKind; 11] = [
        Self::Noop,
        Self::CreateNeuron,
        Self::DeleteNeuron,
        Self::ConnectNeurons,
        Self::CreateSynapse,
        Self::RunSimulation,
        Self::GetNeuronState,
        Self::SetNeuronParam,
        Self::ResetSimulation,
        Self::GetMemoryStats,
        Self::Shutdown,
    ];

    /// Decode from a wire code
    pub fn from_code(code: u8) -> Result<Self> {
        Self::ALL
            .get(usize::from(code))
            .copied()
            .ok_or_else(|| RuntimeError::invalid_parameter("kind", code.to_string(), "0..=10"))
    }

    /// Wire code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Snake-case name
    pub fn name(self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::CreateNeuron => "create_neuron",
            Self::DeleteNeuron => "delete_neuron",
            Self::ConnectNeurons => "connect_neurons",
            Self::CreateSynapse => "create_synapse",
            Self::RunSimulation => "run_simulation",
            Self::GetNeuronState => "get_neuron_state",
            Self::SetNeuronParam => "set_neuron_param",
            Self::ResetSimulation => "reset_simulation",
            Self::GetMemoryStats => "get_memory_stats",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Command parameters; unset fields are `None`
///
/// `neuron_id` is the subject neuron (the source of `connect_neurons`, the
/// presynaptic side of `create_synapse`) and `target_id` is the other end.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CommandParams {
    /// Subject neuron
    pub neuron_id: Option<u32>,
    /// Neuron type for creation
    pub neuron_type: Option<NeuronType>,
    /// Activation function for creation
    pub activation: Option<ActivationFunction>,
    /// Threshold override at creation
    pub threshold: Option<f32>,
    /// Resting potential override at creation
    pub rest_potential: Option<f32>,
    /// Refractory period override at creation
    pub refractory_period: Option<f32>,
    /// Target neuron
    pub target_id: Option<u32>,
    /// Synapse identifier
    pub synapse_id: Option<u32>,
    /// Synapse type
    pub synapse_type: Option<SynapseType>,
    /// Weight override at synapse creation
    pub weight: Option<f32>,
    /// Delay override at synapse creation
    pub delay: Option<f32>,
    /// Step size for a run
    pub time_step: Option<f32>,
    /// Step count for a run
    pub num_steps: Option<u32>,
    /// Parameter selector for `set_neuron_param`
    pub parameter: Option<NeuronParam>,
    /// Parameter value for `set_neuron_param`
    pub value: Option<f32>,
}

/// A command ready for dispatch
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Command {
    /// What to do
    pub kind: CommandKind,
    /// Parameters
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub params: CommandParams,
}

impl Command {
    /// Command with no parameters
    pub fn new(kind: CommandKind) -> Self {
        Self {
            kind,
            params: CommandParams::default(),
        }
    }

    /// Create a neuron with default parameters
    pub fn create_neuron(id: u32, neuron_type: NeuronType, activation: ActivationFunction) -> Self {
        let mut command = Self::new(CommandKind::CreateNeuron);
        command.params.neuron_id = Some(id);
        command.params.neuron_type = Some(neuron_type);
        command.params.activation = Some(activation);
        command
    }

    /// Destroy a neuron
    pub fn delete_neuron(id: u32) -> Self {
        let mut command = Self::new(CommandKind::DeleteNeuron);
        command.params.neuron_id = Some(id);
        command
    }

    /// Add the edge `source -> target`
    pub fn connect_neurons(source: u32, target: u32) -> Self {
        let mut command = Self::new(CommandKind::ConnectNeurons);
        command.params.neuron_id = Some(source);
        command.params.target_id = Some(target);
        command
    }

    /// Create a synapse `pre -> post`
    pub fn create_synapse(id: u32, pre: u32, post: u32, synapse_type: SynapseType) -> Self {
        let mut command = Self::new(CommandKind::CreateSynapse);
        command.params.synapse_id = Some(id);
        command.params.neuron_id = Some(pre);
        command.params.target_id = Some(post);
        command.params.synapse_type = Some(synapse_type);
        command
    }

    /// Run `num_steps` steps of `time_step`
    pub fn run_simulation(time_step: f32, num_steps: u32) -> Self {
        let mut command = Self::new(CommandKind::RunSimulation);
        command.params.time_step = Some(time_step);
        command.params.num_steps = Some(num_steps);
        command
    }

    /// Read a neuron's potential
    pub fn get_neuron_state(id: u32) -> Self {
        let mut command = Self::new(CommandKind::GetNeuronState);
        command.params.neuron_id = Some(id);
        command
    }

    /// Overwrite one neuron parameter
    pub fn set_neuron_param(id: u32, parameter: NeuronParam, value: f32) -> Self {
        let mut command = Self::new(CommandKind::SetNeuronParam);
        command.params.neuron_id = Some(id);
        command.params.parameter = Some(parameter);
        command.params.value = Some(value);
        command
    }

    /// Override the threshold at creation
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.params.threshold = Some(threshold);
        self
    }

    /// Override the resting potential at creation
    pub fn with_rest_potential(mut self, rest_potential: f32) -> Self {
        self.params.rest_potential = Some(rest_potential);
        self
    }

    /// Override the refractory period at creation
    pub fn with_refractory_period(mut self, refractory_period: f32) -> Self {
        self.params.refractory_period = Some(refractory_period);
        self
    }

    /// Override the weight at synapse creation
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.params.weight = Some(weight);
        self
    }

    /// Override the delay at synapse creation
    pub fn with_delay(mut self, delay: f32) -> Self {
        self.params.delay = Some(delay);
        self
    }

    pub(crate) fn require<T: Copy>(&self, value: Option<T>, name: &str) -> Result<T> {
        value.ok_or_else(|| RuntimeError::missing_parameter(self.kind.name(), name))
    }
}

impl From<CommandKind> for Command {
    fn from(kind: CommandKind) -> Self {
        Self::new(kind)
    }
}

/// Outcome of a command
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CommandResult {
    /// [`STATUS_OK`] or [`STATUS_ERROR`]
    pub status: i32,
    /// Created or queried identifier, 0 when not applicable
    pub id: u32,
    /// Scalar result, 0.0 when not applicable
    pub value: f32,
}

impl CommandResult {
    /// Success with no payload
    pub const fn ok() -> Self {
        Self {
            status: STATUS_OK,
            id: 0,
            value: 0.0,
        }
    }

    /// Success carrying an identifier
    pub const fn with_id(id: u32) -> Self {
        Self {
            status: STATUS_OK,
            id,
            value: 0.0,
        }
    }

    /// Success carrying an identifier and a value
    pub const fn with_value(id: u32, value: f32) -> Self {
        Self {
            status: STATUS_OK,
            id,
            value,
        }
    }

    /// Failure with the given status
    pub const fn error(status: i32) -> Self {
        Self {
            status,
            id: 0,
            value: 0.0,
        }
    }

    /// Whether the command succeeded
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

impl Default for CommandResult {
    fn default() -> Self {
        Self::ok()
    }
}
