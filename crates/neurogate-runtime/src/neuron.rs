//! Leaky neuron model with refractory gating

use crate::{
    arena::{BlockHandle, TrackedArena},
    error::*,
    NeuronId,
};
use core::mem;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default resting potential (mV)
pub const DEFAULT_REST_POTENTIAL: f32 = -70.0;

/// Default firing threshold (mV)
pub const DEFAULT_THRESHOLD: f32 = -55.0;

/// Default refractory period (time units)
pub const DEFAULT_REFRACTORY_PERIOD: f32 = 2.0;

/// Last-fired sentinel; far enough in the past that a new neuron is never refractory
pub const NEVER_FIRED: f32 = -1000.0;

/// Fraction of the distance to rest recovered on every compute
pub const LEAK_RATE: f32 = 0.1;

const EDGE_BYTES: usize = mem::size_of::<u32>();

/// Neuron type (advisory; does not alter dynamics)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum NeuronType {
    /// Excitatory neuron
    #[default]
    Excitatory,
    /// Inhibitory neuron
    Inhibitory,
}

impl NeuronType {
    /// Decode from a wire code
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            0 => Ok(Self::Excitatory),
            1 => Ok(Self::Inhibitory),
            other => Err(RuntimeError::invalid_parameter(
                "neuron_type",
                other.to_string(),
                "0 (excitatory) or 1 (inhibitory)",
            )),
        }
    }

    /// Wire code
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Output nonlinearity applied to the membrane potential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum ActivationFunction {
    /// Identity
    #[default]
    Linear,
    /// Logistic sigmoid
    Sigmoid,
    /// Rectified linear
    Relu,
    /// Hyperbolic tangent
    Tanh,
}

impl ActivationFunction {
    /// Apply the function to `value`
    pub fn apply(self, value: f32) -> f32 {
        match self {
            Self::Linear => value,
            Self::Sigmoid => 1.0 / (1.0 + (-value).exp()),
            Self::Relu => value.max(0.0),
            Self::Tanh => value.tanh(),
        }
    }

    /// Decode from a wire code
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            0 => Ok(Self::Linear),
            1 => Ok(Self::Sigmoid),
            2 => Ok(Self::Relu),
            3 => Ok(Self::Tanh),
            other => Err(RuntimeError::invalid_parameter(
                "activation",
                other.to_string(),
                "0..=3",
            )),
        }
    }

    /// Wire code
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Neuron parameter selector for `set_neuron_param`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum NeuronParam {
    /// Firing threshold
    Threshold,
    /// Resting potential
    RestPotential,
    /// Refractory period
    RefractoryPeriod,
    /// Membrane potential
    Potential,
}

impl NeuronParam {
    /// Decode from a wire code
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            1 => Ok(Self::Threshold),
            2 => Ok(Self::RestPotential),
            3 => Ok(Self::RefractoryPeriod),
            4 => Ok(Self::Potential),
            other => Err(RuntimeError::invalid_parameter(
                "parameter",
                other.to_string(),
                "1..=4",
            )),
        }
    }

    /// Wire code
    pub fn code(self) -> u32 {
        match self {
            Self::Threshold => 1,
            Self::RestPotential => 2,
            Self::RefractoryPeriod => 3,
            Self::Potential => 4,
        }
    }
}

/// A single neuron and its outbound adjacency list
///
/// The neuron record and the adjacency list are both tracked arena blocks; the
/// adjacency block grows by exactly one slot per new edge.
#[derive(Debug)]
pub struct Neuron {
    id: NeuronId,
    /// Neuron type
    pub kind: NeuronType,
    /// Activation function
    pub activation: ActivationFunction,
    /// Membrane potential (mV)
    pub potential: f32,
    /// Firing threshold (mV)
    pub threshold: f32,
    /// Resting potential (mV)
    pub rest_potential: f32,
    /// Refractory period (time units)
    pub refractory_period: f32,
    last_fired: f32,
    connections: Vec<NeuronId>,
    record: BlockHandle,
    edges: Option<BlockHandle>,
}

impl Neuron {
    /// Create a neuron with default biophysical parameters
    pub fn create(
        arena: &mut TrackedArena,
        id: NeuronId,
        kind: NeuronType,
        activation: ActivationFunction,
    ) -> Result<Self> {
        let record = arena.allocate(mem::size_of::<Neuron>())?;
        log::debug!("Created neuron with ID {}", id);
        Ok(Self {
            id,
            kind,
            activation,
            potential: DEFAULT_REST_POTENTIAL,
            threshold: DEFAULT_THRESHOLD,
            rest_potential: DEFAULT_REST_POTENTIAL,
            refractory_period: DEFAULT_REFRACTORY_PERIOD,
            last_fired: NEVER_FIRED,
            connections: Vec::new(),
            record,
            edges: None,
        })
    }

    /// Release the neuron and its adjacency list
    pub fn destroy(self, arena: &mut TrackedArena) -> Result<()> {
        if let Some(edges) = self.edges {
            arena.release(edges)?;
        }
        arena.release(self.record)?;
        log::debug!("Destroyed neuron {}", self.id);
        Ok(())
    }

    /// Add an outbound edge to `target`
    ///
    /// Returns `false` when the edge already existed; that is not an error.
    pub fn connect(&mut self, arena: &mut TrackedArena, target: NeuronId) -> Result<bool> {
        if self.connections.contains(&target) {
            log::warn!(
                "Connection already exists between neurons {} and {}",
                self.id,
                target
            );
            return Ok(false);
        }

        let new_size = (self.connections.len() + 1) * EDGE_BYTES;
        self.edges = arena.reallocate(self.edges, new_size).map_err(|e| {
            log::error!("Failed to allocate memory for neuron connection");
            e
        })?;
        self.connections.push(target);

        log::debug!("Connected neuron {} to {}", self.id, target);
        Ok(true)
    }

    /// Remove the outbound edge to `target`, keeping the order of the others
    ///
    /// Returns `false` when no such edge existed; that is not an error.
    pub fn disconnect(&mut self, arena: &mut TrackedArena, target: NeuronId) -> Result<bool> {
        let position = match self.connections.iter().position(|&id| id == target) {
            Some(position) => position,
            None => {
                log::warn!(
                    "No connection exists between neurons {} and {}",
                    self.id,
                    target
                );
                return Ok(false);
            }
        };

        let new_size = (self.connections.len() - 1) * EDGE_BYTES;
        self.edges = arena.reallocate(self.edges, new_size)?;
        self.connections.remove(position);

        log::debug!("Disconnected neuron {} from {}", self.id, target);
        Ok(true)
    }

    /// Integrate `input` over `dt`, leak toward rest and return the activation
    pub fn compute(&mut self, input: f32, dt: f32) -> f32 {
        self.potential += input * dt;
        self.potential = self.potential * (1.0 - LEAK_RATE) + self.rest_potential * LEAK_RATE;
        self.activation.apply(self.potential)
    }

    /// Fire if outside the refractory window and at or above threshold
    ///
    /// The refractory check comes first: a neuron above threshold inside its
    /// window neither fires nor resets.
    pub fn fire(&mut self, current_time: f32) -> bool {
        if current_time - self.last_fired < self.refractory_period {
            return false;
        }

        if self.potential >= self.threshold {
            self.last_fired = current_time;
            self.potential = self.rest_potential;
            log::debug!("Neuron {} fired at time {:.2}", self.id, current_time);
            return true;
        }

        false
    }

    /// Restore potential and last-fired time; connections are kept
    pub fn reset(&mut self) {
        self.potential = self.rest_potential;
        self.last_fired = NEVER_FIRED;
        log::debug!("Reset neuron {}", self.id);
    }

    /// Overwrite one parameter
    pub fn set_param(&mut self, param: NeuronParam, value: f32) {
        match param {
            NeuronParam::Threshold => self.threshold = value,
            NeuronParam::RestPotential => self.rest_potential = value,
            NeuronParam::RefractoryPeriod => self.refractory_period = value,
            NeuronParam::Potential => self.potential = value,
        }
    }

    /// Neuron ID
    pub fn id(&self) -> NeuronId {
        self.id
    }

    /// Time of the last successful fire
    pub fn last_fired(&self) -> f32 {
        self.last_fired
    }

    /// Outbound edges in insertion order
    pub fn connections(&self) -> &[NeuronId] {
        &self.connections
    }

    /// Whether an outbound edge to `target` exists
    pub fn is_connected_to(&self, target: NeuronId) -> bool {
        self.connections.contains(&target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArenaConfig;

    fn arena() -> TrackedArena {
        TrackedArena::new(ArenaConfig::default()).unwrap()
    }

    fn neuron(arena: &mut TrackedArena, id: u32) -> Neuron {
        Neuron::create(
            arena,
            NeuronId::new(id),
            NeuronType::Excitatory,
            ActivationFunction::Linear,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let mut arena = arena();
        let n = neuron(&mut arena, 7);

        assert_eq!(n.id(), NeuronId::new(7));
        assert_eq!(n.potential, -70.0);
        assert_eq!(n.rest_potential, -70.0);
        assert_eq!(n.threshold, -55.0);
        assert_eq!(n.refractory_period, 2.0);
        assert_eq!(n.last_fired(), NEVER_FIRED);
        assert!(n.connections().is_empty());
        assert_eq!(arena.live_block_count(), 1);
    }

    #[test]
    fn test_activation_functions() {
        assert_eq!(ActivationFunction::Linear.apply(-3.0), -3.0);
        assert_eq!(ActivationFunction::Sigmoid.apply(0.0), 0.5);
        assert_eq!(ActivationFunction::Relu.apply(-3.0), 0.0);
        assert_eq!(ActivationFunction::Relu.apply(3.0), 3.0);
        assert!((ActivationFunction::Tanh.apply(1.0) - 1.0f32.tanh()).abs() < 1e-6);
    }

    #[test]
    fn test_compute_leaks_toward_rest() {
        let mut arena = arena();
        let mut n = neuron(&mut arena, 1);

        // -70 + 10*1 = -60, then -60*0.9 + -70*0.1 = -61
        let out = n.compute(10.0, 1.0);
        assert!((n.potential - -61.0).abs() < 1e-4);
        assert_eq!(out, n.potential);

        // At rest with no input the potential stays put
        n.reset();
        n.compute(0.0, 1.0);
        assert!((n.potential - -70.0).abs() < 1e-4);
    }

    #[test]
    fn test_fresh_neuron_fires_immediately() {
        let mut arena = arena();
        let mut n = neuron(&mut arena, 1);
        n.potential = -50.0;

        assert!(n.fire(0.0));
        assert_eq!(n.potential, n.rest_potential);
        assert_eq!(n.last_fired(), 0.0);
    }

    #[test]
    fn test_below_threshold_does_not_fire() {
        let mut arena = arena();
        let mut n = neuron(&mut arena, 1);
        n.potential = -56.0;
        assert!(!n.fire(5.0));
        assert_eq!(n.last_fired(), NEVER_FIRED);
    }

    #[test]
    fn test_refractory_window_blocks_fire_without_reset() {
        let mut arena = arena();
        let mut n = neuron(&mut arena, 1);

        n.potential = -50.0;
        assert!(n.fire(0.0));

        n.potential = -40.0;
        assert!(!n.fire(1.0));
        // No reset inside the window
        assert_eq!(n.potential, -40.0);

        assert!(n.fire(2.0));
        assert_eq!(n.potential, -70.0);
        assert_eq!(n.last_fired(), 2.0);
    }

    #[test]
    fn test_reset_keeps_connections() {
        let mut arena = arena();
        let mut n = neuron(&mut arena, 1);
        n.connect(&mut arena, NeuronId::new(2)).unwrap();
        n.potential = -20.0;
        n.fire(3.0);

        n.reset();
        assert_eq!(n.potential, n.rest_potential);
        assert_eq!(n.last_fired(), NEVER_FIRED);
        assert_eq!(n.connections(), &[NeuronId::new(2)]);
    }

    #[test]
    fn test_connect_grows_one_slot_per_edge() {
        let mut arena = arena();
        let mut n = neuron(&mut arena, 1);
        let base = arena.used_bytes();

        assert!(n.connect(&mut arena, NeuronId::new(2)).unwrap());
        assert_eq!(arena.used_bytes(), base + 4);
        assert!(n.connect(&mut arena, NeuronId::new(3)).unwrap());
        assert_eq!(arena.used_bytes(), base + 8);

        // Duplicate is a successful no-op
        assert!(!n.connect(&mut arena, NeuronId::new(2)).unwrap());
        assert_eq!(arena.used_bytes(), base + 8);
        assert_eq!(n.connections(), &[NeuronId::new(2), NeuronId::new(3)]);
    }

    #[test]
    fn test_disconnect() {
        let mut arena = arena();
        let mut n = neuron(&mut arena, 1);
        for target in [2, 3, 4] {
            n.connect(&mut arena, NeuronId::new(target)).unwrap();
        }

        assert!(n.disconnect(&mut arena, NeuronId::new(3)).unwrap());
        assert_eq!(n.connections(), &[NeuronId::new(2), NeuronId::new(4)]);
        assert!(!n.disconnect(&mut arena, NeuronId::new(3)).unwrap());

        n.disconnect(&mut arena, NeuronId::new(2)).unwrap();
        n.disconnect(&mut arena, NeuronId::new(4)).unwrap();
        assert!(n.connections().is_empty());
        // Only the neuron record remains
        assert_eq!(arena.live_block_count(), 1);
    }

    #[test]
    fn test_destroy_releases_everything() {
        let mut arena = arena();
        let mut n = neuron(&mut arena, 1);
        n.connect(&mut arena, NeuronId::new(2)).unwrap();
        assert_eq!(arena.live_block_count(), 2);

        n.destroy(&mut arena).unwrap();
        assert_eq!(arena.live_block_count(), 0);
        assert_eq!(arena.used_bytes(), 0);
    }

    #[test]
    fn test_set_param() {
        let mut arena = arena();
        let mut n = neuron(&mut arena, 1);
        n.set_param(NeuronParam::Threshold, -60.0);
        n.set_param(NeuronParam::RestPotential, -65.0);
        n.set_param(NeuronParam::RefractoryPeriod, 5.0);
        n.set_param(NeuronParam::Potential, -10.0);
        assert_eq!(n.threshold, -60.0);
        assert_eq!(n.rest_potential, -65.0);
        assert_eq!(n.refractory_period, 5.0);
        assert_eq!(n.potential, -10.0);
    }

    #[test]
    fn test_codes() {
        assert_eq!(NeuronType::from_code(1).unwrap(), NeuronType::Inhibitory);
        assert!(NeuronType::from_code(2).is_err());
        assert_eq!(ActivationFunction::from_code(3).unwrap(), ActivationFunction::Tanh);
        assert!(ActivationFunction::from_code(4).is_err());
        for code in 1..=4 {
            assert_eq!(NeuronParam::from_code(code).unwrap().code(), code);
        }
        assert!(NeuronParam::from_code(0).is_err());
        assert!(NeuronParam::from_code(5).is_err());
    }
}
