//! Directed, weighted, delay-gated synapses

use crate::{
    arena::{BlockHandle, TrackedArena},
    error::*,
    plasticity::{PlasticityMode, PlasticityRule, StdpRule},
    NeuronId, SynapseId,
};
use core::mem;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default transmission delay (time units)
pub const DEFAULT_DELAY: f32 = 1.0;

/// Default lower weight bound
pub const DEFAULT_MIN_WEIGHT: f32 = -1.0;

/// Default upper weight bound
pub const DEFAULT_MAX_WEIGHT: f32 = 1.0;

/// Last-active sentinel; the first activation always passes the delay gate
pub const NEVER_ACTIVE: f32 = -1000.0;

/// Synapse type; sets the default weight at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum SynapseType {
    /// Excitatory, +0.5
    #[default]
    Excitatory,
    /// Inhibitory, -0.5
    Inhibitory,
    /// Modulatory, +0.1
    Modulatory,
}

impl SynapseType {
    /// Weight a new synapse of this type starts with
    pub fn default_weight(self) -> f32 {
        match self {
            Self::Excitatory => 0.5,
            Self::Inhibitory => -0.5,
            Self::Modulatory => 0.1,
        }
    }

    /// Decode from a wire code
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            0 => Ok(Self::Excitatory),
            1 => Ok(Self::Inhibitory),
            2 => Ok(Self::Modulatory),
            other => Err(RuntimeError::invalid_parameter(
                "synapse_type",
                other.to_string(),
                "0..=2",
            )),
        }
    }

    /// Wire code
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Edge between two neuron ids
///
/// Endpoints are held by value; a synapse never owns or borrows neurons.
#[derive(Debug)]
pub struct Synapse {
    id: SynapseId,
    pre: NeuronId,
    post: NeuronId,
    /// Synapse type
    pub kind: SynapseType,
    /// Plasticity mode
    pub plasticity: PlasticityMode,
    weight: f32,
    /// Transmission delay (time units)
    pub delay: f32,
    last_active: f32,
    min_weight: f32,
    max_weight: f32,
    record: BlockHandle,
}

impl Synapse {
    /// Create a static synapse with type-dependent default weight
    pub fn create(
        arena: &mut TrackedArena,
        id: SynapseId,
        pre: NeuronId,
        post: NeuronId,
        kind: SynapseType,
    ) -> Result<Self> {
        let record = arena.allocate(mem::size_of::<Synapse>())?;
        log::debug!(
            "Created synapse with ID {} from neuron {} to {}",
            id,
            pre,
            post
        );
        Ok(Self {
            id,
            pre,
            post,
            kind,
            plasticity: PlasticityMode::Static,
            weight: kind.default_weight(),
            delay: DEFAULT_DELAY,
            last_active: NEVER_ACTIVE,
            min_weight: DEFAULT_MIN_WEIGHT,
            max_weight: DEFAULT_MAX_WEIGHT,
            record,
        })
    }

    /// Release the synapse record
    pub fn destroy(self, arena: &mut TrackedArena) -> Result<()> {
        arena.release(self.record)?;
        log::debug!("Destroyed synapse {}", self.id);
        Ok(())
    }

    /// Transmit `input` if the delay since the last transmission has elapsed
    ///
    /// A gated call returns 0.0 and leaves `last_active` untouched.
    pub fn activate(&mut self, input: f32, current_time: f32) -> f32 {
        if current_time < self.last_active + self.delay {
            return 0.0;
        }

        self.last_active = current_time;
        let output = input * self.weight;

        log::debug!(
            "Synapse {} activated at time {:.2} with output {:.4}",
            self.id,
            current_time,
            output
        );
        output
    }

    /// Apply the default STDP rule; no effect unless the mode is `Stdp`
    pub fn update_weight(&mut self, pre_spike_time: f32, post_spike_time: f32) {
        self.update_weight_with(&StdpRule::default(), pre_spike_time, post_spike_time);
    }

    /// Apply `rule`; no effect unless the mode is `Stdp`
    pub fn update_weight_with<R: PlasticityRule>(
        &mut self,
        rule: &R,
        pre_spike_time: f32,
        post_spike_time: f32,
    ) {
        if self.plasticity != PlasticityMode::Stdp {
            return;
        }

        let change = rule.weight_change(pre_spike_time, post_spike_time);
        if change.is_nan() {
            log::warn!("Ignoring NaN weight change for synapse {}", self.id);
            return;
        }
        self.weight = (self.weight + change).clamp(self.min_weight, self.max_weight);
        log::debug!("Updated synapse {} weight to {:.4}", self.id, self.weight);
    }

    /// Forget the last activation; the weight is kept
    pub fn reset(&mut self) {
        self.last_active = NEVER_ACTIVE;
        log::debug!("Reset synapse {}", self.id);
    }

    /// Set the weight, clamped to the bounds; NaN is ignored
    pub fn set_weight(&mut self, weight: f32) {
        if weight.is_nan() {
            log::warn!("Ignoring NaN weight for synapse {}", self.id);
            return;
        }
        self.weight = weight.clamp(self.min_weight, self.max_weight);
    }

    /// Set the weight bounds; the current weight is clamped into them
    pub fn set_bounds(&mut self, min_weight: f32, max_weight: f32) -> Result<()> {
        // f32::clamp panics on NaN or inverted bounds
        if min_weight.is_nan() || max_weight.is_nan() || min_weight > max_weight {
            return Err(RuntimeError::invalid_parameter(
                "max_weight",
                format!("{} (with min_weight={})", max_weight, min_weight),
                ">= min_weight",
            ));
        }
        self.min_weight = min_weight;
        self.max_weight = max_weight;
        self.weight = self.weight.clamp(min_weight, max_weight);
        Ok(())
    }

    /// Synapse ID
    pub fn id(&self) -> SynapseId {
        self.id
    }

    /// Presynaptic neuron ID
    pub fn pre(&self) -> NeuronId {
        self.pre
    }

    /// Postsynaptic neuron ID
    pub fn post(&self) -> NeuronId {
        self.post
    }

    /// Current weight
    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Weight bounds `(min, max)`
    pub fn bounds(&self) -> (f32, f32) {
        (self.min_weight, self.max_weight)
    }

    /// Time of the last transmission
    pub fn last_active(&self) -> f32 {
        self.last_active
    }
}
