//! Neuron and synapse registry
//!
//! Both collections are index-stable slot tables: removal leaves a tombstone
//! that the next insertion reuses (lowest free slot first), so the remaining
//! entries never move and registry order is slot order. Each table's backing
//! store is a tracked arena block that doubles when every slot is occupied.
//! Lookup is a linear scan over the slots.

use crate::{
    arena::{BlockHandle, TrackedArena},
    config::RuntimeConfig,
    error::*,
    neuron::{ActivationFunction, Neuron, NeuronType},
    synapse::{Synapse, SynapseType},
    NeuronId, SynapseId,
};
use core::mem;

/// Bytes accounted per table slot
const SLOT_BYTES: usize = mem::size_of::<usize>();

/// An object owned by a [`Table`]
pub trait Entry: Sized {
    /// Identifier type
    type Key: Copy + PartialEq + core::fmt::Display;

    /// Identifier of this entry
    fn key(&self) -> Self::Key;

    /// Release the entry's arena blocks
    fn destroy(self, arena: &mut TrackedArena) -> Result<()>;
}

impl Entry for Neuron {
    type Key = NeuronId;

    fn key(&self) -> NeuronId {
        self.id()
    }

    fn destroy(self, arena: &mut TrackedArena) -> Result<()> {
        Neuron::destroy(self, arena)
    }
}

impl Entry for Synapse {
    type Key = SynapseId;

    fn key(&self) -> SynapseId {
        self.id()
    }

    fn destroy(self, arena: &mut TrackedArena) -> Result<()> {
        Synapse::destroy(self, arena)
    }
}

/// Growable, id-searchable slot table
#[derive(Debug)]
pub struct Table<T> {
    label: &'static str,
    slots: Vec<Option<T>>,
    live: usize,
    capacity: usize,
    backing: BlockHandle,
}

impl<T: Entry> Table<T> {
    /// Reserve `capacity` slots in the arena
    pub fn with_capacity(
        arena: &mut TrackedArena,
        label: &'static str,
        capacity: usize,
    ) -> Result<Self> {
        let bytes = capacity
            .checked_mul(SLOT_BYTES)
            .ok_or_else(|| RuntimeError::capacity_exhausted(label, usize::MAX))?;
        let backing = arena.allocate(bytes).map_err(|e| {
            log::error!("Failed to allocate {} array", label);
            e
        })?;

        Ok(Self {
            label,
            slots: Vec::with_capacity(capacity),
            live: 0,
            capacity,
            backing,
        })
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.live
    }

    /// True when no entries are live
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Slots currently reserved in the arena
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots in use or tombstoned
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Slot index holding `key`
    pub fn position(&self, key: T::Key) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|entry| entry.key() == key))
    }

    /// Entry with `key`
    pub fn get(&self, key: T::Key) -> Option<&T> {
        self.position(key).and_then(|index| self.at(index))
    }

    /// Mutable entry with `key`
    pub fn get_mut(&mut self, key: T::Key) -> Option<&mut T> {
        self.position(key).and_then(move |index| self.at_mut(index))
    }

    /// Entry at slot `index`
    pub fn at(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Mutable entry at slot `index`
    pub fn at_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Live entries in slot order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().flatten()
    }

    /// Mutable live entries in slot order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().flatten()
    }

    /// Pick a slot for a new entry, doubling the backing store when full
    ///
    /// Nothing changes if growth fails.
    pub fn reserve_slot(&mut self, arena: &mut TrackedArena) -> Result<usize> {
        if let Some(index) = self.slots.iter().position(Option::is_none) {
            return Ok(index);
        }
        if self.slots.len() < self.capacity {
            return Ok(self.slots.len());
        }

        let new_capacity = self
            .capacity
            .checked_mul(2)
            .ok_or_else(|| RuntimeError::capacity_exhausted(self.label, usize::MAX))?;
        let bytes = new_capacity
            .checked_mul(SLOT_BYTES)
            .ok_or_else(|| RuntimeError::capacity_exhausted(self.label, usize::MAX))?;

        arena
            .reallocate(Some(self.backing), bytes)
            .map_err(|e| {
                log::error!("Failed to expand {} array", self.label);
                e
            })?;
        self.slots.reserve(new_capacity - self.slots.len());
        self.capacity = new_capacity;

        log::info!("Expanded {} array to {} slots", self.label, new_capacity);
        Ok(self.slots.len())
    }

    /// Place `entry` in a slot obtained from [`Table::reserve_slot`]
    pub fn insert_at(&mut self, index: usize, entry: T) {
        if index == self.slots.len() {
            self.slots.push(Some(entry));
        } else {
            self.slots[index] = Some(entry);
        }
        self.live += 1;
    }

    /// Detach the entry with `key`, leaving a tombstone
    pub fn take(&mut self, key: T::Key) -> Option<T> {
        let index = self.position(key)?;
        let entry = self.slots[index].take();
        if entry.is_some() {
            self.live -= 1;
        }
        entry
    }

    /// Destroy every entry and release the backing store
    ///
    /// Keeps going past failures and returns the first one.
    pub fn destroy(self, arena: &mut TrackedArena) -> Result<()> {
        let mut first_error = None;
        for entry in self.slots.into_iter().flatten() {
            let key = entry.key();
            if let Err(e) = entry.destroy(arena) {
                log::error!("Failed to destroy {} {}: {}", self.label, key, e);
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = arena.release(self.backing) {
            first_error.get_or_insert(e);
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Owner of every live neuron and synapse
#[derive(Debug)]
pub struct Registry {
    neurons: Table<Neuron>,
    synapses: Table<Synapse>,
}

impl Registry {
    /// Reserve the initial neuron and synapse tables
    pub fn new(arena: &mut TrackedArena, config: &RuntimeConfig) -> Result<Self> {
        let neurons = Table::with_capacity(arena, "neuron", config.initial_neuron_capacity)?;
        let synapses =
            match Table::with_capacity(arena, "synapse", config.initial_synapse_capacity) {
                Ok(synapses) => synapses,
                Err(e) => {
                    neurons.destroy(arena)?;
                    return Err(e);
                }
            };
        Ok(Self { neurons, synapses })
    }

    /// Create a neuron with default parameters
    pub fn add_neuron(
        &mut self,
        arena: &mut TrackedArena,
        id: NeuronId,
        kind: NeuronType,
        activation: ActivationFunction,
    ) -> Result<&mut Neuron> {
        if self.neurons.position(id).is_some() {
            return Err(RuntimeError::DuplicateNeuron { neuron_id: id.raw() });
        }
        let index = self.neurons.reserve_slot(arena)?;
        let neuron = Neuron::create(arena, id, kind, activation)?;
        self.neurons.insert_at(index, neuron);
        self.neurons
            .at_mut(index)
            .ok_or(RuntimeError::NeuronNotFound { neuron_id: id.raw() })
    }

    /// Destroy a neuron
    ///
    /// Synapses and other neurons' edges that name it are left in place; they
    /// are skipped during propagation.
    pub fn remove_neuron(&mut self, arena: &mut TrackedArena, id: NeuronId) -> Result<()> {
        let neuron = self
            .neurons
            .take(id)
            .ok_or(RuntimeError::NeuronNotFound { neuron_id: id.raw() })?;
        neuron.destroy(arena)
    }

    /// Add the edge `source -> target`; both must exist
    ///
    /// Returns `false` if the edge already existed.
    pub fn connect(
        &mut self,
        arena: &mut TrackedArena,
        source: NeuronId,
        target: NeuronId,
    ) -> Result<bool> {
        if self.neurons.position(target).is_none() {
            return Err(RuntimeError::NeuronNotFound { neuron_id: target.raw() });
        }
        self.neurons
            .get_mut(source)
            .ok_or(RuntimeError::NeuronNotFound { neuron_id: source.raw() })?
            .connect(arena, target)
    }

    /// Remove the edge `source -> target`
    ///
    /// Only the source must exist. Returns `false` if there was no such edge.
    pub fn disconnect(
        &mut self,
        arena: &mut TrackedArena,
        source: NeuronId,
        target: NeuronId,
    ) -> Result<bool> {
        self.neurons
            .get_mut(source)
            .ok_or(RuntimeError::NeuronNotFound { neuron_id: source.raw() })?
            .disconnect(arena, target)
    }

    /// Create a synapse; endpoints are not checked here
    pub fn add_synapse(
        &mut self,
        arena: &mut TrackedArena,
        id: SynapseId,
        pre: NeuronId,
        post: NeuronId,
        kind: SynapseType,
    ) -> Result<&mut Synapse> {
        if self.synapses.position(id).is_some() {
            return Err(RuntimeError::DuplicateSynapse { synapse_id: id.raw() });
        }
        let index = self.synapses.reserve_slot(arena)?;
        let synapse = Synapse::create(arena, id, pre, post, kind)?;
        self.synapses.insert_at(index, synapse);
        self.synapses
            .at_mut(index)
            .ok_or(RuntimeError::SynapseNotFound { synapse_id: id.raw() })
    }

    /// Destroy a synapse
    pub fn remove_synapse(&mut self, arena: &mut TrackedArena, id: SynapseId) -> Result<()> {
        let synapse = self
            .synapses
            .take(id)
            .ok_or(RuntimeError::SynapseNotFound { synapse_id: id.raw() })?;
        synapse.destroy(arena)
    }

    /// Neuron with `id`
    pub fn neuron(&self, id: NeuronId) -> Option<&Neuron> {
        self.neurons.get(id)
    }

    /// Mutable neuron with `id`
    pub fn neuron_mut(&mut self, id: NeuronId) -> Option<&mut Neuron> {
        self.neurons.get_mut(id)
    }

    /// Synapse with `id`
    pub fn synapse(&self, id: SynapseId) -> Option<&Synapse> {
        self.synapses.get(id)
    }

    /// Mutable synapse with `id`
    pub fn synapse_mut(&mut self, id: SynapseId) -> Option<&mut Synapse> {
        self.synapses.get_mut(id)
    }

    /// Neuron table
    pub fn neurons(&self) -> &Table<Neuron> {
        &self.neurons
    }

    /// Mutable neuron table
    pub fn neurons_mut(&mut self) -> &mut Table<Neuron> {
        &mut self.neurons
    }

    /// Synapse table
    pub fn synapses(&self) -> &Table<Synapse> {
        &self.synapses
    }

    /// Mutable synapse table
    pub fn synapses_mut(&mut self) -> &mut Table<Synapse> {
        &mut self.synapses
    }

    /// Slot of the first synapse carrying `pre -> post`
    pub fn synapse_between(&self, pre: NeuronId, post: NeuronId) -> Option<usize> {
        self.synapses.slots.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|synapse| synapse.pre() == pre && synapse.post() == post)
        })
    }

    /// Reset every neuron and synapse
    pub fn reset(&mut self) {
        self.neurons.iter_mut().for_each(Neuron::reset);
        self.synapses.iter_mut().for_each(Synapse::reset);
    }

    /// Destroy every object and both tables
    pub fn destroy(self, arena: &mut TrackedArena) -> Result<()> {
        let neurons = self.neurons.destroy(arena);
        let synapses = self.synapses.destroy(arena);
        neurons.and(synapses)
    }
}
