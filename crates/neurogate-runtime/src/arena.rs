//! Tracked arena allocator
//!
//! Every simulation object (neuron records, adjacency lists, synapse records and
//! the registry tables themselves) draws its storage from a [`TrackedArena`].
//! Each block carries a tag and links into a doubly-linked list of live blocks,
//! so the arena can report usage at any time and enumerate leaks at teardown.
//!
//! Blocks are addressed by generation-checked [`BlockHandle`]s instead of raw
//! pointers: a handle to a released block can never alias a newer block, and
//! releasing it again is reported as corruption rather than acted upon.

use crate::{config::ArenaConfig, error::*};

/// Tag stamped on every live block
pub const BLOCK_TAG: u32 = 0xDEAD_BEEF;

/// Handle to a block in a [`TrackedArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHandle {
    index: u32,
    generation: u32,
}

impl BlockHandle {
    /// Reconstruct a handle from its raw parts
    pub const fn from_raw(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Slot generation at the time the block was handed out
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

/// Summary of blocks reclaimed by [`TrackedArena::cleanup`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeakReport {
    /// Number of blocks still live at cleanup
    pub blocks: usize,
    /// Bytes still live at cleanup
    pub bytes: usize,
}

impl LeakReport {
    /// True when nothing was leaked
    pub fn is_clean(&self) -> bool {
        self.blocks == 0 && self.bytes == 0
    }
}

#[derive(Debug)]
struct Block {
    tag: u32,
    prev: Option<u32>,
    next: Option<u32>,
    data: Vec<u8>,
}

impl Block {
    fn size(&self) -> usize {
        self.data.len()
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    block: Option<Block>,
}

/// Allocator that records every live allocation
#[derive(Debug)]
pub struct TrackedArena {
    config: ArenaConfig,
    slots: Vec<Slot>,
    free: Vec<u32>,
    head: Option<u32>,
    total_bytes: usize,
    block_count: usize,
}

impl TrackedArena {
    /// Create an empty arena
    pub fn new(config: ArenaConfig) -> Result<Self> {
        config.validate()?;
        log::info!("Tracked arena initialized");
        Ok(Self {
            config,
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            total_bytes: 0,
            block_count: 0,
        })
    }

    /// Allocate a zeroed block of `size` bytes
    pub fn allocate(&mut self, size: usize) -> Result<BlockHandle> {
        if size == 0 {
            log::warn!("Attempting to allocate zero bytes");
            return Err(RuntimeError::ZeroSizeAllocation);
        }
        self.check_limit(size)?;

        let mut data = Vec::new();
        if data.try_reserve_exact(size).is_err() {
            log::error!("Memory allocation failed for {} bytes", size);
            return Err(RuntimeError::capacity_exhausted("arena block", size));
        }
        data.resize(size, 0);

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(self.slots.len())
                    .map_err(|_| RuntimeError::capacity_exhausted("arena slots", size))?;
                self.slots.push(Slot::default());
                index
            }
        };

        let old_head = self.head;
        if let Some(head) = old_head {
            if let Some(block) = self.slots[head as usize].block.as_mut() {
                block.prev = Some(index);
            }
        }

        let slot = &mut self.slots[index as usize];
        slot.block = Some(Block {
            tag: BLOCK_TAG,
            prev: None,
            next: old_head,
            data,
        });
        let handle = BlockHandle::from_raw(index, slot.generation);
        self.head = Some(index);

        self.total_bytes += size;
        self.block_count += 1;

        log::debug!("Allocated {} bytes at {}:{}", size, handle.index, handle.generation);
        Ok(handle)
    }

    /// Resize a block, allocating on `None` and releasing on `new_size == 0`
    ///
    /// On failure the original block and all accounting are left untouched.
    pub fn reallocate(
        &mut self,
        handle: Option<BlockHandle>,
        new_size: usize,
    ) -> Result<Option<BlockHandle>> {
        let handle = match handle {
            None => return self.allocate(new_size).map(Some),
            Some(handle) => handle,
        };
        if new_size == 0 {
            self.release(handle)?;
            return Ok(None);
        }

        let old_size = self.validate(handle)?.size();
        if new_size > old_size {
            self.check_limit(new_size - old_size)?;
        }

        let block = self.validate(handle)?;
        if new_size > old_size {
            if block.data.try_reserve_exact(new_size - old_size).is_err() {
                log::error!("Memory reallocation failed for {} bytes", new_size);
                return Err(RuntimeError::capacity_exhausted("arena block", new_size));
            }
            block.data.resize(new_size, 0);
        } else {
            block.data.truncate(new_size);
            block.data.shrink_to_fit();
        }

        self.total_bytes = self.total_bytes - old_size + new_size;
        log::debug!(
            "Reallocated block {}:{} from {} to {} bytes",
            handle.index,
            handle.generation,
            old_size,
            new_size
        );
        Ok(Some(handle))
    }

    /// Release a block
    ///
    /// A stale, unknown or mis-tagged handle is reported and otherwise ignored.
    pub fn release(&mut self, handle: BlockHandle) -> Result<()> {
        let (prev, next) = {
            let block = self.validate(handle)?;
            (block.prev, block.next)
        };

        match prev {
            Some(prev) => {
                if let Some(block) = self.slots[prev as usize].block.as_mut() {
                    block.next = next;
                }
            }
            None => self.head = next,
        }
        if let Some(next) = next {
            if let Some(block) = self.slots[next as usize].block.as_mut() {
                block.prev = prev;
            }
        }

        let slot = &mut self.slots[handle.index as usize];
        let size = match slot.block.take() {
            Some(mut block) => {
                block.tag = 0;
                block.size()
            }
            None => 0,
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);

        self.total_bytes -= size;
        self.block_count -= 1;

        log::debug!("Freed {} bytes at {}:{}", size, handle.index, handle.generation);
        Ok(())
    }

    /// Bytes currently live
    pub fn used_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Number of live blocks
    pub fn live_block_count(&self) -> usize {
        self.block_count
    }

    /// Size of a live block
    pub fn block_size(&self, handle: BlockHandle) -> Option<usize> {
        self.lookup(handle).map(Block::size)
    }

    /// Whether `handle` refers to a live block
    pub fn contains(&self, handle: BlockHandle) -> bool {
        self.lookup(handle).is_some()
    }

    /// Live blocks, most recently allocated first
    pub fn live_blocks(&self) -> LiveBlocks<'_> {
        LiveBlocks {
            arena: self,
            cursor: self.head,
        }
    }

    /// Report outstanding blocks; returns true if any are live
    pub fn check_leaks(&self) -> bool {
        if self.block_count > 0 {
            log::warn!(
                "Memory leaks detected: {} blocks, {} bytes not freed",
                self.block_count,
                self.total_bytes
            );
            return true;
        }
        false
    }

    /// Log usage statistics
    pub fn debug_stats(&self) {
        log::info!(
            "Memory usage: {} bytes in {} blocks",
            self.total_bytes,
            self.block_count
        );
        if log::log_enabled!(log::Level::Debug) {
            for (handle, size) in self.live_blocks() {
                log::debug!("Block at {}:{}: {} bytes", handle.index, handle.generation, size);
            }
        }
    }

    /// Reclaim every remaining block and reset the counters
    ///
    /// Blocks are freed without any knowledge of what they held. Handles issued
    /// before cleanup stay invalid afterwards.
    pub fn cleanup(&mut self) -> LeakReport {
        let report = LeakReport {
            blocks: self.block_count,
            bytes: self.total_bytes,
        };

        if report.is_clean() {
            log::info!("Memory manager cleaned up with no leaks");
        } else {
            log::warn!(
                "Memory leaks detected: {} blocks, {} bytes not freed",
                report.blocks,
                report.bytes
            );
        }

        let mut cursor = self.head;
        while let Some(index) = cursor {
            let slot = &mut self.slots[index as usize];
            cursor = match slot.block.take() {
                Some(block) => {
                    log::debug!("Leaked block: {} bytes", block.size());
                    block.next
                }
                None => None,
            };
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(index);
        }

        self.head = None;
        self.total_bytes = 0;
        self.block_count = 0;
        report
    }

    fn lookup(&self, handle: BlockHandle) -> Option<&Block> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.block.as_ref().filter(|block| block.tag == BLOCK_TAG)
    }

    fn validate(&mut self, handle: BlockHandle) -> Result<&mut Block> {
        let block = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.block.as_mut())
            .filter(|block| block.tag == BLOCK_TAG);

        match block {
            Some(block) => Ok(block),
            None => {
                log::error!(
                    "Invalid memory block {}:{}",
                    handle.index,
                    handle.generation
                );
                Err(RuntimeError::Corruption {
                    index: handle.index,
                    generation: handle.generation,
                })
            }
        }
    }

    fn check_limit(&self, additional: usize) -> Result<()> {
        if let Some(limit) = self.config.byte_limit {
            if self.total_bytes.saturating_add(additional) > limit {
                log::error!(
                    "Arena limit of {} bytes exceeded by request for {} bytes",
                    limit,
                    additional
                );
                return Err(RuntimeError::capacity_exhausted("arena byte limit", additional));
            }
        }
        Ok(())
    }

    #[cfg(test)]
    fn scribble_tag(&mut self, handle: BlockHandle) {
        if let Some(block) = self.slots[handle.index as usize].block.as_mut() {
            block.tag = 0x0BAD_F00D;
        }
    }
}

/// Iterator over live blocks, see [`TrackedArena::live_blocks`]
#[derive(Debug)]
pub struct LiveBlocks<'a> {
    arena: &'a TrackedArena,
    cursor: Option<u32>,
}

impl Iterator for LiveBlocks<'_> {
    type Item = (BlockHandle, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let slot = &self.arena.slots[index as usize];
        let block = slot.block.as_ref()?;
        self.cursor = block.next;
        Some((BlockHandle::from_raw(index, slot.generation), block.size()))
    }
}
