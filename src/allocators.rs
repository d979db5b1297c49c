//! The allocator engine, in single-threaded and shared form.
//!
//! ## Basic Types
//!
//! ### [`Memory`](struct.Memory.html)
//!
//! A `Memory` is a single simulated address space: a [`BlockList`] covering
//! `[0, total_size)`, plus the operations that carve it up (`allocate`),
//! give space back (`release`), squeeze out fragmentation (`compact`) and
//! describe it (`status`). It is a plain value; each one is independent of
//! every other.
//!
//! ### [`SharedMemory`](struct.SharedMemory.html)
//!
//! A `SharedMemory` wraps `Memory` with a spin lock, so that several threads
//! can work on the same address space. Each operation holds the lock from
//! start to finish.

use core::num::NonZeroUsize;
use core::ops::Range;

use log::{debug, trace};
use spin::{Mutex, MutexGuard};

use crate::blocklist::{Block, BlockList, Stats, Validity};
use crate::error::{AllocationError, AllocationFailure, ReleaseError};
use crate::owner::Owner;
use crate::status::StatusReport;
use crate::strategy::Strategy;

/// A simulated contiguous address space.
///
/// After every call, successful or not, the blocks are ordered, contiguous,
/// cover exactly `[0, total_size)`, no two free blocks touch, and no owner
/// holds more than one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    total_size: usize,
    blocks: BlockList,
}

impl Memory {
    /// Create a new address space of `total_size` bytes, all of it free.
    pub fn new(total_size: NonZeroUsize) -> Self {
        Memory {
            total_size: total_size.get(),
            blocks: BlockList::new(total_size.get()),
        }
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn blocks(&self) -> &BlockList {
        &self.blocks
    }

    /// Number of blocks, free and allocated.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Never true: an address space always has at least one block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Whether `owner` currently holds an allocation.
    pub fn owns(&self, owner: &Owner) -> bool {
        self.blocks.position_of(owner).is_some()
    }

    pub fn free_size(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| b.is_free())
            .map(Block::size)
            .sum()
    }

    pub fn allocated_size(&self) -> usize {
        self.total_size - self.free_size()
    }

    /// Get statistics on this address space, and verify validity of the
    /// BlockList
    pub fn stats(&self) -> (Validity, Stats) {
        self.blocks.stats(self.total_size)
    }

    /// Give `size` bytes to `owner`, placed according to `strategy`, and
    /// return the address range it now holds.
    ///
    /// The space is carved from the low end of the chosen free block.
    pub fn allocate(
        &mut self,
        owner: Owner,
        size: NonZeroUsize,
        strategy: Strategy,
    ) -> Result<Range<usize>, AllocationError> {
        let size = size.get();
        trace!("allocate({}, {}, {:?})", owner, size, strategy);

        if self.owns(&owner) {
            return Err(AllocationError::DuplicateOwner(owner));
        }

        let ix = strategy
            .select(self.blocks.as_slice(), size)
            .ok_or(AllocationError::NoSuitableBlock { requested: size })?;

        let range = self
            .blocks
            .claim(ix, size, owner)
            .map_err(AllocationFailure::from)?;

        debug!(
            "Allocated {} bytes at {:?} to '{}' using {:?} fit",
            size, range, owner, strategy
        );
        Ok(range)
    }

    /// Free the block held by `owner`, merging it with any free neighbours.
    /// Returns the range `owner` held.
    pub fn release(&mut self, owner: &Owner) -> Result<Range<usize>, ReleaseError> {
        trace!("release({})", owner);

        let ix = self
            .blocks
            .position_of(owner)
            .ok_or(ReleaseError::NotFound(*owner))?;
        let range = self.blocks.as_slice()[ix].as_range();

        let merged = self.blocks.release(ix);
        debug!(
            "Released {:?} from '{}'; free block is now {:?}",
            range,
            owner,
            self.blocks.get(merged).map(Block::as_range)
        );
        Ok(range)
    }

    /// Move every allocated block to the low end of the address space, in
    /// their current order, and gather all free space into one block at the
    /// end.
    ///
    /// The new layout is built in full before it replaces the old one; if
    /// that fails, nothing changes.
    pub fn compact(&mut self) -> Result<(), AllocationFailure> {
        let compacted = self.blocks.compacted()?;
        debug!(
            "Compacted {} blocks into {}",
            self.blocks.len(),
            compacted.len()
        );
        self.blocks = compacted;
        Ok(())
    }

    /// Every block, in address order, with its owner or `Unused`.
    pub fn status(&self) -> StatusReport<'_> {
        StatusReport::new(self.blocks.as_slice(), self.total_size)
    }
}

/// An address space shared between threads, using a spin lock around a
/// `Memory`.
pub struct SharedMemory {
    raw: Mutex<Memory>,
}

impl SharedMemory {
    pub const fn new(memory: Memory) -> Self {
        SharedMemory {
            raw: Mutex::new(memory),
        }
    }

    /// Get a reference to the underlying `Memory`.
    ///
    /// Every other caller waits while the guard is held.
    pub fn lock(&self) -> MutexGuard<'_, Memory> {
        self.raw.lock()
    }

    pub fn allocate(
        &self,
        owner: Owner,
        size: NonZeroUsize,
        strategy: Strategy,
    ) -> Result<Range<usize>, AllocationError> {
        self.lock().allocate(owner, size, strategy)
    }

    pub fn release(&self, owner: &Owner) -> Result<Range<usize>, ReleaseError> {
        self.lock().release(owner)
    }

    pub fn compact(&self) -> Result<(), AllocationFailure> {
        self.lock().compact()
    }

    pub fn stats(&self) -> (Validity, Stats) {
        self.lock().stats()
    }

    pub fn into_inner(self) -> Memory {
        self.raw.into_inner()
    }
}

impl From<Memory> for SharedMemory {
    fn from(memory: Memory) -> Self {
        SharedMemory::new(memory)
    }
}
