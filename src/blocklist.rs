use alloc::collections::TryReserveError;
use alloc::vec::Vec;
use core::fmt;
use core::ops::Range;

use log::trace;

use crate::owner::Owner;

/// A contiguous run of the simulated address space.
///
/// A block is allocated exactly when it has an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    start: usize,
    size: usize,
    owner: Option<Owner>,
}

/// An enum for easy comparison of blocks and their order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Before,
    AdjacentBefore,
    Overlapping,
    AdjacentAfter,
    After,
}

impl Block {
    pub fn free(start: usize, size: usize) -> Block {
        Block {
            start,
            size,
            owner: None,
        }
    }

    pub fn allocated(start: usize, size: usize, owner: Owner) -> Block {
        Block {
            start,
            size,
            owner: Some(owner),
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    /// The size of the block, in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// One past the last address covered by this block.
    pub fn end(&self) -> usize {
        self.start + self.size
    }

    pub fn owner(&self) -> Option<&Owner> {
        self.owner.as_ref()
    }

    pub fn is_free(&self) -> bool {
        self.owner.is_none()
    }

    pub fn is_allocated(&self) -> bool {
        self.owner.is_some()
    }

    /// Get the address range covered by this block.
    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end()
    }

    /// Compare two blocks to see how they are ordered.
    pub fn relation(&self, other: &Self) -> Relation {
        let self_range = self.as_range();
        let other_range = other.as_range();

        if self_range.end < other_range.start {
            Relation::Before
        } else if self_range.end == other_range.start {
            Relation::AdjacentBefore
        } else if self_range.start < other_range.end {
            Relation::Overlapping
        } else if self_range.start == other_range.end {
            Relation::AdjacentAfter
        } else {
            Relation::After
        }
    }

    /// Split `size` bytes off the low end of this free block and hand them to
    /// `owner`. This block shrinks to the remainder, starting right after the
    /// returned block.
    ///
    /// Panics if this block is allocated, or if `size` does not leave a
    /// non-empty remainder; a request of exactly this block's size should
    /// relabel the block instead.
    fn split(&mut self, size: usize, owner: Owner) -> Block {
        assert!(self.is_free(), "Can't split an allocated block");
        if size == 0 || size >= self.size {
            panic!(
                "Can't split a block of size {} off of a block of size {}",
                size, self.size,
            )
        }

        let carved = Block::allocated(self.start, size, owner);
        self.start += size;
        self.size -= size;
        carved
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.owner {
            Some(ref owner) => write!(f, "{}:{} '{}'", self.start, self.size, owner),
            None => write!(f, "{}:{} free", self.start, self.size),
        }
    }
}

/// A `BlockList` is the ordered sequence of blocks partitioning an address
/// space, both free and allocated.
///
/// It maintains a few internal invariants:
///
/// - Blocks are sorted by start address.
/// - Each block ends exactly where the next one starts.
/// - No block is empty.
/// - No two free blocks are adjacent (those are merged when a block is freed).
/// - No owner labels more than one block.
///
/// Whether the list covers exactly `[0, total_size)` is up to the owner of the
/// list; `stats` checks that too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockList {
    blocks: Vec<Block>,
}

pub type BlockIter<'list> = core::slice::Iter<'list, Block>;

impl<'list> IntoIterator for &'list BlockList {
    type Item = &'list Block;
    type IntoIter = BlockIter<'list>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

impl fmt::Display for BlockList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockList(")?;
        let mut start = true;
        for block in self {
            if !start {
                write!(f, ", ")?;
            } else {
                start = false;
            }
            write!(f, "{}", block)?;
        }

        write!(f, ")")
    }
}

/// Validity contains a representation of all invalid states found in a
/// BlockList.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Validity {
    /// Number of blocks overlapping the block before them.
    ///
    /// This likely indicates corruption.
    pub overlaps: usize,
    /// Number of holes between consecutive blocks.
    pub gaps: usize,
    /// Number of blocks that do not start after the end of the one before.
    pub out_of_orders: usize,
    /// Number of free blocks directly after another free block. These should
    /// have been merged.
    pub adjacent_free: usize,
    /// Number of blocks of size zero.
    pub empty_blocks: usize,
    /// Number of allocated blocks whose owner already appeared earlier.
    pub duplicate_owners: usize,
    /// Whether the first block starts at address 0.
    pub starts_at_zero: bool,
    /// Whether the last block ends at the total size of the space.
    pub ends_at_total: bool,
}

impl Validity {
    /// Returns a boolean - a simple check if all cases are 0 and the list
    /// covers the whole space.
    pub fn is_valid(&self) -> bool {
        self.overlaps == 0
            && self.gaps == 0
            && self.out_of_orders == 0
            && self.adjacent_free == 0
            && self.empty_blocks == 0
            && self.duplicate_owners == 0
            && self.starts_at_zero
            && self.ends_at_total
    }
}

impl From<Validity> for bool {
    fn from(v: Validity) -> bool {
        v.is_valid()
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    pub length: usize,
    pub free_blocks: usize,
    pub free_size: usize,
    pub allocated_blocks: usize,
    pub allocated_size: usize,
    pub largest_free: usize,
}

impl BlockList {
    /// A list holding one free block covering `[0, total_size)`.
    pub fn new(total_size: usize) -> BlockList {
        BlockList {
            blocks: alloc::vec![Block::free(0, total_size)],
        }
    }

    /// Build a list from raw blocks, without checking anything. Use `stats`
    /// to find out whether the result is sound.
    pub fn from_blocks(blocks: Vec<Block>) -> BlockList {
        BlockList { blocks }
    }

    pub fn iter(&self) -> BlockIter<'_> {
        self.blocks.iter()
    }

    pub fn as_slice(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get(&self, ix: usize) -> Option<&Block> {
        self.blocks.get(ix)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Index of the allocated block labelled `owner`, if any.
    pub fn position_of(&self, owner: &Owner) -> Option<usize> {
        self.blocks
            .iter()
            .position(|block| block.owner() == Some(owner))
    }

    /// Check current size of the list, and whether it is a valid partition of
    /// `[0, total_size)`.
    pub fn stats(&self, total_size: usize) -> (Validity, Stats) {
        let mut validity = Validity {
            starts_at_zero: self.blocks.first().map(Block::start) == Some(0),
            ends_at_total: self.blocks.last().map(Block::end) == Some(total_size),
            ..Default::default()
        };
        let mut stats: Stats = Default::default();

        let mut previous: Option<&Block> = None;
        for (ix, next) in self.blocks.iter().enumerate() {
            match previous.map(|p| p.relation(next)) {
                Some(Relation::Before) => {
                    // Right order, but there is a hole between them.
                    validity.gaps += 1;
                }
                Some(Relation::AdjacentBefore) => {
                    // This is what we want.
                }
                Some(Relation::Overlapping) => {
                    // This is really bad.
                    validity.overlaps += 1;
                }
                Some(Relation::AdjacentAfter) | Some(Relation::After) => {
                    // Wrong order.
                    validity.out_of_orders += 1;
                }
                None => {
                    // This is the first in the list. Valid, do nothing.
                }
            }

            if next.size == 0 {
                validity.empty_blocks += 1;
            }

            match next.owner {
                None => {
                    if previous.map_or(false, Block::is_free) {
                        validity.adjacent_free += 1;
                    }
                    stats.free_blocks += 1;
                    stats.free_size += next.size;
                    stats.largest_free = stats.largest_free.max(next.size);
                }
                Some(ref owner) => {
                    if self.blocks[..ix].iter().any(|b| b.owner() == Some(owner)) {
                        validity.duplicate_owners += 1;
                    }
                    stats.allocated_blocks += 1;
                    stats.allocated_size += next.size;
                }
            }

            stats.length += 1;
            previous = Some(next);
        }

        (validity, stats)
    }

    /// Hand the free block at `ix` to `owner`: relabel it if it is exactly
    /// `size` bytes, or carve `size` bytes off its low end otherwise. Returns
    /// the address range now owned by `owner`.
    ///
    /// Storage for the new block record is reserved before anything changes,
    /// so on error the list is untouched.
    ///
    /// Panics if the block at `ix` is allocated or smaller than `size`.
    pub fn claim(
        &mut self,
        ix: usize,
        size: usize,
        owner: Owner,
    ) -> Result<Range<usize>, TryReserveError> {
        let block = &mut self.blocks[ix];
        assert!(block.is_free(), "Can't claim an allocated block");

        if block.size == size {
            trace!("  Block {} at {} is exactly {} bytes", ix, block.start, size);
            block.owner = Some(owner);
            return Ok(block.as_range());
        }

        self.blocks.try_reserve(1)?;
        let carved = self.blocks[ix].split(size, owner);
        trace!(
            "  Split {} bytes off block {}, leaving {}",
            size,
            ix,
            self.blocks[ix]
        );
        self.blocks.insert(ix, carved);
        Ok(carved.as_range())
    }

    /// Free the block at `ix` and merge it with any free neighbours. Returns
    /// the index of the resulting free block.
    pub fn release(&mut self, ix: usize) -> usize {
        self.blocks[ix].owner = None;

        self.try_merge_next(ix);
        if ix > 0 && self.try_merge_next(ix - 1) {
            return ix - 1;
        }
        ix
    }

    /// Attempt to merge the free block at `ix` with the next.
    ///
    /// If the next block exists, is free, and starts directly after this
    /// block, the two will merge and this will return true; otherwise, this
    /// will return false.
    pub fn try_merge_next(&mut self, ix: usize) -> bool {
        let (this, next) = match self.blocks.get(ix..ix + 2) {
            Some([this, next]) => (this, next),
            _ => return false,
        };
        if !this.is_free() || !next.is_free() || this.end() != next.start {
            return false;
        }

        trace!("  Merging {} into {}", next, this);
        let next_size = next.size;
        self.blocks[ix].size += next_size;
        self.blocks.remove(ix + 1);
        true
    }

    /// Build the compacted form of this list: every allocated block, in
    /// order, packed from address 0, followed by one free block holding all
    /// the free space (if there is any).
    ///
    /// The current list is not modified.
    pub fn compacted(&self) -> Result<BlockList, TryReserveError> {
        let allocated = self.blocks.iter().filter(|b| b.is_allocated()).count();
        let free_size: usize = self
            .blocks
            .iter()
            .filter(|b| b.is_free())
            .map(Block::size)
            .sum();

        let mut blocks = Vec::new();
        blocks.try_reserve_exact(allocated + usize::from(free_size > 0))?;

        let mut address = 0;
        for block in self.blocks.iter().filter(|b| b.is_allocated()) {
            blocks.push(Block {
                start: address,
                ..*block
            });
            address += block.size;
        }
        if free_size > 0 {
            blocks.push(Block::free(address, free_size));
        }

        Ok(BlockList { blocks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn owner(name: &str) -> Owner {
        Owner::new(name).unwrap()
    }

    fn assert_valid(list: &BlockList, total: usize) {
        let (validity, _) = list.stats(total);
        assert!(validity.is_valid(), "{}: {:?}", list, validity);
    }

    #[test]
    fn test_relation() {
        let a = Block::free(0, 10);
        assert_eq!(a.relation(&Block::free(20, 5)), Relation::Before);
        assert_eq!(a.relation(&Block::free(10, 5)), Relation::AdjacentBefore);
        assert_eq!(a.relation(&Block::free(5, 10)), Relation::Overlapping);
        assert_eq!(Block::free(10, 5).relation(&a), Relation::AdjacentAfter);
        assert_eq!(Block::free(20, 5).relation(&a), Relation::After);
    }

    #[test]
    fn test_claim_split_and_exact() {
        let mut list = BlockList::new(100);

        let range = list.claim(0, 30, owner("A")).unwrap();
        assert_eq!(range, 0..30);
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(0), Some(&Block::allocated(0, 30, owner("A"))));
        assert_eq!(list.get(1), Some(&Block::free(30, 70)));
        assert_valid(&list, 100);

        let range = list.claim(1, 70, owner("B")).unwrap();
        assert_eq!(range, 30..100);
        assert_eq!(list.len(), 2);
        assert_valid(&list, 100);
        log::info!("claimed: {}", list);
    }

    #[test]
    #[should_panic(expected = "Can't claim an allocated block")]
    fn test_claim_allocated_panics() {
        let mut list = BlockList::new(100);
        list.claim(0, 10, owner("A")).unwrap();
        let _ = list.claim(0, 5, owner("B"));
    }

    #[test]
    fn test_release_merges_both_sides() {
        let mut list = BlockList::from_blocks(vec![
            Block::free(0, 10),
            Block::allocated(10, 20, owner("A")),
            Block::free(30, 30),
            Block::allocated(60, 40, owner("B")),
        ]);
        assert_valid(&list, 100);

        let ix = list.release(1);
        assert_eq!(ix, 0);
        assert_eq!(list.as_slice(), &[
            Block::free(0, 60),
            Block::allocated(60, 40, owner("B")),
        ]);
        assert_valid(&list, 100);

        let ix = list.release(1);
        assert_eq!(ix, 0);
        assert_eq!(list.as_slice(), &[Block::free(0, 100)]);
    }

    #[test]
    fn test_release_without_free_neighbours() {
        let mut list = BlockList::from_blocks(vec![
            Block::allocated(0, 10, owner("A")),
            Block::allocated(10, 10, owner("B")),
            Block::allocated(20, 10, owner("C")),
        ]);
        assert_eq!(list.release(1), 1);
        assert_eq!(list.len(), 3);
        assert_eq!(list.get(1), Some(&Block::free(10, 10)));
        assert_valid(&list, 30);
    }

    #[test]
    fn test_stats_finds_problems() {
        let list = BlockList::from_blocks(vec![
            Block::free(5, 10),
            Block::free(15, 5),
            Block::allocated(25, 10, owner("A")),
            Block::allocated(30, 10, owner("A")),
            Block::free(40, 0),
        ]);
        let (validity, stats) = list.stats(50);
        assert_eq!(
            validity,
            Validity {
                overlaps: 1,
                gaps: 1,
                out_of_orders: 0,
                adjacent_free: 1,
                empty_blocks: 1,
                duplicate_owners: 1,
                starts_at_zero: false,
                ends_at_total: false,
            }
        );
        assert!(!bool::from(validity));
        assert_eq!(stats.length, 5);
        assert_eq!(stats.free_blocks, 3);
        assert_eq!(stats.free_size, 15);
        assert_eq!(stats.allocated_size, 20);
        assert_eq!(stats.largest_free, 10);
    }

    #[test]
    fn test_compacted() {
        let list = BlockList::from_blocks(vec![
            Block::allocated(0, 20, owner("A")),
            Block::free(20, 30),
            Block::allocated(50, 10, owner("B")),
            Block::free(60, 40),
        ]);

        let compacted = list.compacted().unwrap();
        assert_eq!(compacted.as_slice(), &[
            Block::allocated(0, 20, owner("A")),
            Block::allocated(20, 10, owner("B")),
            Block::free(30, 70),
        ]);
        assert_valid(&compacted, 100);
        // The source is left alone.
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn test_compacted_edge_cases() {
        let full = BlockList::from_blocks(vec![
            Block::allocated(0, 40, owner("A")),
            Block::allocated(40, 60, owner("B")),
        ]);
        assert_eq!(full.compacted().unwrap(), full);

        let empty = BlockList::new(100);
        assert_eq!(empty.compacted().unwrap(), empty);
    }

    #[test]
    fn test_display() {
        let list = BlockList::from_blocks(vec![
            Block::allocated(0, 20, owner("A")),
            Block::free(20, 80),
        ]);
        assert_eq!(list.to_string(), "BlockList(0:20 'A', 20:80 free)");
    }
}
