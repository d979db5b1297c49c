//! Read-only reporting over an address space.

use core::fmt;
use core::iter::FusedIterator;
use core::ops::Range;

use crate::blocklist::{Block, BlockIter};
use crate::owner::Owner;

/// Who a reported range belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label<'a> {
    Owner(&'a Owner),
    Unused,
}

/// One line of a status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry<'a> {
    pub range: Range<usize>,
    pub label: Label<'a>,
}

impl<'a> StatusEntry<'a> {
    pub fn start(&self) -> usize {
        self.range.start
    }

    /// One past the last address of the range.
    pub fn end(&self) -> usize {
        self.range.end
    }

    fn from_block(block: &'a Block) -> StatusEntry<'a> {
        StatusEntry {
            range: block.as_range(),
            label: block.owner().map_or(Label::Unused, Label::Owner),
        }
    }
}

impl fmt::Display for StatusEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Addresses are printed inclusively.
        write!(f, "Addresses [{}:{}] ", self.range.start, self.range.end - 1)?;
        match self.label {
            Label::Owner(owner) => write!(f, "Process '{}'", owner),
            Label::Unused => write!(f, "Unused"),
        }
    }
}

/// A report over every block of an address space, in address order.
///
/// Iterate over it for the entries, or display it for the printed report.
#[derive(Clone)]
pub struct StatusReport<'a> {
    blocks: &'a [Block],
    total_size: usize,
}

impl<'a> StatusReport<'a> {
    pub(crate) fn new(blocks: &'a [Block], total_size: usize) -> Self {
        StatusReport { blocks, total_size }
    }

    pub fn iter(&self) -> StatusIter<'a> {
        StatusIter {
            blocks: self.blocks.iter(),
        }
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl<'a> IntoIterator for StatusReport<'a> {
    type Item = StatusEntry<'a>;
    type IntoIter = StatusIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &StatusReport<'a> {
    type Item = StatusEntry<'a>;
    type IntoIter = StatusIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for StatusReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Memory Status:")?;
        for entry in self {
            writeln!(f, "{}", entry)?;
        }
        write!(f, "Total memory size: {} bytes", self.total_size)
    }
}

pub struct StatusIter<'a> {
    blocks: BlockIter<'a>,
}

impl<'a> Iterator for StatusIter<'a> {
    type Item = StatusEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.blocks.next().map(StatusEntry::from_block)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.blocks.size_hint()
    }
}

impl ExactSizeIterator for StatusIter<'_> {}

impl FusedIterator for StatusIter<'_> {}
