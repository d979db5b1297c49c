//! Placement strategies: which free block satisfies a request.

use core::fmt;
use core::str::FromStr;

use log::trace;
use thiserror::Error;

use crate::blocklist::Block;

/// The rule used to choose among the free blocks large enough for a request.
///
/// All three scan the blocks in address order. Ties always go to the block
/// found first, i.e. the one at the lowest address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// The first block that fits.
    First,
    /// The smallest block that fits.
    Best,
    /// The largest block that fits.
    Worst,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown strategy {0:?}, expected one of F, B or W")]
pub struct UnknownStrategy(pub char);

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::First, Strategy::Best, Strategy::Worst];

    /// The single-letter code used on the command line.
    pub fn code(self) -> char {
        match self {
            Strategy::First => 'F',
            Strategy::Best => 'B',
            Strategy::Worst => 'W',
        }
    }

    pub fn from_code(code: char) -> Result<Strategy, UnknownStrategy> {
        match code {
            'F' => Ok(Strategy::First),
            'B' => Ok(Strategy::Best),
            'W' => Ok(Strategy::Worst),
            other => Err(UnknownStrategy(other)),
        }
    }

    /// Pick a free block of at least `size` bytes, returning its index in
    /// `blocks`.
    pub fn select(self, blocks: &[Block], size: usize) -> Option<usize> {
        let candidates = blocks
            .iter()
            .enumerate()
            .filter(|(_, block)| block.is_free() && block.size() >= size);

        let mut chosen: Option<(usize, usize)> = None;
        for (ix, block) in candidates {
            trace!(
                "  {:?} fit considering block {} at {}, size {}",
                self,
                ix,
                block.start(),
                block.size()
            );
            let replace = match (self, chosen) {
                (_, None) => true,
                (Strategy::First, Some(_)) => false,
                (Strategy::Best, Some((_, best))) => block.size() < best,
                (Strategy::Worst, Some((_, worst))) => block.size() > worst,
            };
            if replace {
                chosen = Some((ix, block.size()));
            }
            if self == Strategy::First {
                // Earliest address wins; no need to look further.
                break;
            }
        }

        chosen.map(|(ix, _)| ix)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Strategy::from_code(c),
            // Report the first character of anything that isn't a single letter.
            (Some(c), Some(_)) => Err(UnknownStrategy(c)),
            (None, _) => Err(UnknownStrategy(' ')),
        }
    }
}
