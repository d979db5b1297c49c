#![cfg_attr(not(test), no_std)]

//! A simulated contiguous memory allocator.
//!
//! An address space of a fixed size is partitioned into an ordered list of
//! blocks, each either free or held by a named owner. Requests are placed
//! with first, best or worst fit, released blocks are merged with free
//! neighbours, and compaction slides every allocation down to address 0.
//! Only the bookkeeping is simulated; no memory is handed out.
//!
//! ```
//! use core::num::NonZeroUsize;
//! use contiguous_allocator::{Memory, Owner, Strategy};
//!
//! let mut memory = Memory::new(NonZeroUsize::new(100).unwrap());
//! let p1 = Owner::new("P1").unwrap();
//! let range = memory
//!     .allocate(p1, NonZeroUsize::new(40).unwrap(), Strategy::Best)
//!     .unwrap();
//! assert_eq!(range, 0..40);
//!
//! memory.release(&p1).unwrap();
//! assert_eq!(memory.len(), 1);
//! ```

extern crate alloc;

pub mod allocators;
pub mod blocklist;
pub mod command;
pub mod error;
pub mod owner;
pub mod status;
pub mod strategy;

pub use allocators::{Memory, SharedMemory};
pub use command::{Command, ParseError, Reply};
pub use error::{AllocationError, AllocationFailure, Error, ReleaseError};
pub use owner::{Owner, OwnerError, MAX_OWNER_LEN};
pub use status::{Label, StatusEntry, StatusReport};
pub use strategy::Strategy;
