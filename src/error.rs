//! Errors reported by the allocator engine.
//!
//! Every failure is recoverable: the address space is left exactly as it was
//! before the failed call.

use alloc::collections::TryReserveError;

use thiserror::Error;

use crate::owner::Owner;

/// Storage for a new block record could not be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("could not obtain storage for block records")]
pub struct AllocationFailure;

impl From<TryReserveError> for AllocationFailure {
    fn from(_: TryReserveError) -> Self {
        AllocationFailure
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("process '{0}' already holds an allocation")]
    DuplicateOwner(Owner),
    #[error("not enough memory available for a request of {requested} bytes")]
    NoSuitableBlock { requested: usize },
    #[error(transparent)]
    AllocationFailure(#[from] AllocationFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReleaseError {
    #[error("process '{0}' not found in allocated memory")]
    NotFound(Owner),
}

/// Any error an engine operation can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Release(#[from] ReleaseError),
    #[error(transparent)]
    Compaction(#[from] AllocationFailure),
}
