use thiserror::Error;

/// Returned by [`Allocator::new`](crate::Allocator::new) for unusable configurations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    #[error("an allocator needs room for at least one allocation")]
    ZeroCapacity,
    #[error("{requested} allocations requested but node indices can only address {max}")]
    CapacityTooLarge { requested: u32, max: u64 },
}

/// Why [`Allocator::try_allocate`](crate::Allocator::try_allocate) failed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocError {
    #[error("zero-sized allocations are not supported")]
    ZeroSize,
    /// Every node is tracking a range; free something first.
    #[error("OOM: too many allocations")]
    OutOfNodes,
    /// No free range is big enough.
    #[error("OOM: no free range large enough")]
    OutOfSpace,
}
