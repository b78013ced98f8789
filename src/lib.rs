//! Fixed-capacity offset allocator.
//!
//! This crate doesn't allocate any memory itself, it only does the bookkeeping for a linear range
//! of `size` units (bytes of a GPU buffer, slots of a virtual range...). Allocation methods return
//! an [`Allocation`] with an offset that the user can interpret in whichever way they need.
//!
//! Free ranges are kept in 256 size-class bins laid out like a small floating point number
//! (see [`small_float`]), with a two-level bitmask to find a fitting bin in constant time.
//! Range records live in a fixed node pool, and physically adjacent free ranges are merged back
//! as soon as they are freed.
//!
//! ```
//! use offset_allocator::Allocator;
//!
//! let mut allocator = Allocator::new(1024, 16).unwrap();
//! let a = allocator.allocate(100);
//! assert_eq!(a.offset, 0);
//! assert_eq!(allocator.allocation_size(a), 100);
//! allocator.free(a);
//! assert_eq!(allocator.storage_report().total_free_space, 1024);
//! ```
//!
//! The allocator isn't synchronized. Callers sharing one between threads need to wrap it in a
//! lock.

mod allocator;
mod bins;
mod error;
mod node;
mod report;
pub mod small_float;
pub mod trace;

use serde::{Deserialize, Serialize};

pub use allocator::{Allocator, DEFAULT_MAX_ALLOCS};
pub use bins::{NUM_LEAF_BINS, NUM_TOP_BINS};
pub use error::{AllocError, InitError};
pub use node::{NodeIndex, MAX_NODE_COUNT};
pub use report::{StorageRegion, StorageReport, StorageReportFull};

/// A range handed out by an [`Allocator`].
///
/// `metadata` identifies the range inside the allocator and must be given back unchanged to
/// [`Allocator::free`]. Failed allocations have both fields set to [`Allocation::NO_SPACE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Allocation {
    pub offset: u32,
    pub metadata: u32,
}

impl Allocation {
    pub const NO_SPACE: u32 = u32::MAX;

    /// The allocation returned on failure.
    pub const FAILED: Self = Self {
        offset: Self::NO_SPACE,
        metadata: Self::NO_SPACE,
    };

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn metadata(&self) -> u32 {
        self.metadata
    }

    pub fn is_valid(&self) -> bool {
        self.offset != Self::NO_SPACE && self.metadata != Self::NO_SPACE
    }
}
