use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;

use crate::bins::NUM_LEAF_BINS;

/// Summary of the free space left in an [`Allocator`](crate::Allocator).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageReport {
    /// Sum of every free range. Zero once the node pool is exhausted, as nothing else can be
    /// allocated anyway.
    pub total_free_space: u32,
    /// Size class of the biggest free range. The range itself may be slightly bigger.
    pub largest_free_region: u32,
}

/// Free ranges of one size class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageRegion {
    pub size: u32,
    pub count: u32,
}

/// Per-bin breakdown of the free space, indexed by bin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageReportFull {
    #[serde(with = "BigArray")]
    pub free_regions: [StorageRegion; NUM_LEAF_BINS],
}

impl Default for StorageReportFull {
    fn default() -> Self {
        Self {
            free_regions: [StorageRegion::default(); NUM_LEAF_BINS],
        }
    }
}

impl StorageReportFull {
    /// Iterates over the bins that currently hold free ranges.
    pub fn iter_nonempty(&self) -> impl Iterator<Item = &StorageRegion> + '_ {
        self.free_regions.iter().filter(|region| region.count > 0)
    }

    /// Total number of free ranges across every bin.
    pub fn free_range_count(&self) -> u32 {
        self.free_regions.iter().map(|region| region.count).sum()
    }
}
