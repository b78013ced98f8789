//! Two-level bin directory.
//!
//! The 256 size classes produced by [`small_float`](crate::small_float) are split into 32 top bins
//! of 8 leaf bins each. A 32-bit mask records which top bins hold any free node, and one 8-bit
//! mask per top bin records which of its leaf bins do. Finding the smallest non-empty bin that
//! can hold a request is then two bit scans.

use crate::node::{Node, NodeIndex};
use crate::small_float::find_lowest_set_bit_after;

pub const NUM_TOP_BINS: usize = 32;
pub const BINS_PER_LEAF: usize = 8;
pub const TOP_BINS_INDEX_SHIFT: u32 = 3;
pub const LEAF_BINS_INDEX_MASK: u32 = 0x7;
pub const NUM_LEAF_BINS: usize = NUM_TOP_BINS * BINS_PER_LEAF;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BinDirectory {
    used_bins_top: u32,
    used_bins: [u8; NUM_TOP_BINS],
    /// Head of each bin's free list, or [`Node::UNUSED`].
    bin_indices: [NodeIndex; NUM_LEAF_BINS],
}

impl Default for BinDirectory {
    fn default() -> Self {
        Self {
            used_bins_top: 0,
            used_bins: [0; NUM_TOP_BINS],
            bin_indices: [Node::UNUSED; NUM_LEAF_BINS],
        }
    }
}

impl BinDirectory {
    /// Returns the first node of the free list of `bin_index`.
    pub fn head(&self, bin_index: u32) -> NodeIndex {
        self.bin_indices[bin_index as usize]
    }

    /// Replaces the first node of the free list of `bin_index`, keeping both masks in sync.
    pub fn set_head(&mut self, bin_index: u32, node_index: NodeIndex) {
        let top_bin_index = (bin_index >> TOP_BINS_INDEX_SHIFT) as usize;
        let leaf_bin_index = bin_index & LEAF_BINS_INDEX_MASK;

        self.bin_indices[bin_index as usize] = node_index;
        if node_index == Node::UNUSED {
            self.used_bins[top_bin_index] &= !(1 << leaf_bin_index);
            if self.used_bins[top_bin_index] == 0 {
                self.used_bins_top &= !(1 << top_bin_index);
            }
        } else {
            self.used_bins[top_bin_index] |= 1 << leaf_bin_index;
            self.used_bins_top |= 1 << top_bin_index;
        }
    }

    /// Finds the smallest non-empty bin with an index of at least `min_bin_index`.
    pub fn find_free_bin(&self, min_bin_index: u32) -> Option<u32> {
        let min_top_bin_index = min_bin_index >> TOP_BINS_INDEX_SHIFT;
        let min_leaf_bin_index = min_bin_index & LEAF_BINS_INDEX_MASK;

        let mut top_bin_index = min_top_bin_index;
        let mut leaf_bin_index = None;

        // The top bin of the request may still hold a big enough leaf bin.
        if self.used_bins_top & (1 << top_bin_index) != 0 {
            leaf_bin_index = find_lowest_set_bit_after(
                u32::from(self.used_bins[top_bin_index as usize]),
                min_leaf_bin_index,
            );
        }

        let leaf_bin_index = match leaf_bin_index {
            Some(leaf_bin_index) => leaf_bin_index,
            None => {
                top_bin_index = find_lowest_set_bit_after(self.used_bins_top, min_top_bin_index + 1)?;
                // Every leaf of a bigger top bin fits. Its mask can't be empty since the top bit
                // was set.
                u32::from(self.used_bins[top_bin_index as usize]).trailing_zeros()
            }
        };

        Some((top_bin_index << TOP_BINS_INDEX_SHIFT) | leaf_bin_index)
    }

    /// Returns the biggest non-empty bin.
    pub fn largest_bin(&self) -> Option<u32> {
        if self.used_bins_top == 0 {
            return None;
        }
        let top_bin_index = 31 - self.used_bins_top.leading_zeros();
        let leaf_bin_index = 31 - u32::from(self.used_bins[top_bin_index as usize]).leading_zeros();
        Some((top_bin_index << TOP_BINS_INDEX_SHIFT) | leaf_bin_index)
    }

    /// Returns `true` if the masks agree with the list heads.
    #[cfg(test)]
    pub fn is_consistent(&self) -> bool {
        (0..NUM_TOP_BINS).all(|top| {
            let leaves_match = (0..BINS_PER_LEAF).all(|leaf| {
                let used = self.bin_indices[top * BINS_PER_LEAF + leaf] != Node::UNUSED;
                used == (self.used_bins[top] & (1 << leaf) != 0)
            });
            leaves_match && (self.used_bins[top] != 0) == (self.used_bins_top & (1 << top) != 0)
        })
    }
}
