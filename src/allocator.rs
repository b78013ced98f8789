use std::fmt;

use crate::bins::{BinDirectory, NUM_LEAF_BINS};
use crate::error::{AllocError, InitError};
use crate::node::{Node, NodeIndex, NodePool, MAX_NODE_COUNT};
use crate::report::{StorageRegion, StorageReport, StorageReportFull};
use crate::small_float::{float_to_uint, uint_to_float_round_down, uint_to_float_round_up};
use crate::Allocation;

/// Node pool capacity used by [`Allocator::with_default_capacity`].
pub const DEFAULT_MAX_ALLOCS: u32 = 128 * 1024;

/// Offset allocator over a linear range of `size` units.
///
/// Allocation and deallocation are O(1): requests are rounded up to a size class, the smallest
/// non-empty fitting bin is found with two bit scans, and the chosen free range is split with its
/// remainder put back into a smaller bin. Freed ranges are merged with their free physical
/// neighbors right away.
///
/// Ranges are tracked by a pool of at most `max_allocs` nodes. Running out of nodes makes
/// allocation fail even if space is left.
///
/// [`Allocator::default`] is an empty allocator with no storage. [`std::mem::take`] can be used to
/// move an allocator out while leaving such an empty one behind.
#[derive(Clone, Default)]
pub struct Allocator {
    size: u32,
    max_allocs: u32,
    /// Total of every range sitting in a bin.
    free_storage: u32,
    bins: BinDirectory,
    nodes: NodePool,
}

impl fmt::Debug for Allocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.storage_report_full();
        let mut bins = f.debug_map();
        for (bin_index, region) in report.free_regions.iter().enumerate() {
            if region.count > 0 {
                bins.entry(&bin_index, &format_args!("{} x {}", region.count, region.size));
            }
        }
        bins.finish()?;
        write!(
            f,
            " ({}/{} free, {} nodes left)",
            self.free_storage,
            self.size,
            self.nodes.free_count()
        )
    }
}

impl Allocator {
    /// Creates an allocator over `size` units able to track up to `max_allocs` ranges.
    pub fn new(size: u32, max_allocs: u32) -> Result<Self, InitError> {
        if max_allocs == 0 {
            return Err(InitError::ZeroCapacity);
        }
        if u64::from(max_allocs) > MAX_NODE_COUNT {
            return Err(InitError::CapacityTooLarge {
                requested: max_allocs,
                max: MAX_NODE_COUNT,
            });
        }

        let mut allocator = Self {
            size,
            max_allocs,
            ..Default::default()
        };
        allocator.reset();
        Ok(allocator)
    }

    /// Same as [`Allocator::new`] with [`DEFAULT_MAX_ALLOCS`] nodes.
    pub fn with_default_capacity(size: u32) -> Result<Self, InitError> {
        let max_allocs = u64::from(DEFAULT_MAX_ALLOCS).min(MAX_NODE_COUNT) as u32;
        Self::new(size, max_allocs)
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn max_allocs(&self) -> u32 {
        self.max_allocs
    }

    /// Sum of the sizes of every free range.
    pub fn free_storage(&self) -> u32 {
        self.free_storage
    }

    /// Forgets every allocation and starts over with a single free range covering everything.
    ///
    /// Allocations made before the reset must not be freed afterwards.
    pub fn reset(&mut self) {
        log::debug!(
            "resetting allocator of {} units with {} nodes",
            self.size,
            self.max_allocs
        );

        self.free_storage = 0;
        self.bins = BinDirectory::default();
        self.nodes.reset(self.max_allocs);

        if let Some(node_index) = self.nodes.acquire() {
            self.insert_node_into_bin(node_index, self.size, 0);
        }
    }

    /// Allocates `size` units, returning [`Allocation::FAILED`] if that's not possible.
    ///
    /// See [`Allocator::try_allocate`] to know why an allocation failed.
    pub fn allocate(&mut self, size: u32) -> Allocation {
        self.try_allocate(size).unwrap_or(Allocation::FAILED)
    }

    /// Allocates `size` units.
    pub fn try_allocate(&mut self, size: u32) -> Result<Allocation, AllocError> {
        if size == 0 {
            return Err(AllocError::ZeroSize);
        }
        if self.nodes.is_exhausted() {
            log::trace!("cannot allocate {size} units: out of nodes");
            return Err(AllocError::OutOfNodes);
        }

        // Rounding up guarantees that every range in the bin found is big enough.
        let min_bin_index = uint_to_float_round_up(size);
        let Some(bin_index) = self.bins.find_free_bin(min_bin_index) else {
            log::trace!("cannot allocate {size} units: out of space");
            return Err(AllocError::OutOfSpace);
        };

        let node_index = self.bins.head(bin_index);
        let node = self.nodes[node_index];
        let node_total_size = node.data_size;
        let remainder_size = node_total_size - size;

        // Not exhausted, so there is always a node left for the remainder.
        let remainder_node_index = if remainder_size > 0 {
            Some(self.nodes.acquire().ok_or(AllocError::OutOfNodes)?)
        } else {
            None
        };

        // Pop the node off its bin.
        self.bins.set_head(bin_index, node.bin_list_next);
        if node.bin_list_next != Node::UNUSED {
            self.nodes[node.bin_list_next].bin_list_prev = Node::UNUSED;
        }
        {
            let node = &mut self.nodes[node_index];
            node.data_size = size;
            node.used = true;
            node.bin_list_next = Node::UNUSED;
        }
        self.free_storage -= node_total_size;
        log::trace!(
            "free storage: {} (-{node_total_size}) (allocate)",
            self.free_storage
        );

        // Put the rest of the range back into a smaller bin, between this node and its old next
        // neighbor.
        if let Some(remainder_node_index) = remainder_node_index {
            self.insert_node_into_bin(
                remainder_node_index,
                remainder_size,
                node.data_offset + size,
            );

            if node.neighbor_next != Node::UNUSED {
                self.nodes[node.neighbor_next].neighbor_prev = remainder_node_index;
            }
            let remainder = &mut self.nodes[remainder_node_index];
            remainder.neighbor_prev = node_index;
            remainder.neighbor_next = node.neighbor_next;
            self.nodes[node_index].neighbor_next = remainder_node_index;
        }

        Ok(Allocation {
            offset: node.data_offset,
            metadata: u32::from(node_index),
        })
    }

    /// Frees an allocation, merging it with any free range right before or after it.
    ///
    /// `allocation` must come from this allocator and must not have been freed already. This is
    /// only checked in debug builds; freeing twice in release corrupts the allocator state.
    /// Freeing on an empty allocator does nothing.
    pub fn free(&mut self, allocation: Allocation) {
        if self.nodes.is_empty() {
            return;
        }
        debug_assert!(
            allocation.metadata != Allocation::NO_SPACE,
            "tried to free a failed allocation"
        );
        if allocation.metadata == Allocation::NO_SPACE {
            return;
        }
        let Ok(node_index) = NodeIndex::try_from(allocation.metadata) else {
            return;
        };

        let node = self.nodes[node_index];
        debug_assert!(node.used, "double free of node {node_index}");

        let mut offset = node.data_offset;
        let mut size = node.data_size;
        let mut neighbor_prev = node.neighbor_prev;
        let mut neighbor_next = node.neighbor_next;

        if neighbor_prev != Node::UNUSED && !self.nodes[neighbor_prev].used {
            let prev_node = self.nodes[neighbor_prev];
            debug_assert_eq!(prev_node.neighbor_next, node_index);
            offset = prev_node.data_offset;
            size += prev_node.data_size;

            self.remove_node_from_bin(neighbor_prev);
            neighbor_prev = prev_node.neighbor_prev;
        }

        if neighbor_next != Node::UNUSED && !self.nodes[neighbor_next].used {
            let next_node = self.nodes[neighbor_next];
            debug_assert_eq!(next_node.neighbor_prev, node_index);
            size += next_node.data_size;

            self.remove_node_from_bin(neighbor_next);
            neighbor_next = next_node.neighbor_next;
        }

        // The freed node would go back to the free stack only to be popped again right away for
        // the merged range, so its record is reused directly.
        log::trace!("reusing node {node_index} for merged range (free)");
        self.insert_node_into_bin(node_index, size, offset);

        if neighbor_next != Node::UNUSED {
            self.nodes[node_index].neighbor_next = neighbor_next;
            self.nodes[neighbor_next].neighbor_prev = node_index;
        }
        if neighbor_prev != Node::UNUSED {
            self.nodes[node_index].neighbor_prev = neighbor_prev;
            self.nodes[neighbor_prev].neighbor_next = node_index;
        }
    }

    /// Returns the size requested for `allocation`, or 0 for failed allocations.
    pub fn allocation_size(&self, allocation: Allocation) -> u32 {
        if allocation.metadata == Allocation::NO_SPACE {
            return 0;
        }
        NodeIndex::try_from(allocation.metadata)
            .ok()
            .and_then(|node_index| self.nodes.get(node_index))
            .map_or(0, |node| node.data_size)
    }

    pub fn storage_report(&self) -> StorageReport {
        let mut report = StorageReport::default();

        // Out of nodes means nothing can be allocated anymore, so no space is reported.
        if !self.nodes.is_exhausted() {
            report.total_free_space = self.free_storage;
            if let Some(bin_index) = self.bins.largest_bin() {
                report.largest_free_region = float_to_uint(bin_index);
                debug_assert!(report.total_free_space >= report.largest_free_region);
            }
        }

        report
    }

    /// Counts the free ranges of every bin.
    pub fn storage_report_full(&self) -> StorageReportFull {
        let mut report = StorageReportFull::default();
        for (bin_index, region) in (0..NUM_LEAF_BINS as u32).zip(report.free_regions.iter_mut()) {
            let mut count = 0;
            let mut node_index = self.bins.head(bin_index);
            while node_index != Node::UNUSED {
                node_index = self.nodes[node_index].bin_list_next;
                count += 1;
            }
            *region = StorageRegion {
                size: float_to_uint(bin_index),
                count,
            };
        }
        report
    }

    /// Turns `node_index` into a free range and pushes it on top of its bin's free list.
    ///
    /// Neighbor links are left unset; callers splice the node into the neighbor chain.
    fn insert_node_into_bin(&mut self, node_index: NodeIndex, size: u32, data_offset: u32) {
        // Rounding down guarantees that the range is at least as big as its bin.
        let bin_index = uint_to_float_round_down(size);
        let top_node_index = self.bins.head(bin_index);

        self.nodes[node_index] = Node {
            data_offset,
            data_size: size,
            bin_list_next: top_node_index,
            ..Node::default()
        };
        if top_node_index != Node::UNUSED {
            self.nodes[top_node_index].bin_list_prev = node_index;
        }
        self.bins.set_head(bin_index, node_index);

        self.free_storage += size;
        log::trace!(
            "free storage: {} (+{size}) (insert_node_into_bin)",
            self.free_storage
        );
    }

    /// Unlinks a free node from its bin and gives it back to the node pool.
    fn remove_node_from_bin(&mut self, node_index: NodeIndex) {
        let node = self.nodes[node_index];

        if node.bin_list_prev != Node::UNUSED {
            // Middle of the list: just unlink.
            self.nodes[node.bin_list_prev].bin_list_next = node.bin_list_next;
            if node.bin_list_next != Node::UNUSED {
                self.nodes[node.bin_list_next].bin_list_prev = node.bin_list_prev;
            }
        } else {
            // Head of the list. Nodes don't store their bin, so find it again.
            let bin_index = uint_to_float_round_down(node.data_size);
            self.bins.set_head(bin_index, node.bin_list_next);
            if node.bin_list_next != Node::UNUSED {
                self.nodes[node.bin_list_next].bin_list_prev = Node::UNUSED;
            }
        }

        self.nodes.release(node_index);
        self.free_storage -= node.data_size;
        log::trace!(
            "free storage: {} (-{}) (remove_node_from_bin)",
            self.free_storage,
            node.data_size
        );
    }
}

#[cfg(test)]
mod test {
    use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

    use super::Allocator;
    use crate::node::Node;
    use crate::{AllocError, Allocation, InitError};

    /// Walks the neighbor chain and checks it against the live allocations.
    fn check_consistency(allocator: &Allocator, live: &[(Allocation, u32)]) {
        assert!(allocator.bins.is_consistent());

        let mut ranges: Vec<_> = live
            .iter()
            .map(|&(allocation, size)| {
                assert_eq!(allocator.allocation_size(allocation), size);
                (allocation.offset, allocation.offset + size)
            })
            .collect();
        ranges.sort_unstable();
        for pair in ranges.windows(2) {
            assert!(pair[0].1 <= pair[1].0, "{:?} overlaps {:?}", pair[0], pair[1]);
        }
        if let Some(last) = ranges.last() {
            assert!(last.1 <= allocator.size());
        }

        let live_total: u32 = live.iter().map(|&(_, size)| size).sum();
        assert_eq!(allocator.free_storage() + live_total, allocator.size());

        // The range at offset 0 starts the chain, whether it is free or not.
        let full = allocator.storage_report_full();
        let mut first = live
            .iter()
            .map(|&(allocation, _)| allocation.metadata as crate::NodeIndex)
            .find(|&index| allocator.nodes[index].data_offset == 0);
        if first.is_none() {
            first = (0..crate::NUM_LEAF_BINS as u32)
                .map(|bin| allocator.bins.head(bin))
                .filter(|&head| head != Node::UNUSED)
                .flat_map(|head| {
                    std::iter::successors(Some(head), |&index| {
                        let next = allocator.nodes[index].bin_list_next;
                        (next != Node::UNUSED).then_some(next)
                    })
                })
                .find(|&index| allocator.nodes[index].data_offset == 0);
        }
        let mut index = first.expect("no range starts at offset 0");
        assert_eq!(allocator.nodes[index].neighbor_prev, Node::UNUSED);

        let mut end = 0;
        let mut free_ranges = 0;
        let mut previous_free = false;
        loop {
            let node = allocator.nodes[index];
            assert_eq!(node.data_offset, end);
            end += node.data_size;
            if !node.used {
                assert!(!previous_free, "two adjacent free ranges were not merged");
                free_ranges += 1;
            }
            previous_free = !node.used;
            if node.neighbor_next == Node::UNUSED {
                break;
            }
            assert_eq!(allocator.nodes[node.neighbor_next].neighbor_prev, index);
            index = node.neighbor_next;
        }
        assert_eq!(end, allocator.size());
        assert_eq!(free_ranges, full.free_range_count());
    }

    #[test]
    fn init_errors() {
        assert_eq!(Allocator::new(16, 0).unwrap_err(), InitError::ZeroCapacity);
        assert!(Allocator::new(16, 1).is_ok());
        assert!(Allocator::with_default_capacity(1 << 20).is_ok());
    }

    #[cfg(feature = "u16-node-index")]
    #[test]
    fn u16_capacity_limit() {
        assert!(Allocator::new(1024, 65536).is_ok());
        assert_eq!(
            Allocator::new(1024, 65537).unwrap_err(),
            InitError::CapacityTooLarge {
                requested: 65537,
                max: 65536
            }
        );
    }

    #[test]
    fn first_allocation() {
        let mut allocator = Allocator::new(1024, 16).unwrap();
        assert_eq!(allocator.storage_report().largest_free_region, 1024);

        let a = allocator.allocate(100);
        assert_eq!(a.offset, 0);
        assert_eq!(allocator.allocation_size(a), 100);

        let report = allocator.storage_report();
        assert_eq!(report.total_free_space, 924);
        // 924 falls in the 896 size class.
        assert_eq!(report.largest_free_region, 896);
        check_consistency(&allocator, &[(a, 100)]);
    }

    #[test]
    fn requests_round_up_to_size_class() {
        let mut allocator = Allocator::new(1024, 16).unwrap();
        let a = allocator.allocate(100);

        // 924 units are free but sit in the 896 class, while 900 needs the 960 class.
        assert_eq!(allocator.try_allocate(900), Err(AllocError::OutOfSpace));
        assert_eq!(allocator.allocate(900), Allocation::FAILED);

        let b = allocator.allocate(896);
        assert_eq!(b.offset, 100);
        assert_eq!(allocator.storage_report().total_free_space, 28);
        assert_eq!(allocator.allocate(50), Allocation::FAILED);
        check_consistency(&allocator, &[(a, 100), (b, 896)]);
    }

    #[test]
    fn out_of_nodes() {
        let mut allocator = Allocator::new(256, 4).unwrap();
        let results: Vec<_> = (0..5).map(|_| allocator.try_allocate(60)).collect();

        let allocated: Vec<_> = results.iter().filter_map(|r| r.ok()).collect();
        assert!(allocated.len() < 5);
        assert_eq!(allocated[0].offset, 0);
        assert_eq!(allocated[1].offset, 60);
        assert!(results.contains(&Err(AllocError::OutOfNodes)));

        // Space is left but cannot be used.
        assert!(allocator.free_storage() > 0);
        assert_eq!(allocator.storage_report().total_free_space, 0);
        assert_eq!(allocator.storage_report().largest_free_region, 0);

        // Merging with the free remainder gives a node back.
        allocator.free(allocated[1]);
        assert_eq!(allocator.allocate(60).offset, 60);
    }

    #[test]
    fn capacity_exhaustion() {
        const MAX_ALLOCS: u32 = 8;
        let mut allocator = Allocator::new(1 << 16, MAX_ALLOCS).unwrap();
        let mut allocated = 0;
        while allocator.allocate(16).is_valid() {
            allocated += 1;
            assert!(allocated <= MAX_ALLOCS);
        }
        assert_eq!(allocator.try_allocate(16), Err(AllocError::OutOfNodes));
        assert!(allocator.free_storage() >= (1 << 16) - 16 * MAX_ALLOCS);
    }

    #[test]
    fn zero_size_is_rejected() {
        let mut allocator = Allocator::new(64, 4).unwrap();
        assert_eq!(allocator.try_allocate(0), Err(AllocError::ZeroSize));
        assert_eq!(allocator.allocate(0), Allocation::FAILED);
        assert_eq!(allocator.allocation_size(Allocation::FAILED), 0);
        assert_eq!(allocator.storage_report().total_free_space, 64);
    }

    #[test]
    fn exact_fit_takes_whole_range() {
        let mut allocator = Allocator::new(1024, 4).unwrap();
        let a = allocator.allocate(1024);
        assert_eq!(a.offset, 0);
        assert_eq!(allocator.free_storage(), 0);
        assert_eq!(allocator.try_allocate(1), Err(AllocError::OutOfSpace));
        allocator.free(a);
        assert_eq!(allocator.free_storage(), 1024);
    }

    #[test]
    fn unrepresentable_total_size() {
        // 1000 is in the 960 class, so it can never be handed out in one piece.
        let mut allocator = Allocator::new(1000, 8).unwrap();
        assert_eq!(allocator.try_allocate(1000), Err(AllocError::OutOfSpace));
        assert_eq!(allocator.allocate(960).offset, 0);
    }

    #[test]
    fn free_merges_both_neighbors() {
        let mut allocator = Allocator::new(1024, 8).unwrap();
        let a = allocator.allocate(300);
        let b = allocator.allocate(300);
        assert_eq!(a.offset, 0);
        assert_eq!(b.offset, 300);
        check_consistency(&allocator, &[(a, 300), (b, 300)]);

        allocator.free(a);
        check_consistency(&allocator, &[(b, 300)]);
        allocator.free(b);
        check_consistency(&allocator, &[]);

        assert_eq!(allocator.storage_report_full().free_range_count(), 1);
        let c = allocator.allocate(1024);
        assert_eq!(c.offset, 0);
    }

    #[test]
    fn free_merges_with_previous_only() {
        let mut allocator = Allocator::new(4096, 16).unwrap();
        let a = allocator.allocate(512);
        let b = allocator.allocate(512);
        let c = allocator.allocate(512);
        allocator.free(a);
        allocator.free(b);
        check_consistency(&allocator, &[(c, 512)]);

        // The merged range in front of `c` is reused first since it's the smaller one.
        let d = allocator.allocate(1024);
        assert_eq!(d.offset, 0);
        check_consistency(&allocator, &[(c, 512), (d, 1024)]);
    }

    #[test]
    fn full_coalescing() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..16 {
            let mut allocator = Allocator::new(4096, 32).unwrap();
            let mut allocations: Vec<_> = (0..16).map(|_| allocator.allocate(256)).collect();
            for (i, allocation) in allocations.iter().enumerate() {
                assert_eq!(allocation.offset, i as u32 * 256);
            }
            assert_eq!(allocator.free_storage(), 0);

            allocations.shuffle(&mut rng);
            for allocation in allocations {
                allocator.free(allocation);
            }
            assert_eq!(allocator.storage_report().total_free_space, 4096);
            check_consistency(&allocator, &[]);
            assert_eq!(allocator.allocate(4096).offset, 0);
        }
    }

    #[test]
    fn reset_restores_full_range() {
        let mut allocator = Allocator::new(1 << 20, 64).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..40 {
            let a = allocator.allocate(rng.gen_range(1..20000));
            if a.is_valid() && rng.gen_bool(0.3) {
                allocator.free(a);
            }
        }
        allocator.reset();
        check_consistency(&allocator, &[]);
        assert_eq!(allocator.allocate(1 << 20).offset, 0);
    }

    #[test]
    fn move_out_keeps_allocations() {
        let mut allocator = Allocator::new(4096, 32).unwrap();
        let a = allocator.allocate(100);
        let b = allocator.allocate(200);

        let mut moved = std::mem::take(&mut allocator);
        assert_eq!(moved.allocation_size(a), 100);
        assert_eq!(moved.allocation_size(b), 200);

        // The moved-from allocator is empty and ignores everything.
        assert_eq!(allocator.allocation_size(a), 0);
        allocator.free(a);
        assert_eq!(allocator.try_allocate(1), Err(AllocError::OutOfNodes));
        assert_eq!(allocator.storage_report(), Default::default());
        allocator.reset();
        assert_eq!(allocator.max_allocs(), 0);

        moved.free(a);
        moved.free(b);
        check_consistency(&moved, &[]);
        assert_eq!(moved.allocate(4096).offset, 0);
    }

    #[test]
    fn full_report() {
        let mut allocator = Allocator::new(1024, 16).unwrap();
        let _a = allocator.allocate(100);
        let _b = allocator.allocate(100);
        let _c = allocator.allocate(100);

        let report = allocator.storage_report_full();
        assert_eq!(report.free_regions[8].size, 8);
        assert_eq!(report.free_regions[64].size, 1024);
        let nonempty: Vec<_> = report.iter_nonempty().copied().collect();
        assert_eq!(nonempty.len(), 1);
        // 724 free units in the 704 class.
        assert_eq!(nonempty[0].size, 704);
        assert_eq!(nonempty[0].count, 1);

        let debug = format!("{allocator:?}");
        assert!(debug.contains("1 x 704"), "{debug}");
    }

    #[test]
    fn same_bin_lists() {
        // Free ranges of one size class chain in the same bin and unlink from any position.
        let mut allocator = Allocator::new(1 << 16, 64).unwrap();
        let allocations: Vec<_> = (0..12).map(|_| allocator.allocate(64)).collect();
        let mut live: Vec<_> = allocations.iter().map(|&a| (a, 64)).collect();

        for i in [1, 3, 5, 7, 9] {
            allocator.free(allocations[i]);
        }
        live.retain(|(a, _)| ![1, 3, 5, 7, 9].contains(&(a.offset / 64)));
        check_consistency(&allocator, &live);
        assert_eq!(allocator.storage_report_full().free_regions[32].count, 5);

        // Freeing 4 merges 3 and 5 out of the middle of their list.
        allocator.free(allocations[4]);
        live.retain(|(a, _)| a.offset != 4 * 64);
        check_consistency(&allocator, &live);
        assert_eq!(allocator.storage_report_full().free_regions[32].count, 3);
    }

    #[test]
    fn random_workload() {
        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut allocator = Allocator::new(1 << 16, 128).unwrap();
            let mut live: Vec<(Allocation, u32)> = Vec::new();

            for _ in 0..2000 {
                if live.is_empty() || rng.gen_bool(0.55) {
                    let size = rng.gen_range(1..4096);
                    match allocator.try_allocate(size) {
                        Ok(allocation) => live.push((allocation, size)),
                        Err(AllocError::OutOfNodes) => {
                            assert_eq!(allocator.storage_report().total_free_space, 0)
                        }
                        Err(AllocError::OutOfSpace) => {}
                        Err(AllocError::ZeroSize) => unreachable!(),
                    }
                } else {
                    let (allocation, _) = live.swap_remove(rng.gen_range(0..live.len()));
                    allocator.free(allocation);
                }
                check_consistency(&allocator, &live);
            }

            for (allocation, _) in live.drain(..) {
                allocator.free(allocation);
            }
            check_consistency(&allocator, &[]);
            assert_eq!(allocator.allocate(1 << 16).offset, 0);
        }
    }
}
