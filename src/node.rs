//! Node records and the pool they are taken from.

/// Index of a [`Node`] inside the pool.
///
/// 32 bits by default; the `u16-node-index` feature halves the size of every link at the cost of
/// capping the pool at 65536 nodes.
#[cfg(not(feature = "u16-node-index"))]
pub type NodeIndex = u32;
#[cfg(feature = "u16-node-index")]
pub type NodeIndex = u16;

/// The biggest pool [`NodeIndex`] can address.
pub const MAX_NODE_COUNT: u64 = NodeIndex::MAX as u64 + 1;

/// A contiguous range of the managed space, either handed out or sitting in a bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Node {
    pub data_offset: u32,
    pub data_size: u32,
    pub used: bool,
    // Links inside the free list of a bin. Only meaningful while `!used`.
    pub bin_list_prev: NodeIndex,
    pub bin_list_next: NodeIndex,
    // Physically adjacent ranges, used to merge free space back together.
    pub neighbor_prev: NodeIndex,
    pub neighbor_next: NodeIndex,
}

impl Node {
    pub const UNUSED: NodeIndex = NodeIndex::MAX;
}

impl Default for Node {
    fn default() -> Self {
        Self {
            data_offset: 0,
            data_size: 0,
            used: false,
            bin_list_prev: Self::UNUSED,
            bin_list_next: Self::UNUSED,
            neighbor_prev: Self::UNUSED,
            neighbor_next: Self::UNUSED,
        }
    }
}

/// Fixed-capacity node storage plus a stack of the node indices that are not in use.
///
/// The bottom entry of the stack is kept in reserve: the pool reports itself as exhausted as soon
/// as a single index is left, which is the capacity limit `allocate` checks against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct NodePool {
    nodes: Vec<Node>,
    free_nodes: Vec<NodeIndex>,
}

impl NodePool {
    /// Throws away every node and refills the stack so that index 0 pops first.
    pub fn reset(&mut self, max_allocs: u32) {
        self.nodes = vec![Node::default(); max_allocs as usize];
        // `max_allocs` has been checked against `MAX_NODE_COUNT`, so every index fits.
        self.free_nodes = (0..max_allocs).rev().map(|i| i as NodeIndex).collect();
    }

    /// Returns `true` if the pool has no storage at all, as in a default-constructed allocator.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.free_nodes.len() <= 1
    }

    /// Number of indices on the stack, reserve included.
    pub fn free_count(&self) -> usize {
        self.free_nodes.len()
    }

    pub fn acquire(&mut self) -> Option<NodeIndex> {
        let index = self.free_nodes.pop()?;
        log::trace!(
            "getting node {index} from free list [{}]",
            self.free_nodes.len()
        );
        Some(index)
    }

    pub fn release(&mut self, index: NodeIndex) {
        log::trace!(
            "putting node {index} into free list [{}]",
            self.free_nodes.len()
        );
        self.free_nodes.push(index);
    }

    pub fn get(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index as usize)
    }
}

impl std::ops::Index<NodeIndex> for NodePool {
    type Output = Node;

    fn index(&self, index: NodeIndex) -> &Node {
        &self.nodes[index as usize]
    }
}

impl std::ops::IndexMut<NodeIndex> for NodePool {
    fn index_mut(&mut self, index: NodeIndex) -> &mut Node {
        &mut self.nodes[index as usize]
    }
}
