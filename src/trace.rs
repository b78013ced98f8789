//! Recorded allocator traces.
//!
//! A [`Trace`] is a list of operations run against a fresh allocator. Replaying goes through the
//! single-sentinel [`Allocator::allocate`], so the offsets and metadata it yields can be compared
//! one to one with traces recorded from other implementations of the same algorithm.

use ahash::AHashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Allocation, Allocator, InitError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TraceOp {
    Allocate {
        size: u32,
    },
    /// Frees the allocation made by the operation at position `handle` in the trace.
    Free {
        handle: usize,
    },
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TraceOutcome {
    Allocated { offset: u32, metadata: u32 },
    Failed,
    Freed,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub size: u32,
    pub max_allocs: u32,
    pub ops: Vec<TraceOp>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("could not create allocator: {0}")]
    Init(#[from] InitError),
    #[error("op {op}: handle {handle} does not refer to an allocate op")]
    NotAnAllocation { op: usize, handle: usize },
    #[error("op {op}: allocation {handle} is not live (failed, freed or reset)")]
    NotLive { op: usize, handle: usize },
}

/// The state left after replaying a [`Trace`].
#[derive(Debug, Clone)]
pub struct Replay {
    pub outcomes: Vec<TraceOutcome>,
    pub allocator: Allocator,
    /// Allocations still live at the end, keyed by the position of the op that made them.
    pub live: AHashMap<usize, (Allocation, u32)>,
}

impl Replay {
    pub fn failure_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| **outcome == TraceOutcome::Failed)
            .count()
    }

    /// Returns the first pair of live allocations that overlap, if any.
    pub fn find_overlap(&self) -> Option<((u32, u32), (u32, u32))> {
        let mut ranges: Vec<_> = self
            .live
            .values()
            .map(|&(allocation, size)| (allocation.offset, allocation.offset + size))
            .collect();
        ranges.sort_unstable();
        ranges
            .windows(2)
            .find(|pair| pair[0].1 > pair[1].0)
            .map(|pair| (pair[0], pair[1]))
    }
}

impl Trace {
    pub fn new(size: u32, max_allocs: u32) -> Self {
        Self {
            size,
            max_allocs,
            ops: Vec::new(),
        }
    }

    /// Builds a random workload of `op_count` operations.
    ///
    /// Frees only target allocations that succeed, so the trace always replays cleanly.
    pub fn random(
        rng: &mut impl Rng,
        size: u32,
        max_allocs: u32,
        op_count: usize,
        max_alloc_size: u32,
    ) -> Result<Self, InitError> {
        let mut trace = Self::new(size, max_allocs);
        let mut allocator = Allocator::new(size, max_allocs)?;
        let mut live = Vec::new();

        for op in 0..op_count {
            if live.is_empty() || rng.gen_bool(0.6) {
                let alloc_size = rng.gen_range(1..=max_alloc_size.max(1));
                let allocation = allocator.allocate(alloc_size);
                if allocation.is_valid() {
                    live.push((op, allocation));
                }
                trace.ops.push(TraceOp::Allocate { size: alloc_size });
            } else {
                let (handle, allocation) = live.swap_remove(rng.gen_range(0..live.len()));
                allocator.free(allocation);
                trace.ops.push(TraceOp::Free { handle });
            }
        }

        Ok(trace)
    }

    pub fn replay(&self) -> Result<Replay, ReplayError> {
        let mut allocator = Allocator::new(self.size, self.max_allocs)?;
        let mut outcomes = Vec::with_capacity(self.ops.len());
        let mut live = AHashMap::new();

        for (op, trace_op) in self.ops.iter().enumerate() {
            let outcome = match *trace_op {
                TraceOp::Allocate { size } => {
                    let allocation = allocator.allocate(size);
                    if allocation.is_valid() {
                        live.insert(op, (allocation, size));
                        TraceOutcome::Allocated {
                            offset: allocation.offset,
                            metadata: allocation.metadata,
                        }
                    } else {
                        TraceOutcome::Failed
                    }
                }
                TraceOp::Free { handle } => {
                    if !matches!(self.ops.get(handle), Some(TraceOp::Allocate { .. })) {
                        return Err(ReplayError::NotAnAllocation { op, handle });
                    }
                    let (allocation, _) = live
                        .remove(&handle)
                        .ok_or(ReplayError::NotLive { op, handle })?;
                    allocator.free(allocation);
                    TraceOutcome::Freed
                }
                TraceOp::Reset => {
                    allocator.reset();
                    live.clear();
                    TraceOutcome::Reset
                }
            };
            log::debug!("op {op}: {trace_op:?} -> {outcome:?}");
            outcomes.push(outcome);
        }

        Ok(Replay {
            outcomes,
            allocator,
            live,
        })
    }
}
