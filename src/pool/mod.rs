//! Node pools: recycling allocators for stack nodes
//!
//! A pool hands out the nodes a stack links its values through and takes them back when the
//! values are popped. Returned nodes go onto a free list and are handed out again before any new
//! memory is requested. New memory is requested from the global allocator in chunks of
//! [`PoolConfig::chunk_len`] nodes, and only when the free list is empty. Chunks are returned to
//! the allocator when the pool is dropped, never earlier.
//!
//! A pool can be given an upper bound on the number of nodes it will ever allocate
//! ([`PoolConfig::with_max_nodes`]); once that many nodes are in use a `push` hands its value
//! back.
//!
//! There are two pools, mirroring the two stacks:
//!
//! - [`LocalPool`] is for a single owner. It is not `Sync`.
//! - [`SharedPool`] is lock-free and `Sync`. Its free list uses the same version-tagged Treiber
//!   stack as [`SharedStack`](crate::SharedStack).
//!
//! # Examples
//!
//! ```
//! use tagstack::{LocalPool, LocalStack, PoolConfig};
//!
//! // a pool that allocates 16 nodes at a time, at most 32 in total, and 16 right away
//! let config = PoolConfig::new()
//!     .with_chunk_len(16)
//!     .with_max_nodes(32)
//!     .with_prealloc(16);
//!
//! let pool = LocalPool::with_config(config).unwrap();
//! assert_eq!(pool.capacity(), 16);
//!
//! let mut stack = LocalStack::with_pool(pool);
//! for i in 0..32 {
//!     stack.push(i).unwrap();
//! }
//! assert!(stack.push(32).is_err());
//! assert_eq!(stack.pool().capacity(), 32);
//! ```

use core::ptr::NonNull;

use crate::node::Node;

mod chunk;
mod local;
#[cfg(has_dwcas)]
mod shared;

pub use local::LocalPool;
#[cfg(has_dwcas)]
pub use shared::SharedPool;

/// A recycling allocator of [`Node`]s
///
/// # Safety
///
/// Implementors must guarantee that
///
/// - a node returned by `acquire` is valid, has a vacant value slot and is not handed out again
///   until it has been passed to `release`
/// - the memory of every node ever handed out stays valid until the pool is dropped, even while
///   the node sits in the free list
pub(crate) unsafe trait NodePool<T> {
    /// Claims a node from the pool
    ///
    /// Returns `None` when the pool is exhausted: the free list is empty and the pool either hit
    /// its node limit or could not allocate a new chunk.
    fn acquire(&self) -> Option<NonNull<Node<T>>>;

    /// Returns a node to the pool
    ///
    /// # Safety
    ///
    /// `node` must have been returned by `acquire` on this same pool, its value slot must be
    /// vacant and the caller must not use it afterwards.
    unsafe fn release(&self, node: NonNull<Node<T>>);

    /// Number of nodes allocated so far, whether in use or free
    fn capacity(&self) -> usize;
}

/// How a pool grows
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PoolConfig {
    chunk_len: usize,
    max_nodes: Option<usize>,
    prealloc: usize,
}

impl PoolConfig {
    /// Nodes allocated per chunk unless configured otherwise
    pub const DEFAULT_CHUNK_LEN: usize = 64;

    /// Chunks of [`DEFAULT_CHUNK_LEN`](Self::DEFAULT_CHUNK_LEN) nodes, no upper bound, nothing
    /// allocated up front
    pub const fn new() -> Self {
        Self {
            chunk_len: Self::DEFAULT_CHUNK_LEN,
            max_nodes: None,
            prealloc: 0,
        }
    }

    /// A pool of exactly `nodes` nodes, all allocated when the pool is created
    pub const fn fixed(nodes: usize) -> Self {
        Self::new()
            .with_chunk_len(nodes)
            .with_max_nodes(nodes)
            .with_prealloc(nodes)
    }

    /// Sets the number of nodes allocated each time the pool grows
    ///
    /// A length of zero is treated as one.
    pub const fn with_chunk_len(mut self, chunk_len: usize) -> Self {
        self.chunk_len = if chunk_len == 0 { 1 } else { chunk_len };
        self
    }

    /// Caps the number of nodes the pool will ever allocate
    pub const fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }

    /// Sets the number of nodes allocated when the pool is created
    ///
    /// This is clamped to the node limit, if any.
    pub const fn with_prealloc(mut self, prealloc: usize) -> Self {
        self.prealloc = prealloc;
        self
    }

    /// Nodes allocated each time the pool grows
    pub const fn chunk_len(&self) -> usize {
        self.chunk_len
    }

    /// Upper bound on allocated nodes; `None` means unbounded
    pub const fn max_nodes(&self) -> Option<usize> {
        self.max_nodes
    }

    /// Nodes allocated when the pool is created
    pub const fn prealloc(&self) -> usize {
        match self.max_nodes {
            Some(max) if max < self.prealloc => max,
            _ => self.prealloc,
        }
    }

    /// Nodes to allocate next, given `capacity` nodes allocated so far; zero at the limit
    pub(crate) fn growth(&self, capacity: usize) -> usize {
        match self.max_nodes {
            Some(max) => self.chunk_len.min(max.saturating_sub(capacity)),
            None => self.chunk_len,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}
