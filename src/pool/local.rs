use core::{cell::Cell, fmt, ptr, ptr::NonNull};

use super::{chunk::Chunk, NodePool, PoolConfig};
use crate::{error::AllocError, node::Node};

/// A node pool for a single owner
///
/// All bookkeeping lives in [`Cell`]s, so the pool is `Send` (for `T: Send`) but not `Sync`.
/// This is the pool behind [`LocalStack`](crate::LocalStack).
pub struct LocalPool<T> {
    free: Cell<Option<NonNull<Node<T>>>>,
    chunks: Cell<*mut Chunk<T>>,
    capacity: Cell<usize>,
    config: PoolConfig,
}

// SAFETY: the pool owns its chunks; moving it to another thread moves the nodes (and any values
// its owner stored in them) along with it
unsafe impl<T> Send for LocalPool<T> where T: Send {}

impl<T> LocalPool<T> {
    /// Creates an empty pool with the default [`PoolConfig`]
    ///
    /// Nothing is allocated until the first node is acquired.
    pub const fn new() -> Self {
        Self::unallocated(PoolConfig::new())
    }

    /// Creates a pool that grows according to `config`
    ///
    /// Allocates [`PoolConfig::prealloc`] nodes right away and returns an error if that fails.
    pub fn with_config(config: PoolConfig) -> Result<Self, AllocError> {
        let pool = Self::unallocated(config);
        if config.prealloc() > 0 {
            pool.grow(config.prealloc())?;
        }
        Ok(pool)
    }

    const fn unallocated(config: PoolConfig) -> Self {
        Self {
            free: Cell::new(None),
            chunks: Cell::new(ptr::null_mut()),
            capacity: Cell::new(0),
            config,
        }
    }

    /// Returns the configuration this pool grows by
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Returns the number of nodes allocated so far
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    fn pop_free(&self) -> Option<NonNull<Node<T>>> {
        let node = self.free.get()?;
        // SAFETY: nodes on the free list belong to one of our chunks
        self.free.set(unsafe { node.as_ref() }.load_next());
        Some(node)
    }

    fn push_free(&self, node: NonNull<Node<T>>) {
        // SAFETY: nodes on the free list belong to one of our chunks
        unsafe { node.as_ref() }.store_next(self.free.get());
        self.free.set(Some(node));
    }

    /// Allocates a chunk of `len` nodes and puts them all on the free list
    fn grow(&self, len: usize) -> Result<(), AllocError> {
        let chunk = Chunk::allocate(len)?;

        // SAFETY: `chunk` was just allocated and nobody else has seen it
        unsafe {
            (*chunk.as_ptr()).next = self.chunks.get();
            // last node first, so nodes come out in address order
            for node in chunk.as_ref().nodes().rev() {
                self.push_free(node);
            }
        }
        self.chunks.set(chunk.as_ptr());
        self.capacity.set(self.capacity.get() + len);

        #[cfg(feature = "defmt")]
        defmt::trace!(
            "local pool grew by {=usize} nodes, capacity {=usize}",
            len,
            self.capacity.get()
        );

        Ok(())
    }
}

unsafe impl<T> NodePool<T> for LocalPool<T> {
    fn acquire(&self) -> Option<NonNull<Node<T>>> {
        if let Some(node) = self.pop_free() {
            return Some(node);
        }

        let len = self.config.growth(self.capacity());
        if len == 0 {
            #[cfg(feature = "defmt")]
            defmt::debug!("local pool exhausted at {=usize} nodes", self.capacity());

            return None;
        }

        match self.grow(len) {
            Ok(()) => self.pop_free(),
            Err(_error) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("local pool could not grow: {}", _error);

                None
            }
        }
    }

    unsafe fn release(&self, node: NonNull<Node<T>>) {
        self.push_free(node)
    }

    fn capacity(&self) -> usize {
        self.capacity.get()
    }
}

impl<T> Default for LocalPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for LocalPool<T> {
    fn drop(&mut self) {
        // SAFETY: we own every chunk; values still stored in nodes are the owner's business
        unsafe { Chunk::free_all(self.chunks.get()) }
    }
}

impl<T> fmt::Debug for LocalPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalPool")
            .field("capacity", &self.capacity())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use core::ptr::NonNull;
    use std::vec::Vec;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::LocalPool;
    use crate::{node::Node, pool::NodePool, PoolConfig};

    assert_impl_all!(LocalPool<u8>: Send);
    assert_not_impl_any!(LocalPool<u8>: Sync);
    assert_not_impl_any!(LocalPool<*const ()>: Send);

    #[test]
    fn lazy() {
        let pool = LocalPool::<u64>::new();
        assert_eq!(pool.capacity(), 0);

        let node = pool.acquire().unwrap();
        assert_eq!(pool.capacity(), PoolConfig::DEFAULT_CHUNK_LEN);

        unsafe { pool.release(node) };
    }

    #[test]
    fn prealloc() {
        let pool = LocalPool::<u64>::with_config(PoolConfig::new().with_prealloc(10)).unwrap();
        assert_eq!(pool.capacity(), 10);
    }

    #[test]
    fn exhaustion() {
        let pool = LocalPool::<u8>::with_config(PoolConfig::fixed(4)).unwrap();

        let nodes: Vec<_> = (0..4).map(|_| pool.acquire().unwrap()).collect();
        assert!(pool.acquire().is_none());
        assert!(pool.acquire().is_none());
        assert_eq!(pool.capacity(), 4);

        unsafe { pool.release(nodes[2]) };

        // should be possible to acquire again, and it is the same storage
        assert_eq!(pool.acquire(), Some(nodes[2]));
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn recycles_before_growing() {
        let pool = LocalPool::<u8>::with_config(PoolConfig::new().with_chunk_len(2)).unwrap();

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_eq!(pool.capacity(), 2);

        unsafe { pool.release(a) };
        assert_eq!(pool.acquire(), Some(a));
        assert_eq!(pool.capacity(), 2);

        // free list empty again: grow by one chunk
        let c = pool.acquire().unwrap();
        assert_eq!(pool.capacity(), 4);
        assert!(c != a && c != b);
    }

    #[test]
    fn nodes_come_out_in_address_order() {
        let pool = LocalPool::<u32>::with_config(PoolConfig::fixed(3)).unwrap();

        let nodes: Vec<NonNull<Node<u32>>> = (0..3).map(|_| pool.acquire().unwrap()).collect();
        assert!(nodes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn zero_limit() {
        let pool = LocalPool::<u8>::with_config(PoolConfig::new().with_max_nodes(0)).unwrap();

        assert!(pool.acquire().is_none());
        assert_eq!(pool.capacity(), 0);
    }
}
