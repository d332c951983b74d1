use core::{fmt, ptr, ptr::NonNull};

use portable_atomic::{AtomicPtr, AtomicUsize, Ordering};

use super::{chunk::Chunk, NodePool, PoolConfig};
use crate::{error::AllocError, node::Node, treiber};

/// A lock-free node pool
///
/// The free list is a version-tagged Treiber stack, so nodes can be taken and returned from any
/// number of threads at once without a lock. This is the pool behind
/// [`SharedStack`](crate::SharedStack).
///
/// Growing is lock-free too. The node budget is reserved with a compare-and-swap on the
/// capacity counter before the chunk is allocated, so the node limit is never exceeded even when
/// several threads find the free list empty at the same time. Each of them may allocate a chunk.
///
/// With a node limit ([`PoolConfig::with_max_nodes`]) this has a visible consequence. Once the
/// last of the budget has been reserved by one thread, another thread that finds the free list
/// empty reports the pool as exhausted, even though the first thread is about to put the rest of
/// its fresh chunk on the free list. A `push` can therefore fail while nodes are on their way;
/// pushing again once the growing thread is done succeeds. Pools that are fully allocated up
/// front ([`PoolConfig::fixed`]) never grow and are not affected.
///
/// *NOTE:* taking and returning nodes do *not* have bounded execution time; both contain CAS
/// loops.
pub struct SharedPool<T> {
    free: treiber::Stack<T>,
    chunks: AtomicPtr<Chunk<T>>,
    capacity: AtomicUsize,
    config: PoolConfig,
}

// SAFETY: nodes move between threads through the free list; node values are only ever accessed
// by whoever exclusively owns the node, so `T: Send` is all that is needed
unsafe impl<T> Send for SharedPool<T> where T: Send {}
unsafe impl<T> Sync for SharedPool<T> where T: Send {}

impl<T> SharedPool<T> {
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

        let len = config.prealloc();
        if len > 0 {
            let chunk = Chunk::allocate(len)?;
            pool.capacity.store(len, Ordering::Relaxed);
            // SAFETY: the chunk is fresh, and its nodes stay valid until `pool` is dropped
            unsafe {
                pool.publish(chunk);
                for node in chunk.as_ref().nodes().rev() {
                    pool.free.push(node);
                }
            }
        }

        Ok(pool)
    }

    const fn unallocated(config: PoolConfig) -> Self {
        Self {
            free: treiber::Stack::new(),
            chunks: AtomicPtr::new(ptr::null_mut()),
            capacity: AtomicUsize::new(0),
            config,
        }
    }

    /// Returns the configuration this pool grows by
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Returns the number of nodes allocated so far
    ///
    /// While another thread is growing the pool this may already include the chunk being
    /// allocated.
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    /// Reserves budget for the next chunk; returns its length, or `None` at the node limit
    fn reserve(&self) -> Option<usize> {
        self.capacity
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |capacity| {
                match self.config.growth(capacity) {
                    0 => None,
                    len => Some(capacity + len),
                }
            })
            .ok()
            .map(|previous| self.config.growth(previous))
    }

    /// Adds `chunk` to the chunk list, which is only ever read again in `drop`
    ///
    /// # Safety
    ///
    /// `chunk` must be fresh from `Chunk::allocate` and not published before.
    unsafe fn publish(&self, chunk: NonNull<Chunk<T>>) {
        let mut head = self.chunks.load(Ordering::Relaxed);

        loop {
            // SAFETY: nobody else can see `chunk` until the exchange succeeds
            unsafe { (*chunk.as_ptr()).next = head };

            match self.chunks.compare_exchange_weak(
                head,
                chunk.as_ptr(),
                Ordering::Release, // success
                Ordering::Relaxed, // failure
            ) {
                Ok(_) => return,
                Err(current) => head = current,
            }
        }
    }

    /// Allocates a chunk, keeps its first node for the caller and frees the rest
    fn grow(&self) -> Option<NonNull<Node<T>>> {
        let Some(len) = self.reserve() else {
            #[cfg(feature = "defmt")]
            defmt::debug!("shared pool exhausted at {=usize} nodes", self.capacity());

            return None;
        };

        let chunk = match Chunk::allocate(len) {
            Ok(chunk) => chunk,
            Err(_error) => {
                self.capacity.fetch_sub(len, Ordering::Relaxed);

                #[cfg(feature = "defmt")]
                defmt::debug!("shared pool could not grow: {}", _error);

                return None;
            }
        };

        #[cfg(feature = "defmt")]
        defmt::trace!("shared pool grew by {=usize} nodes", len);

        // SAFETY: the chunk is fresh, and its nodes stay valid until the pool is dropped
        unsafe {
            self.publish(chunk);
            let mut nodes = chunk.as_ref().nodes();
            let first = nodes.next();
            for node in nodes.rev() {
                self.free.push(node);
            }
            first
        }
    }
}

unsafe impl<T> NodePool<T> for SharedPool<T> {
    fn acquire(&self) -> Option<NonNull<Node<T>>> {
        self.free.try_pop().or_else(|| {
            // the limit may have been reached by another thread whose nodes are now free
            self.grow().or_else(|| self.free.try_pop())
        })
    }

    unsafe fn release(&self, node: NonNull<Node<T>>) {
        // SAFETY: the caller hands back a node of ours; it stays valid until we are dropped
        unsafe { self.free.push(node) }
    }

    fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }
}

impl<T> Default for SharedPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for SharedPool<T> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` rules out concurrent users; we own every chunk
        unsafe { Chunk::free_all(*self.chunks.get_mut()) }
    }
}

impl<T> fmt::Debug for SharedPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedPool")
            .field("capacity", &self.capacity())
            .field("config", &self.config)
            .finish()
    }
}
