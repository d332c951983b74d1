use core::{fmt, mem};

use portable_atomic::{AtomicUsize, Ordering};

use super::{occupy, vacate, Lifo};
use crate::{
    error::AllocError,
    pool::{PoolConfig, SharedPool},
    treiber,
};

/// A lock-free, pool-backed stack
///
/// `push`, `pop` and `len` take `&self` and may be called from any number of threads at once.
/// The stack is lock-free but not wait-free: some caller always makes progress, but a single
/// caller may retry its compare-and-swap an unbounded number of times under contention.
///
/// The head of the stack is a `{version, pointer}` pair that is read and swapped as a single
/// double-width word. Every successful `push` increments the version and `pop` leaves it
/// unchanged, which is enough to keep a recycled node from being mistaken for the node a stalled
/// `pop` observed earlier (the ABA problem).
///
/// Values are delivered exactly once: each value passed to a successful `push` is returned by
/// exactly one `pop`. Apart from that there is no global order across threads; a single thread
/// that runs alone sees plain LIFO order.
///
/// ```
/// use std::thread;
///
/// use tagstack::SharedStack;
///
/// let stack = SharedStack::new();
///
/// thread::scope(|s| {
///     s.spawn(|| {
///         for i in 0..100 {
///             stack.push(i).unwrap();
///         }
///     });
///     s.spawn(|| {
///         let mut popped = 0;
///         while popped < 50 {
///             if stack.pop().is_some() {
///                 popped += 1;
///             }
///         }
///     });
/// });
///
/// assert_eq!(stack.len(), 50);
/// ```
pub struct SharedStack<T> {
    chain: treiber::Stack<T>,
    len: AtomicUsize,
    pool: SharedPool<T>,
}

// SAFETY: values are moved in by `push` and out by `pop`, on whichever thread calls them; a value
// is only touched by the thread that exclusively owns its node at that moment
unsafe impl<T> Send for SharedStack<T> where T: Send {}
unsafe impl<T> Sync for SharedStack<T> where T: Send {}

impl<T> SharedStack<T> {
    /// Creates an empty stack over a pool that allocates lazily
    pub const fn new() -> Self {
        Self::with_pool(SharedPool::new())
    }

    /// Creates an empty stack whose pool allocates its first chunk up front
    ///
    /// Returns an error if that allocation fails.
    pub fn try_new() -> Result<Self, AllocError> {
        Self::with_config(PoolConfig::new().with_prealloc(PoolConfig::DEFAULT_CHUNK_LEN))
    }

    /// Creates an empty stack over a new pool configured by `config`
    pub fn with_config(config: PoolConfig) -> Result<Self, AllocError> {
        SharedPool::with_config(config).map(Self::with_pool)
    }

    /// Creates an empty stack that takes ownership of `pool`
    pub const fn with_pool(pool: SharedPool<T>) -> Self {
        Self {
            chain: treiber::Stack::new(),
            len: AtomicUsize::new(0),
            pool,
        }
    }

    /// Pushes `value` on top of the stack
    ///
    /// Returns back the `value` if the pool is exhausted. Exhaustion is reported right away;
    /// there is no retry.
    pub fn push(&self, value: T) -> Result<(), T> {
        let node = occupy(&self.pool, value)?;

        // SAFETY: `node` is ours and its storage lives as long as the pool, which outlives
        // `chain`
        unsafe { self.chain.push(node) };
        self.len.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }

    /// Removes the top value and returns it, or `None` if the stack is observed as empty
    pub fn pop(&self) -> Option<T> {
        let node = self.chain.try_pop()?;

        // SAFETY: the successful compare-and-swap in `try_pop` made `node` ours; it came from
        // `occupy` on our pool
        let value = unsafe { vacate(&self.pool, node) };
        self.len.fetch_sub(1, Ordering::Relaxed);

        Some(value)
    }

    /// Returns the number of values in the stack
    ///
    /// This is a snapshot. The counter is updated after the head is swapped, so while other
    /// threads are pushing and popping it can lag behind the chain in either direction: a value
    /// that was just pushed may not be counted yet, and a value that was just popped may still be
    /// counted. A `pop` that overtakes the matching count of a `push` never shows up as a huge
    /// length; the snapshot reads as zero instead. Once all threads are done the count is exact.
    pub fn len(&self) -> usize {
        settled(self.len.load(Ordering::Relaxed))
    }

    /// Returns `true` if the stack was observed to hold no values
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Returns the version of the head: the number of successful pushes so far
    ///
    /// The counter wraps around at `usize::MAX`.
    pub fn version(&self) -> usize {
        self.chain.version()
    }

    /// Returns the pool that backs this stack
    pub fn pool(&self) -> &SharedPool<T> {
        &self.pool
    }
}

/// Maps a raw counter value to a length
///
/// The counter wraps below zero when a `pop` decrements it before the `push` that linked the
/// node has incremented it; such a transient deficit reads as zero.
fn settled(raw: usize) -> usize {
    if raw > isize::MAX as usize {
        0
    } else {
        raw
    }
}

impl<T> Lifo<T> for SharedStack<T> {
    fn push(&mut self, value: T) -> Result<(), T> {
        SharedStack::push(self, value)
    }

    fn pop(&mut self) -> Option<T> {
        SharedStack::pop(self)
    }

    fn len(&self) -> usize {
        SharedStack::len(self)
    }
}

/// Lets each thread hold its own `&SharedStack` and still use it as a [`Lifo`]
impl<T> Lifo<T> for &SharedStack<T> {
    fn push(&mut self, value: T) -> Result<(), T> {
        SharedStack::push(self, value)
    }

    fn pop(&mut self) -> Option<T> {
        SharedStack::pop(self)
    }

    fn len(&self) -> usize {
        SharedStack::len(self)
    }
}

impl<T> Default for SharedStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for SharedStack<T> {
    fn drop(&mut self) {
        // `&mut self`: no other thread can be mid-operation. Node storage goes away with the
        // pool; only the values need attention.
        if mem::needs_drop::<T>() {
            while self.pop().is_some() {}
        }
    }
}

impl<T> fmt::Debug for SharedStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedStack")
            .field("len", &self.len())
            .field("version", &self.version())
            .field("pool", &self.pool)
            .finish()
    }
}
