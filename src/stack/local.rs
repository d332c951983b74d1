use core::{fmt, mem, ptr::NonNull};

use super::{occupy, vacate, Lifo};
use crate::{
    error::AllocError,
    node::Node,
    pool::{LocalPool, PoolConfig},
};

/// A pool-backed stack with a single owner
///
/// `push` and `pop` take `&mut self` and the type is not `Sync`, so there is never more than one
/// caller at a time and no synchronization is needed. Moving the stack to another thread is fine
/// (`LocalStack<T>` is `Send` when `T` is).
///
/// ```
/// use tagstack::LocalStack;
///
/// let mut stack = LocalStack::try_new().unwrap();
///
/// for i in 0..4 {
///     stack.push(i).unwrap();
/// }
/// assert_eq!(stack.len(), 4);
///
/// assert_eq!(stack.pop(), Some(3));
/// assert_eq!(stack.pop(), Some(2));
/// ```
pub struct LocalStack<T> {
    head: Option<NonNull<Node<T>>>,
    len: usize,
    pool: LocalPool<T>,
}

// SAFETY: the stack owns every node reachable from `head` and the pool that backs them
unsafe impl<T> Send for LocalStack<T> where T: Send {}

impl<T> LocalStack<T> {
    /// Creates an empty stack over a pool that allocates lazily
    pub const fn new() -> Self {
        Self::with_pool(LocalPool::new())
    }

    /// Creates an empty stack whose pool allocates its first chunk up front
    ///
    /// Returns an error if that allocation fails.
    pub fn try_new() -> Result<Self, AllocError> {
        Self::with_config(PoolConfig::new().with_prealloc(PoolConfig::DEFAULT_CHUNK_LEN))
    }

    /// Creates an empty stack over a new pool configured by `config`
    pub fn with_config(config: PoolConfig) -> Result<Self, AllocError> {
        LocalPool::with_config(config).map(Self::with_pool)
    }

    /// Creates an empty stack that takes ownership of `pool`
    pub const fn with_pool(pool: LocalPool<T>) -> Self {
        Self {
            head: None,
            len: 0,
            pool,
        }
    }

    /// Pushes `value` on top of the stack
    ///
    /// Returns back the `value` if the pool is exhausted.
    pub fn push(&mut self, value: T) -> Result<(), T> {
        let node = occupy(&self.pool, value)?;

        // SAFETY: `node` is ours until it is linked below
        unsafe { node.as_ref() }.store_next(self.head);
        self.head = Some(node);
        self.len += 1;

        Ok(())
    }

    /// Removes the top value and returns it, or `None` if the stack is empty
    pub fn pop(&mut self) -> Option<T> {
        let node = self.head?;

        // SAFETY: nodes reachable from `head` are ours and occupied
        self.head = unsafe { node.as_ref() }.load_next();
        self.len -= 1;

        // SAFETY: `node` is unlinked; it came from `occupy` on our pool
        Some(unsafe { vacate(&self.pool, node) })
    }

    /// Returns the number of values in the stack
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the stack holds no values
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Returns the pool that backs this stack
    pub fn pool(&self) -> &LocalPool<T> {
        &self.pool
    }
}

impl<T> Lifo<T> for LocalStack<T> {
    fn push(&mut self, value: T) -> Result<(), T> {
        LocalStack::push(self, value)
    }

    fn pop(&mut self) -> Option<T> {
        LocalStack::pop(self)
    }

    fn len(&self) -> usize {
        LocalStack::len(self)
    }
}

impl<T> Default for LocalStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for LocalStack<T> {
    fn drop(&mut self) {
        // node storage goes away with the pool; only the values need attention
        if mem::needs_drop::<T>() {
            while self.pop().is_some() {}
        }
    }
}

impl<T> fmt::Debug for LocalStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStack")
            .field("len", &self.len)
            .field("pool", &self.pool)
            .finish()
    }
}
