use core::{cell::UnsafeCell, mem::MaybeUninit, ptr, ptr::NonNull};

use portable_atomic::{AtomicPtr, Ordering};

/// A storage cell handed out by a [`NodePool`](crate::pool::NodePool)
///
/// A node is a link plus room for one `T`. While it sits in a pool's free list the link chains
/// free nodes together; while it sits in a stack the link points at the node below it and the
/// value slot is occupied.
///
/// The link is atomic because a `pop` that loses its compare-and-swap race may still read the
/// link of a node that another thread has already recycled. Pools never free node storage while
/// they are alive, so such a read is always of valid memory.
pub(crate) struct Node<T> {
    next: AtomicPtr<Node<T>>,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Node<T> {
    /// Returns a node that holds no value and is not linked to any other node
    pub(crate) const fn vacant() -> Self {
        Self {
            next: AtomicPtr::new(ptr::null_mut()),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Returns the node below this one, if any
    pub(crate) fn load_next(&self) -> Option<NonNull<Node<T>>> {
        NonNull::new(self.next.load(Ordering::Relaxed))
    }

    pub(crate) fn store_next(&self, next: Option<NonNull<Node<T>>>) {
        self.next.store(
            next.map_or(ptr::null_mut(), NonNull::as_ptr),
            Ordering::Relaxed,
        )
    }

    /// # Safety
    ///
    /// - `node` must be valid and exclusively owned by the caller
    /// - the value slot must be vacant, or its current value is leaked
    pub(crate) unsafe fn write(node: NonNull<Self>, value: T) {
        // SAFETY: the caller owns `node`, so nobody else touches its value slot
        unsafe { (*node.as_ref().value.get()).write(value) };
    }

    /// Moves the value out, leaving the slot vacant
    ///
    /// # Safety
    ///
    /// - `node` must be valid and exclusively owned by the caller
    /// - the value slot must be occupied
    pub(crate) unsafe fn take(node: NonNull<Self>) -> T {
        // SAFETY: the caller owns `node` and guarantees the slot was initialized by `write`
        unsafe { (*node.as_ref().value.get()).assume_init_read() }
    }
}

#[cfg(test)]
mod tests {
    use core::{mem, ptr::NonNull};

    use super::Node;

    #[test]
    fn node_is_never_zero_sized() {
        struct Zst;

        assert_ne!(mem::size_of::<Node<Zst>>(), 0);
    }

    #[test]
    fn write_then_take() {
        let mut node = Node::vacant();
        let ptr = NonNull::from(&mut node);

        unsafe {
            Node::write(ptr, 42);
            assert_eq!(Node::take(ptr), 42);
        }

        assert!(node.load_next().is_none());
    }

    #[test]
    fn link() {
        let below = Node::<u8>::vacant();
        let top = Node::<u8>::vacant();

        top.store_next(Some(NonNull::from(&below)));
        assert_eq!(top.load_next(), Some(NonNull::from(&below)));

        top.store_next(None);
        assert_eq!(top.load_next(), None);
    }
}
