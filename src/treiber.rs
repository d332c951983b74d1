//! Treiber stack of [`Node`]s with a version-tagged head
//!
//! This is the one compare-and-swap protocol in the crate. `SharedStack` uses it for its chain
//! of values and `SharedPool` uses it for its free list.
//!
//! # ABA
//!
//! A plain Treiber stack is susceptible to the ABA problem: a `pop` reads the top `A` and its
//! successor `B`, gets preempted, and meanwhile other threads pop `A`, pop `B` and push `A` back.
//! The stale `pop` then swaps `A` for `B` even though `B` is no longer on the stack.
//!
//! Here the head is a `{version, pointer}` pair swapped as one double-width word, and every
//! successful `push` increments the version. `pop` leaves the version unchanged: the only way a
//! node can reappear at the top after it was popped is through a `push`, and that `push` bumps the
//! version, so the stale `{version, A}` can never match the live head again.
//!
//! | Thread 1                           | Thread 2          | Head        | Stack        |
//! |------------------------------------|-------------------|-------------|--------------|
//! | `old = load() // (5, A)`, `A.next` |                   | `(5, A)`    | `A -> B -> C`|
//! |                                    | `pop() // A`      | `(5, B)`    | `B -> C`     |
//! |                                    | `pop() // B`      | `(5, C)`    | `C`          |
//! |                                    | `push(A)`         | `(6, A)`    | `A -> C`     |
//! | `cas((5, A), (5, B))` fails        |                   | `(6, A)`    | `A -> C`     |
//!
//! This relies on nodes only ever re-entering a stack through `push` on that same stack. Nodes
//! are owned by a single pool which is owned by a single stack, so that holds.

use core::ptr::NonNull;

use portable_atomic::Ordering;

use crate::node::Node;

mod cas;

use cas::AtomicHead;
#[cfg(test)]
use cas::Tagged;

pub(crate) struct Stack<T> {
    head: AtomicHead<Node<T>>,
}

impl<T> Stack<T> {
    pub(crate) const fn new() -> Self {
        Self {
            head: AtomicHead::new(),
        }
    }

    /// # Safety
    ///
    /// - `node` must be valid and exclusively owned by the caller; ownership moves to the stack
    /// - the memory behind `node` must stay valid for as long as this stack is alive, even after
    ///   the node has been popped again; a losing `try_pop` may still read its link
    pub(crate) unsafe fn push(&self, node: NonNull<Node<T>>) {
        let mut top = self.head.load(Ordering::Relaxed);

        loop {
            // SAFETY: the caller owns `node`
            unsafe { node.as_ref() }.store_next(top.node());

            match self.head.compare_exchange_weak(
                top,
                top.bumped(Some(node)),
                Ordering::Release, // success
                Ordering::Relaxed, // failure
            ) {
                Ok(()) => return,
                // head changed
                Err(observed) => top = observed,
            }
        }
    }

    /// Returns `None` when the stack is observed as empty
    pub(crate) fn try_pop(&self) -> Option<NonNull<Node<T>>> {
        let mut top = self.head.load(Ordering::Acquire);

        loop {
            let node = top.node()?;

            // SAFETY: every node ever pushed stays valid while the stack is alive (see `push`).
            // If `node` was popped and recycled in the meantime the value read here is garbage,
            // but then the version no longer matches and the compare-and-swap below fails.
            let next = unsafe { node.as_ref() }.load_next();

            match self.head.compare_exchange_weak(
                top,
                top.with_node(next),
                Ordering::Release, // success
                Ordering::Acquire, // failure
            ) {
                Ok(()) => return Some(node),
                // head was changed by another thread
                Err(observed) => top = observed,
            }
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.load(Ordering::Relaxed).node().is_none()
    }

    /// Acquire: a thread that sees version `v` also sees everything the first `v` pushers did
    /// before their push
    pub(crate) fn version(&self) -> usize {
        self.head.load(Ordering::Acquire).version() as usize
    }

    #[cfg(test)]
    fn head(&self) -> Tagged<Node<T>> {
        self.head.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use core::ptr::NonNull;
    use std::{thread, vec::Vec};

    use portable_atomic::{AtomicBool, Ordering};

    use super::Stack;
    use crate::node::Node;

    fn nodes<const N: usize>() -> [Node<u8>; N] {
        core::array::from_fn(|_| Node::vacant())
    }

    #[test]
    fn lifo() {
        let storage = nodes::<3>();
        let stack = Stack::new();

        for node in &storage {
            unsafe { stack.push(NonNull::from(node)) };
        }

        assert_eq!(stack.try_pop(), Some(NonNull::from(&storage[2])));
        assert_eq!(stack.try_pop(), Some(NonNull::from(&storage[1])));
        assert_eq!(stack.try_pop(), Some(NonNull::from(&storage[0])));
        assert_eq!(stack.try_pop(), None);
        assert!(stack.is_empty());
    }

    #[test]
    fn version_moves_on_push_only() {
        let storage = nodes::<2>();
        let stack = Stack::new();
        assert_eq!(stack.version(), 0);

        unsafe { stack.push(NonNull::from(&storage[0])) };
        unsafe { stack.push(NonNull::from(&storage[1])) };
        assert_eq!(stack.version(), 2);

        stack.try_pop().unwrap();
        stack.try_pop().unwrap();
        assert_eq!(stack.version(), 2);
        assert!(stack.try_pop().is_none());
        assert_eq!(stack.version(), 2);
    }

    // replays the interleaving from the module documentation
    #[test]
    fn stale_head_does_not_match_after_recycle() {
        let storage = nodes::<3>();
        let [c, b, a] = [0, 1, 2].map(|i| NonNull::from(&storage[i]));
        let stack = Stack::new();

        unsafe {
            stack.push(c);
            stack.push(b);
            stack.push(a);
        }

        // thread 1 reads the head and the link below it, then stalls
        let stale = stack.head();
        let stale_next = unsafe { stale.node().unwrap().as_ref() }.load_next();
        assert_eq!(stale.node(), Some(a));
        assert_eq!(stale_next, Some(b));

        // thread 2 pops `a` and `b`, then pushes `a` back
        assert_eq!(stack.try_pop(), Some(a));
        assert_eq!(stack.try_pop(), Some(b));
        unsafe { stack.push(a) };

        // the pointer is back at the top...
        assert_eq!(stack.head().node(), Some(a));

        // ...but thread 1's compare-and-swap fails, so `b` is not resurrected
        let outcome = stack.head.compare_exchange_weak(
            stale,
            stale.with_node(stale_next),
            Ordering::Release,
            Ordering::Relaxed,
        );
        assert_eq!(outcome.map_err(|head| head.node()), Err(Some(a)));

        assert_eq!(stack.try_pop(), Some(a));
        assert_eq!(stack.try_pop(), Some(c));
        assert_eq!(stack.try_pop(), None);
    }

    #[test]
    #[cfg_attr(miri, ignore)] // too slow
    fn observed_heads_are_never_torn() {
        const NODES: usize = 8;
        const THREADS: usize = 4;
        const ROUNDS: usize = 20_000;

        struct Shared(Stack<u8>);
        // SAFETY: the workers only move nodes between the stack and themselves
        unsafe impl Sync for Shared {}

        let storage = nodes::<NODES>();
        let known: Vec<usize> = storage.iter().map(|node| node as *const _ as usize).collect();
        let stack = Shared(Stack::new());
        for node in &storage {
            unsafe { stack.0.push(NonNull::from(node)) };
        }

        let done = AtomicBool::new(false);

        thread::scope(|s| {
            let workers: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        let stack = &stack; // capture the `Sync` wrapper, not the field
                        for _ in 0..ROUNDS {
                            if let Some(node) = stack.0.try_pop() {
                                unsafe { stack.0.push(node) };
                            }
                        }
                    })
                })
                .collect();

            let sampler = s.spawn(|| {
                let stack = &stack; // capture the `Sync` wrapper, not the field
                let mut last = stack.0.head().version();
                while !done.load(Ordering::Relaxed) {
                    let head = stack.0.head();

                    // both halves come from the same write: a known node, a version no lower
                    // than the pushes that put the nodes there in the first place
                    assert!(head.version() >= last);
                    assert!(head.version() as usize >= NODES);
                    if let Some(node) = head.node() {
                        assert!(known.contains(&(node.as_ptr() as usize)));
                    }
                    last = head.version();
                }
            });

            for worker in workers {
                worker.join().unwrap();
            }
            done.store(true, Ordering::Relaxed);
            sampler.join().unwrap();
        });

        // every pop was paired with a push: all nodes are back, each exactly once
        let mut drained: Vec<usize> = core::iter::from_fn(|| stack.0.try_pop())
            .map(|node| node.as_ptr() as usize)
            .collect();
        drained.sort_unstable();
        let mut expected = known.clone();
        expected.sort_unstable();
        assert_eq!(drained, expected);
    }
}
