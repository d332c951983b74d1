//! LIFO stacks backed by a node pool
//!
//! [`LocalStack`] and [`SharedStack`] have the same semantics; they differ only in who may call
//! them. Code that does not care can be written against the [`Lifo`] trait.
//!
//! ```
//! use tagstack::{Lifo, LocalStack};
//!
//! fn drain_into<S>(stack: &mut S, out: &mut Vec<u32>)
//! where
//!     S: Lifo<u32>,
//! {
//!     while let Some(x) = stack.pop() {
//!         out.push(x);
//!     }
//! }
//!
//! let mut stack = LocalStack::new();
//! stack.push(1).unwrap();
//! stack.push(2).unwrap();
//!
//! let mut out = Vec::new();
//! drain_into(&mut stack, &mut out);
//! assert_eq!(out, [2, 1]);
//! ```

use core::ptr::NonNull;

use crate::{node::Node, pool::NodePool};

mod local;
#[cfg(has_dwcas)]
mod shared;

pub use local::LocalStack;
#[cfg(has_dwcas)]
pub use shared::SharedStack;

/// The operations both stacks share
pub trait Lifo<T> {
    /// Pushes `value` on top of the stack
    ///
    /// Returns back the `value` if the stack's pool is exhausted; the stack is left unchanged.
    fn push(&mut self, value: T) -> Result<(), T>;

    /// Removes the top value and returns it, or `None` if the stack is empty
    fn pop(&mut self) -> Option<T>;

    /// Returns the number of values in the stack
    fn len(&self) -> usize;

    /// Returns `true` if the stack holds no values
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Claims a node from `pool` and moves `value` into it
///
/// The node is exclusively owned by the caller until it is linked into a stack.
fn occupy<T, P>(pool: &P, value: T) -> Result<NonNull<Node<T>>, T>
where
    P: NodePool<T>,
{
    match pool.acquire() {
        Some(node) => {
            // SAFETY: a freshly acquired node is ours and vacant
            unsafe { Node::write(node, value) };
            Ok(node)
        }
        None => Err(value),
    }
}

/// Moves the value out of `node` and hands the node back to `pool`
///
/// # Safety
///
/// `node` must have been filled by `occupy` on the same `pool`, must be exclusively owned by the
/// caller (i.e. unlinked from its stack) and must not be used afterwards.
unsafe fn vacate<T, P>(pool: &P, node: NonNull<Node<T>>) -> T
where
    P: NodePool<T>,
{
    // SAFETY: the caller owns the occupied `node`
    let value = unsafe { Node::take(node) };
    // SAFETY: the slot is vacant again and the node came from `pool`
    unsafe { pool.release(node) };
    value
}
