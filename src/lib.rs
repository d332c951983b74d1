//! Pool-backed LIFO stacks that never hand node memory back to the allocator while in use
//!
//! Every stack owns a node pool. `push` takes a node from the pool, `pop` gives it back, and the
//! pool only asks the global allocator for memory, in chunks, when its free list runs dry.
//!
//! Two variants are provided, with identical semantics:
//!
//! - [`LocalStack`]: a single owner stack. It is `Send` but not `Sync`, so the compiler enforces
//!   that only one context operates on it at a time.
//! - [`SharedStack`]: a lock-free Treiber stack that any number of threads can `push` to and
//!   `pop` from through a shared reference. Its head is a `{version, pointer}` pair updated with
//!   a single double-width compare-and-swap, which defeats the ABA problem without hazard
//!   pointers or epochs.
//!
//! Both implement the [`Lifo`] trait.
//!
//! # Examples
//!
//! ## `LocalStack`
//!
//! ```
//! use tagstack::LocalStack;
//!
//! let mut stack = LocalStack::new();
//!
//! assert!(stack.push(0).is_ok());
//! assert!(stack.push(1).is_ok());
//! assert_eq!(stack.len(), 2);
//!
//! assert_eq!(stack.pop(), Some(1));
//! assert_eq!(stack.pop(), Some(0));
//! assert_eq!(stack.pop(), None);
//! ```
//!
//! ## `SharedStack`
//!
//! ```
//! use std::thread;
//!
//! use tagstack::SharedStack;
//!
//! let stack = SharedStack::new();
//!
//! thread::scope(|s| {
//!     for t in 0..4 {
//!         let stack = &stack;
//!         s.spawn(move || {
//!             for i in 0..100 {
//!                 stack.push(t * 100 + i).unwrap();
//!             }
//!         });
//!     }
//! });
//!
//! assert_eq!(stack.len(), 400);
//! assert_eq!(stack.version(), 400);
//! ```
//!
//! ## Fixed capacity
//!
//! A pool can be capped, in which case `push` hands the value back once every node is in use.
//!
//! ```
//! use tagstack::{LocalStack, PoolConfig};
//!
//! let mut stack = LocalStack::with_config(PoolConfig::fixed(2)).unwrap();
//!
//! assert!(stack.push('a').is_ok());
//! assert!(stack.push('b').is_ok());
//! assert_eq!(stack.push('c'), Err('c')); // exhausted
//!
//! assert_eq!(stack.pop(), Some('b'));
//! assert!(stack.push('c').is_ok()); // the node was recycled
//! ```
//!
//! # Portability
//!
//! `SharedStack` and `SharedPool` need a compare-and-swap twice as wide as a pointer
//! (`cmpxchg16b` on x86_64, `casp` / `ldxp`+`stxp` on AArch64, `cmpxchg8b` on x86, `ldrexd` /
//! `strexd` on ARMv6K+ A/R profiles). They are only compiled for targets that have one. The
//! atomics come from [`portable-atomic`](https://crates.io/crates/portable-atomic).
//!
//! The stock x86_64 targets do not enable `cmpxchg16b` at compile time. There the instruction is
//! detected at run time, and on the rare CPU without it (first generation AMD64) the head is
//! guarded by a lock instead. Build with `-C target-feature=+cmpxchg16b` (or a `target-cpu` that
//! implies it) to use the instruction unconditionally. All other supported targets are always
//! lock-free.
//!
//! # Optional Features
//!
//! - `defmt`: implements `defmt::Format` for the public types and emits `trace` / `debug` events
//!   when a pool grows or runs out of nodes.

#![no_std]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub use error::AllocError;
#[cfg(has_dwcas)]
pub use pool::SharedPool;
pub use pool::{LocalPool, PoolConfig};
#[cfg(has_dwcas)]
pub use stack::SharedStack;
pub use stack::{Lifo, LocalStack};

#[macro_use]
#[cfg(test)]
mod test_helpers;

mod error;
mod node;
pub mod pool;
pub mod stack;
#[cfg(has_dwcas)]
mod treiber;

#[cfg(feature = "defmt")]
mod defmt;

#[cfg(doctest)]
mod cfail;
