//! Compile fail tests
//!
//! # `Send`-ness
//!
//! Stacks and pools of `Send`-able things are `Send`
//!
//! ```
//! use tagstack::{LocalPool, LocalStack};
//!
//! struct IsSend;
//!
//! unsafe impl Send for IsSend {}
//!
//! fn is_send<T>() where T: Send {}
//!
//! is_send::<LocalStack<IsSend>>();
//! is_send::<LocalPool<IsSend>>();
//! ```
//!
//! Stacks of non-`Send`-able things are *not* `Send`
//!
//! ``` compile_fail
//! use std::marker::PhantomData;
//! use tagstack::LocalStack;
//!
//! type NotSend = PhantomData<*const ()>;
//!
//! fn is_send<T>() where T: Send {}
//!
//! is_send::<LocalStack<NotSend>>();
//! ```
//!
//! ``` compile_fail
//! use std::marker::PhantomData;
//! use tagstack::SharedStack;
//!
//! type NotSend = PhantomData<*const ()>;
//!
//! fn is_send<T>() where T: Send {}
//!
//! is_send::<SharedStack<NotSend>>();
//! ```
//!
//! # `Sync`-ness
//!
//! A `SharedStack` can be shared between threads
//!
//! ```
//! use tagstack::{SharedPool, SharedStack};
//!
//! fn is_sync<T>() where T: Sync {}
//!
//! is_sync::<SharedStack<u32>>();
//! is_sync::<SharedPool<u32>>();
//! ```
//!
//! A `LocalStack` cannot
//!
//! ``` compile_fail
//! use tagstack::LocalStack;
//!
//! fn is_sync<T>() where T: Sync {}
//!
//! is_sync::<LocalStack<u32>>();
//! ```
//!
//! ``` compile_fail
//! use std::thread;
//! use tagstack::LocalStack;
//!
//! let mut stack = LocalStack::new();
//! stack.push(0).unwrap();
//!
//! thread::scope(|s| {
//!     s.spawn(|| stack.len());
//!     s.spawn(|| stack.len());
//! });
//! ```
//!
//! # Exclusive access
//!
//! Mutating a `LocalStack` needs `&mut`
//!
//! ``` compile_fail
//! use tagstack::LocalStack;
//!
//! let stack = LocalStack::new();
//! stack.push(0).unwrap();
//! ```
//!
//! # Pool internals
//!
//! Nodes and the pool trait are not part of the public API
//!
//! ``` compile_fail
//! use tagstack::NodePool;
//! ```
//!
//! ``` compile_fail
//! use tagstack::pool::NodePool;
//! ```
//!
//! ``` compile_fail
//! use tagstack::Node;
//! ```
