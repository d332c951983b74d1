use alloc::{
    alloc::{alloc, dealloc},
    boxed::Box,
    vec::Vec,
};
use core::{alloc::Layout, ptr, ptr::NonNull};

use crate::{error::AllocError, node::Node};

/// One allocation of pool nodes
///
/// Chunks form a singly linked list owned by the pool. The node slice is kept as a raw pointer so
/// that node pointers handed out by the pool stay valid no matter how the chunk header is moved
/// or borrowed.
pub(crate) struct Chunk<T> {
    pub(crate) next: *mut Chunk<T>,
    nodes: NonNull<[Node<T>]>,
}

impl<T> Chunk<T> {
    /// Allocates a chunk of `len` vacant nodes
    ///
    /// Both the node storage and the header are allocated fallibly.
    pub(crate) fn allocate(len: usize) -> Result<NonNull<Self>, AllocError> {
        let error = AllocError { nodes: len };

        let mut nodes = Vec::new();
        nodes.try_reserve_exact(len).map_err(|_| error)?;
        // within the reserved capacity: neither of these reallocates
        nodes.extend((0..len).map(|_| Node::vacant()));
        let nodes = NonNull::from(Box::leak(nodes.into_boxed_slice()));

        let layout = Layout::new::<Self>();
        // SAFETY: `Chunk` holds two pointers, so `layout` is not zero sized
        let Some(header) = NonNull::new(unsafe { alloc(layout) }.cast::<Self>()) else {
            // SAFETY: `nodes` came from `Box::leak` above and was not handed out
            drop(unsafe { Box::from_raw(nodes.as_ptr()) });
            return Err(error);
        };

        // SAFETY: `header` is freshly allocated with the layout of `Self`
        unsafe {
            header.as_ptr().write(Self {
                next: ptr::null_mut(),
                nodes,
            })
        };

        Ok(header)
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Pointers to every node in the chunk
    pub(crate) fn nodes(&self) -> impl DoubleEndedIterator<Item = NonNull<Node<T>>> {
        let first = self.nodes.cast::<Node<T>>();
        // SAFETY: `i` stays within the slice
        (0..self.len()).map(move |i| unsafe { first.add(i) })
    }

    /// Frees `chunk` and returns the next chunk in the list
    ///
    /// Node values are not dropped; the owner of the nodes must have dealt with them.
    ///
    /// # Safety
    ///
    /// `chunk` must come from `allocate`, must not be freed twice and none of its nodes may be
    /// used afterwards.
    pub(crate) unsafe fn free(chunk: NonNull<Self>) -> *mut Self {
        // SAFETY: the caller guarantees `chunk` is a live allocation from `allocate`
        let Self { next, nodes } = unsafe { chunk.as_ptr().read() };

        // SAFETY: see `allocate`; `Node` has no drop glue, so this only frees memory
        unsafe {
            drop(Box::from_raw(nodes.as_ptr()));
            dealloc(chunk.as_ptr().cast(), Layout::new::<Self>());
        }

        next
    }

    /// Frees every chunk in the list starting at `head`
    ///
    /// # Safety
    ///
    /// Same as `free`, for every chunk in the list.
    pub(crate) unsafe fn free_all(mut head: *mut Self) {
        while let Some(chunk) = NonNull::new(head) {
            // SAFETY: forwarded to the caller
            head = unsafe { Self::free(chunk) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Chunk;

    #[test]
    fn nodes_are_distinct_and_vacant() {
        let chunk = Chunk::<u32>::allocate(8).unwrap();

        unsafe {
            let nodes = chunk.as_ref().nodes();
            let mut previous = None;
            for node in nodes {
                assert!(node.as_ref().load_next().is_none());
                assert_ne!(Some(node), previous);
                previous = Some(node);
            }
            assert_eq!(chunk.as_ref().len(), 8);

            assert!(Chunk::free(chunk).is_null());
        }
    }

    #[test]
    fn list() {
        let first = Chunk::<u8>::allocate(1).unwrap();
        let second = Chunk::<u8>::allocate(2).unwrap();

        unsafe {
            (*second.as_ptr()).next = first.as_ptr();
            Chunk::free_all(second.as_ptr());
        }
    }

    #[test]
    fn empty_chunk() {
        let chunk = Chunk::<u8>::allocate(0).unwrap();

        unsafe {
            assert_eq!(chunk.as_ref().nodes().count(), 0);
            Chunk::free(chunk);
        }
    }
}
