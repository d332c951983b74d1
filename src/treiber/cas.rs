use core::{marker::PhantomData, ptr::NonNull};

use portable_atomic as atomic;

use atomic::Ordering;

#[cfg(target_pointer_width = "32")]
mod types {
    use super::atomic;

    pub type Inner = u64;
    pub type InnerAtomic = atomic::AtomicU64;

    pub type Version = u32;
    pub type Address = u32;
}

#[cfg(target_pointer_width = "64")]
mod types {
    use super::atomic;

    pub type Inner = u128;
    pub type InnerAtomic = atomic::AtomicU128;

    pub type Version = u64;
    pub type Address = u64;
}

use types::*;

/// A `{version, pointer}` pair packed into one double-width word
///
/// The version lives in the upper half and the address in the lower half, so both are always
/// read and written together.
pub struct Tagged<N> {
    inner: Inner,
    _marker: PhantomData<*mut N>,
}

impl<N> Clone for Tagged<N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N> Copy for Tagged<N> {}

impl<N> PartialEq for Tagged<N> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<N> Eq for Tagged<N> {}

impl<N> Tagged<N> {
    #[inline]
    pub fn new(version: Version, node: Option<NonNull<N>>) -> Self {
        let address = node.map_or(0, |node| node.as_ptr() as usize as Address);

        Self {
            inner: (Inner::from(version) << Address::BITS) | Inner::from(address),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn version(&self) -> Version {
        (self.inner >> Address::BITS) as Version
    }

    #[inline]
    pub fn node(&self) -> Option<NonNull<N>> {
        NonNull::new(self.inner as Address as usize as *mut N)
    }

    /// Same version, different node; used when unlinking the top
    #[inline]
    pub fn with_node(self, node: Option<NonNull<N>>) -> Self {
        Self::new(self.version(), node)
    }

    /// Next version, different node; used when linking a new top
    #[inline]
    pub fn bumped(self, node: Option<NonNull<N>>) -> Self {
        Self::new(self.version().wrapping_add(1), node)
    }
}

pub struct AtomicHead<N> {
    inner: InnerAtomic,
    _marker: PhantomData<*mut N>,
}

impl<N> AtomicHead<N> {
    #[inline]
    pub const fn new() -> Self {
        Self {
            inner: InnerAtomic::new(0),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn load(&self, order: Ordering) -> Tagged<N> {
        Tagged {
            inner: self.inner.load(order),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn compare_exchange_weak(
        &self,
        current: Tagged<N>,
        new: Tagged<N>,
        success: Ordering,
        failure: Ordering,
    ) -> Result<(), Tagged<N>> {
        self.inner
            .compare_exchange_weak(current.inner, new.inner, success, failure)
            .map(drop)
            .map_err(|inner| Tagged {
                inner,
                _marker: PhantomData,
            })
    }
}

#[cfg(test)]
mod tests {
    use core::ptr::NonNull;

    use super::{Address, AtomicHead, InnerAtomic, Ordering, Tagged, Version};

    #[test]
    fn starts_at_version_zero_and_null() {
        let head = AtomicHead::<u64>::new().load(Ordering::Relaxed);

        assert_eq!(head.version(), 0);
        assert_eq!(head.node(), None);
        assert!(head == Tagged::new(0, None));
    }

    #[test]
    fn halves_do_not_bleed() {
        let mut value = 0u64;
        let node = NonNull::from(&mut value);

        let head = Tagged::new(Version::MAX, Some(node));
        assert_eq!(head.version(), Version::MAX);
        assert_eq!(head.node(), Some(node));

        let head = Tagged::<u64>::new(7, None);
        assert_eq!(head.version(), 7);
        assert_eq!(head.node(), None);
    }

    #[test]
    fn bump_keeps_pointer_identity_apart() {
        let mut value = 0u64;
        let node = NonNull::from(&mut value);

        let before = Tagged::new(3, Some(node));
        let after = before.with_node(None).bumped(Some(node));

        // same address, different version: a stale compare-and-swap must not match
        assert_eq!(after.node(), before.node());
        assert_eq!(after.version(), 4);
        assert!(before != after);
    }

    #[test]
    fn version_wraps() {
        let head = Tagged::<u64>::new(Version::MAX, None).bumped(None);

        assert_eq!(head.version(), 0);
        assert_eq!(Address::BITS, Version::BITS);
    }

    // every CPU a test machine runs on has the instruction, whether it was enabled at compile
    // time or is picked at run time
    #[test]
    #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
    #[cfg_attr(miri, ignore)]
    fn head_is_lock_free() {
        assert!(InnerAtomic::is_lock_free());
    }

    #[test]
    fn exchange_swaps_both_halves() {
        let mut a = 0u64;
        let mut b = 0u64;
        let (a, b) = (NonNull::from(&mut a), NonNull::from(&mut b));

        let head = AtomicHead::<u64>::new();
        let empty = head.load(Ordering::Relaxed);

        let pushed = empty.bumped(Some(a));
        while head
            .compare_exchange_weak(empty, pushed, Ordering::Release, Ordering::Relaxed)
            .is_err()
        {}
        assert!(head.load(Ordering::Acquire) == pushed);

        // a stale expected value fails and reports the live head
        let stale = Tagged::new(0, Some(b));
        assert!(head
            .compare_exchange_weak(stale, stale.bumped(None), Ordering::Release, Ordering::Relaxed)
            .is_err_and(|live| live == pushed));
    }
}
