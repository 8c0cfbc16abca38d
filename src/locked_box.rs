//! [`LockedBox`]: a typed, move-only RAII handle over a locked-pool
//! allocation.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::allocator::Allocator;
use crate::zero::secure_zero;

/// An owning handle to a byte range carved out of a shared [`Allocator`].
///
/// `Allocator::allocate`/`deallocate` return bare pointers and leave
/// lifetime tracking to the caller; `LockedBox` is the typed wrapper built
/// on top of that pair: it pairs an `allocate` call with a `Drop` impl
/// that zeroes the held bytes and calls `deallocate` before the memory is
/// returned to the free list. It holds no interior mutability and cannot
/// be cloned — moving it transfers ownership of the address.
pub struct LockedBox {
    allocator: Arc<Allocator>,
    ptr: *mut u8,
    num_elems: usize,
    elem_size: usize,
}

// SAFETY: the pointed-to bytes are exclusively owned by this `LockedBox`;
// no other handle aliases them while this one is alive.
unsafe impl Send for LockedBox {}

impl LockedBox {
    /// Allocate `num_elems * elem_size` bytes from `allocator`, aligned to
    /// `elem_size`. Returns `None` exactly when the underlying `allocate`
    /// call would — see [`Allocator::allocate`].
    pub fn new(allocator: Arc<Allocator>, num_elems: usize, elem_size: usize) -> Option<Self> {
        let ptr = allocator.allocate(num_elems, elem_size)?;
        Some(Self { allocator, ptr, num_elems, elem_size })
    }

    /// Length of the held region in bytes.
    pub fn len(&self) -> usize {
        self.num_elems * self.elem_size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Deref for LockedBox {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: `ptr` is valid for `len()` bytes for the lifetime of
        // this `LockedBox`, and access is exclusive (no aliasing handle).
        unsafe { std::slice::from_raw_parts(self.ptr, self.len()) }
    }
}

impl DerefMut for LockedBox {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: same as `deref`, with exclusive `&mut self` access.
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len()) }
    }
}

impl Drop for LockedBox {
    fn drop(&mut self) {
        secure_zero(&mut *self);
        // A `false` result here means the allocator itself is disabled or
        // the pointer is somehow foreign, neither of which `new` could
        // have produced — it would indicate the invariant-violation case
        // the allocator documents as a bug, which `Drop` cannot usefully
        // report. We intentionally do not panic from `drop`.
        let _ = self.allocator.deallocate(self.ptr, self.num_elems, self.elem_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Allocator;

    #[test]
    fn zeroes_contents_on_drop_and_returns_region() {
        let allocator = Arc::new(Allocator::with_capacity_for_testing(1024).unwrap());
        let addr = {
            let mut handle = LockedBox::new(allocator.clone(), 64, 1).unwrap();
            handle.fill(0xAB);
            handle.as_ptr()
        };
        // Region is back in the free list and zeroed: a fresh allocation
        // of the same size lands at the same address and reads as zero.
        let handle2 = LockedBox::new(allocator.clone(), 64, 1).unwrap();
        assert_eq!(handle2.as_ptr(), addr);
        assert!(handle2.iter().all(|&b| b == 0));
    }

    #[test]
    fn new_fails_when_pool_exhausted() {
        let allocator = Arc::new(Allocator::with_capacity_for_testing(64).unwrap());
        assert!(LockedBox::new(allocator, 64, 1).is_none());
    }
}
