//! The zeroing primitive: writes zero bytes in a way the optimizer cannot
//! remove as dead stores, even though nothing reads the slice afterwards.

use std::sync::atomic::{compiler_fence, Ordering};

/// Overwrite every byte of `slice` with zero.
///
/// This is used for the pool's initial zeroing, for zeroing a region
/// immediately before handing it out, and by [`LockedBox::drop`](crate::LockedBox)
/// before a region is returned to the free list. It is not used by
/// [`Allocator::deallocate`](crate::Allocator::deallocate) itself — see that
/// function's docs for why.
pub(crate) fn secure_zero(slice: &mut [u8]) {
    for byte in slice.iter_mut() {
        // SAFETY: `byte` is a valid `&mut u8` for the duration of the write.
        unsafe { core::ptr::write_volatile(byte, 0) };
    }
    compiler_fence(Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroes_every_byte() {
        let mut buf = [0xAAu8; 64];
        secure_zero(&mut buf);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn handles_empty_slice() {
        let mut buf: [u8; 0] = [];
        secure_zero(&mut buf);
    }
}
