//! Construction-time error surface.
//!
//! [`Allocator::allocate`](crate::Allocator::allocate) and
//! [`Allocator::deallocate`](crate::Allocator::deallocate) never return a
//! `Result` — every runtime failure is in-band (`None`/`false`), per the
//! allocator's propagation policy. [`PoolError`] exists only for the
//! fallible half of the pool's lifecycle: standing up the OS mapping in
//! [`LockedPool::new`](crate::LockedPool::new).

use std::io;

/// Failure to acquire the backing OS mapping for a [`LockedPool`](crate::LockedPool).
///
/// A zero lockable-memory limit is *not* represented here: that degrades
/// the pool to a permanently-disabled state in-band, it does not fail
/// construction (see `LockedPool::new`).
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The anonymous mapping syscall failed.
    #[error("failed to map {size} bytes of locked pool memory: {source}")]
    Map {
        size: usize,
        #[source]
        source: io::Error,
    },
    /// The mapping succeeded but pinning it in physical memory failed.
    /// The mapping has already been released by the time this is returned.
    #[error("failed to lock {size} bytes of pool memory in RAM: {source}")]
    Lock {
        size: usize,
        #[source]
        source: io::Error,
    },
}
