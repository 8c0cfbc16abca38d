//! Platform-specific primitives backing [`LockedPool`](crate::LockedPool):
//! the lockable-memory resource limit, anonymous mapping, pinning, and
//! unmapping.
//!
//! Unix targets implement the full sequence against `libc`. Other targets
//! compile against [`other::query_lockable_limit`], which reports a zero
//! limit — the allocator is present but permanently disabled there rather
//! than failing to build. `mlock`'s pin-pages-plus-query-a-lockable-budget
//! semantics don't have a faithful `VirtualLock`/`VirtualAlloc` analogue,
//! so non-Unix targets are inert rather than approximating it.

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub(crate) use unix::{lock_region, map_region, query_lockable_limit, unlock_region, unmap_region};

#[cfg(not(unix))]
mod other;
#[cfg(not(unix))]
pub(crate) use other::{lock_region, map_region, query_lockable_limit, unlock_region, unmap_region};

/// An anonymous, page-aligned mapping plus its pinned-in-RAM state.
pub(crate) struct MappedRegion {
    pub(crate) base: *mut u8,
    pub(crate) len: usize,
}

// SAFETY: the region is exclusively owned by the `LockedPool` that holds
// this handle; no aliasing `MappedRegion` is ever created for the same
// mapping.
unsafe impl Send for MappedRegion {}
