//! The backing OS-level memory region for the allocator.

use tracing::{error, warn};

use crate::error::PoolError;
use crate::platform::{lock_region, map_region, query_lockable_limit, unlock_region, unmap_region, MappedRegion};
use crate::zero::secure_zero;

/// Hard cap on pool size, regardless of how generous the process's
/// lockable-memory limit is. Keeps a single process from pinning an
/// unreasonable amount of physical RAM, and keeps the allocator's linear
/// free-list scan cheap.
pub const MLOCK_UPPER_BOUND: usize = 512 * 1024;

/// A single, fixed-size, page-locked region of anonymous memory.
///
/// Construction queries the OS's lockable-memory limit and maps
/// `min(limit, MLOCK_UPPER_BOUND)` bytes. If the limit is zero the pool is
/// constructed successfully but [`is_disabled`](LockedPool::is_disabled)
/// returns `true` — every allocation request against it is then refused
/// in-band, which is not a fatal condition. A fatal [`PoolError`] is only
/// returned if the OS refuses the mapping or pinning syscalls outright
/// after a nonzero limit was already committed to.
pub struct LockedPool {
    region: Option<MappedRegion>,
}

// SAFETY: the pool bytes are exclusively owned by this struct; access to
// them is only ever performed under the allocator's free-list mutex (see
// `Allocator`), so sharing a `&LockedPool` across threads is sound.
unsafe impl Sync for LockedPool {}

impl LockedPool {
    /// Construct the pool from the process's `RLIMIT_MEMLOCK`.
    pub fn new() -> Result<Self, PoolError> {
        let limit = query_lockable_limit();
        if limit == 0 {
            warn!("RLIMIT_MEMLOCK is 0; locked memory pool is disabled for this process");
            return Ok(Self { region: None });
        }
        let size = limit.min(MLOCK_UPPER_BOUND);
        Self::with_capacity(size)
    }

    /// Construct a pool of an explicit size, bypassing the `RLIMIT_MEMLOCK`
    /// query. Intended for tests that need a small, deterministic `P`
    /// without depending on the host's ambient lockable-memory limit.
    #[cfg(any(test, feature = "test-support"))]
    pub fn with_capacity_for_testing(size: usize) -> Result<Self, PoolError> {
        Self::with_capacity(size)
    }

    fn with_capacity(size: usize) -> Result<Self, PoolError> {
        let region = map_region(size).map_err(|source| PoolError::Map { size, source })?;

        // SAFETY: `region` was just mapped above with exactly `size` bytes
        // of read/write memory, and nothing else has a reference to it yet.
        secure_zero(unsafe { std::slice::from_raw_parts_mut(region.base, region.len) });

        if let Err(source) = lock_region(&region) {
            unmap_region(&region);
            error!(size, %source, "failed to pin locked memory pool; mapping released");
            return Err(PoolError::Lock { size, source });
        }

        Ok(Self { region: Some(region) })
    }

    /// `true` if the pool has no backing memory (the host's lockable-memory
    /// limit was zero). Every [`Allocator`](crate::Allocator) call against
    /// a disabled pool fails in-band.
    pub fn is_disabled(&self) -> bool {
        self.region.is_none()
    }

    /// Total pool size in bytes, `0` if disabled.
    pub fn len(&self) -> usize {
        self.region.as_ref().map_or(0, |r| r.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Base address of the pool, or `None` if disabled.
    pub(crate) fn base_ptr(&self) -> Option<*mut u8> {
        self.region.as_ref().map(|r| r.base)
    }
}

impl Drop for LockedPool {
    fn drop(&mut self) {
        if let Some(region) = self.region.take() {
            // SAFETY: `region.base` is valid for `region.len` bytes for as
            // long as the mapping is alive, which is still the case here.
            secure_zero(unsafe { std::slice::from_raw_parts_mut(region.base, region.len) });
            let _ = unlock_region(&region);
            unmap_region(&region);
        }
    }
}
