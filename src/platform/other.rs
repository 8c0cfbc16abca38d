//! Stub platform backend for targets that are neither Unix nor have a
//! `mlock`-equivalent implementation here.
//!
//! Reporting a zero lockable-memory limit means [`LockedPool::new`](crate::LockedPool::new)
//! degrades to the permanently-disabled state rather than failing to
//! build or panicking: the allocator is present on every target, it is
//! just inert where this module is compiled in.

use std::io;

use super::MappedRegion;

pub(crate) fn query_lockable_limit() -> usize {
    0
}

pub(crate) fn map_region(_len: usize) -> io::Result<MappedRegion> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "locked memory pool is not implemented on this platform",
    ))
}

pub(crate) fn lock_region(_region: &MappedRegion) -> io::Result<()> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "mlock unavailable"))
}

pub(crate) fn unlock_region(_region: &MappedRegion) -> io::Result<()> {
    Ok(())
}

pub(crate) fn unmap_region(_region: &MappedRegion) {}
