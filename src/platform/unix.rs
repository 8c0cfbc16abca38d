//! Unix (Linux, macOS, the BSDs) implementation of the pool's OS primitives.

use std::io;
use std::ptr;

use super::MappedRegion;

/// Query the current process's lockable-memory limit, raising the soft
/// limit to the hard limit first if the platform allows it (best-effort:
/// failure to raise it is not an error, we just fall back to whatever the
/// soft limit already was).
///
/// Returns the resulting soft limit in bytes, or `usize::MAX` if the
/// platform reports `RLIM_INFINITY`.
pub(crate) fn query_lockable_limit() -> usize {
    // SAFETY: `limit` is a valid, fully-initialized `rlimit` by the time
    // any field of it is read, because `getrlimit` either fills it in or
    // we use its documented zeroed fallback.
    let mut limit: libc::rlimit = unsafe { std::mem::zeroed() };
    if unsafe { libc::getrlimit(libc::RLIMIT_MEMLOCK, &mut limit) } != 0 {
        return 0;
    }

    if limit.rlim_cur < limit.rlim_max {
        let raised = libc::rlimit {
            rlim_cur: limit.rlim_max,
            rlim_max: limit.rlim_max,
        };
        // Best-effort: many sandboxes refuse this even for the same
        // process that owns the limit. Re-query regardless of outcome.
        unsafe {
            let _ = libc::setrlimit(libc::RLIMIT_MEMLOCK, &raised);
            let _ = libc::getrlimit(libc::RLIMIT_MEMLOCK, &mut limit);
        }
    }

    if limit.rlim_cur == libc::RLIM_INFINITY {
        usize::MAX
    } else {
        limit.rlim_cur as usize
    }
}

/// Map `len` bytes of anonymous, private, read/write memory and hint that
/// it should be excluded from core dumps where the platform supports it.
pub(crate) fn map_region(len: usize) -> io::Result<MappedRegion> {
    // SAFETY: all arguments are valid for an anonymous mapping: a null
    // hint address, a nonzero length, RW protection, and no backing fd.
    let base = unsafe {
        libc::mmap(
            ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };

    if base == libc::MAP_FAILED {
        return Err(io::Error::last_os_error());
    }

    #[cfg(target_os = "linux")]
    {
        // SAFETY: `base` is a valid mapping of at least `len` bytes, just
        // established above. MADV_DONTDUMP is advisory; an absent or
        // failing no-core-dump hint is a no-op, not an error, so the
        // result is intentionally ignored.
        unsafe {
            libc::madvise(base, len, libc::MADV_DONTDUMP);
        }
    }

    Ok(MappedRegion {
        base: base.cast::<u8>(),
        len,
    })
}

/// Pin `region` in physical memory so it is never written to swap.
pub(crate) fn lock_region(region: &MappedRegion) -> io::Result<()> {
    // SAFETY: `region.base` is valid for `region.len` bytes for the
    // lifetime of the mapping, which outlives this call.
    let result = unsafe { libc::mlock(region.base.cast(), region.len) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Unpin `region`. Errors are not actionable during teardown and are
/// swallowed by the caller.
pub(crate) fn unlock_region(region: &MappedRegion) -> io::Result<()> {
    // SAFETY: same as `lock_region`.
    let result = unsafe { libc::munlock(region.base.cast(), region.len) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Release the mapping. `region` must not be used afterwards.
pub(crate) fn unmap_region(region: &MappedRegion) {
    // SAFETY: `region.base`/`region.len` describe a mapping this module
    // created in `map_region` and that has not yet been unmapped.
    unsafe {
        libc::munmap(region.base.cast(), region.len);
    }
}
