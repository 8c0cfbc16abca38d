//! The best-fit, coalescing free-list allocator carved out of a
//! [`LockedPool`].

use parking_lot::Mutex;

use crate::error::PoolError;
use crate::pool::LockedPool;
use crate::zero::secure_zero;

/// A disjoint, free byte range relative to the pool base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Extent {
    offset: usize,
    length: usize,
}

fn padding(offset: usize, align: usize) -> usize {
    let rem = offset % align;
    if rem == 0 {
        0
    } else {
        align - rem
    }
}

/// Best-fit allocator over a single [`LockedPool`].
///
/// `allocate` and `deallocate` never panic on caller-supplied bad input —
/// they report failure in-band (`None`/`false`) per the pool's error
/// policy. The one exception is the documented precondition on
/// `deallocate`: passing a `(num_elems, elem_size)` pair that overflows is
/// a logic error an honest caller cannot hit, since `allocate` would
/// already have refused it, and is enforced with an assertion rather than
/// handled defensively.
pub struct Allocator {
    pool: LockedPool,
    free_list: Mutex<Vec<Extent>>,
}

impl Allocator {
    /// Construct an allocator backed by a freshly-acquired [`LockedPool`].
    pub fn new() -> Result<Self, PoolError> {
        Ok(Self::from_pool(LockedPool::new()?))
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn with_capacity_for_testing(size: usize) -> Result<Self, PoolError> {
        Ok(Self::from_pool(LockedPool::with_capacity_for_testing(size)?))
    }

    /// The pool's base address, for tests that need to reason about
    /// absolute offsets. Not part of the allocator's public contract.
    #[cfg(any(test, feature = "test-support"))]
    pub fn base_ptr_for_testing(&self) -> *mut u8 {
        self.pool.base_ptr().expect("test pool is never disabled")
    }

    fn from_pool(pool: LockedPool) -> Self {
        let initial = if pool.is_disabled() {
            Vec::new()
        } else {
            vec![Extent { offset: 0, length: pool.len() }]
        };
        Self { pool, free_list: Mutex::new(initial) }
    }

    /// `true` if the backing pool has no memory to hand out.
    pub fn is_disabled(&self) -> bool {
        self.pool.is_disabled()
    }

    /// Total pool capacity in bytes, `0` if disabled.
    pub fn capacity(&self) -> usize {
        self.pool.len()
    }

    /// Allocate `num_elems * elem_size` bytes aligned to `elem_size`.
    ///
    /// Returns `None` if the pool is disabled, the size overflows, the
    /// request is greater than or equal to the whole pool, or no free
    /// extent is large enough once alignment padding is accounted for.
    /// The returned region is zeroed before this function returns. A
    /// `num_elems` of zero is not special-cased: it is carved out of
    /// whichever extent fits the (zero-length) request, consuming no
    /// bytes, and fails exactly when no extent satisfies the alignment
    /// padding — i.e. under the same no-fit rule as any other size.
    pub fn allocate(&self, num_elems: usize, elem_size: usize) -> Option<*mut u8> {
        if elem_size == 0 {
            return None;
        }
        let base = self.pool.base_ptr()?;
        let pool_len = self.pool.len();
        let n = num_elems.checked_mul(elem_size)?;
        if n >= pool_len {
            return None;
        }

        let mut free_list = self.free_list.lock();

        for (idx, extent) in free_list.iter().enumerate() {
            if extent.length == n && extent.offset % elem_size == 0 {
                let offset = extent.offset;
                free_list.remove(idx);
                drop(free_list);
                // SAFETY: `[base+offset, base+offset+n)` was free and is
                // within the pool; this call owns the only reference to it.
                unsafe { secure_zero(std::slice::from_raw_parts_mut(base.add(offset), n)) };
                return Some(unsafe { base.add(offset) });
            }
        }

        let mut best: Option<(usize, usize, usize)> = None; // (index, offset, length)
        for (idx, extent) in free_list.iter().enumerate() {
            let pad = padding(extent.offset, elem_size);
            if extent.length < n + pad {
                continue;
            }
            match best {
                Some((_, _, best_len)) if best_len <= extent.length => {}
                _ => best = Some((idx, extent.offset, extent.length)),
            }
        }

        let (idx, off, len) = best?;
        let pad = padding(off, elem_size);
        let remainder = len - n - pad;

        if remainder == 0 {
            if pad > 0 {
                free_list[idx] = Extent { offset: off, length: pad };
            } else {
                free_list.remove(idx);
            }
        } else {
            free_list[idx] = Extent { offset: off + n + pad, length: remainder };
            if pad > 0 {
                free_list.insert(idx, Extent { offset: off, length: pad });
            }
        }
        drop(free_list);

        let addr_offset = off + pad;
        // SAFETY: `[base+addr_offset, base+addr_offset+n)` was carved out
        // of a free extent above and is within the pool.
        unsafe { secure_zero(std::slice::from_raw_parts_mut(base.add(addr_offset), n)) };
        Some(unsafe { base.add(addr_offset) })
    }

    /// Return a previously-allocated region to the pool.
    ///
    /// Returns `false` if the pool is disabled or `addr` does not denote a
    /// range entirely within the pool — callers are expected to route a
    /// `false` result to a fallback allocator. The bytes are not zeroed
    /// here; see the crate docs and [`crate::LockedBox`] for why.
    pub fn deallocate(&self, addr: *mut u8, num_elems: usize, elem_size: usize) -> bool {
        let Some(base) = self.pool.base_ptr() else {
            return false;
        };
        let pool_len = self.pool.len();

        let n = num_elems
            .checked_mul(elem_size)
            .expect("deallocate: size overflow — allocate would have refused this request");

        let addr_val = addr as usize;
        let base_val = base as usize;
        if addr_val < base_val {
            return false;
        }
        let start = addr_val - base_val;
        let end = match start.checked_add(n) {
            Some(end) => end,
            None => return false,
        };
        if end > pool_len {
            return false;
        }
        if n == 0 {
            return true;
        }

        let mut free_list = self.free_list.lock();
        let i = free_list.partition_point(|e| e.offset < start);

        let mut remaining = n;
        let merged_forward = i < free_list.len() && start + remaining == free_list[i].offset;
        if merged_forward {
            free_list[i].offset = start;
            free_list[i].length += remaining;
            remaining = 0;
        }

        if i > 0 {
            let p = i - 1;
            if free_list[p].offset + free_list[p].length == start {
                if remaining > 0 {
                    free_list[p].length += remaining;
                    remaining = 0;
                } else {
                    let absorbed = free_list[i].length;
                    free_list[p].length += absorbed;
                    free_list.remove(i);
                }
            }
        }

        if remaining > 0 {
            free_list.insert(i, Extent { offset: start, length: remaining });
        }

        true
    }

    /// Snapshot of the free list as `(offset, length)` pairs, ordered by
    /// offset. Exposed for tests asserting the canonical-form invariant.
    #[cfg(test)]
    fn free_extents(&self) -> Vec<(usize, usize)> {
        self.free_list.lock().iter().map(|e| (e.offset, e.length)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Allocator {
        Allocator::with_capacity_for_testing(1024).unwrap()
    }

    #[test]
    fn perfect_fit_reuse() {
        let a = small();
        let x = a.allocate(1, 256).unwrap();
        assert_eq!(a.free_extents(), vec![(256, 768)]);
        assert!(a.deallocate(x, 1, 256));
        assert_eq!(a.free_extents(), vec![(0, 1024)]);
        let x2 = a.allocate(1, 256).unwrap();
        assert_eq!(x, x2);
        assert_eq!(a.free_extents(), vec![(256, 768)]);
    }

    #[test]
    fn alignment_padding_creates_hole() {
        let a = small();
        // Pre-allocate 1 byte at offset 0 so the remaining free extent
        // starts at offset 1, forcing padding on the next request.
        let base = a.pool.base_ptr().unwrap();
        let one = a.allocate(1, 1).unwrap();
        assert_eq!(one, base);
        assert_eq!(a.free_extents(), vec![(1, 1023)]);

        let eight = a.allocate(1, 8).unwrap();
        // SAFETY: `base` is valid for the whole 1024-byte test pool and 8
        // is within bounds.
        assert_eq!(eight, unsafe { base.add(8) });
        assert_eq!(a.free_extents(), vec![(1, 7), (16, 1008)]);

        assert!(a.deallocate(eight, 1, 8));
        assert_eq!(a.free_extents(), vec![(1, 1023)]);
    }

    #[test]
    fn best_fit_beats_first_fit() {
        let a = small();
        let base = a.pool.base_ptr().unwrap();
        // Carve the pool so freeing two of the five blocks leaves the
        // free list [(0,64),(128,32),(384,640)] — two equally-reachable
        // holes of different sizes plus the untouched tail.
        let x0 = a.allocate(64, 1).unwrap(); // [0,64)
        let gap1 = a.allocate(64, 1).unwrap(); // [64,128)
        let x2 = a.allocate(32, 1).unwrap(); // [128,160)
        let gap2 = a.allocate(96, 1).unwrap(); // [160,256)
        let _tail = a.allocate(128, 1).unwrap(); // [256,384)
        assert!(a.deallocate(x0, 64, 1));
        assert!(a.deallocate(x2, 32, 1));
        assert_eq!(a.free_extents(), vec![(0, 64), (128, 32), (384, 640)]);
        let _ = (gap1, gap2);

        let winner = a.allocate(32, 1).unwrap();
        // SAFETY: `base` is valid for the whole 1024-byte test pool and 128
        // is within bounds.
        assert_eq!(winner, unsafe { base.add(128) });
    }

    #[test]
    fn bidirectional_merge() {
        let a = small();
        let blk_a = a.allocate(100, 1).unwrap();
        let blk_b = a.allocate(100, 1).unwrap();
        let blk_c = a.allocate(100, 1).unwrap();

        assert!(a.deallocate(blk_a, 100, 1));
        assert!(a.deallocate(blk_c, 100, 1));
        assert_eq!(a.free_extents(), vec![(0, 100), (200, 824)]);

        assert!(a.deallocate(blk_b, 100, 1));
        assert_eq!(a.free_extents(), vec![(0, 1024)]);
    }

    #[test]
    fn oversized_refusal() {
        let a = small();
        assert!(a.allocate(1024, 1).is_none());
        assert_eq!(a.free_extents(), vec![(0, 1024)]);
    }

    #[test]
    fn overflow_refusal() {
        let a = small();
        assert!(a.allocate(usize::MAX, 2).is_none());
        assert_eq!(a.free_extents(), vec![(0, 1024)]);
    }

    #[test]
    fn foreign_pointer_rejected() {
        let a = small();
        let mut stray = [0u8; 16];
        assert!(!a.deallocate(stray.as_mut_ptr(), 16, 1));
        assert_eq!(a.free_extents(), vec![(0, 1024)]);
    }

    #[test]
    fn handout_is_zeroed() {
        let a = small();
        let p = a.allocate(64, 1).unwrap();
        // SAFETY: freshly allocated, exclusively held here.
        let bytes = unsafe { std::slice::from_raw_parts(p, 64) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    fn assert_canonical(free: &[(usize, usize)], pool_len: usize) {
        for w in free.windows(2) {
            assert!(w[0].0 + w[0].1 < w[1].0, "adjacent free extents should have merged: {free:?}");
        }
        if let Some(&(offset, length)) = free.last() {
            assert!(offset + length <= pool_len);
        }
    }

    mod free_list_properties {
        use super::*;
        use proptest::collection::vec as pvec;
        use proptest::prelude::*;

        fn op_strategy() -> impl Strategy<Value = (bool, usize, usize)> {
            prop_oneof![
                (1usize..=64, prop_oneof![Just(1usize), Just(2), Just(4), Just(8)])
                    .prop_map(|(n, sz)| (true, n, sz)),
                (0usize..8).prop_map(|which| (false, which, 0)),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            /// Arbitrary allocate/deallocate interleavings should always leave
            /// the free list sorted, non-adjacent, and summing together with
            /// every live allocation back to the pool's full capacity.
            #[test]
            fn free_list_stays_canonical_and_conserves_bytes(ops in pvec(op_strategy(), 1..64)) {
                let a = Allocator::with_capacity_for_testing(1024).unwrap();
                let mut live: Vec<(*mut u8, usize, usize)> = Vec::new();

                for (is_alloc, p1, p2) in ops {
                    if is_alloc {
                        if let Some(ptr) = a.allocate(p1, p2) {
                            live.push((ptr, p1, p2));
                        }
                    } else if !live.is_empty() {
                        let idx = p1 % live.len();
                        let (ptr, n, sz) = live.remove(idx);
                        prop_assert!(a.deallocate(ptr, n, sz));
                    }

                    let free = a.free_extents();
                    assert_canonical(&free, 1024);

                    let free_bytes: usize = free.iter().map(|(_, len)| len).sum();
                    let live_bytes: usize = live.iter().map(|(_, n, sz)| n * sz).sum();
                    prop_assert_eq!(free_bytes + live_bytes, 1024);
                }
            }
        }
    }
}
