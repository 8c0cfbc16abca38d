//! A process-wide, page-locked memory pool for cryptographically sensitive
//! material.
//!
//! [`LockedPool`] acquires a single, fixed-size region of anonymous memory,
//! pins it in physical RAM so it is never written to swap, and excludes it
//! from core dumps where the platform supports that. [`Allocator`] carves
//! small, element-aligned regions out of that pool with a best-fit free
//! list, and [`LockedBox`] is a typed RAII handle that zeroes its contents
//! on drop before returning them to the pool.
//!
//! The pool is bounded (see [`MLOCK_UPPER_BOUND`]) and never grows; it is
//! meant for keys and short-lived intermediate state, not general-purpose
//! allocation. Requests the pool cannot satisfy fail in-band (`None`/
//! `false`) rather than panicking — see [`Allocator::allocate`] and
//! [`Allocator::deallocate`].

mod allocator;
mod error;
mod locked_box;
mod platform;
mod pool;
mod singleton;
mod zero;

pub use allocator::Allocator;
pub use error::PoolError;
pub use locked_box::LockedBox;
pub use pool::{LockedPool, MLOCK_UPPER_BOUND};
pub use singleton::instance;
