//! Process-wide singleton access to the locked-memory allocator.

use std::sync::{Arc, OnceLock};

use tracing::error;

use crate::allocator::Allocator;

static INSTANCE: OnceLock<Arc<Allocator>> = OnceLock::new();

/// Returns the process-wide [`Allocator`], constructing it on first call.
///
/// A zero lockable-memory limit degrades the returned allocator to a
/// disabled one rather than failing this call — every `allocate` against
/// it then returns `None`. Only a syscall failure after a nonzero limit
/// was already committed to is fatal, and that failure aborts the process:
/// there is no way to hand back a disabled allocator in that case without
/// silently hiding a real OS-level problem from every subsequent caller
/// who assumed `instance()` always succeeds.
pub fn instance() -> Arc<Allocator> {
    INSTANCE
        .get_or_init(|| {
            Arc::new(Allocator::new().unwrap_or_else(|err| {
                error!(%err, "fatal: could not construct locked memory pool");
                panic!("locked memory pool construction failed: {err}");
            }))
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_the_same_instance() {
        let a = instance();
        let b = instance();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
