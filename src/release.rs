//! Release capability for evicted payloads.
//!
//! When a slot is freed (eviction, `remove`, `remove_all`, overwrite or
//! `reset`) the cache hands the item's release context and payload to a
//! [`Releaser`]. The cache never inspects either value; ownership returns to
//! the caller at that point.
//!
//! Releasers run while the cache lock is held and must not call back into the
//! same cache.
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use gencache::release::Releaser;
//!
//! let released = AtomicUsize::new(0);
//! let releaser = |ctx: u32, payload: Vec<u8>| {
//!     released.fetch_add(ctx as usize + payload.len(), Ordering::Relaxed);
//! };
//! releaser.release(1, vec![0; 4]);
//! assert_eq!(released.load(Ordering::Relaxed), 5);
//! ```

/// Disposes of a payload given its original release context.
pub trait Releaser<C, V> {
    fn release(&self, context: C, payload: V);
}

impl<C, V, F> Releaser<C, V> for F
where
    F: Fn(C, V),
{
    #[inline]
    fn release(&self, context: C, payload: V) {
        self(context, payload)
    }
}

/// Releaser that simply drops the context and payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct DropReleaser;

impl<C, V> Releaser<C, V> for DropReleaser {
    #[inline]
    fn release(&self, _context: C, _payload: V) {}
}
