//! Thread-safe signature cache handle.
//!
//! [`SignatureCache`] wraps a [`CacheCore`] in one `parking_lot::Mutex`. Every
//! public operation holds the lock for its whole duration, including growth,
//! index rebuilds, eviction passes and releaser callbacks. Cloning the handle
//! shares the same cache.
//!
//! Pinning is advisory: an acquired item cannot be evicted, but the cache does
//! not synchronize access to the payload itself. Share payloads as `Arc<T>`
//! and synchronize their contents as needed.
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//! use gencache::{CacheBuilder, InsertOptions};
//!
//! let cache = CacheBuilder::new(8)
//!     .max_items(64)
//!     .build::<Arc<Vec<u8>>, ()>()
//!     .unwrap();
//!
//! let producer = {
//!     let cache = cache.clone();
//!     thread::spawn(move || {
//!         for i in 0u64..16 {
//!             let payload = Arc::new(vec![i as u8; 4]);
//!             cache.insert(&i.to_le_bytes(), (), payload, InsertOptions::new(4)).unwrap();
//!         }
//!     })
//! };
//! producer.join().unwrap();
//!
//! let payload = cache.acquire(&3u64.to_le_bytes()).unwrap();
//! assert_eq!(payload.as_slice(), &[3, 3, 3, 3]);
//! cache.release(&3u64.to_le_bytes()).unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::{CacheCore, InsertOptions};
use crate::ds::Stamp;
use crate::error::{CacheError, ConfigError, InsertError, InvariantError};
use crate::metrics::{CacheStats, MetricsSnapshotProvider};
use crate::release::{DropReleaser, Releaser};

pub struct SignatureCache<V, C = (), R = DropReleaser>
where
    R: Releaser<C, V>,
{
    inner: Arc<Mutex<CacheCore<V, C, R>>>,
}

impl<V, C, R> Clone for SignatureCache<V, C, R>
where
    R: Releaser<C, V>,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, C, R> fmt::Debug for SignatureCache<V, C, R>
where
    R: Releaser<C, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.inner.lock();
        f.debug_struct("SignatureCache")
            .field("len", &cache.len())
            .field("slot_capacity", &cache.slot_capacity())
            .field("total_storage", &cache.total_storage())
            .finish_non_exhaustive()
    }
}

impl<V, C, R> SignatureCache<V, C, R>
where
    R: Releaser<C, V>,
{
    pub fn from_core(core: CacheCore<V, C, R>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(core)),
        }
    }

    /// Runs `f` with the lock held, for compound operations that must not
    /// interleave with other callers.
    pub fn with_core<T>(&self, f: impl FnOnce(&mut CacheCore<V, C, R>) -> T) -> T {
        let mut core = self.inner.lock();
        f(&mut core)
    }

    /// See [`CacheCore::insert`].
    pub fn insert(
        &self,
        signature: &[u8],
        context: C,
        payload: V,
        opts: InsertOptions,
    ) -> Result<(), InsertError<C, V>> {
        self.inner.lock().insert(signature, context, payload, opts)
    }

    pub fn check_exists(&self, signature: &[u8], touch: bool) -> bool {
        self.inner.lock().check_exists(signature, touch)
    }

    /// Checks many signatures under a single lock acquisition.
    pub fn check_exists_batch<S: AsRef<[u8]>>(&self, signatures: &[S], touch: bool) -> Vec<bool> {
        self.inner.lock().check_exists_batch(signatures, touch)
    }

    /// Pins the item and returns a clone of its payload.
    pub fn acquire(&self, signature: &[u8]) -> Option<V>
    where
        V: Clone,
    {
        self.inner.lock().acquire(signature)
    }

    /// Pins the item and runs `f` on its payload under the lock.
    pub fn acquire_with<T>(&self, signature: &[u8], f: impl FnOnce(&V) -> T) -> Option<T> {
        self.inner.lock().acquire_with(signature, f)
    }

    pub fn release(&self, signature: &[u8]) -> Result<(), CacheError> {
        self.inner.lock().release(signature)
    }

    pub fn remove(&self, signature: &[u8]) -> Result<(), CacheError> {
        self.inner.lock().remove(signature)
    }

    pub fn remove_all(&self) -> bool {
        self.inner.lock().remove_all()
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    pub fn set_max_storage(&self, max_storage: u64) {
        self.inner.lock().set_max_storage(max_storage);
    }

    pub fn set_max_items(&self, max_items: usize) -> Result<(), ConfigError> {
        self.inner.lock().set_max_items(max_items)
    }

    pub fn set_clock_wrap_at(&self, wrap_at: Stamp) {
        self.inner.lock().set_clock_wrap_at(wrap_at);
    }

    pub fn signature_size(&self) -> usize {
        self.inner.lock().signature_size()
    }

    pub fn max_items(&self) -> usize {
        self.inner.lock().max_items()
    }

    pub fn max_storage(&self) -> u64 {
        self.inner.lock().max_storage()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn total_storage(&self) -> u64 {
        self.inner.lock().total_storage()
    }

    pub fn lock_count(&self, signature: &[u8]) -> Option<u32> {
        self.inner.lock().lock_count(signature)
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats()
    }

    pub fn dump_stats(&self) {
        self.inner.lock().dump_stats();
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.lock().check_invariants()
    }
}

impl<V, C, R> MetricsSnapshotProvider<CacheStats> for SignatureCache<V, C, R>
where
    R: Releaser<C, V>,
{
    fn snapshot(&self) -> CacheStats {
        self.stats()
    }
}
