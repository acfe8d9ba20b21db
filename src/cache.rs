//! Single-threaded signature-keyed eviction cache.
//!
//! [`CacheCore`] implements every cache operation behind `&mut self`. The
//! thread-safe [`SignatureCache`](crate::concurrent::SignatureCache) wraps it
//! in one mutex.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                          CacheCore<V, C, R>                          │
//!   │                                                                      │
//!   │   SignatureIndex ──SlotId──► SlotStore ◄── batch_lru (victims)       │
//!   │         ▲                      │  headers / signatures / bitmap      │
//!   │         └── rebuilt on grow ───┘                                     │
//!   │                                                                      │
//!   │   LogicalClock ──stamp──► header.last_used   (wrap ⇒ all reset to 0) │
//!   │   Releaser ◄── (context, payload) of every freed slot                │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Insert Flow
//!
//! ```text
//!   insert(sig, ctx, payload, opts)
//!     ├─ resident?  !overwrite → AlreadyPresent
//!     │             pinned     → Locked (raised if error_on_overwrite_locked)
//!     │             otherwise  → evict it
//!     ├─ storage or slots over budget → eviction pass
//!     ├─ first free slot, growing up to max_items (none → SlotsExhausted)
//!     └─ stamp, write header + signature, index it
//! ```
//!
//! The storage budget is a soft target: if the eviction pass could not free
//! enough (everything pinned) the insert still proceeds. The slot budget is
//! hard.
//!
//! ## Error Policy
//!
//! Misuse (wrong signature width, release without acquire, removing a pinned
//! item) and bookkeeping violations are *raised*: logged through `tracing`
//! and, with `crash_on_internal_error`, turned into a panic. Either way the
//! operation also returns the error.

use std::fmt;

use crate::builder::CacheConfig;
use crate::ds::{LogicalClock, Stamp};
use crate::error::{CacheError, ConfigError, InsertError, InvariantError};
use crate::metrics::{CacheCounters, CacheStats, MetricsSnapshotProvider};
use crate::policy::batch_lru::{collect_candidates, select_victims, EvictionRequest, Pressure};
use crate::release::{DropReleaser, Releaser};
use crate::store::{
    Freed, GenerationCost, SignatureIndex, SlotHeader, SlotId, SlotStore, StorageCost,
};

/// Lock counts at or above this are reported as a leaked pin.
pub const LOCK_COUNT_SANITY_LIMIT: u32 = 1000;

/// Per-insert parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOptions {
    pub storage_cost: StorageCost,
    pub generation_cost: GenerationCost,
    /// Replace a resident, unpinned item with the same signature.
    pub overwrite: bool,
    /// Start with a lock count of 1; the caller must `release` it.
    pub pinned: bool,
}

impl InsertOptions {
    pub fn new(storage_cost: StorageCost) -> Self {
        Self {
            storage_cost,
            ..Self::default()
        }
    }

    pub fn generation_cost(mut self, cost: GenerationCost) -> Self {
        self.generation_cost = cost;
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }
}

pub struct CacheCore<V, C = (), R = DropReleaser>
where
    R: Releaser<C, V>,
{
    store: SlotStore<C, V>,
    index: SignatureIndex,
    clock: LogicalClock,
    counters: CacheCounters,
    releaser: R,
    max_storage: u64,
    error_on_overwrite_locked: bool,
    crash_on_internal_error: bool,
    verify_on_grow: bool,
}

impl<V, C, R> CacheCore<V, C, R>
where
    R: Releaser<C, V>,
{
    pub(crate) fn new(config: CacheConfig, releaser: R) -> Self {
        Self {
            store: SlotStore::new(config.signature_size, config.max_items),
            index: SignatureIndex::new(),
            clock: LogicalClock::new(config.clock_wrap_at),
            counters: CacheCounters::default(),
            releaser,
            max_storage: config.max_storage,
            error_on_overwrite_locked: config.error_on_overwrite_locked,
            crash_on_internal_error: config.crash_on_internal_error,
            verify_on_grow: config.verify_on_grow,
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Inserts an item, optionally replacing a resident unpinned one.
    ///
    /// On rejection the context and payload are returned inside the error.
    pub fn insert(
        &mut self,
        signature: &[u8],
        context: C,
        payload: V,
        opts: InsertOptions,
    ) -> Result<(), InsertError<C, V>> {
        self.counters.record_insert();
        if let Err(err) = self.check_width(signature) {
            return Err(InsertError::new(err, context, payload));
        }

        if let Some(existing) = self.find(signature) {
            if !opts.overwrite {
                return Err(InsertError::new(CacheError::AlreadyPresent, context, payload));
            }
            if self.lock_count_at(existing) > 0 {
                if self.error_on_overwrite_locked {
                    self.raise(&CacheError::Locked);
                }
                return Err(InsertError::new(CacheError::Locked, context, payload));
            }
            self.evict_slot(existing);
        }

        let storage = u64::from(opts.storage_cost);
        let storage_blown = self.store.total_storage().saturating_add(storage) > self.max_storage;
        let slots_blown = self.store.is_full();
        if slots_blown {
            self.evict_for_space(Pressure::Slots, storage);
        } else if storage_blown {
            self.evict_for_space(Pressure::Storage, storage);
        }
        if (slots_blown || storage_blown)
            && self.store.total_storage().saturating_add(storage) > self.max_storage
        {
            tracing::warn!(
                total_storage = self.store.total_storage(),
                storage_cost = storage,
                max_storage = self.max_storage,
                "insert proceeds over the storage budget"
            );
        }

        let Some(slot) = self.allocate_slot() else {
            tracing::warn!(
                max_items = self.store.max_items(),
                "insert rejected: every slot is pinned"
            );
            return Err(InsertError::new(CacheError::SlotsExhausted, context, payload));
        };

        let last_used = self.next_stamp();
        self.store.occupy(
            SlotHeader {
                context,
                payload,
                generation_cost: opts.generation_cost,
                storage_cost: opts.storage_cost,
                last_used,
                slot,
                lock_count: u32::from(opts.pinned),
            },
            signature,
        );
        if let Err(err) = self.index.insert(slot, self.store.signatures()) {
            self.raise(&err.into());
        }
        Ok(())
    }

    /// Reports whether `signature` is resident. With `touch` the item's
    /// recency is refreshed and the lookup counts as a read.
    pub fn check_exists(&mut self, signature: &[u8], touch: bool) -> bool {
        self.lookup(signature, touch).is_some()
    }

    /// [`check_exists`](Self::check_exists) over many signatures.
    pub fn check_exists_batch<S: AsRef<[u8]>>(&mut self, signatures: &[S], touch: bool) -> Vec<bool> {
        signatures
            .iter()
            .map(|sig| self.check_exists(sig.as_ref(), touch))
            .collect()
    }

    /// Pins the item and returns a clone of its payload.
    ///
    /// Every successful acquire must be paired with a [`release`](Self::release).
    pub fn acquire(&mut self, signature: &[u8]) -> Option<V>
    where
        V: Clone,
    {
        self.acquire_with(signature, V::clone)
    }

    /// Pins the item and runs `f` on its payload.
    pub fn acquire_with<T>(&mut self, signature: &[u8], f: impl FnOnce(&V) -> T) -> Option<T> {
        let slot = self.lookup(signature, true)?;
        let header = self.store.get_mut(slot)?;
        header.lock_count += 1;
        let lock_count = header.lock_count;
        let out = f(&header.payload);
        if lock_count >= LOCK_COUNT_SANITY_LIMIT {
            self.raise(&CacheError::Inconsistent(InvariantError::new(format!(
                "slot {} lock count {} reached {}",
                slot.index(),
                lock_count,
                LOCK_COUNT_SANITY_LIMIT
            ))));
        }
        Some(out)
    }

    /// Drops one pin taken by [`acquire`](Self::acquire) or a pinned insert.
    pub fn release(&mut self, signature: &[u8]) -> Result<(), CacheError> {
        self.check_width(signature)?;
        let Some(slot) = self.find(signature) else {
            return Err(self.raised(CacheError::NotFound));
        };
        match self.store.get(slot).map(|h| h.lock_count) {
            Some(0) => Err(self.raised(CacheError::NotPinned)),
            Some(_) => {
                if let Some(header) = self.store.get_mut(slot) {
                    header.lock_count -= 1;
                }
                Ok(())
            },
            None => Err(self.raised(CacheError::Inconsistent(InvariantError::new(format!(
                "indexed slot {} is free",
                slot.index()
            ))))),
        }
    }

    /// Evicts one unpinned item.
    ///
    /// Absent signatures return [`CacheError::NotFound`]; pinned items are
    /// left alone and raise [`CacheError::Locked`].
    pub fn remove(&mut self, signature: &[u8]) -> Result<(), CacheError> {
        self.check_width(signature)?;
        let slot = self.find(signature).ok_or(CacheError::NotFound)?;
        if self.lock_count_at(slot) > 0 {
            return Err(self.raised(CacheError::Locked));
        }
        self.evict_slot(slot);
        Ok(())
    }

    /// Evicts every unpinned item. Returns `true` if the cache is now empty.
    pub fn remove_all(&mut self) -> bool {
        let unpinned: Vec<SlotId> = self
            .store
            .iter()
            .filter(|h| h.lock_count == 0)
            .map(|h| h.slot)
            .collect();
        for slot in unpinned {
            self.evict_slot(slot);
        }
        let pinned = self.store.len();
        if pinned > 0 {
            tracing::debug!(pinned, "remove_all left pinned items resident");
        }
        pinned == 0
    }

    /// Releases every item (pinned ones included) through the releaser and
    /// returns the cache to its freshly built state. Limits are kept.
    pub fn reset(&mut self) {
        let pinned = self.store.iter().filter(|h| h.lock_count > 0).count();
        if pinned > 0 {
            tracing::warn!(pinned, "reset is releasing pinned items");
        }
        self.release_all();
        self.clock.reset();
        self.counters.reset();
    }

    // -----------------------------------------------------------------------
    // Limits
    // -----------------------------------------------------------------------

    pub fn set_max_storage(&mut self, max_storage: u64) {
        self.max_storage = max_storage;
    }

    /// Raises the item limit. Shrinking below the allocated slot capacity is
    /// rejected.
    pub fn set_max_items(&mut self, max_items: usize) -> Result<(), ConfigError> {
        if max_items == 0 || max_items < self.store.capacity() {
            let err = ConfigError::new(format!(
                "max items {} is below the {} allocated slots",
                max_items,
                self.store.capacity()
            ));
            tracing::warn!(error = %err, "set_max_items rejected");
            return Err(err);
        }
        self.store.set_max_items(max_items);
        Ok(())
    }

    pub fn set_clock_wrap_at(&mut self, wrap_at: Stamp) {
        self.clock.set_wrap_at(wrap_at);
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    pub fn signature_size(&self) -> usize {
        self.store.signatures().width()
    }

    pub fn max_items(&self) -> usize {
        self.store.max_items()
    }

    pub fn max_storage(&self) -> u64 {
        self.max_storage
    }

    /// Number of resident items.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn slot_capacity(&self) -> usize {
        self.store.capacity()
    }

    pub fn total_storage(&self) -> u64 {
        self.store.total_storage()
    }

    pub fn total_generation_time(&self) -> u64 {
        self.store.total_generation()
    }

    /// Current lock count of a resident item, without touching it.
    pub fn lock_count(&self, signature: &[u8]) -> Option<u32> {
        if signature.len() != self.signature_size() {
            return None;
        }
        self.find(signature).map(|slot| self.lock_count_at(slot))
    }

    /// Last recency stamp of a resident item, without touching it.
    pub fn last_used(&self, signature: &[u8]) -> Option<Stamp> {
        if signature.len() != self.signature_size() {
            return None;
        }
        let slot = self.find(signature)?;
        self.store.get(slot).map(|h| h.last_used)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_storage: self.store.total_storage(),
            total_generation_time: self.store.total_generation(),
            slots_used: self.store.len(),
            slot_capacity: self.store.capacity(),
            clock: self.clock.current(),
            clock_wraps: self.clock.wraps(),
            reads: self.counters.reads,
            successful_reads: self.counters.successful_reads,
            inserts: self.counters.inserts,
            eviction_passes: self.counters.eviction_passes,
            evicted_items: self.counters.evicted_items,
            max_items: self.store.max_items(),
            max_storage: self.max_storage,
        }
    }

    /// Logs the stats table at `info` level.
    pub fn dump_stats(&self) {
        let stats = self.stats();
        tracing::info!(target: "gencache::stats", "{}", CacheStats::header());
        tracing::info!(target: "gencache::stats", "{}", stats);
    }

    /// Full consistency check of store, index and clock.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.store.check_invariants()?;
        if self.index.len() != self.store.len() {
            return Err(InvariantError::new(format!(
                "index size {} != slots used {}",
                self.index.len(),
                self.store.len()
            )));
        }
        for header in self.store.iter() {
            let signature = self.store.signature(header.slot);
            match self.index.lookup(signature, self.store.signatures()) {
                Some(slot) if slot == header.slot => {},
                Some(slot) => {
                    return Err(InvariantError::new(format!(
                        "slot {} signature indexed at slot {}",
                        header.slot.index(),
                        slot.index()
                    )));
                },
                None => {
                    return Err(InvariantError::new(format!(
                        "slot {} missing from index",
                        header.slot.index()
                    )));
                },
            }
            if header.lock_count >= LOCK_COUNT_SANITY_LIMIT {
                return Err(InvariantError::new(format!(
                    "slot {} lock count {} reached {}",
                    header.slot.index(),
                    header.lock_count,
                    LOCK_COUNT_SANITY_LIMIT
                )));
            }
            if header.last_used >= self.clock.current() {
                return Err(InvariantError::new(format!(
                    "slot {} last used {} is not before clock {}",
                    header.slot.index(),
                    header.last_used,
                    self.clock.current()
                )));
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn raise(&self, err: &CacheError) {
        if self.crash_on_internal_error {
            panic!("gencache: {err}");
        }
        tracing::error!(error = %err, "cache error raised");
    }

    fn raised(&self, err: CacheError) -> CacheError {
        self.raise(&err);
        err
    }

    fn check_width(&self, signature: &[u8]) -> Result<(), CacheError> {
        let expected = self.signature_size();
        if signature.len() != expected {
            return Err(self.raised(CacheError::SignatureWidth {
                expected,
                actual: signature.len(),
            }));
        }
        Ok(())
    }

    #[inline]
    fn find(&self, signature: &[u8]) -> Option<SlotId> {
        self.index.lookup(signature, self.store.signatures())
    }

    fn lock_count_at(&self, slot: SlotId) -> u32 {
        self.store.get(slot).map_or(0, |h| h.lock_count)
    }

    /// Width-checked lookup; `touch` counts a read and refreshes recency.
    fn lookup(&mut self, signature: &[u8], touch: bool) -> Option<SlotId> {
        self.check_width(signature).ok()?;
        let slot = self.find(signature);
        if touch {
            self.counters.record_read(slot.is_some());
            if let Some(slot) = slot {
                let stamp = self.next_stamp();
                if let Some(header) = self.store.get_mut(slot) {
                    header.last_used = stamp;
                }
            }
        }
        slot
    }

    fn next_stamp(&mut self) -> Stamp {
        let tick = self.clock.tick();
        if tick.wrapped {
            self.store.reset_recency();
            tracing::debug!(wraps = self.clock.wraps(), "recency clock wrapped");
        }
        tick.stamp
    }

    fn allocate_slot(&mut self) -> Option<SlotId> {
        if let Some(slot) = self.store.first_free() {
            return Some(slot);
        }
        if !self.store.grow() {
            return None;
        }
        self.after_grow();
        self.store.first_free()
    }

    fn after_grow(&mut self) {
        tracing::debug!(
            capacity = self.store.capacity(),
            used = self.store.len(),
            "slot store grew"
        );
        if let Err(err) = self
            .index
            .rebuild(self.store.occupied(), self.store.signatures())
        {
            self.raise(&err.into());
        }
        if self.verify_on_grow {
            if let Err(err) = self.check_invariants() {
                self.raise(&err.into());
            }
        }
    }

    /// Hands every resident item to the releaser and empties store and index.
    fn release_all(&mut self) {
        let releaser = &self.releaser;
        self.store
            .drain(|header| releaser.release(header.context, header.payload));
        self.index.clear();
    }

    fn evict_for_space(&mut self, pressure: Pressure, ensure_space_for: u64) {
        self.counters.record_eviction_pass();
        let candidates = collect_candidates(&self.store);
        let available = candidates.len();
        let request = EvictionRequest {
            pressure,
            ensure_space_for,
            max_storage: self.max_storage,
        };
        let victims = select_victims(candidates, &request);
        tracing::trace!(
            ?pressure,
            evicting = victims.len(),
            candidates = available,
            resident = self.store.len(),
            "eviction pass"
        );
        for slot in victims {
            self.evict_slot(slot);
        }
    }

    /// Frees an occupied, unpinned slot and hands its payload to the releaser.
    fn evict_slot(&mut self, slot: SlotId) {
        let removed = self
            .index
            .remove(self.store.signature(slot), self.store.signatures());
        if removed != Some(slot) {
            self.raise(&CacheError::Inconsistent(InvariantError::new(format!(
                "slot {} was not indexed under its signature",
                slot.index()
            ))));
        }
        match self.store.free(slot) {
            Some(Freed { header, underflow }) => {
                debug_assert_eq!(header.lock_count, 0, "evicting a pinned slot");
                self.counters.record_evicted_item();
                self.releaser.release(header.context, header.payload);
                if let Some(err) = underflow {
                    self.raise(&err.into());
                }
            },
            None => self.raise(&CacheError::Inconsistent(InvariantError::new(format!(
                "evicting free slot {}",
                slot.index()
            )))),
        }
    }
}

impl<V, C, R> MetricsSnapshotProvider<CacheStats> for CacheCore<V, C, R>
where
    R: Releaser<C, V>,
{
    fn snapshot(&self) -> CacheStats {
        self.stats()
    }
}

impl<V, C, R> fmt::Debug for CacheCore<V, C, R>
where
    R: Releaser<C, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheCore")
            .field("len", &self.store.len())
            .field("slot_capacity", &self.store.capacity())
            .field("max_items", &self.store.max_items())
            .field("total_storage", &self.store.total_storage())
            .field("max_storage", &self.max_storage)
            .finish_non_exhaustive()
    }
}

impl<V, C, R> Drop for CacheCore<V, C, R>
where
    R: Releaser<C, V>,
{
    fn drop(&mut self) {
        if !self.store.is_empty() {
            tracing::debug!(
                resident = self.store.len(),
                "cache dropped; releasing resident items"
            );
            self.release_all();
        }
    }
}
