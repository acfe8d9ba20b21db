//! Slot store: contiguous slot headers, inline signatures and occupancy.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                           SlotStore<C, V>                            │
//!   │                                                                      │
//!   │   headers:    [ Some(h0) | None | Some(h2) | Some(h3) | None | ... ] │
//!   │   signatures: [  sig0    | .... |  sig2    |  sig3    | .... | ... ] │
//!   │                 └─ width bytes per slot, one contiguous buffer       │
//!   │   occupancy:  [    1     |  0   |    1     |    1     |  0   | ... ] │
//!   │                                                                      │
//!   │   used = 3, total_storage = Σ h.storage_cost, capacity = 16          │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A slot is either free (bit clear, header `None`) or occupied (bit set,
//! header `Some`). Growth doubles capacity (minimum 16, capped at
//! `max_items`) and keeps every slot index stable, so [`SlotId`] handles and
//! the signature bytes they point at survive a grow unchanged.
//!
//! The store knows nothing about the signature index or the releaser; the
//! cache composes those around [`occupy`](SlotStore::occupy) and
//! [`free`](SlotStore::free).

use crate::ds::{OccupancyBitmap, Stamp};
use crate::error::InvariantError;

/// Caller-assigned generation effort of an item.
pub type GenerationCost = u32;
/// Caller-assigned weight charged against the storage budget.
pub type StorageCost = u32;

/// Smallest capacity allocated by the first grow.
pub const MIN_GROW: usize = 16;

/// Stable index of a slot in the [`SlotStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub(crate) usize);

impl SlotId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Per-item bookkeeping stored in an occupied slot.
#[derive(Debug)]
pub struct SlotHeader<C, V> {
    pub context: C,
    pub payload: V,
    pub generation_cost: GenerationCost,
    pub storage_cost: StorageCost,
    pub last_used: Stamp,
    pub slot: SlotId,
    pub lock_count: u32,
}

/// Fixed-width signature bytes for every allocated slot, stored back to back.
#[derive(Debug, Clone)]
pub struct SignatureArena {
    width: usize,
    bytes: Vec<u8>,
}

impl SignatureArena {
    fn new(width: usize) -> Self {
        Self {
            width,
            bytes: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Signature bytes recorded for `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is beyond the allocated capacity.
    #[inline]
    pub fn get(&self, slot: SlotId) -> &[u8] {
        let start = slot.0 * self.width;
        &self.bytes[start..start + self.width]
    }

    fn write(&mut self, slot: SlotId, signature: &[u8]) {
        let start = slot.0 * self.width;
        self.bytes[start..start + self.width].copy_from_slice(signature);
    }

    fn resize(&mut self, slots: usize) {
        self.bytes.resize(slots * self.width, 0);
    }

    fn clear(&mut self) {
        self.bytes = Vec::new();
    }
}

/// A header taken out of a slot by [`SlotStore::free`].
#[derive(Debug)]
pub struct Freed<C, V> {
    pub header: SlotHeader<C, V>,
    /// Set when the aggregate totals were smaller than the freed costs.
    pub underflow: Option<InvariantError>,
}

#[derive(Debug)]
pub struct SlotStore<C, V> {
    headers: Vec<Option<SlotHeader<C, V>>>,
    signatures: SignatureArena,
    occupancy: OccupancyBitmap,
    max_items: usize,
    used: usize,
    total_storage: u64,
    total_generation: u64,
}

impl<C, V> SlotStore<C, V> {
    pub fn new(signature_width: usize, max_items: usize) -> Self {
        Self {
            headers: Vec::new(),
            signatures: SignatureArena::new(signature_width),
            occupancy: OccupancyBitmap::new(),
            max_items,
            used: 0,
            total_storage: 0,
            total_generation: 0,
        }
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Number of allocated slots (occupied or free).
    pub fn capacity(&self) -> usize {
        self.occupancy.len()
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    pub fn set_max_items(&mut self, max_items: usize) {
        self.max_items = max_items;
    }

    pub fn total_storage(&self) -> u64 {
        self.total_storage
    }

    pub fn total_generation(&self) -> u64 {
        self.total_generation
    }

    pub fn signatures(&self) -> &SignatureArena {
        &self.signatures
    }

    pub fn signature(&self, slot: SlotId) -> &[u8] {
        self.signatures.get(slot)
    }

    pub fn get(&self, slot: SlotId) -> Option<&SlotHeader<C, V>> {
        self.headers.get(slot.0).and_then(|h| h.as_ref())
    }

    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut SlotHeader<C, V>> {
        self.headers.get_mut(slot.0).and_then(|h| h.as_mut())
    }

    /// First free slot without growing.
    pub fn first_free(&self) -> Option<SlotId> {
        self.occupancy.first_clear().map(SlotId)
    }

    /// Returns `true` when every allocated slot is occupied and growth is capped.
    pub fn is_full(&self) -> bool {
        self.used >= self.max_items
    }

    /// Extends capacity to `max(16, 2 * capacity)`, capped at `max_items`.
    ///
    /// Returns `false` when already at `max_items`. Existing slots keep their
    /// index and signature bytes.
    pub fn grow(&mut self) -> bool {
        let current = self.capacity();
        if current >= self.max_items {
            return false;
        }
        let next = (current * 2).max(MIN_GROW).min(self.max_items);
        self.headers.reserve_exact(next - current);
        self.headers.resize_with(next, || None);
        self.signatures.resize(next);
        self.occupancy.resize(next);
        true
    }

    /// Writes `header` and `signature` into a free slot and marks it occupied.
    ///
    /// # Panics
    ///
    /// Panics if the slot is not allocated or already occupied, or if the
    /// signature width is wrong.
    pub fn occupy(&mut self, header: SlotHeader<C, V>, signature: &[u8]) {
        let slot = header.slot;
        assert!(
            !self.occupancy.get(slot.0),
            "slot {} is already occupied",
            slot.0
        );
        assert_eq!(signature.len(), self.signatures.width());
        self.total_storage += u64::from(header.storage_cost);
        self.total_generation += u64::from(header.generation_cost);
        self.signatures.write(slot, signature);
        self.headers[slot.0] = Some(header);
        self.occupancy.set(slot.0, true);
        self.used += 1;
    }

    /// Clears the slot and returns its header. The signature bytes stay in
    /// place until the slot is reused.
    ///
    /// A storage or generation total that would drop below zero is clamped
    /// and reported in [`Freed::underflow`].
    pub fn free(&mut self, slot: SlotId) -> Option<Freed<C, V>> {
        let header = self.headers.get_mut(slot.0)?.take()?;
        self.occupancy.set(slot.0, false);
        self.used -= 1;

        let storage = u64::from(header.storage_cost);
        let generation = u64::from(header.generation_cost);
        let underflow = match (
            self.total_storage.checked_sub(storage),
            self.total_generation.checked_sub(generation),
        ) {
            (Some(s), Some(g)) => {
                self.total_storage = s;
                self.total_generation = g;
                None
            },
            (s, g) => {
                let err = InvariantError::new(format!(
                    "freeing slot {} underflows totals (storage {} - {}, generation {} - {})",
                    slot.0, self.total_storage, storage, self.total_generation, generation
                ));
                self.total_storage = s.unwrap_or(0);
                self.total_generation = g.unwrap_or(0);
                Some(err)
            },
        };
        Some(Freed { header, underflow })
    }

    /// Occupied slot ids in ascending order.
    pub fn occupied(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.occupancy.iter_ones().map(SlotId)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlotHeader<C, V>> + '_ {
        self.headers.iter().filter_map(|h| h.as_ref())
    }

    /// Sets `last_used = 0` on every occupied slot.
    pub fn reset_recency(&mut self) {
        for header in self.headers.iter_mut().flatten() {
            header.last_used = 0;
        }
    }

    /// Empties the store, handing every occupied header to `f`, and releases
    /// the slot storage.
    pub fn drain(&mut self, mut f: impl FnMut(SlotHeader<C, V>)) {
        for header in std::mem::take(&mut self.headers).into_iter().flatten() {
            f(header);
        }
        self.signatures.clear();
        self.occupancy.clear();
        self.used = 0;
        self.total_storage = 0;
        self.total_generation = 0;
    }

    /// Verifies occupancy, headers and the aggregate counters agree.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.capacity() > self.max_items {
            return Err(InvariantError::new(format!(
                "allocated slots {} exceed max items {}",
                self.capacity(),
                self.max_items
            )));
        }
        if self.headers.len() != self.capacity() {
            return Err(InvariantError::new(format!(
                "header count {} != bitmap length {}",
                self.headers.len(),
                self.capacity()
            )));
        }
        let bits = self.occupancy.count_ones();
        if bits != self.used {
            return Err(InvariantError::new(format!(
                "occupied bits {} != slots used {}",
                bits, self.used
            )));
        }

        let mut storage = 0u64;
        let mut generation = 0u64;
        for (index, header) in self.headers.iter().enumerate() {
            match (self.occupancy.get(index), header) {
                (true, Some(h)) => {
                    if h.slot.0 != index {
                        return Err(InvariantError::new(format!(
                            "slot {} header records slot {}",
                            index, h.slot.0
                        )));
                    }
                    storage += u64::from(h.storage_cost);
                    generation += u64::from(h.generation_cost);
                },
                (false, None) => {},
                (true, None) => {
                    return Err(InvariantError::new(format!(
                        "slot {index} marked occupied but has no header"
                    )));
                },
                (false, Some(_)) => {
                    return Err(InvariantError::new(format!(
                        "slot {index} marked free but holds a header"
                    )));
                },
            }
        }
        if storage != self.total_storage {
            return Err(InvariantError::new(format!(
                "storage sum {} != total storage {}",
                storage, self.total_storage
            )));
        }
        if generation != self.total_generation {
            return Err(InvariantError::new(format!(
                "generation sum {} != total generation {}",
                generation, self.total_generation
            )));
        }
        Ok(())
    }
}
