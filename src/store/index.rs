//! Signature index: signature bytes → slot id.
//!
//! The table stores only [`SlotId`]s. Hashing and equality read the signature
//! bytes out of the [`SignatureArena`], so a signature is held exactly once,
//! in its slot. Every call takes the arena the ids refer to.
//!
//! ```text
//!   lookup(sig) ──► fx(sig) ──► table bucket ──► [SlotId] ──► arena.get(id) == sig ?
//! ```

use std::hash::Hasher;

use hashbrown::HashTable;
use rustc_hash::FxHasher;

use crate::error::InvariantError;
use crate::store::slots::{SignatureArena, SlotId};

#[inline]
fn hash_signature(signature: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(signature);
    hasher.finish()
}

#[derive(Debug, Default)]
pub struct SignatureIndex {
    table: HashTable<SlotId>,
}

impl SignatureIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn lookup(&self, signature: &[u8], arena: &SignatureArena) -> Option<SlotId> {
        self.table
            .find(hash_signature(signature), |&slot| arena.get(slot) == signature)
            .copied()
    }

    /// Maps the signature already written at `slot` to `slot`.
    ///
    /// Returns an error if the signature is already mapped.
    pub fn insert(&mut self, slot: SlotId, arena: &SignatureArena) -> Result<(), InvariantError> {
        let signature = arena.get(slot);
        let hash = hash_signature(signature);
        if let Some(&existing) = self.table.find(hash, |&s| arena.get(s) == signature) {
            return Err(InvariantError::new(format!(
                "signature for slot {} already mapped to slot {}",
                slot.index(),
                existing.index()
            )));
        }
        self.table
            .insert_unique(hash, slot, |&s| hash_signature(arena.get(s)));
        Ok(())
    }

    pub fn remove(&mut self, signature: &[u8], arena: &SignatureArena) -> Option<SlotId> {
        match self
            .table
            .find_entry(hash_signature(signature), |&slot| arena.get(slot) == signature)
        {
            Ok(entry) => Some(entry.remove().0),
            Err(_) => None,
        }
    }

    /// Discards every mapping and re-hashes the given occupied slots.
    pub fn rebuild(
        &mut self,
        occupied: impl Iterator<Item = SlotId>,
        arena: &SignatureArena,
    ) -> Result<(), InvariantError> {
        self.table.clear();
        for slot in occupied {
            self.insert(slot, arena)?;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.table = HashTable::new();
    }
}
