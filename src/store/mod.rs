//! Slot storage and the signature index that points into it.

pub mod index;
pub mod slots;

pub use index::SignatureIndex;
pub use slots::{Freed, GenerationCost, SignatureArena, SlotHeader, SlotId, SlotStore, StorageCost};
