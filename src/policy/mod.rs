//! Eviction policies.
//!
//! - [`batch_lru`]: oldest-touched-first batches sized by storage and slot pressure.

pub mod batch_lru;

pub use batch_lru::{Candidate, EvictionRequest, Pressure};
