pub mod logical_clock;
pub mod occupancy;

pub use logical_clock::{LogicalClock, Stamp, Tick, DEFAULT_WRAP_AT};
pub use occupancy::OccupancyBitmap;
