//! Wrap-around logical clock issuing recency stamps.
//!
//! Stamps increase by one per tick. Once the counter reaches the configured
//! ceiling it restarts at zero and reports the wrap, so the owner can reset
//! the recency of every resident item in the same step.
//!
//! ```text
//!   tick() ─► current < wrap_at ? ──yes──► Tick { stamp: current, wrapped: false }, current += 1
//!                  │
//!                  no
//!                  ▼
//!             current = 0, wraps += 1
//!             Tick { stamp: 0, wrapped: true }, current = 1
//! ```
//!
//! Relative recency across a wrap boundary is discarded: after a wrap only
//! stamps issued since the wrap order meaningfully against each other.

/// Recency stamp.
pub type Stamp = u32;

/// Default ceiling: a quarter of the stamp range.
pub const DEFAULT_WRAP_AT: Stamp = Stamp::MAX / 4;

/// Result of a single [`LogicalClock::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub stamp: Stamp,
    /// The counter wrapped to zero before issuing `stamp`.
    pub wrapped: bool,
}

#[derive(Debug, Clone)]
pub struct LogicalClock {
    current: Stamp,
    wrap_at: Stamp,
    wraps: u64,
}

impl LogicalClock {
    pub fn new(wrap_at: Stamp) -> Self {
        Self {
            current: 0,
            wrap_at: wrap_at.max(1),
            wraps: 0,
        }
    }

    /// Returns the current counter value and advances it.
    pub fn tick(&mut self) -> Tick {
        let mut wrapped = false;
        if self.current >= self.wrap_at {
            self.current = 0;
            self.wraps += 1;
            wrapped = true;
        }
        let stamp = self.current;
        self.current += 1;
        Tick { stamp, wrapped }
    }

    /// Value the next tick will issue (absent a wrap).
    pub fn current(&self) -> Stamp {
        self.current
    }

    pub fn wrap_at(&self) -> Stamp {
        self.wrap_at
    }

    /// Changes the ceiling. Takes effect on the next tick.
    pub fn set_wrap_at(&mut self, wrap_at: Stamp) {
        self.wrap_at = wrap_at.max(1);
    }

    /// Number of wraps since construction or the last [`reset`](Self::reset).
    pub fn wraps(&self) -> u64 {
        self.wraps
    }

    pub fn reset(&mut self) {
        self.current = 0;
        self.wraps = 0;
    }
}

impl Default for LogicalClock {
    fn default() -> Self {
        Self::new(DEFAULT_WRAP_AT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_are_monotonic_before_wrap() {
        let mut clock = LogicalClock::new(100);
        let stamps: Vec<Stamp> = (0..5).map(|_| clock.tick().stamp).collect();
        assert_eq!(stamps, vec![0, 1, 2, 3, 4]);
        assert_eq!(clock.current(), 5);
        assert_eq!(clock.wraps(), 0);
    }

    #[test]
    fn wraps_at_ceiling() {
        let mut clock = LogicalClock::new(3);
        assert_eq!(clock.tick(), Tick { stamp: 0, wrapped: false });
        assert_eq!(clock.tick(), Tick { stamp: 1, wrapped: false });
        assert_eq!(clock.tick(), Tick { stamp: 2, wrapped: false });
        assert_eq!(clock.tick(), Tick { stamp: 0, wrapped: true });
        assert_eq!(clock.tick(), Tick { stamp: 1, wrapped: false });
        assert_eq!(clock.wraps(), 1);
    }

    #[test]
    fn zero_ceiling_is_clamped() {
        let mut clock = LogicalClock::new(0);
        assert_eq!(clock.wrap_at(), 1);
        assert!(!clock.tick().wrapped);
        assert!(clock.tick().wrapped);
    }

    #[test]
    fn lowering_ceiling_wraps_on_next_tick() {
        let mut clock = LogicalClock::new(1000);
        for _ in 0..10 {
            clock.tick();
        }
        clock.set_wrap_at(5);
        let tick = clock.tick();
        assert!(tick.wrapped);
        assert_eq!(tick.stamp, 0);
    }

    #[test]
    fn reset_clears_counter_and_wraps() {
        let mut clock = LogicalClock::new(2);
        for _ in 0..7 {
            clock.tick();
        }
        assert!(clock.wraps() > 0);
        clock.reset();
        assert_eq!(clock.current(), 0);
        assert_eq!(clock.wraps(), 0);
    }

    #[test]
    fn default_ceiling_is_quarter_range() {
        let clock = LogicalClock::default();
        assert_eq!(clock.wrap_at(), u32::MAX / 4);
    }
}
