// crates/tally-core/src/clock.rs
//
// Clock implementations: wall-clock seconds, and a manually driven counter
// used both for block-height mode (advanced by the daemon scheduler) and in
// tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::traits::Clock;

/// Wall-clock time in unix seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

/// A shared counter that only moves when told to.
///
/// Clones share the same counter. `set` refuses to move backwards so the
/// clock stays monotonic.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    ticks: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            ticks: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Advance by `delta` and return the new reading.
    pub fn advance(&self, delta: u64) -> u64 {
        self.ticks.fetch_add(delta, Ordering::SeqCst) + delta
    }

    /// Move to `value` if it is ahead of the current reading.
    pub fn set(&self, value: u64) {
        self.ticks.fetch_max(value, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances_shared_counter() {
        let clock = ManualClock::new(10);
        let other = clock.clone();
        assert_eq!(clock.advance(5), 15);
        assert_eq!(other.now(), 15);
    }

    #[test]
    fn test_manual_clock_never_moves_backwards() {
        let clock = ManualClock::new(100);
        clock.set(50);
        assert_eq!(clock.now(), 100);
        clock.set(120);
        assert_eq!(clock.now(), 120);
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.now() > 1_577_836_800);
    }
}
