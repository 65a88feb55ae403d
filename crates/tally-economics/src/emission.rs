// crates/tally-economics/src/emission.rs
//
// Time-based reward emission with optional halving.
//
// A schedule emits `rate_per_sec` base units per second of elapsed time. With
// a halving interval, the rate halves every `halving_interval` seconds after
// genesis:
//   rate(t) = rate_per_sec >> ((t - genesis) / halving_interval)
//
// The emission over an interval is the injected reward handed to
// `AccrualLedger::advance` by time-driven contracts.

use serde::{Deserialize, Serialize};

use tally_core::TallyError;

/// After this many halvings the rate is zero.
pub const MAX_HALVINGS: u64 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionSchedule {
    /// Base units emitted per second before any halving.
    pub rate_per_sec: u64,
    /// Seconds between halvings; `None` for a flat rate.
    pub halving_interval: Option<u64>,
    /// Time from which halvings are counted.
    pub genesis: u64,
}

impl EmissionSchedule {
    pub fn flat(rate_per_sec: u64) -> Self {
        Self {
            rate_per_sec,
            halving_interval: None,
            genesis: 0,
        }
    }

    pub fn halving(rate_per_sec: u64, halving_interval: u64, genesis: u64) -> Self {
        Self {
            rate_per_sec,
            halving_interval: Some(halving_interval).filter(|i| *i > 0),
            genesis,
        }
    }

    fn halvings_at(&self, t: u64, interval: u64) -> u64 {
        t.saturating_sub(self.genesis) / interval
    }

    /// Emission rate in effect at time `t`.
    pub fn rate_at(&self, t: u64) -> u64 {
        match self.halving_interval {
            Some(interval) => {
                let n = self.halvings_at(t, interval);
                if n >= MAX_HALVINGS {
                    0
                } else {
                    self.rate_per_sec >> n
                }
            }
            None => self.rate_per_sec,
        }
    }

    /// Total emission over `[from, to)`.
    ///
    /// Intervals crossing one or more halving boundaries are summed segment by
    /// segment. Returns 0 when `to <= from`.
    pub fn emission_between(&self, from: u64, to: u64) -> Result<u64, TallyError> {
        if to <= from {
            return Ok(0);
        }
        let interval = match self.halving_interval {
            Some(interval) => interval,
            None => {
                return self
                    .rate_per_sec
                    .checked_mul(to - from)
                    .ok_or(TallyError::Overflow("emission"));
            }
        };

        let mut total: u64 = 0;
        let mut current = from;
        while current < to {
            let rate = self.rate_at(current);
            if rate == 0 && current >= self.genesis {
                break;
            }
            let next_boundary = if current < self.genesis {
                self.genesis
            } else {
                (self.halvings_at(current, interval) + 1)
                    .checked_mul(interval)
                    .and_then(|offset| offset.checked_add(self.genesis))
                    .unwrap_or(u64::MAX)
            };
            let segment_end = to.min(next_boundary);
            let segment = rate
                .checked_mul(segment_end - current)
                .ok_or(TallyError::Overflow("emission"))?;
            total = total
                .checked_add(segment)
                .ok_or(TallyError::Overflow("emission"))?;
            current = segment_end;
        }
        Ok(total)
    }
}

impl Default for EmissionSchedule {
    fn default() -> Self {
        Self::flat(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_rate() {
        let schedule = EmissionSchedule::flat(10);
        assert_eq!(schedule.rate_at(1_000_000), 10);
        assert_eq!(schedule.emission_between(0, 10).unwrap(), 100);
        assert_eq!(schedule.emission_between(10, 10).unwrap(), 0);
        assert_eq!(schedule.emission_between(10, 5).unwrap(), 0);
    }

    #[test]
    fn test_rate_halves() {
        let schedule = EmissionSchedule::halving(1_000, 100, 0);
        assert_eq!(schedule.rate_at(0), 1_000);
        assert_eq!(schedule.rate_at(99), 1_000);
        assert_eq!(schedule.rate_at(100), 500);
        assert_eq!(schedule.rate_at(200), 250);
        assert_eq!(schedule.rate_at(100 * MAX_HALVINGS), 0);
    }

    #[test]
    fn test_emission_across_halving_boundary() {
        let schedule = EmissionSchedule::halving(1_000, 100, 0);
        // 50s at 1000 + 50s at 500
        assert_eq!(schedule.emission_between(50, 150).unwrap(), 75_000);
        // two boundaries: 10s at 1000, 100s at 500, 10s at 250
        assert_eq!(
            schedule.emission_between(90, 210).unwrap(),
            10_000 + 50_000 + 2_500
        );
    }

    #[test]
    fn test_halving_counted_from_genesis() {
        let schedule = EmissionSchedule::halving(8, 10, 1_000);
        assert_eq!(schedule.rate_at(500), 8);
        assert_eq!(schedule.rate_at(1_010), 4);
        assert_eq!(schedule.emission_between(995, 1_015).unwrap(), 5 * 8 + 10 * 8 + 5 * 4);
    }

    #[test]
    fn test_zero_interval_is_flat() {
        let schedule = EmissionSchedule::halving(3, 0, 0);
        assert_eq!(schedule.halving_interval, None);
        assert_eq!(schedule.emission_between(0, 1_000_000).unwrap(), 3_000_000);
    }

    #[test]
    fn test_overflow_is_reported() {
        let schedule = EmissionSchedule::flat(u64::MAX);
        assert_eq!(
            schedule.emission_between(0, 2),
            Err(TallyError::Overflow("emission"))
        );
    }
}
