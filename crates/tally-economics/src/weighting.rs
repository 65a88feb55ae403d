// crates/tally-economics/src/weighting.rs
//
// Lock-duration tiers and effective stake weight.
//
// A deposit locked for at least a tier's minimum duration earns that tier's
// multiplier (in basis points). Durations below the shortest tier are
// rejected. Default tiers:
//   - 90 days:  1.2x (12_000 bp)
//   - 180 days: 1.5x (15_000 bp)
//   - 365 days: 2.0x (20_000 bp)

use serde::{Deserialize, Serialize};

use tally_core::{mul_div, TallyError, BP_DENOMINATOR};

/// Seconds in one day.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// One step of the tier schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockTier {
    /// Shortest lock duration (seconds) that qualifies for this tier.
    pub min_duration: u64,
    /// Weight multiplier in basis points (10_000 = 1.0x).
    pub multiplier_bp: u64,
}

/// Step function from lock duration to multiplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSchedule {
    /// Sorted by `min_duration`, strictly increasing.
    tiers: Vec<LockTier>,
}

impl TierSchedule {
    /// Build a schedule from tiers in any order.
    ///
    /// # Errors
    /// `InvalidParameter` if the list is empty, two tiers share a minimum
    /// duration, or a multiplier is zero.
    pub fn new(mut tiers: Vec<LockTier>) -> Result<Self, TallyError> {
        if tiers.is_empty() {
            return Err(TallyError::InvalidParameter(
                "tier schedule needs at least one tier".to_string(),
            ));
        }
        tiers.sort_by_key(|t| t.min_duration);
        for pair in tiers.windows(2) {
            if pair[0].min_duration == pair[1].min_duration {
                return Err(TallyError::InvalidParameter(format!(
                    "duplicate tier boundary {}",
                    pair[0].min_duration
                )));
            }
        }
        if let Some(tier) = tiers.iter().find(|t| t.multiplier_bp == 0) {
            return Err(TallyError::InvalidParameter(format!(
                "tier at {}s has a zero multiplier",
                tier.min_duration
            )));
        }
        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[LockTier] {
        &self.tiers
    }

    /// Multiplier of the longest tier whose minimum `duration` reaches.
    ///
    /// # Errors
    /// `InvalidLockDuration` if `duration` is shorter than every tier.
    pub fn multiplier_for(&self, duration: u64) -> Result<u64, TallyError> {
        self.tiers
            .iter()
            .rev()
            .find(|t| duration >= t.min_duration)
            .map(|t| t.multiplier_bp)
            .ok_or(TallyError::InvalidLockDuration(duration))
    }
}

impl Default for TierSchedule {
    fn default() -> Self {
        Self {
            tiers: vec![
                LockTier {
                    min_duration: 90 * SECONDS_PER_DAY,
                    multiplier_bp: 12_000,
                },
                LockTier {
                    min_duration: 180 * SECONDS_PER_DAY,
                    multiplier_bp: 15_000,
                },
                LockTier {
                    min_duration: 365 * SECONDS_PER_DAY,
                    multiplier_bp: 20_000,
                },
            ],
        }
    }
}

/// `raw_amount * multiplier_bp / 10_000`, truncating.
pub fn effective_weight(raw_amount: u64, multiplier_bp: u64) -> Result<u128, TallyError> {
    mul_div(
        raw_amount as u128,
        multiplier_bp as u128,
        BP_DENOMINATOR as u128,
    )
}

/// The locked principal of one account and the multiplier applied to all of it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockTerms {
    pub raw_amount: u64,
    pub multiplier_bp: u64,
    /// Principal cannot be withdrawn before this time.
    pub lock_expiry: u64,
}

impl LockTerms {
    /// Terms after adding `amount` locked until `new_expiry` at `multiplier_bp`.
    ///
    /// The raw amount is always additive. The multiplier is not blended: the
    /// new tier applies to the whole cumulative amount only when the new
    /// expiry is later than the current one, otherwise the current tier and
    /// expiry stay.
    pub fn combine(
        &self,
        amount: u64,
        multiplier_bp: u64,
        new_expiry: u64,
    ) -> Result<LockTerms, TallyError> {
        let raw_amount = self
            .raw_amount
            .checked_add(amount)
            .ok_or(TallyError::Overflow("locked principal"))?;
        let (multiplier_bp, lock_expiry) = if new_expiry > self.lock_expiry {
            (multiplier_bp, new_expiry)
        } else {
            (self.multiplier_bp, self.lock_expiry)
        };
        Ok(LockTerms {
            raw_amount,
            multiplier_bp,
            lock_expiry,
        })
    }

    pub fn weight(&self) -> Result<u128, TallyError> {
        effective_weight(self.raw_amount, self.multiplier_bp)
    }

    pub fn is_locked(&self, now: u64) -> bool {
        now < self.lock_expiry
    }
}
