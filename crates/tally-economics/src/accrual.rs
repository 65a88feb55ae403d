// crates/tally-economics/src/accrual.rs
//
// The accrual ledger shared by every contract.
//
// A global accumulator (`acc_per_share`, scaled by PRECISION) grows with each
// injected reward divided by the total weighted stake. Each position carries
// a checkpoint ("reward debt") equal to its weight times the accumulator at
// its last settlement; pending entitlement is the difference.
//
// Every mutating operation must run in this order:
//
//   advance -> settle (and pay or credit the pending amount)
//           -> mutate weight / total -> resync checkpoint
//
// Mutating a weight before settling silently moves rewards between the old
// and the new weight. `reweight` performs the last two steps together.

use serde::{Deserialize, Serialize};

use tally_core::{mul_div, to_u64, TallyError, PRECISION};

/// Global accumulator state of one ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalAccrualState {
    /// Cumulative entitlement per unit of weight since genesis, scaled by PRECISION.
    /// Never decreases.
    pub acc_per_share: u128,
    /// Sum of all position weights; denominator of each accumulator step.
    pub total_weighted_stake: u128,
    /// Timestamp, block height, or cumulative-injection counter of the last advance.
    pub last_accrual_mark: u64,
}

/// One account's stake in a ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPosition {
    /// Principal deposited, in base units.
    pub raw_amount: u64,
    /// Effective weight used for accrual (raw amount, or raw amount times a multiplier).
    pub weight: u128,
    /// `weight * acc_per_share / PRECISION` as of the last settlement.
    pub checkpoint: u128,
}

impl AccountPosition {
    pub fn is_empty(&self) -> bool {
        self.raw_amount == 0 && self.weight == 0 && self.checkpoint == 0
    }
}

/// What an `advance` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The mark was not ahead of the last mark; nothing changed.
    Stale,
    /// No stake existed over the interval; the mark moved and the reward was dropped.
    Forfeited { amount: u64 },
    /// The accumulator grew by `per_share_delta`.
    Distributed { amount: u64, per_share_delta: u128 },
}

/// Accumulator-per-share ledger.
///
/// Holds only global state. Positions live in the owning contract and are
/// passed in by reference, so one contract can keep several ledgers over the
/// same accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualLedger {
    state: GlobalAccrualState,
    /// Rewards that entered the accumulator.
    total_injected: u128,
    /// Rewards dropped because the total weighted stake was zero.
    total_forfeited: u128,
}

impl AccrualLedger {
    /// Create a ledger whose first interval starts at `genesis_mark`.
    pub fn new(genesis_mark: u64) -> Self {
        Self {
            state: GlobalAccrualState {
                last_accrual_mark: genesis_mark,
                ..GlobalAccrualState::default()
            },
            total_injected: 0,
            total_forfeited: 0,
        }
    }

    pub fn state(&self) -> &GlobalAccrualState {
        &self.state
    }

    pub fn total_injected(&self) -> u128 {
        self.total_injected
    }

    pub fn total_forfeited(&self) -> u128 {
        self.total_forfeited
    }

    /// Fold the reward accrued up to `mark` into the accumulator.
    ///
    /// - `mark <= last_accrual_mark`: no-op.
    /// - zero total weighted stake: the mark moves, `injected` is dropped.
    /// - otherwise `acc_per_share += injected * PRECISION / total_weighted_stake`,
    ///   truncating; the remainder is not carried forward.
    pub fn advance(&mut self, mark: u64, injected: u64) -> Result<Advance, TallyError> {
        if mark <= self.state.last_accrual_mark {
            return Ok(Advance::Stale);
        }

        if self.state.total_weighted_stake == 0 {
            let forfeited = self
                .total_forfeited
                .checked_add(injected as u128)
                .ok_or(TallyError::Overflow("total forfeited"))?;
            self.state.last_accrual_mark = mark;
            self.total_forfeited = forfeited;
            if injected > 0 {
                tracing::debug!(mark, injected, "No weighted stake; interval reward forfeited");
            }
            return Ok(Advance::Forfeited { amount: injected });
        }

        let per_share_delta = mul_div(
            injected as u128,
            PRECISION,
            self.state.total_weighted_stake,
        )?;
        let acc_per_share = self
            .state
            .acc_per_share
            .checked_add(per_share_delta)
            .ok_or(TallyError::Overflow("acc_per_share"))?;
        let total_injected = self
            .total_injected
            .checked_add(injected as u128)
            .ok_or(TallyError::Overflow("total injected"))?;

        self.state.acc_per_share = acc_per_share;
        self.state.last_accrual_mark = mark;
        self.total_injected = total_injected;

        Ok(Advance::Distributed {
            amount: injected,
            per_share_delta,
        })
    }

    /// Pending entitlement of `position` against the current accumulator.
    ///
    /// Call right after `advance` and before touching the weight. Does not
    /// modify anything; the caller pays or credits the amount and then calls
    /// `resync` (or `reweight`).
    ///
    /// # Errors
    /// `TallyError::Invariant` if the checkpoint exceeds the accrued amount,
    /// which means a weight was changed without a resync.
    pub fn settle(&self, position: &AccountPosition) -> Result<u64, TallyError> {
        let accrued = mul_div(position.weight, self.state.acc_per_share, PRECISION)?;
        let pending = accrued.checked_sub(position.checkpoint).ok_or_else(|| {
            TallyError::Invariant(format!(
                "negative pending entitlement: checkpoint {} exceeds accrued {}",
                position.checkpoint, accrued
            ))
        })?;
        to_u64(pending, "pending entitlement")
    }

    /// Mark everything accrued so far as accounted for.
    pub fn resync(&self, position: &mut AccountPosition) -> Result<(), TallyError> {
        position.checkpoint = mul_div(position.weight, self.state.acc_per_share, PRECISION)?;
        Ok(())
    }

    /// Replace the position's weight, keep the total in step, and resync.
    ///
    /// Only call after the position has been settled at the current accumulator.
    pub fn reweight(
        &mut self,
        position: &mut AccountPosition,
        new_weight: u128,
    ) -> Result<(), TallyError> {
        let without = self
            .state
            .total_weighted_stake
            .checked_sub(position.weight)
            .ok_or_else(|| {
                TallyError::Invariant(format!(
                    "position weight {} exceeds total weighted stake {}",
                    position.weight, self.state.total_weighted_stake
                ))
            })?;
        let total = without
            .checked_add(new_weight)
            .ok_or(TallyError::Overflow("total weighted stake"))?;
        self.state.total_weighted_stake = total;
        position.weight = new_weight;
        self.resync(position)
    }

    /// Pending entitlement as it would be after `advance(mark, injected)`,
    /// computed on a copy.
    pub fn preview(
        &self,
        mark: u64,
        injected: u64,
        position: &AccountPosition,
    ) -> Result<u64, TallyError> {
        let mut simulated = self.clone();
        simulated.advance(mark, injected)?;
        simulated.settle(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Settle and resync a position at a new weight, the way contracts do.
    fn set_weight(
        ledger: &mut AccrualLedger,
        position: &mut AccountPosition,
        weight: u128,
    ) -> u64 {
        let pending = ledger.settle(position).unwrap();
        ledger.reweight(position, weight).unwrap();
        pending
    }

    #[test]
    fn test_single_depositor_receives_injected_reward() {
        // 1000 units at the 2x tier: weight 2000.
        let mut ledger = AccrualLedger::new(0);
        let mut alice = AccountPosition {
            raw_amount: 1000,
            ..AccountPosition::default()
        };
        ledger.advance(0, 0).unwrap();
        set_weight(&mut ledger, &mut alice, 2000);

        let outcome = ledger.advance(10, 100).unwrap();
        assert_eq!(
            outcome,
            Advance::Distributed {
                amount: 100,
                per_share_delta: 100 * PRECISION / 2000
            }
        );
        assert_eq!(ledger.state().acc_per_share, 100 * PRECISION / 2000);
        assert_eq!(ledger.settle(&alice).unwrap(), 100);
    }

    #[test]
    fn test_zero_stake_interval_is_forfeited() {
        let mut ledger = AccrualLedger::new(0);
        let outcome = ledger.advance(50, 500).unwrap();
        assert_eq!(outcome, Advance::Forfeited { amount: 500 });
        assert_eq!(ledger.state().acc_per_share, 0);
        assert_eq!(ledger.state().last_accrual_mark, 50);
        assert_eq!(ledger.total_forfeited(), 500);

        // Stake arriving later does not see the dropped reward.
        let mut bob = AccountPosition::default();
        set_weight(&mut ledger, &mut bob, 10);
        ledger.advance(60, 0).unwrap();
        assert_eq!(ledger.settle(&bob).unwrap(), 0);
    }

    #[test]
    fn test_stale_mark_is_noop() {
        let mut ledger = AccrualLedger::new(100);
        let mut alice = AccountPosition::default();
        set_weight(&mut ledger, &mut alice, 1);
        assert_eq!(ledger.advance(100, 1_000).unwrap(), Advance::Stale);
        assert_eq!(ledger.advance(99, 1_000).unwrap(), Advance::Stale);
        assert_eq!(ledger.state().acc_per_share, 0);
        assert_eq!(ledger.state().last_accrual_mark, 100);
    }

    #[test]
    fn test_deposit_then_withdraw_with_no_elapsed_time_yields_nothing() {
        let mut ledger = AccrualLedger::new(0);
        let mut other = AccountPosition::default();
        set_weight(&mut ledger, &mut other, 500);
        ledger.advance(5, 77).unwrap();

        let mut alice = AccountPosition::default();
        assert_eq!(set_weight(&mut ledger, &mut alice, 300), 0);
        ledger.advance(5, 0).unwrap();
        assert_eq!(set_weight(&mut ledger, &mut alice, 0), 0);
        assert_eq!(ledger.settle(&alice).unwrap(), 0);
        assert_eq!(ledger.state().total_weighted_stake, 500);
    }

    #[test]
    fn test_truncation_remainder_is_lost() {
        let mut ledger = AccrualLedger::new(0);
        let mut alice = AccountPosition::default();
        set_weight(&mut ledger, &mut alice, 3);
        ledger.advance(1, 10).unwrap();
        // 10 * 1e12 / 3 = 3_333_333_333_333; 3 * that / 1e12 = 9.
        assert_eq!(ledger.settle(&alice).unwrap(), 9);
    }

    #[test]
    fn test_weight_change_without_resync_is_detected() {
        let mut ledger = AccrualLedger::new(0);
        let mut alice = AccountPosition::default();
        set_weight(&mut ledger, &mut alice, 100);
        ledger.advance(1, 1_000).unwrap();
        ledger.resync(&mut alice).unwrap();
        // Shrinking the weight behind the ledger's back makes pending negative.
        alice.weight = 50;
        assert!(matches!(
            ledger.settle(&alice),
            Err(TallyError::Invariant(_))
        ));
    }

    #[test]
    fn test_reweight_rejects_weight_above_total() {
        let mut ledger = AccrualLedger::new(0);
        let mut ghost = AccountPosition {
            weight: 10,
            ..AccountPosition::default()
        };
        assert!(matches!(
            ledger.reweight(&mut ghost, 0),
            Err(TallyError::Invariant(_))
        ));
    }

    #[test]
    fn test_preview_does_not_mutate() {
        let mut ledger = AccrualLedger::new(0);
        let mut alice = AccountPosition::default();
        set_weight(&mut ledger, &mut alice, 1_000);
        let before = ledger.clone();
        assert_eq!(ledger.preview(10, 250, &alice).unwrap(), 250);
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_monotonic_and_conserving_under_interleavings() {
        // Deterministic pseudo-random interleaving of weight changes and injections.
        let mut ledger = AccrualLedger::new(0);
        let mut positions = vec![AccountPosition::default(); 5];
        let mut paid: u128 = 0;
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut mark = 0u64;
        let mut last_acc = 0u128;
        let mut operations: u128 = 0;

        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let who = (seed % 5) as usize;
            match (seed >> 8) % 3 {
                0 => {
                    mark += 1 + (seed >> 16) % 10;
                    ledger.advance(mark, (seed >> 24) % 10_000).unwrap();
                }
                1 => {
                    let weight = ((seed >> 32) % 5_000) as u128;
                    paid += set_weight(&mut ledger, &mut positions[who], weight) as u128;
                }
                _ => {
                    paid += ledger.settle(&positions[who]).unwrap() as u128;
                    ledger.resync(&mut positions[who]).unwrap();
                }
            }
            operations += 1;

            assert!(ledger.state().acc_per_share >= last_acc);
            last_acc = ledger.state().acc_per_share;

            let outstanding: u128 = positions
                .iter()
                .map(|p| ledger.settle(p).unwrap() as u128)
                .sum();
            let distributed = (paid + outstanding) as i128;
            // Floored checkpoints drift by less than one unit per segment.
            let drift = (ledger.total_injected() as i128 - distributed).abs();
            assert!(drift <= operations as i128);
        }

        let total: u128 = positions.iter().map(|p| p.weight).sum();
        assert_eq!(total, ledger.state().total_weighted_stake);
    }
}
