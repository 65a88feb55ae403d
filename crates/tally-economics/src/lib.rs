// crates/tally-economics/src/lib.rs
//
// tally-economics: the accrual engine and the contracts built on it.
//
// Shared mechanisms:
//   - accrual:   accumulator-per-share ledger with per-account checkpoints
//   - weighting: lock-duration tiers and effective stake weight
//   - emission:  time-based emission with halving
//   - health:    borrow capacity and liquidation arithmetic
//   - cascade:   bounded referral chain walk
//   - points:    promo windows, streaks, task-point formula
//   - journal:   all-or-nothing execution over the token ledger
//
// Contracts: liquidity, stablecoin, referral, rewards; aggregated by runtime.
//
// All token amounts are u64 base units (1 token = 10^9 units).

pub mod accrual;
pub mod book;
pub mod cascade;
pub mod emission;
pub mod health;
pub mod journal;
pub mod liquidity;
pub mod points;
pub mod referral;
pub mod rewards;
pub mod runtime;
pub mod stablecoin;
pub mod token;
pub mod weighting;

// Re-export key types for ergonomic access from downstream crates.
pub use accrual::{AccountPosition, AccrualLedger, Advance, GlobalAccrualState};
pub use book::AccountBook;
pub use cascade::{upline, MAX_CASCADE_DEPTH};
pub use emission::EmissionSchedule;
pub use health::{HealthReport, LiquidationOutcome, PositionHealthPolicy};
pub use journal::{atomically, Transaction};
pub use liquidity::{LiquidityConfig, LiquidityIncentive};
pub use points::{task_points, PromoWindow, StreakPolicy};
pub use referral::{ReferralConfig, ReferralProgram};
pub use rewards::{RewardManager, RewardManagerConfig};
pub use runtime::{Runtime, RuntimeConfig, RuntimeSummary};
pub use stablecoin::{Stablecoin, StablecoinConfig};
pub use token::{format_units, TokenBank, DECIMALS, UNITS_PER_TOKEN};
pub use weighting::{LockTerms, LockTier, TierSchedule, SECONDS_PER_DAY};
