// crates/tally-core/src/lib.rs
//
// tally-core: Core types, error taxonomy, collaborator traits, and
// fixed-point math for the Tally accrual engine.
//
// This is the leaf crate that all other crates in the workspace depend on.
// All token amounts are u64 base units; per-share accumulators are u128
// scaled by `math::PRECISION`.

pub mod account;
pub mod clock;
pub mod error;
pub mod math;
pub mod roles;
pub mod traits;

// Re-export key types for ergonomic access from downstream crates.
pub use account::{AccountId, Asset};
pub use clock::{ManualClock, SystemClock};
pub use error::{ErrorKind, TallyError};
pub use math::{apply_bp, mul_div, to_u64, BP_DENOMINATOR, PRECISION};
pub use roles::RoleRegistry;
pub use traits::{ensure_not_vault, ensure_oracle, ensure_owner, AccessControl, Clock, TokenLedger};
