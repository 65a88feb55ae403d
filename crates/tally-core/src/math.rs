// crates/tally-core/src/math.rs
//
// Fixed-point helpers shared by every ledger.
//
// Accumulators are u128 scaled by PRECISION. Products of two u128 values are
// formed in a 256-bit intermediate so that `a * b / d` only fails when the
// final quotient itself does not fit in u128.

use primitive_types::U256;

use crate::error::TallyError;

/// Fixed-point scale of every per-share accumulator (1e12).
pub const PRECISION: u128 = 1_000_000_000_000;

/// Denominator for basis-point ratios (10_000 bp = 100%).
pub const BP_DENOMINATOR: u64 = 10_000;

/// Compute `a * b / denominator`, truncating.
///
/// # Errors
/// Returns `TallyError::Overflow` if `denominator` is zero or the quotient
/// exceeds `u128::MAX`.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128, TallyError> {
    if denominator == 0 {
        return Err(TallyError::Overflow("mul_div: zero denominator"));
    }
    let quotient = U256::from(a) * U256::from(b) / U256::from(denominator);
    if quotient > U256::from(u128::MAX) {
        return Err(TallyError::Overflow("mul_div"));
    }
    Ok(quotient.as_u128())
}

/// Narrow a u128 to a u64 token amount.
pub fn to_u64(value: u128, context: &'static str) -> Result<u64, TallyError> {
    u64::try_from(value).map_err(|_| TallyError::Overflow(context))
}

/// Apply a basis-point ratio to an amount: `amount * bp / 10_000`, truncating.
pub fn apply_bp(amount: u64, bp: u64) -> Result<u64, TallyError> {
    let scaled = mul_div(amount as u128, bp as u128, BP_DENOMINATOR as u128)?;
    to_u64(scaled, "apply_bp")
}
