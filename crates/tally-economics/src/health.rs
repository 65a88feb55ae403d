// crates/tally-economics/src/health.rs
//
// Borrowing capacity and liquidation arithmetic for collateralized debt.
//
//   max_borrow(collateral) = collateral * 10_000 / collateral_ratio_bp
//   liquidatable           = debt > max_borrow(collateral)
//   seized                 = min(collateral, repay * (10_000 + discount_bp) / 10_000)
//   debt_after             = max(0, debt - repay)
//
// A partial liquidation may leave the position unhealthy; liquidating it
// again is allowed.

use serde::{Deserialize, Serialize};

use tally_core::{apply_bp, mul_div, to_u64, TallyError, BP_DENOMINATOR};

/// Default minimum collateralization: 150%.
pub const DEFAULT_COLLATERAL_RATIO_BP: u64 = 15_000;

/// Default liquidation bonus on seized collateral: 5%.
pub const DEFAULT_LIQUIDATION_DISCOUNT_BP: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionHealthPolicy {
    /// Minimum collateral-to-debt ratio in basis points. At least 10_000.
    pub collateral_ratio_bp: u64,
    /// Extra collateral a liquidator receives per unit repaid, in basis points.
    pub liquidation_discount_bp: u64,
}

/// Result of one liquidation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationOutcome {
    pub collateral_seized: u64,
    pub collateral_after: u64,
    /// Amount the liquidator supplies (burned in full).
    pub repaid: u64,
    pub debt_after: u64,
}

/// Snapshot of a position's standing under the current policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub collateral: u64,
    pub debt: u64,
    pub max_borrow: u64,
    pub liquidatable: bool,
    /// `max_borrow * 10_000 / debt`; below 10_000 means liquidatable. `None` without debt.
    pub health_factor_bp: Option<u64>,
}

impl PositionHealthPolicy {
    /// # Errors
    /// `InvalidParameter` if the ratio is below 100% or the discount above 100%.
    pub fn new(collateral_ratio_bp: u64, liquidation_discount_bp: u64) -> Result<Self, TallyError> {
        let policy = Self {
            collateral_ratio_bp,
            liquidation_discount_bp,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), TallyError> {
        if self.collateral_ratio_bp < BP_DENOMINATOR {
            return Err(TallyError::InvalidParameter(format!(
                "collateral ratio {}bp is below 100%",
                self.collateral_ratio_bp
            )));
        }
        if self.liquidation_discount_bp > BP_DENOMINATOR {
            return Err(TallyError::InvalidParameter(format!(
                "liquidation discount {}bp exceeds 100%",
                self.liquidation_discount_bp
            )));
        }
        Ok(())
    }

    pub fn max_borrow(&self, collateral: u64) -> Result<u64, TallyError> {
        let max = mul_div(
            collateral as u128,
            BP_DENOMINATOR as u128,
            self.collateral_ratio_bp as u128,
        )?;
        to_u64(max, "max borrow")
    }

    pub fn is_liquidatable(&self, collateral: u64, debt: u64) -> Result<bool, TallyError> {
        Ok(debt > self.max_borrow(collateral)?)
    }

    pub fn report(&self, collateral: u64, debt: u64) -> Result<HealthReport, TallyError> {
        let max_borrow = self.max_borrow(collateral)?;
        let health_factor_bp = if debt == 0 {
            None
        } else {
            let factor = mul_div(max_borrow as u128, BP_DENOMINATOR as u128, debt as u128)?;
            Some(u64::try_from(factor).unwrap_or(u64::MAX))
        };
        Ok(HealthReport {
            collateral,
            debt,
            max_borrow,
            liquidatable: debt > max_borrow,
            health_factor_bp,
        })
    }

    /// Fail with `Undercollateralized` if `debt` exceeds the capacity of `collateral`.
    pub fn ensure_healthy(&self, collateral: u64, debt: u64) -> Result<(), TallyError> {
        let max_borrow = self.max_borrow(collateral)?;
        if debt > max_borrow {
            return Err(TallyError::Undercollateralized { debt, max_borrow });
        }
        Ok(())
    }

    /// Liquidation arithmetic for a repayment of `repay`.
    ///
    /// # Errors
    /// `ZeroAmount` if `repay` is zero; `NotLiquidatable` if the position is healthy.
    pub fn liquidate(
        &self,
        collateral: u64,
        debt: u64,
        repay: u64,
    ) -> Result<LiquidationOutcome, TallyError> {
        if repay == 0 {
            return Err(TallyError::ZeroAmount);
        }
        let max_borrow = self.max_borrow(collateral)?;
        if debt <= max_borrow {
            return Err(TallyError::NotLiquidatable { debt, max_borrow });
        }
        let bonus_bp = BP_DENOMINATOR
            .checked_add(self.liquidation_discount_bp)
            .ok_or(TallyError::Overflow("liquidation bonus"))?;
        let with_bonus = apply_bp(repay, bonus_bp)?;
        let collateral_seized = collateral.min(with_bonus);
        Ok(LiquidationOutcome {
            collateral_seized,
            collateral_after: collateral - collateral_seized,
            repaid: repay,
            debt_after: debt.saturating_sub(repay),
        })
    }
}

impl Default for PositionHealthPolicy {
    fn default() -> Self {
        Self {
            collateral_ratio_bp: DEFAULT_COLLATERAL_RATIO_BP,
            liquidation_discount_bp: DEFAULT_LIQUIDATION_DISCOUNT_BP,
        }
    }
}
