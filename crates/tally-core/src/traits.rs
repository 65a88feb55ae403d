// crates/tally-core/src/traits.rs

use crate::account::{AccountId, Asset};
use crate::error::TallyError;

/// Multi-asset fungible token collaborator.
///
/// Every call is synchronous and all-or-nothing: on `Err` the ledger is left
/// exactly as it was. Implemented in memory by `tally_economics::token::TokenBank`.
pub trait TokenLedger: Send + Sync {
    /// Balance of `owner` in `asset`. Unknown owners read as zero.
    fn balance_of(&self, asset: &Asset, owner: &AccountId) -> u64;

    /// Remaining amount `spender` may pull from `owner`.
    fn allowance(&self, asset: &Asset, owner: &AccountId, spender: &AccountId) -> u64;

    /// Set (not add to) the allowance of `spender` over `owner`'s balance.
    fn approve(&mut self, asset: &Asset, owner: &AccountId, spender: &AccountId, amount: u64);

    /// Move `amount` from `from` to `to`.
    fn transfer(
        &mut self,
        asset: &Asset,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), TallyError>;

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming allowance.
    fn transfer_from(
        &mut self,
        asset: &Asset,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), TallyError>;

    /// Create `amount` new units for `to`. Only the asset's minter may call this.
    fn mint(
        &mut self,
        asset: &Asset,
        minter: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), TallyError>;

    /// Destroy `amount` units held by `from`. Only the asset's minter may call this.
    fn burn(
        &mut self,
        asset: &Asset,
        burner: &AccountId,
        from: &AccountId,
        amount: u64,
    ) -> Result<(), TallyError>;
}

/// Role checks guarding privileged operations.
///
/// Implemented by `RoleRegistry`.
pub trait AccessControl: Send + Sync {
    /// Whether `caller` may change parameters (rates, ratios, windows).
    fn is_owner(&self, caller: &AccountId) -> bool;

    /// Whether `caller` may report off-ledger activity (task points, activity scores).
    fn is_authorized_oracle(&self, caller: &AccountId) -> bool;
}

/// Monotonic time source: unix seconds or a block counter.
///
/// Used for accrual marks, lock expiries, and streak windows. Read it while
/// holding the runtime's write guard so readings stay ordered with operations.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Fail with `Unauthorized` unless `caller` is the owner.
pub fn ensure_owner(access: &dyn AccessControl, caller: &AccountId) -> Result<(), TallyError> {
    if access.is_owner(caller) {
        Ok(())
    } else {
        Err(TallyError::Unauthorized(format!("{} is not the owner", caller)))
    }
}

/// Fail with `Unauthorized` if `caller` is a contract vault.
///
/// Vault balances only move through their contract.
pub fn ensure_not_vault(caller: &AccountId) -> Result<(), TallyError> {
    if caller.is_vault() {
        Err(TallyError::Unauthorized(format!(
            "{} is a contract vault",
            caller
        )))
    } else {
        Ok(())
    }
}

/// Fail with `Unauthorized` unless `caller` is an authorized oracle.
pub fn ensure_oracle(access: &dyn AccessControl, caller: &AccountId) -> Result<(), TallyError> {
    if access.is_authorized_oracle(caller) {
        Ok(())
    } else {
        Err(TallyError::Unauthorized(format!(
            "{} is not an authorized oracle",
            caller
        )))
    }
}
