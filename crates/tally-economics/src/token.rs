// crates/tally-economics/src/token.rs
//
// In-memory multi-asset token bank and amount formatting.
//
// Every asset has 9 decimals: 1 token = 10^9 base units. All internal
// accounting uses base units to avoid floating-point precision issues.
// Each asset has exactly one minter, the only account allowed to mint or burn.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use tally_core::{AccountId, Asset, TallyError, TokenLedger};

/// Number of decimal places of every asset.
pub const DECIMALS: u32 = 9;

/// Base units in one whole token. 1 token = 10^9 units.
pub const UNITS_PER_TOKEN: u64 = 1_000_000_000;

/// Render a base-unit amount as a decimal token string, trimming trailing zeros.
///
/// ```
/// use tally_economics::token::format_units;
/// assert_eq!(format_units(1_500_000_000), "1.5");
/// ```
pub fn format_units(amount: u64) -> String {
    let whole = amount / UNITS_PER_TOKEN;
    let frac = amount % UNITS_PER_TOKEN;
    if frac == 0 {
        whole.to_string()
    } else {
        let frac_str = format!("{:09}", frac);
        format!("{}.{}", whole, frac_str.trim_end_matches('0'))
    }
}

/// Balances, allowances, and supply of a single asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AssetBook {
    minter: AccountId,
    supply: u64,
    balances: HashMap<AccountId, u64>,
    /// owner -> spender -> remaining allowance
    allowances: HashMap<AccountId, HashMap<AccountId, u64>>,
}

impl AssetBook {
    fn balance(&self, owner: &AccountId) -> u64 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    fn debit(&mut self, owner: &AccountId, amount: u64) -> Result<(), TallyError> {
        let available = self.balance(owner);
        if available < amount {
            return Err(TallyError::Transfer(format!(
                "insufficient balance for {}: requested {} but only {} available",
                owner, amount, available
            )));
        }
        let remaining = available - amount;
        if remaining == 0 {
            self.balances.remove(owner);
        } else {
            self.balances.insert(owner.clone(), remaining);
        }
        Ok(())
    }

    fn credit(&mut self, owner: &AccountId, amount: u64) -> Result<(), TallyError> {
        let updated = self
            .balance(owner)
            .checked_add(amount)
            .ok_or(TallyError::Overflow("token balance"))?;
        self.balances.insert(owner.clone(), updated);
        Ok(())
    }

    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> u64 {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    fn set_allowance(&mut self, owner: &AccountId, spender: &AccountId, amount: u64) {
        if amount == 0 {
            if let Some(spenders) = self.allowances.get_mut(owner) {
                spenders.remove(spender);
                if spenders.is_empty() {
                    self.allowances.remove(owner);
                }
            }
        } else {
            self.allowances
                .entry(owner.clone())
                .or_default()
                .insert(spender.clone(), amount);
        }
    }

    fn ensure_minter(&self, caller: &AccountId, asset: &Asset) -> Result<(), TallyError> {
        if *caller != self.minter {
            return Err(TallyError::Transfer(format!(
                "{} is not the minter of {}",
                caller, asset
            )));
        }
        Ok(())
    }
}

/// The in-memory token collaborator used by the runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenBank {
    assets: BTreeMap<Asset, AssetBook>,
}

impl TokenBank {
    /// Create an empty bank with no assets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new asset with its sole minter.
    ///
    /// # Errors
    /// Returns `TallyError::InvalidParameter` if the asset already exists.
    pub fn register_asset(&mut self, asset: Asset, minter: AccountId) -> Result<(), TallyError> {
        if self.assets.contains_key(&asset) {
            return Err(TallyError::InvalidParameter(format!(
                "asset {} already registered",
                asset
            )));
        }
        self.assets.insert(
            asset,
            AssetBook {
                minter,
                supply: 0,
                balances: HashMap::new(),
                allowances: HashMap::new(),
            },
        );
        Ok(())
    }

    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.keys()
    }

    pub fn total_supply(&self, asset: &Asset) -> u64 {
        self.assets.get(asset).map(|book| book.supply).unwrap_or(0)
    }

    pub fn minter(&self, asset: &Asset) -> Option<&AccountId> {
        self.assets.get(asset).map(|book| &book.minter)
    }

    fn book(&self, asset: &Asset) -> Option<&AssetBook> {
        self.assets.get(asset)
    }

    fn book_mut(&mut self, asset: &Asset) -> Result<&mut AssetBook, TallyError> {
        self.assets
            .get_mut(asset)
            .ok_or_else(|| TallyError::Transfer(format!("unknown asset {}", asset)))
    }
}

impl TokenLedger for TokenBank {
    fn balance_of(&self, asset: &Asset, owner: &AccountId) -> u64 {
        self.book(asset).map(|book| book.balance(owner)).unwrap_or(0)
    }

    fn allowance(&self, asset: &Asset, owner: &AccountId, spender: &AccountId) -> u64 {
        self.book(asset)
            .map(|book| book.allowance(owner, spender))
            .unwrap_or(0)
    }

    fn approve(&mut self, asset: &Asset, owner: &AccountId, spender: &AccountId, amount: u64) {
        if let Ok(book) = self.book_mut(asset) {
            book.set_allowance(owner, spender, amount);
        }
    }

    fn transfer(
        &mut self,
        asset: &Asset,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), TallyError> {
        let book = self.book_mut(asset)?;
        if amount == 0 || from == to {
            return Ok(());
        }
        // Check the credit side first so a failure leaves both balances intact.
        book.balance(to)
            .checked_add(amount)
            .ok_or(TallyError::Overflow("token balance"))?;
        book.debit(from, amount)?;
        book.credit(to, amount)
    }

    fn transfer_from(
        &mut self,
        asset: &Asset,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), TallyError> {
        let allowance = self.allowance(asset, from, spender);
        if allowance < amount {
            return Err(TallyError::Transfer(format!(
                "insufficient allowance: {} may pull {} {} from {} but requested {}",
                spender, allowance, asset, from, amount
            )));
        }
        self.transfer(asset, from, to, amount)?;
        self.book_mut(asset)?
            .set_allowance(from, spender, allowance - amount);
        Ok(())
    }

    fn mint(
        &mut self,
        asset: &Asset,
        minter: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), TallyError> {
        let book = self.book_mut(asset)?;
        book.ensure_minter(minter, asset)?;
        let supply = book
            .supply
            .checked_add(amount)
            .ok_or(TallyError::Overflow("token supply"))?;
        book.credit(to, amount)?;
        book.supply = supply;
        Ok(())
    }

    fn burn(
        &mut self,
        asset: &Asset,
        burner: &AccountId,
        from: &AccountId,
        amount: u64,
    ) -> Result<(), TallyError> {
        let book = self.book_mut(asset)?;
        book.ensure_minter(burner, asset)?;
        book.debit(from, amount)?;
        book.supply -= amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> (TokenBank, Asset, AccountId) {
        let mut bank = TokenBank::new();
        let asset = Asset::new("LP");
        let minter = AccountId::new("owner");
        bank.register_asset(asset.clone(), minter.clone()).unwrap();
        (bank, asset, minter)
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(42 * UNITS_PER_TOKEN), "42");
        assert_eq!(format_units(1_500_000_000), "1.5");
        assert_eq!(format_units(0), "0");
        assert_eq!(format_units(1), "0.000000001");
    }

    #[test]
    fn test_mint_and_transfer() {
        let (mut bank, asset, minter) = bank();
        let alice = AccountId::new("alice");
        let bob = AccountId::new("bob");
        bank.mint(&asset, &minter, &alice, 100).unwrap();
        bank.transfer(&asset, &alice, &bob, 40).unwrap();
        assert_eq!(bank.balance_of(&asset, &alice), 60);
        assert_eq!(bank.balance_of(&asset, &bob), 40);
        assert_eq!(bank.total_supply(&asset), 100);
    }

    #[test]
    fn test_transfer_insufficient_balance_leaves_state() {
        let (mut bank, asset, minter) = bank();
        let alice = AccountId::new("alice");
        bank.mint(&asset, &minter, &alice, 10).unwrap();
        let result = bank.transfer(&asset, &alice, &AccountId::new("bob"), 11);
        assert!(matches!(result, Err(TallyError::Transfer(_))));
        assert_eq!(bank.balance_of(&asset, &alice), 10);
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let (mut bank, asset, minter) = bank();
        let alice = AccountId::new("alice");
        let vault = AccountId::vault("liquidity");
        bank.mint(&asset, &minter, &alice, 100).unwrap();
        bank.approve(&asset, &alice, &vault, 70);

        bank.transfer_from(&asset, &vault, &alice, &vault, 50).unwrap();
        assert_eq!(bank.allowance(&asset, &alice, &vault), 20);
        assert_eq!(bank.balance_of(&asset, &vault), 50);

        assert!(bank.transfer_from(&asset, &vault, &alice, &vault, 21).is_err());
        assert_eq!(bank.allowance(&asset, &alice, &vault), 20);
    }

    #[test]
    fn test_only_minter_mints_and_burns() {
        let (mut bank, asset, minter) = bank();
        let mallory = AccountId::new("mallory");
        assert!(bank.mint(&asset, &mallory, &mallory, 1).is_err());
        bank.mint(&asset, &minter, &mallory, 5).unwrap();
        assert!(bank.burn(&asset, &mallory, &mallory, 5).is_err());
        bank.burn(&asset, &minter, &mallory, 5).unwrap();
        assert_eq!(bank.total_supply(&asset), 0);
    }

    #[test]
    fn test_unknown_asset_fails() {
        let mut bank = TokenBank::new();
        let result = bank.transfer(&Asset::new("NOPE"), &"a".into(), &"b".into(), 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_asset_registration() {
        let (mut bank, asset, minter) = bank();
        assert!(bank.register_asset(asset, minter).is_err());
    }
}
