// crates/tally-economics/src/journal.rs
//
// All-or-nothing execution of contract operations.
//
// A contract operation touches two kinds of state: the contract's own ledger
// (positions, accumulators) and the external token collaborator. The
// contract state is staged on a clone and only swapped in on success; token
// calls go through a `Transaction` that records an undo entry for every call
// that succeeded, and replays the compensations in reverse on failure.

use tally_core::{AccountId, Asset, TallyError, TokenLedger};

/// Compensation for one successful token call.
#[derive(Debug, Clone)]
enum Undo {
    Transfer {
        asset: Asset,
        from: AccountId,
        to: AccountId,
        amount: u64,
    },
    TransferFrom {
        asset: Asset,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        amount: u64,
        allowance_before: u64,
    },
    Mint {
        asset: Asset,
        minter: AccountId,
        to: AccountId,
        amount: u64,
    },
    Burn {
        asset: Asset,
        burner: AccountId,
        from: AccountId,
        amount: u64,
    },
    Approve {
        asset: Asset,
        owner: AccountId,
        spender: AccountId,
        previous: u64,
    },
}

/// A journaled view over the token collaborator for the duration of one operation.
pub struct Transaction<'a> {
    tokens: &'a mut dyn TokenLedger,
    undo: Vec<Undo>,
}

impl<'a> Transaction<'a> {
    pub fn begin(tokens: &'a mut dyn TokenLedger) -> Self {
        Self {
            tokens,
            undo: Vec::new(),
        }
    }

    pub fn balance_of(&self, asset: &Asset, owner: &AccountId) -> u64 {
        self.tokens.balance_of(asset, owner)
    }

    pub fn allowance(&self, asset: &Asset, owner: &AccountId, spender: &AccountId) -> u64 {
        self.tokens.allowance(asset, owner, spender)
    }

    pub fn approve(&mut self, asset: &Asset, owner: &AccountId, spender: &AccountId, amount: u64) {
        let previous = self.tokens.allowance(asset, owner, spender);
        self.tokens.approve(asset, owner, spender, amount);
        self.undo.push(Undo::Approve {
            asset: asset.clone(),
            owner: owner.clone(),
            spender: spender.clone(),
            previous,
        });
    }

    pub fn transfer(
        &mut self,
        asset: &Asset,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), TallyError> {
        self.tokens.transfer(asset, from, to, amount)?;
        self.undo.push(Undo::Transfer {
            asset: asset.clone(),
            from: from.clone(),
            to: to.clone(),
            amount,
        });
        Ok(())
    }

    pub fn transfer_from(
        &mut self,
        asset: &Asset,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), TallyError> {
        let allowance_before = self.tokens.allowance(asset, from, spender);
        self.tokens.transfer_from(asset, spender, from, to, amount)?;
        self.undo.push(Undo::TransferFrom {
            asset: asset.clone(),
            spender: spender.clone(),
            from: from.clone(),
            to: to.clone(),
            amount,
            allowance_before,
        });
        Ok(())
    }

    pub fn mint(
        &mut self,
        asset: &Asset,
        minter: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), TallyError> {
        self.tokens.mint(asset, minter, to, amount)?;
        self.undo.push(Undo::Mint {
            asset: asset.clone(),
            minter: minter.clone(),
            to: to.clone(),
            amount,
        });
        Ok(())
    }

    pub fn burn(
        &mut self,
        asset: &Asset,
        burner: &AccountId,
        from: &AccountId,
        amount: u64,
    ) -> Result<(), TallyError> {
        self.tokens.burn(asset, burner, from, amount)?;
        self.undo.push(Undo::Burn {
            asset: asset.clone(),
            burner: burner.clone(),
            from: from.clone(),
            amount,
        });
        Ok(())
    }

    /// Number of token calls recorded so far.
    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    /// Keep every recorded token call.
    pub fn commit(self) {}

    /// Undo every recorded token call, newest first.
    ///
    /// Compensations run inside the same serialized region as the calls they
    /// revert, so the funds they move are still where the original call put
    /// them. A failing compensation means the collaborator broke its contract.
    pub fn rollback(self) -> Result<(), TallyError> {
        let Transaction { tokens, undo } = self;
        for entry in undo.into_iter().rev() {
            match entry {
                Undo::Transfer {
                    asset,
                    from,
                    to,
                    amount,
                } => tokens.transfer(&asset, &to, &from, amount)?,
                Undo::TransferFrom {
                    asset,
                    spender,
                    from,
                    to,
                    amount,
                    allowance_before,
                } => {
                    tokens.transfer(&asset, &to, &from, amount)?;
                    tokens.approve(&asset, &from, &spender, allowance_before);
                }
                Undo::Mint {
                    asset,
                    minter,
                    to,
                    amount,
                } => tokens.burn(&asset, &minter, &to, amount)?,
                Undo::Burn {
                    asset,
                    burner,
                    from,
                    amount,
                } => tokens.mint(&asset, &burner, &from, amount)?,
                Undo::Approve {
                    asset,
                    owner,
                    spender,
                    previous,
                } => tokens.approve(&asset, &owner, &spender, previous),
            }
        }
        Ok(())
    }
}

/// Run `op` against a staged copy of `state` inside a token transaction.
///
/// On success the staged state replaces `state` and the token calls stand.
/// On failure the staged state is dropped and the token calls are reverted,
/// so the caller observes either the whole operation or none of it.
///
/// Staging clones the whole contract state on every call, so the cost of an
/// operation grows with the number of tracked accounts.
pub fn atomically<C, R, F>(state: &mut C, tokens: &mut dyn TokenLedger, op: F) -> Result<R, TallyError>
where
    C: Clone,
    F: FnOnce(&mut C, &mut Transaction<'_>) -> Result<R, TallyError>,
{
    let mut staged = state.clone();
    let mut tx = Transaction::begin(tokens);
    match op(&mut staged, &mut tx) {
        Ok(out) => {
            tx.commit();
            *state = staged;
            Ok(out)
        }
        Err(err) => {
            let reverted = tx.len();
            if let Err(undo_err) = tx.rollback() {
                tracing::error!(
                    error = %err,
                    undo_error = %undo_err,
                    "Rollback failed; token ledger may be inconsistent"
                );
                return Err(TallyError::Invariant(format!(
                    "rollback after '{}' failed: {}",
                    err, undo_err
                )));
            }
            if reverted > 0 {
                tracing::warn!(error = %err, reverted, "Operation aborted; token calls reverted");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenBank;

    fn setup() -> (TokenBank, Asset, AccountId, AccountId, AccountId) {
        let mut bank = TokenBank::new();
        let asset = Asset::new("REWARD");
        let minter = AccountId::new("owner");
        let alice = AccountId::new("alice");
        let vault = AccountId::vault("test");
        bank.register_asset(asset.clone(), minter.clone()).unwrap();
        bank.mint(&asset, &minter, &alice, 100).unwrap();
        (bank, asset, minter, alice, vault)
    }

    #[test]
    fn test_commit_keeps_state_and_transfers() {
        let (mut bank, asset, _, alice, vault) = setup();
        let mut counter = 0u64;
        let out = atomically(&mut counter, &mut bank, |c, tx| {
            tx.transfer(&asset, &alice, &vault, 30)?;
            *c += 1;
            Ok(*c)
        })
        .unwrap();
        assert_eq!(out, 1);
        assert_eq!(counter, 1);
        assert_eq!(bank.balance_of(&asset, &vault), 30);
    }

    #[test]
    fn test_failure_reverts_earlier_transfers_and_state() {
        let (mut bank, asset, minter, alice, vault) = setup();
        bank.approve(&asset, &alice, &vault, 50);
        let mut counter = 0u64;
        let result: Result<(), TallyError> = atomically(&mut counter, &mut bank, |c, tx| {
            tx.transfer_from(&asset, &vault, &alice, &vault, 40)?;
            tx.mint(&asset, &minter, &vault, 5)?;
            *c = 99;
            // Fails: alice only has 60 left.
            tx.transfer(&asset, &alice, &vault, 61)
        });
        assert!(result.is_err());
        assert_eq!(counter, 0);
        assert_eq!(bank.balance_of(&asset, &alice), 100);
        assert_eq!(bank.balance_of(&asset, &vault), 0);
        assert_eq!(bank.allowance(&asset, &alice, &vault), 50);
        assert_eq!(bank.total_supply(&asset), 100);
    }

    #[test]
    fn test_burn_and_approve_are_reverted() {
        let (mut bank, asset, minter, alice, vault) = setup();
        let mut unit = ();
        let result: Result<(), TallyError> = atomically(&mut unit, &mut bank, |_, tx| {
            tx.approve(&asset, &alice, &vault, 7);
            tx.burn(&asset, &minter, &alice, 10)?;
            Err(TallyError::NothingToClaim)
        });
        assert_eq!(result, Err(TallyError::NothingToClaim));
        assert_eq!(bank.balance_of(&asset, &alice), 100);
        assert_eq!(bank.allowance(&asset, &alice, &vault), 0);
    }
}
