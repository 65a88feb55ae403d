// crates/tally-economics/src/book.rs
//
// Per-account storage with explicit zero-default semantics.
//
// Reading an account that never interacted yields a zero-valued record
// without inserting anything; the record is materialized on first write.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use tally_core::AccountId;

/// Map from account to record where absent keys read as `P::default()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountBook<P> {
    entries: HashMap<AccountId, P>,
}

impl<P> Default for AccountBook<P> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<P: Default + Clone> AccountBook<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the account's record, zero-valued if it never interacted.
    pub fn get(&self, account: &AccountId) -> P {
        self.entries.get(account).cloned().unwrap_or_default()
    }

    /// Borrow the stored record, `None` if the account never interacted.
    pub fn get_ref(&self, account: &AccountId) -> Option<&P> {
        self.entries.get(account)
    }

    /// Mutable access, inserting a zero-valued record on first write.
    pub fn entry(&mut self, account: &AccountId) -> &mut P {
        self.entries.entry(account.clone()).or_default()
    }

    pub fn contains(&self, account: &AccountId) -> bool {
        self.entries.contains_key(account)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &P)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_does_not_insert() {
        let book: AccountBook<u64> = AccountBook::new();
        assert_eq!(book.get(&AccountId::new("ghost")), 0);
        assert!(book.is_empty());
        assert!(book.get_ref(&AccountId::new("ghost")).is_none());
    }

    #[test]
    fn test_entry_inserts_on_first_write() {
        let mut book: AccountBook<u64> = AccountBook::new();
        let alice = AccountId::new("alice");
        *book.entry(&alice) += 5;
        *book.entry(&alice) += 2;
        assert_eq!(book.get(&alice), 7);
        assert!(book.contains(&alice));
        assert_eq!(book.len(), 1);
    }
}
