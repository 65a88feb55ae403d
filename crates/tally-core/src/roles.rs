// crates/tally-core/src/roles.rs
//
// Role registry: a single owner plus a set of authorized oracles.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::error::TallyError;
use crate::traits::{ensure_owner, AccessControl};

/// Owner and oracle assignments for a runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRegistry {
    owner: AccountId,
    oracles: BTreeSet<AccountId>,
}

impl RoleRegistry {
    pub fn new(owner: AccountId) -> Self {
        Self {
            owner,
            oracles: BTreeSet::new(),
        }
    }

    pub fn with_oracles(owner: AccountId, oracles: impl IntoIterator<Item = AccountId>) -> Self {
        Self {
            owner,
            oracles: oracles.into_iter().collect(),
        }
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    pub fn oracles(&self) -> impl Iterator<Item = &AccountId> {
        self.oracles.iter()
    }

    /// Grant the oracle role. Owner only.
    pub fn add_oracle(&mut self, caller: &AccountId, oracle: AccountId) -> Result<(), TallyError> {
        ensure_owner(&*self, caller)?;
        self.oracles.insert(oracle);
        Ok(())
    }

    /// Revoke the oracle role. Owner only.
    pub fn remove_oracle(&mut self, caller: &AccountId, oracle: &AccountId) -> Result<(), TallyError> {
        ensure_owner(&*self, caller)?;
        if !self.oracles.remove(oracle) {
            return Err(TallyError::NotFound(format!("oracle {}", oracle)));
        }
        Ok(())
    }
}

impl AccessControl for RoleRegistry {
    fn is_owner(&self, caller: &AccountId) -> bool {
        *caller == self.owner
    }

    fn is_authorized_oracle(&self, caller: &AccountId) -> bool {
        self.oracles.contains(caller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ensure_oracle;

    fn registry() -> RoleRegistry {
        RoleRegistry::new(AccountId::new("owner"))
    }

    #[test]
    fn test_owner_check() {
        let roles = registry();
        assert!(roles.is_owner(&AccountId::new("owner")));
        assert!(!roles.is_owner(&AccountId::new("mallory")));
        assert!(ensure_owner(&roles, &AccountId::new("mallory")).is_err());
    }

    #[test]
    fn test_add_and_remove_oracle() {
        let mut roles = registry();
        let owner = AccountId::new("owner");
        let oracle = AccountId::new("oracle-1");
        roles.add_oracle(&owner, oracle.clone()).unwrap();
        assert!(ensure_oracle(&roles, &oracle).is_ok());
        roles.remove_oracle(&owner, &oracle).unwrap();
        assert!(!roles.is_authorized_oracle(&oracle));
        assert!(roles.remove_oracle(&owner, &oracle).is_err());
    }

    #[test]
    fn test_only_owner_grants_oracles() {
        let mut roles = registry();
        let result = roles.add_oracle(&AccountId::new("mallory"), AccountId::new("mallory"));
        assert!(matches!(result, Err(TallyError::Unauthorized(_))));
        assert_eq!(roles.oracles().count(), 0);
    }
}
