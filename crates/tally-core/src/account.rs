// crates/tally-core/src/account.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an account (a user, a contract vault, an oracle).
///
/// Opaque to the engine: any non-empty string is accepted. Contract vaults
/// use the `vault:` prefix by convention so they never collide with user ids
/// handed out by the front end.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Vault account owned by the named contract.
    pub fn vault(contract: &str) -> Self {
        Self(format!("vault:{}", contract))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_vault(&self) -> bool {
        self.0.starts_with("vault:")
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Symbol of a fungible token held in the token ledger (e.g. "LP", "STABLE").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Asset(String);

impl Asset {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn symbol(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Asset {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_vault_prefix() {
        let vault = AccountId::vault("liquidity");
        assert_eq!(vault.as_str(), "vault:liquidity");
        assert!(vault.is_vault());
        assert!(!AccountId::new("alice").is_vault());
    }

    #[test]
    fn test_vaults_cannot_act_as_callers() {
        let err = crate::traits::ensure_not_vault(&AccountId::vault("referral")).unwrap_err();
        assert_eq!(
            err,
            crate::error::TallyError::Unauthorized("vault:referral is a contract vault".to_string())
        );
        assert!(crate::traits::ensure_not_vault(&AccountId::new("alice")).is_ok());
    }

    #[test]
    fn test_account_id_as_json_map_key() {
        let mut map = HashMap::new();
        map.insert(AccountId::new("alice"), 7u64);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"alice":7}"#);
        let back: HashMap<AccountId, u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(&AccountId::new("alice")), Some(&7));
    }
}
