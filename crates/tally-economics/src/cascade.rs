// crates/tally-economics/src/cascade.rs
//
// Bounded walk up the referral chain.

use tally_core::AccountId;

/// Number of upstream levels that receive a referral bonus.
pub const MAX_CASCADE_DEPTH: usize = 3;

/// Accounts credited when someone registers under `direct`.
///
/// Returns `direct` followed by its referrer and that account's referrer,
/// stopping early where a chain ends. Never more than `MAX_CASCADE_DEPTH`
/// entries regardless of chain length. Referrer edges are set once at
/// registration and always point at an earlier registrant, so the chain
/// cannot cycle.
pub fn upline<F>(direct: &AccountId, mut referrer_of: F) -> Vec<AccountId>
where
    F: FnMut(&AccountId) -> Option<AccountId>,
{
    let mut levels = Vec::with_capacity(MAX_CASCADE_DEPTH);
    let mut current = Some(direct.clone());
    while let Some(account) = current {
        if levels.len() == MAX_CASCADE_DEPTH {
            break;
        }
        current = referrer_of(&account);
        levels.push(account);
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn chain(links: &[(&str, &str)]) -> HashMap<AccountId, AccountId> {
        links
            .iter()
            .map(|(child, parent)| (AccountId::new(*child), AccountId::new(*parent)))
            .collect()
    }

    #[test]
    fn test_walk_stops_at_depth() {
        // A <- B <- C <- D; E registers under D.
        let edges = chain(&[("B", "A"), ("C", "B"), ("D", "C")]);
        let levels = upline(&AccountId::new("D"), |a| edges.get(a).cloned());
        assert_eq!(
            levels,
            vec![AccountId::new("D"), AccountId::new("C"), AccountId::new("B")]
        );
    }

    #[test]
    fn test_short_chain() {
        let edges = chain(&[("B", "A")]);
        let levels = upline(&AccountId::new("B"), |a| edges.get(a).cloned());
        assert_eq!(levels, vec![AccountId::new("B"), AccountId::new("A")]);
    }

    #[test]
    fn test_lookups_bounded() {
        let mut lookups = 0;
        upline(&AccountId::new("x"), |a| {
            lookups += 1;
            Some(AccountId::new(format!("{}'", a)))
        });
        assert_eq!(lookups, MAX_CASCADE_DEPTH);
    }
}
