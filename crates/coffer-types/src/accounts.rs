//! Named pools of real-world funds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::balance::Balance;
use crate::ident::{hash_object, ObjectId};

/// A mapping from account name to balance.
///
/// Names may carry a path-like `/` separator to group subaccounts under an
/// institution, e.g. `citi/checking`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Accounts(BTreeMap<String, Balance>);

impl Accounts {
    /// An empty account listing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Account names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// The balance held by `name`, zero when the account is unknown.
    pub fn balance(&self, name: &str) -> Balance {
        self.0.get(name).cloned().unwrap_or_default()
    }

    /// True when `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Records `balance` for `name`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, balance: Balance) {
        self.0.insert(name.into(), balance);
    }

    /// Removes `name`, returning its balance if it was present.
    pub fn remove(&mut self, name: &str) -> Option<Balance> {
        self.0.remove(name)
    }

    /// Iterates `(name, balance)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Balance)> {
        self.0.iter()
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no accounts are recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of every account balance.
    pub fn total(&self) -> Balance {
        self.0
            .values()
            .fold(Balance::new(), |acc, balance| acc.add(balance))
    }

    /// Content-derived identity over the sorted `name balance` listing.
    pub fn id(&self) -> ObjectId {
        let mut body = String::new();
        for (name, balance) in &self.0 {
            body.push_str(name);
            body.push(' ');
            body.push_str(&balance.canonical_encoding());
            body.push('\n');
        }
        hash_object("accounts", &body)
    }
}

impl FromIterator<(String, Balance)> for Accounts {
    fn from_iter<T: IntoIterator<Item = (String, Balance)>>(iter: T) -> Self {
        Accounts(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_ignores_insertion_order() {
        let mut forward = Accounts::new();
        forward.insert("checking", Balance::parse("USD 100").unwrap());
        forward.insert("savings", Balance::parse("USD 250.50").unwrap());

        let mut backward = Accounts::new();
        backward.insert("savings", Balance::parse("USD 250.50").unwrap());
        backward.insert("checking", Balance::parse("USD 100").unwrap());

        assert_eq!(forward.id(), backward.id());
    }

    #[test]
    fn id_tracks_content() {
        let mut a = Accounts::new();
        a.insert("checking", Balance::parse("USD 100").unwrap());

        let mut b = Accounts::new();
        b.insert("checking", Balance::parse("USD 100.01").unwrap());

        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn total_sums_across_accounts() {
        let mut accounts = Accounts::new();
        accounts.insert("checking", Balance::parse("USD 100").unwrap());
        accounts.insert("savings", Balance::parse("USD 50 EUR 3").unwrap());

        assert_eq!(accounts.total(), Balance::parse("USD 150 EUR 3").unwrap());
    }

    #[test]
    fn serde_round_trip_preserves_id() {
        let mut accounts = Accounts::new();
        accounts.insert("citi/checking", Balance::parse("USD 12.34").unwrap());

        let encoded = serde_json::to_vec(&accounts).unwrap();
        let decoded: Accounts = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded, accounts);
        assert_eq!(decoded.id(), accounts.id());
    }
}
