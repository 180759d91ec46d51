//! Hierarchical budget envelopes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::balance::Balance;
use crate::ident::{hash_object, ObjectId};

/// An ordered tree of spending envelopes.
///
/// Each node holds its own funds in `balance`, exclusive of its descendants;
/// [`Budget::recursive_balance`] folds the subtree. Child names are unique
/// among siblings, non-empty, and contain no path separator. The tree is
/// strictly acyclic by construction: children are owned, never shared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    /// Funds allocated directly to this envelope.
    pub balance: Balance,
    /// Child envelopes by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, Budget>,
}

impl Budget {
    /// An empty envelope with no children.
    pub fn new() -> Self {
        Self::default()
    }

    /// A leaf envelope holding `balance`.
    pub fn with_balance(balance: Balance) -> Self {
        Budget {
            balance,
            children: BTreeMap::new(),
        }
    }

    /// This envelope's funds plus those of every descendant.
    pub fn recursive_balance(&self) -> Balance {
        self.children
            .values()
            .fold(self.balance.clone(), |acc, child| {
                acc.add(&child.recursive_balance())
            })
    }

    /// Looks up a descendant by `/`-separated path. The empty path names
    /// this node.
    pub fn descendant(&self, path: &str) -> Option<&Budget> {
        let mut current = self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current.children.get(segment)?;
        }
        Some(current)
    }

    /// Flattens the tree into `path -> own balance`, with the root at the
    /// empty path and children joined by `/`.
    pub fn flatten(&self) -> BTreeMap<String, Balance> {
        fn helper(node: &Budget, path: &str, out: &mut BTreeMap<String, Balance>) {
            out.insert(path.to_string(), node.balance.clone());
            for (name, child) in &node.children {
                let child_path = if path.is_empty() {
                    name.clone()
                } else {
                    format!("{path}/{name}")
                };
                helper(child, &child_path, out);
            }
        }

        let mut out = BTreeMap::new();
        helper(self, "", &mut out);
        out
    }

    /// Content-derived identity covering this node's balance and, through
    /// child identities, the entire subtree.
    pub fn id(&self) -> ObjectId {
        let mut body = String::new();
        body.push_str("balance ");
        body.push_str(&self.balance.canonical_encoding());
        body.push('\n');
        for (name, child) in &self.children {
            body.push_str("child ");
            body.push_str(name);
            body.push(' ');
            body.push_str(&child.id().to_hex());
            body.push('\n');
        }
        hash_object("budget", &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(text: &str) -> Balance {
        Balance::parse(text).unwrap()
    }

    fn sample() -> Budget {
        let mut root = Budget::with_balance(usd("USD 10"));
        root.children
            .insert("groceries".to_string(), Budget::with_balance(usd("USD 50")));
        let mut fun = Budget::with_balance(usd("USD 20"));
        fun.children
            .insert("games".to_string(), Budget::with_balance(usd("USD 5")));
        root.children.insert("fun".to_string(), fun);
        root
    }

    #[test]
    fn recursive_balance_folds_subtree() {
        assert_eq!(sample().recursive_balance(), usd("USD 85"));
    }

    #[test]
    fn flatten_joins_paths() {
        let flat = sample().flatten();
        assert_eq!(flat[""], usd("USD 10"));
        assert_eq!(flat["groceries"], usd("USD 50"));
        assert_eq!(flat["fun"], usd("USD 20"));
        assert_eq!(flat["fun/games"], usd("USD 5"));
        assert_eq!(flat.len(), 4);
    }

    #[test]
    fn descendant_by_path() {
        let budget = sample();
        assert_eq!(budget.descendant("").unwrap(), &budget);
        assert_eq!(
            budget.descendant("fun/games").unwrap().balance,
            usd("USD 5")
        );
        assert!(budget.descendant("fun/missing").is_none());
    }

    #[test]
    fn id_covers_descendants() {
        let mut a = sample();
        let b = sample();
        assert_eq!(a.id(), b.id());

        a.children
            .get_mut("fun")
            .unwrap()
            .children
            .get_mut("games")
            .unwrap()
            .balance = usd("USD 6");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn serde_round_trip_preserves_id() {
        let budget = sample();
        let encoded = serde_json::to_vec(&budget).unwrap();
        let decoded: Budget = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded, budget);
        assert_eq!(decoded.id(), budget.id());
    }
}
