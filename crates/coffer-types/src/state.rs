//! Financial state snapshots and the algebra over them.

use std::collections::{BTreeMap, BTreeSet};

use num_traits::Signed;

use crate::accounts::Accounts;
use crate::balance::Balance;
use crate::budget::Budget;
use crate::ident::{hash_object, ObjectId};

/// The pair of account balances and budget tree at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    /// Real-world account balances.
    pub accounts: Accounts,
    /// Allocated spending envelopes.
    pub budget: Budget,
}

/// A signed difference between two [`State`]s.
///
/// Structurally identical to a state, but its balances are deltas and may be
/// negative. Entries absent from either dimension are zero deltas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Impact(pub State);

impl State {
    /// Content-derived identity referencing the accounts and budget IDs.
    pub fn id(&self) -> ObjectId {
        state_id(self.accounts.id(), self.budget.id())
    }

    /// Computes `self - other` as a signed [`Impact`].
    ///
    /// Account deltas that are zero are omitted. The budget delta tree keeps
    /// any path whose own balance or subtree differs between the two states.
    pub fn subtract(&self, other: &State) -> Impact {
        let mut accounts = Accounts::new();
        let names: BTreeSet<&String> = self
            .accounts
            .names()
            .chain(other.accounts.names())
            .collect();
        for name in names {
            let delta = self.accounts.balance(name).sub(&other.accounts.balance(name));
            if !delta.is_zero() {
                accounts.insert(name.clone(), delta);
            }
        }

        let budget = subtract_budget(&self.budget, &other.budget).unwrap_or_default();

        Impact(State { accounts, budget })
    }

    /// Applies an impact, producing the state `self + impact`.
    ///
    /// Inverse of [`State::subtract`]: accounts and budget paths present on
    /// either side survive into the result.
    pub fn add(&self, impact: &Impact) -> State {
        let mut accounts = self.accounts.clone();
        for (name, delta) in impact.0.accounts.iter() {
            accounts.insert(name.clone(), accounts.balance(name).add(delta));
        }

        State {
            accounts,
            budget: add_budget(&self.budget, &impact.0.budget),
        }
    }

    /// The difference between what accounts hold and what the budget has
    /// allocated, `sum(accounts) - recursive_balance(budget)`. Zero when the
    /// two dimensions agree.
    pub fn imbalance(&self) -> Balance {
        self.accounts.total().sub(&self.budget.recursive_balance())
    }
}

impl Impact {
    /// The zero difference.
    pub fn zero() -> Self {
        Self::default()
    }

    /// True when no account or budget path differs.
    pub fn is_zero(&self) -> bool {
        self.0.accounts.is_empty()
            && self.0.budget.balance.is_zero()
            && self.0.budget.children.is_empty()
    }

    /// The impact with every delta negated.
    pub fn negate(&self) -> Impact {
        let mut accounts = Accounts::new();
        for (name, delta) in self.0.accounts.iter() {
            accounts.insert(name.clone(), delta.negate());
        }

        Impact(State {
            accounts,
            budget: negate_budget(&self.0.budget),
        })
    }
}

impl From<State> for Impact {
    /// Views a state as its deltas from the empty state.
    fn from(state: State) -> Self {
        Impact(state)
    }
}

/// Content-derived identity of a state from its component identities.
pub fn state_id(accounts: ObjectId, budget: ObjectId) -> ObjectId {
    let body = format!("accounts {}\nbudget {}\n", accounts.to_hex(), budget.to_hex());
    hash_object("state", &body)
}

fn subtract_budget(a: &Budget, b: &Budget) -> Option<Budget> {
    let balance = a.balance.sub(&b.balance);

    let empty = Budget::new();
    let names: BTreeSet<&String> = a.children.keys().chain(b.children.keys()).collect();
    let mut children = BTreeMap::new();
    for name in names {
        let left = a.children.get(name).unwrap_or(&empty);
        let right = b.children.get(name).unwrap_or(&empty);
        if let Some(delta) = subtract_budget(left, right) {
            children.insert(name.clone(), delta);
        }
    }

    if balance.is_zero() && children.is_empty() {
        None
    } else {
        Some(Budget { balance, children })
    }
}

fn add_budget(a: &Budget, b: &Budget) -> Budget {
    let empty = Budget::new();
    let names: BTreeSet<&String> = a.children.keys().chain(b.children.keys()).collect();
    let mut children = BTreeMap::new();
    for name in names {
        let left = a.children.get(name).unwrap_or(&empty);
        let right = b.children.get(name).unwrap_or(&empty);
        children.insert(name.clone(), add_budget(left, right));
    }

    Budget {
        balance: a.balance.add(&b.balance),
        children,
    }
}

fn negate_budget(b: &Budget) -> Budget {
    Budget {
        balance: b.balance.negate(),
        children: b
            .children
            .iter()
            .map(|(name, child)| (name.clone(), negate_budget(child)))
            .collect(),
    }
}

/// Infers the magnitude of the change between two states, for use when a
/// transaction is committed without an explicit amount.
///
/// Per-path deltas are summed into positive and negative sides, per asset,
/// over the accounts dimension first. A pure deposit reports the positive
/// side, a pure debit the negative side, and a transfer the positive side
/// (the amount received). When the accounts dimension nets out to nothing,
/// the same rule is applied to the flattened budget dimension.
pub fn detect_amount(prev: &State, next: &State) -> Balance {
    let account_names: BTreeSet<&String> =
        prev.accounts.names().chain(next.accounts.names()).collect();
    let account_deltas = account_names
        .into_iter()
        .map(|name| next.accounts.balance(name).sub(&prev.accounts.balance(name)));

    let from_accounts = dimension_amount(account_deltas);
    if !from_accounts.is_zero() {
        return from_accounts;
    }

    let prev_flat = prev.budget.flatten();
    let next_flat = next.budget.flatten();
    let paths: BTreeSet<&String> = prev_flat.keys().chain(next_flat.keys()).collect();
    let budget_deltas = paths.into_iter().map(|path| {
        let prev_balance = prev_flat.get(path).cloned().unwrap_or_default();
        let next_balance = next_flat.get(path).cloned().unwrap_or_default();
        next_balance.sub(&prev_balance)
    });

    dimension_amount(budget_deltas)
}

/// Folds one dimension's deltas into the reported magnitude: the per-asset
/// sum of positive deltas when any exist, otherwise the per-asset sum of
/// negative deltas.
fn dimension_amount(deltas: impl Iterator<Item = Balance>) -> Balance {
    let mut positive = Balance::new();
    let mut negative = Balance::new();

    for delta in deltas {
        for (asset, magnitude) in delta.iter() {
            if magnitude.is_positive() {
                positive.set(asset.clone(), positive.magnitude(asset) + magnitude);
            } else {
                negative.set(asset.clone(), negative.magnitude(asset) + magnitude);
            }
        }
    }

    if positive.is_zero() {
        negative
    } else {
        positive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bal(text: &str) -> Balance {
        Balance::parse(text).unwrap()
    }

    fn leaf(text: &str) -> Budget {
        Budget::with_balance(bal(text))
    }

    /// Accounts {checking: 100}, budget {groceries: 50, entertainment: 50}.
    fn base_state() -> State {
        let mut accounts = Accounts::new();
        accounts.insert("checking", bal("USD 100.00"));

        let mut budget = Budget::new();
        budget
            .children
            .insert("groceries".to_string(), leaf("USD 50"));
        budget
            .children
            .insert("entertainment".to_string(), leaf("USD 50"));

        State { accounts, budget }
    }

    #[test]
    fn subtract_self_is_zero() {
        let state = base_state();
        assert!(state.subtract(&state).is_zero());
    }

    #[test]
    fn subtract_preserves_structure_on_either_side() {
        let prev = base_state();
        let mut next = base_state();
        next.accounts.insert("savings", bal("USD 10"));
        next.budget
            .children
            .get_mut("groceries")
            .unwrap()
            .balance = bal("USD 60");

        let diff = next.subtract(&prev);
        assert_eq!(diff.0.accounts.balance("savings"), bal("USD 10"));
        assert!(!diff.0.accounts.contains("checking"));
        assert_eq!(
            diff.0.budget.children["groceries"].balance,
            bal("USD 10")
        );
        assert!(!diff.0.budget.children.contains_key("entertainment"));
    }

    #[test]
    fn add_inverts_subtract() {
        let prev = base_state();
        let mut next = base_state();
        next.accounts.insert("checking", bal("USD 150.00"));
        next.budget
            .children
            .get_mut("groceries")
            .unwrap()
            .balance = bal("USD 75");
        next.budget
            .children
            .get_mut("entertainment")
            .unwrap()
            .balance = bal("USD 75");

        let impact = next.subtract(&prev);
        let rebuilt = prev.add(&impact);
        assert!(rebuilt.subtract(&next).is_zero());
        assert_eq!(rebuilt.add(&impact.negate()).subtract(&prev), Impact::zero());
    }

    #[test]
    fn add_then_subtract_returns_impact() {
        let state = base_state();
        let mut other = base_state();
        other.accounts.insert("checking", bal("USD 40"));
        other.budget.children.get_mut("groceries").unwrap().balance = bal("USD 5");
        let impact = other.subtract(&state);

        assert_eq!(state.add(&impact).subtract(&state), impact);
    }

    #[test]
    fn subtract_from_empty_matches_state_viewed_as_impact() {
        let state = base_state();
        assert_eq!(
            state.subtract(&State::default()),
            Impact::from(state.clone())
        );
    }

    #[test]
    fn state_id_tracks_components() {
        let a = base_state();
        let mut b = base_state();
        assert_eq!(a.id(), b.id());

        b.accounts.insert("checking", bal("USD 99"));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn imbalance_reports_disagreement() {
        let state = base_state();
        assert!(state.imbalance().is_zero());

        let mut skewed = base_state();
        skewed.accounts.insert("checking", bal("USD 120"));
        assert_eq!(skewed.imbalance(), bal("USD 20"));
    }

    #[test]
    fn detect_amount_pure_deposit() {
        let prev = base_state();
        let mut next = base_state();
        next.accounts.insert("checking", bal("USD 150.00"));
        next.budget.children.get_mut("groceries").unwrap().balance = bal("USD 75");
        next.budget
            .children
            .get_mut("entertainment")
            .unwrap()
            .balance = bal("USD 75");

        assert_eq!(detect_amount(&prev, &next), bal("USD 50.00"));
    }

    #[test]
    fn detect_amount_pure_debit() {
        let prev = base_state();
        let mut next = base_state();
        next.accounts.insert("checking", bal("USD 50"));
        next.budget.children.get_mut("groceries").unwrap().balance = bal("USD 0");

        assert_eq!(detect_amount(&prev, &next), bal("USD -50.00"));
    }

    #[test]
    fn detect_amount_transfer_reports_received_side() {
        let mut prev = State::default();
        prev.accounts.insert("checking", bal("USD 100"));
        prev.accounts.insert("savings", bal("USD 0"));

        let mut next = State::default();
        next.accounts.insert("checking", bal("USD 50"));
        next.accounts.insert("savings", bal("USD 50"));

        assert_eq!(detect_amount(&prev, &next), bal("USD 50.00"));
    }

    #[test]
    fn detect_amount_three_party_transfer() {
        let mut prev = State::default();
        prev.accounts.insert("checking", bal("USD 22000"));
        prev.accounts.insert("savings", bal("USD 40000"));

        let mut next = State::default();
        next.accounts.insert("checking", bal("USD 5000"));
        next.accounts.insert("savings", bal("USD 0"));
        next.accounts.insert("escrow", bal("USD 57000"));

        assert_eq!(detect_amount(&prev, &next), bal("USD 57000.00"));
    }

    #[test]
    fn detect_amount_falls_back_to_budget_dimension() {
        let mut prev = State::default();
        prev.budget.children.insert("groceries".to_string(), leaf("USD 50"));
        prev.budget.children.insert("fun".to_string(), leaf("USD 50"));

        let mut next = State::default();
        next.budget.children.insert("groceries".to_string(), leaf("USD 30"));
        next.budget.children.insert("fun".to_string(), leaf("USD 70"));

        assert_eq!(detect_amount(&prev, &next), bal("USD 20.00"));
    }

    #[test]
    fn detect_amount_no_change_is_zero() {
        let state = base_state();
        assert!(detect_amount(&state, &state).is_zero());
    }

    #[test]
    fn detect_amount_is_deterministic() {
        let prev = base_state();
        let mut next = base_state();
        next.accounts.insert("checking", bal("USD 135"));
        assert_eq!(detect_amount(&prev, &next), detect_amount(&prev, &next));
    }
}
