//! Reconciling divergent histories.

use std::collections::{HashSet, VecDeque};

use tokio_util::sync::CancellationToken;

use coffer_types::{ObjectId, State};

use crate::backend::StorageBackend;
use crate::error::StoreError;
use crate::repository::Repository;

impl<B: StorageBackend> Repository<B> {
    /// Merges the states of the given transactions.
    ///
    /// The common ancestor is found pairwise in input order, then the merged
    /// state is `ancestor + sum(input_i - ancestor)`. Histories with no
    /// shared ancestor merge against the empty state. The result is a state,
    /// not a transaction: the caller is expected to check it out, adjust it
    /// if needed, and commit it with the inputs as parents.
    pub async fn merge(
        &self,
        inputs: &[ObjectId],
        token: &CancellationToken,
    ) -> Result<State, StoreError> {
        let Some((&first, rest)) = inputs.split_first() else {
            return Ok(State::default());
        };

        let mut ancestor = Some(first);
        for &next in rest {
            ancestor = match ancestor {
                Some(current) => self.common_ancestor(current, next, token).await?,
                None => None,
            };
        }

        let ancestor_state = match ancestor {
            Some(id) if !id.is_null() => self.load_transaction(id, token).await?.state,
            _ => State::default(),
        };

        let mut merged = ancestor_state.clone();
        for &input in inputs {
            let state = self.load_transaction(input, token).await?.state;
            merged = merged.add(&state.subtract(&ancestor_state));
        }
        Ok(merged)
    }

    /// The nearest transaction reachable from both `a` and `b`, following
    /// all parent edges breadth first. Deterministic for a given repository
    /// because parent lists are ordered.
    async fn common_ancestor(
        &self,
        a: ObjectId,
        b: ObjectId,
        token: &CancellationToken,
    ) -> Result<Option<ObjectId>, StoreError> {
        if a.is_null() || b.is_null() {
            return Ok(None);
        }

        let mut reachable = HashSet::new();
        let mut queue = VecDeque::from([a]);
        while let Some(id) = queue.pop_front() {
            Self::ensure_live(token)?;
            if id.is_null() || !reachable.insert(id) {
                continue;
            }
            let record = self.load_transaction_record(id, token).await?;
            queue.extend(record.parents.iter().copied());
        }

        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([b]);
        while let Some(id) = queue.pop_front() {
            Self::ensure_live(token)?;
            if id.is_null() || !seen.insert(id) {
                continue;
            }
            if reachable.contains(&id) {
                return Ok(Some(id));
            }
            let record = self.load_transaction_record(id, token).await?;
            queue.extend(record.parents.iter().copied());
        }

        Ok(None)
    }
}
