//! Lazy traversal of transaction history.

use std::collections::{HashSet, VecDeque};

use tokio_util::sync::CancellationToken;

use coffer_types::{ObjectId, Transaction};

use crate::backend::StorageBackend;
use crate::error::StoreError;
use crate::repository::Repository;

/// Visitor verdict after seeing one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Keep traversing into the remaining history.
    Continue,
    /// Terminate the walk early.
    Stop,
}

/// Which parent edges a walk follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    /// Follow only each transaction's first parent.
    FirstParent,
    /// Follow every parent of every merge.
    AllParents,
}

impl<B: StorageBackend> Repository<B> {
    /// Traverses the DAG from `start`, visiting each reachable transaction
    /// exactly once in breadth-first order.
    ///
    /// The walk is lazy: it loads one transaction at a time and stops as
    /// soon as the visitor returns [`Walk::Stop`]. The cancellation token is
    /// polled between transactions.
    pub async fn walk<F>(
        &self,
        start: ObjectId,
        mode: WalkMode,
        token: &CancellationToken,
        mut visit: F,
    ) -> Result<(), StoreError>
    where
        F: FnMut(ObjectId, &Transaction) -> Walk + Send,
    {
        let mut queue = VecDeque::from([start]);
        let mut seen = HashSet::new();

        while let Some(id) = queue.pop_front() {
            Self::ensure_live(token)?;
            if id.is_null() || !seen.insert(id) {
                continue;
            }

            let transaction = self.load_transaction(id, token).await?;
            if visit(id, &transaction) == Walk::Stop {
                return Ok(());
            }

            match mode {
                WalkMode::FirstParent => {
                    queue.extend(transaction.parent());
                }
                WalkMode::AllParents => {
                    queue.extend(transaction.parents.iter().copied());
                }
            }
        }

        Ok(())
    }
}
