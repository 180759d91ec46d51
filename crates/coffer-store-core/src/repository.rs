//! The typed repository layered over a raw backend.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use tokio_util::sync::CancellationToken;

use coffer_types::{Accounts, Budget, ObjectId, State, Transaction};

use crate::backend::StorageBackend;
use crate::codec::{decode, Object, StateRecord, TransactionRecord};
use crate::error::StoreError;
use crate::refspec::RefSpec;

/// Default number of raw objects kept in the in-memory cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// A content-addressed object repository.
///
/// Wraps a [`StorageBackend`] with the typed codec, recursive reads and
/// writes over the object graph, and an LRU cache of raw object bytes.
/// Because cache keys are content hashes, a cached entry can never go
/// stale; eviction is purely a memory concern and observable behavior is
/// identical at any capacity, including zero.
pub struct Repository<B> {
    backend: B,
    cache: Option<Mutex<LruCache<ObjectId, Arc<Vec<u8>>>>>,
}

impl<B: StorageBackend> Repository<B> {
    /// Opens a repository over `backend` with the default cache capacity.
    pub fn new(backend: B) -> Self {
        Self::with_cache_capacity(backend, DEFAULT_CACHE_CAPACITY)
    }

    /// Opens a repository with an explicit cache capacity. Zero disables
    /// caching.
    pub fn with_cache_capacity(backend: B, capacity: usize) -> Self {
        let cache = NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap)));
        Repository { backend, cache }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub(crate) fn ensure_live(token: &CancellationToken) -> Result<(), StoreError> {
        if token.is_cancelled() {
            Err(StoreError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn cache_get(&self, id: &ObjectId) -> Option<Arc<Vec<u8>>> {
        let cache = self.cache.as_ref()?;
        let mut cache = cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.get(id).cloned()
    }

    fn cache_put(&self, id: ObjectId, bytes: Arc<Vec<u8>>) {
        if let Some(cache) = self.cache.as_ref() {
            let mut cache = cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            cache.put(id, bytes);
        }
    }

    async fn raw_object(
        &self,
        id: ObjectId,
        token: &CancellationToken,
    ) -> Result<Arc<Vec<u8>>, StoreError> {
        Self::ensure_live(token)?;
        if let Some(hit) = self.cache_get(&id) {
            return Ok(hit);
        }
        let bytes = self
            .backend
            .get_object(id)
            .await?
            .ok_or(StoreError::NotFound(id))?;
        let bytes = Arc::new(bytes);
        self.cache_put(id, Arc::clone(&bytes));
        Ok(bytes)
    }

    async fn put(&self, object: &Object) -> Result<ObjectId, StoreError> {
        let id = object.id();
        if !self.backend.contains_object(id).await? {
            let bytes = object.encode();
            self.backend.put_object(id, &bytes).await?;
            self.cache_put(id, Arc::new(bytes));
        }
        Ok(id)
    }

    /// True when an object is stored under `id`.
    pub async fn contains(
        &self,
        id: ObjectId,
        token: &CancellationToken,
    ) -> Result<bool, StoreError> {
        Self::ensure_live(token)?;
        if self.cache_get(&id).is_some() {
            return Ok(true);
        }
        self.backend.contains_object(id).await
    }

    //─────────────────────────────
    //  Typed reads
    //─────────────────────────────

    /// Loads an accounts listing by identity.
    pub async fn load_accounts(
        &self,
        id: ObjectId,
        token: &CancellationToken,
    ) -> Result<Accounts, StoreError> {
        let raw = self.raw_object(id, token).await?;
        let accounts: Accounts = decode(id, &raw)?;
        if accounts.id() != id {
            return Err(StoreError::corrupt(id, "content does not match its identity"));
        }
        Ok(accounts)
    }

    /// Loads a budget tree by identity.
    pub async fn load_budget(
        &self,
        id: ObjectId,
        token: &CancellationToken,
    ) -> Result<Budget, StoreError> {
        let raw = self.raw_object(id, token).await?;
        let budget: Budget = decode(id, &raw)?;
        if budget.id() != id {
            return Err(StoreError::corrupt(id, "content does not match its identity"));
        }
        Ok(budget)
    }

    pub(crate) async fn load_state_record(
        &self,
        id: ObjectId,
        token: &CancellationToken,
    ) -> Result<StateRecord, StoreError> {
        let raw = self.raw_object(id, token).await?;
        let record: StateRecord = decode(id, &raw)?;
        if record.id() != id {
            return Err(StoreError::corrupt(id, "content does not match its identity"));
        }
        Ok(record)
    }

    /// Loads a transaction's stored record without hydrating its state.
    pub async fn load_transaction_record(
        &self,
        id: ObjectId,
        token: &CancellationToken,
    ) -> Result<TransactionRecord, StoreError> {
        let raw = self.raw_object(id, token).await?;
        let record: TransactionRecord = decode(id, &raw)?;
        if record.id() != id {
            return Err(StoreError::corrupt(id, "content does not match its identity"));
        }
        Ok(record)
    }

    /// Loads a state by identity, hydrating its accounts and budget.
    pub async fn load_state(
        &self,
        id: ObjectId,
        token: &CancellationToken,
    ) -> Result<State, StoreError> {
        let record = self.load_state_record(id, token).await?;
        let accounts = self.load_accounts(record.accounts, token).await?;
        let budget = self.load_budget(record.budget, token).await?;
        Ok(State { accounts, budget })
    }

    /// Loads a transaction by identity, hydrating its full state.
    pub async fn load_transaction(
        &self,
        id: ObjectId,
        token: &CancellationToken,
    ) -> Result<Transaction, StoreError> {
        let record = self.load_transaction_record(id, token).await?;
        let state = self.load_state(record.state, token).await?;
        Ok(record.into_transaction(state))
    }

    //─────────────────────────────
    //  Writes
    //─────────────────────────────

    /// Writes a state and its accounts and budget, returning the state
    /// identity. Objects already present are left untouched.
    pub async fn write_state(
        &self,
        state: &State,
        token: &CancellationToken,
    ) -> Result<ObjectId, StoreError> {
        Self::ensure_live(token)?;
        let accounts = self.put(&Object::Accounts(state.accounts.clone())).await?;
        let budget = self.put(&Object::Budget(state.budget.clone())).await?;
        self.put(&Object::State(StateRecord { accounts, budget })).await
    }

    /// Writes a transaction and, recursively, its state dependencies.
    ///
    /// Rewriting an already-present transaction is a no-op, which also keeps
    /// the bank record index from accumulating duplicate entries. Parents
    /// must already exist in this repository.
    pub async fn write_transaction(
        &self,
        transaction: &Transaction,
        token: &CancellationToken,
    ) -> Result<ObjectId, StoreError> {
        Self::ensure_live(token)?;
        let record = TransactionRecord::from_transaction(transaction);
        let id = record.id();
        if self.contains(id, token).await? {
            return Ok(id);
        }

        for parent in &record.parents {
            if !parent.is_null() && !self.contains(*parent, token).await? {
                return Err(StoreError::NotFound(*parent));
            }
        }

        self.write_state(&transaction.state, token).await?;
        self.put(&Object::Transaction(record.clone())).await?;

        if !record.record_id.is_empty() {
            self.backend.append_bank_record(&record.record_id, id).await?;
        }

        Ok(id)
    }

    //─────────────────────────────
    //  Branches and the current pointer
    //─────────────────────────────

    /// Points branch `name` at `id`, creating or moving it.
    pub async fn write_branch(
        &self,
        name: &str,
        id: ObjectId,
        token: &CancellationToken,
    ) -> Result<(), StoreError> {
        Self::ensure_live(token)?;
        self.backend.write_branch(name, id).await
    }

    /// Creates branch `name` at `id`, refusing to move an existing branch.
    pub async fn create_branch(
        &self,
        name: &str,
        id: ObjectId,
        token: &CancellationToken,
    ) -> Result<(), StoreError> {
        Self::ensure_live(token)?;
        if self.backend.read_branch(name).await?.is_some() {
            return Err(StoreError::DuplicateBranch(name.to_string()));
        }
        self.backend.write_branch(name, id).await
    }

    /// The identity branch `name` points at.
    pub async fn read_branch(
        &self,
        name: &str,
        token: &CancellationToken,
    ) -> Result<ObjectId, StoreError> {
        self.try_read_branch(name, token)
            .await?
            .ok_or_else(|| StoreError::BranchNotFound(name.to_string()))
    }

    /// Like [`Repository::read_branch`] but yields `None` for an unknown
    /// branch instead of failing.
    pub async fn try_read_branch(
        &self,
        name: &str,
        token: &CancellationToken,
    ) -> Result<Option<ObjectId>, StoreError> {
        Self::ensure_live(token)?;
        self.backend.read_branch(name).await
    }

    /// Every branch name, in unspecified order.
    pub async fn list_branches(
        &self,
        token: &CancellationToken,
    ) -> Result<Vec<String>, StoreError> {
        Self::ensure_live(token)?;
        self.backend.list_branches().await
    }

    /// Stores the current refspec.
    pub async fn set_current(
        &self,
        refspec: &RefSpec,
        token: &CancellationToken,
    ) -> Result<(), StoreError> {
        Self::ensure_live(token)?;
        self.backend.set_current(refspec.as_str()).await
    }

    /// The current refspec.
    pub async fn current(&self, token: &CancellationToken) -> Result<RefSpec, StoreError> {
        Self::ensure_live(token)?;
        Ok(RefSpec::new(self.backend.current().await?))
    }

    //─────────────────────────────
    //  Bank record index
    //─────────────────────────────

    /// True when at least one transaction is indexed under `record_id`.
    pub async fn has_bank_record(
        &self,
        record_id: &str,
        token: &CancellationToken,
    ) -> Result<bool, StoreError> {
        Ok(!self.transactions_by_bank_record(record_id, token).await?.is_empty())
    }

    /// Transaction identities indexed under `record_id`.
    pub async fn transactions_by_bank_record(
        &self,
        record_id: &str,
        token: &CancellationToken,
    ) -> Result<Vec<ObjectId>, StoreError> {
        Self::ensure_live(token)?;
        self.backend.bank_record(record_id).await
    }

    /// Appends an index entry directly, for index reconstruction.
    pub async fn index_bank_record(
        &self,
        record_id: &str,
        id: ObjectId,
        token: &CancellationToken,
    ) -> Result<(), StoreError> {
        Self::ensure_live(token)?;
        self.backend.append_bank_record(record_id, id).await
    }
}
