#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **coffer-store-memory** – In-memory storage driver for coffer.
//!
//! This crate provides a fast, non-persistent backend suitable for tests
//! and development. All data is stored in process memory and lost when the
//! process terminates. A fresh backend looks like a freshly initialized
//! repository: the default branch exists, points at the null identity, and
//! the current pointer names it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use coffer_store_core::{StorageBackend, StoreError, DEFAULT_BRANCH};
use coffer_types::ObjectId;

/// An in-memory, non-persistent object store.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    objects: Arc<RwLock<HashMap<ObjectId, Vec<u8>>>>,
    branches: Arc<RwLock<HashMap<String, ObjectId>>>,
    current: Arc<RwLock<String>>,
    bank_records: Arc<RwLock<HashMap<String, Vec<ObjectId>>>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Creates an empty backend on the default branch.
    pub fn new() -> Self {
        let mut branches = HashMap::new();
        branches.insert(DEFAULT_BRANCH.to_string(), ObjectId::NULL);
        MemoryBackend {
            objects: Arc::new(RwLock::new(HashMap::new())),
            branches: Arc::new(RwLock::new(branches)),
            current: Arc::new(RwLock::new(DEFAULT_BRANCH.to_string())),
            bank_records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of objects stored.
    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Drops all stored data, returning to the freshly initialized shape.
    pub async fn clear(&self) {
        self.objects.write().await.clear();
        let mut branches = self.branches.write().await;
        branches.clear();
        branches.insert(DEFAULT_BRANCH.to_string(), ObjectId::NULL);
        *self.current.write().await = DEFAULT_BRANCH.to_string();
        self.bank_records.write().await.clear();
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn put_object(&self, id: ObjectId, bytes: &[u8]) -> Result<(), StoreError> {
        // Identities are content hashes; the first write wins and repeats
        // are no-ops.
        self.objects
            .write()
            .await
            .entry(id)
            .or_insert_with(|| bytes.to_vec());
        Ok(())
    }

    async fn get_object(&self, id: ObjectId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.objects.read().await.get(&id).cloned())
    }

    async fn contains_object(&self, id: ObjectId) -> Result<bool, StoreError> {
        Ok(self.objects.read().await.contains_key(&id))
    }

    async fn write_branch(&self, name: &str, id: ObjectId) -> Result<(), StoreError> {
        self.branches.write().await.insert(name.to_string(), id);
        Ok(())
    }

    async fn read_branch(&self, name: &str) -> Result<Option<ObjectId>, StoreError> {
        Ok(self.branches.read().await.get(name).copied())
    }

    async fn list_branches(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.branches.read().await.keys().cloned().collect())
    }

    async fn set_current(&self, refspec: &str) -> Result<(), StoreError> {
        *self.current.write().await = refspec.to_string();
        Ok(())
    }

    async fn current(&self) -> Result<String, StoreError> {
        Ok(self.current.read().await.clone())
    }

    async fn append_bank_record(&self, record_id: &str, id: ObjectId) -> Result<(), StoreError> {
        self.bank_records
            .write()
            .await
            .entry(record_id.to_string())
            .or_default()
            .push(id);
        Ok(())
    }

    async fn bank_record(&self, record_id: &str) -> Result<Vec<ObjectId>, StoreError> {
        Ok(self
            .bank_records
            .read()
            .await
            .get(record_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffer_store_core::{RefSpec, Repository, StoreError, Walk, WalkMode};
    use coffer_types::{detect_amount, Balance, Budget, ObjectId, State, Transaction};
    use tokio_util::sync::CancellationToken;

    fn bal(text: &str) -> Balance {
        Balance::parse(text).unwrap()
    }

    fn state_with(checking: &str, groceries: &str) -> State {
        let mut state = State::default();
        state.accounts.insert("checking", bal(checking));
        state
            .budget
            .children
            .insert("groceries".to_string(), Budget::with_balance(bal(groceries)));
        state
    }

    fn transaction(state: State, parents: Vec<ObjectId>, comment: &str) -> Transaction {
        let amount = state
            .accounts
            .balance("checking");
        Transaction {
            state,
            parents,
            amount,
            merchant: "Test".to_string(),
            comment: comment.to_string(),
            ..Transaction::default()
        }
    }

    /// Writes a three-transaction chain and returns their identities.
    async fn chain(repo: &Repository<MemoryBackend>, token: &CancellationToken) -> [ObjectId; 3] {
        let t1 = transaction(state_with("USD 100", "USD 100"), vec![], "one");
        let id1 = repo.write_transaction(&t1, token).await.unwrap();

        let t2 = transaction(state_with("USD 150", "USD 150"), vec![id1], "two");
        let id2 = repo.write_transaction(&t2, token).await.unwrap();

        let t3 = transaction(state_with("USD 90", "USD 90"), vec![id2], "three");
        let id3 = repo.write_transaction(&t3, token).await.unwrap();

        repo.write_branch("main", id3, token).await.unwrap();
        [id1, id2, id3]
    }

    #[tokio::test]
    async fn write_then_load_round_trips() {
        let repo = Repository::new(MemoryBackend::new());
        let token = CancellationToken::new();

        let original = transaction(state_with("USD 100", "USD 100"), vec![], "first");
        let id = repo.write_transaction(&original, &token).await.unwrap();
        assert_eq!(id, original.id());

        let loaded = repo.load_transaction(id, &token).await.unwrap();
        assert_eq!(loaded, original);
        assert_eq!(loaded.id(), id);
    }

    #[tokio::test]
    async fn missing_objects_are_not_found() {
        let repo = Repository::new(MemoryBackend::new());
        let token = CancellationToken::new();

        let absent = transaction(state_with("USD 1", "USD 1"), vec![], "absent").id();
        match repo.load_transaction(absent, &token).await {
            Err(StoreError::NotFound(id)) => assert_eq!(id, absent),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn writes_are_idempotent() {
        let backend = MemoryBackend::new();
        let repo = Repository::new(backend.clone());
        let token = CancellationToken::new();

        let tx = transaction(state_with("USD 100", "USD 100"), vec![], "only");
        repo.write_transaction(&tx, &token).await.unwrap();
        let count = backend.object_count().await;

        repo.write_transaction(&tx, &token).await.unwrap();
        assert_eq!(backend.object_count().await, count);
    }

    #[tokio::test]
    async fn rewriting_keeps_bank_record_index_single() {
        let repo = Repository::new(MemoryBackend::new());
        let token = CancellationToken::new();

        let mut tx = transaction(state_with("USD 5", "USD 5"), vec![], "tagged");
        tx.record_id = "stmt-42".to_string();

        let id = repo.write_transaction(&tx, &token).await.unwrap();
        repo.write_transaction(&tx, &token).await.unwrap();

        assert!(repo.has_bank_record("stmt-42", &token).await.unwrap());
        assert_eq!(
            repo.transactions_by_bank_record("stmt-42", &token).await.unwrap(),
            vec![id]
        );
        assert!(!repo.has_bank_record("stmt-43", &token).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_parents_are_rejected() {
        let repo = Repository::new(MemoryBackend::new());
        let token = CancellationToken::new();

        let ghost = transaction(state_with("USD 1", "USD 1"), vec![], "ghost").id();
        let tx = transaction(state_with("USD 2", "USD 2"), vec![ghost], "orphan");
        assert!(matches!(
            repo.write_transaction(&tx, &token).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn branch_pointers_round_trip() {
        let repo = Repository::new(MemoryBackend::new());
        let token = CancellationToken::new();

        let tx = transaction(state_with("USD 10", "USD 10"), vec![], "tip");
        let id = repo.write_transaction(&tx, &token).await.unwrap();

        repo.write_branch("main", id, &token).await.unwrap();
        assert_eq!(repo.read_branch("main", &token).await.unwrap(), id);

        let mut branches = repo.list_branches(&token).await.unwrap();
        branches.sort();
        assert_eq!(branches, vec!["main".to_string()]);

        assert!(matches!(
            repo.create_branch("main", id, &token).await,
            Err(StoreError::DuplicateBranch(name)) if name == "main"
        ));
        repo.create_branch("experiment", id, &token).await.unwrap();
        assert_eq!(repo.read_branch("experiment", &token).await.unwrap(), id);
    }

    #[tokio::test]
    async fn refspec_chain_resolves_ancestors() {
        let repo = Repository::new(MemoryBackend::new());
        let token = CancellationToken::new();
        let [id1, id2, id3] = chain(&repo, &token).await;

        for (text, expected) in [
            (id3.to_hex(), id3),
            (format!("{}^^", id3.to_hex()), id1),
            (format!("{}~2", id3.to_hex()), id1),
            (format!("{}~0", id3.to_hex()), id3),
            (format!("{}~1~1", id3.to_hex()), id1),
            ("main".to_string(), id3),
            ("main^".to_string(), id2),
            ("HEAD".to_string(), id3),
            ("HEAD~2".to_string(), id1),
        ] {
            let got = repo.resolve(&RefSpec::new(text.clone()), &token).await.unwrap();
            assert_eq!(got, expected, "refspec {text}");
        }
    }

    #[tokio::test]
    async fn refspec_past_initial_transaction_is_invalid() {
        let repo = Repository::new(MemoryBackend::new());
        let token = CancellationToken::new();
        let [_, _, id3] = chain(&repo, &token).await;

        let overreach = RefSpec::new(format!("{}~3", id3.to_hex()));
        assert!(matches!(
            repo.resolve(&overreach, &token).await,
            Err(StoreError::InvalidRefspec(_))
        ));

        assert!(matches!(
            repo.resolve(&RefSpec::new("no-such-branch"), &token).await,
            Err(StoreError::InvalidRefspec(_))
        ));
    }

    #[tokio::test]
    async fn head_of_fresh_repository_is_null() {
        let repo = Repository::new(MemoryBackend::new());
        let token = CancellationToken::new();

        let head = repo.resolve(&RefSpec::head(), &token).await.unwrap();
        assert!(head.is_null());
    }

    #[tokio::test]
    async fn cache_capacity_does_not_change_observations() {
        let token = CancellationToken::new();
        let backend = MemoryBackend::new();

        let cached = Repository::with_cache_capacity(backend.clone(), 10_000);
        let uncached = Repository::with_cache_capacity(backend, 0);

        let [id1, id2, id3] = chain(&cached, &token).await;

        for id in [id1, id2, id3] {
            let warm = cached.load_transaction(id, &token).await.unwrap();
            let cold = uncached.load_transaction(id, &token).await.unwrap();
            assert_eq!(warm, cold);
        }

        // Reads through the cache a second time still agree.
        for id in [id1, id2, id3] {
            let warm = cached.load_transaction(id, &token).await.unwrap();
            assert_eq!(warm.id(), id);
        }
    }

    #[tokio::test]
    async fn walk_first_parent_visits_linear_history() {
        let repo = Repository::new(MemoryBackend::new());
        let token = CancellationToken::new();
        let [id1, id2, id3] = chain(&repo, &token).await;

        let mut visited = Vec::new();
        repo.walk(id3, WalkMode::FirstParent, &token, |id, _| {
            visited.push(id);
            Walk::Continue
        })
        .await
        .unwrap();
        assert_eq!(visited, vec![id3, id2, id1]);

        let mut truncated = Vec::new();
        repo.walk(id3, WalkMode::FirstParent, &token, |id, _| {
            truncated.push(id);
            Walk::Stop
        })
        .await
        .unwrap();
        assert_eq!(truncated, vec![id3]);
    }

    #[tokio::test]
    async fn cancelled_token_stops_operations() {
        let repo = Repository::new(MemoryBackend::new());
        let token = CancellationToken::new();
        let [_, _, id3] = chain(&repo, &token).await;

        token.cancel();
        assert!(matches!(
            repo.walk(id3, WalkMode::FirstParent, &token, |_, _| Walk::Continue)
                .await,
            Err(StoreError::Cancelled)
        ));
        assert!(matches!(
            repo.load_transaction(id3, &token).await,
            Err(StoreError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn merge_reconciles_divergent_histories() {
        let repo = Repository::new(MemoryBackend::new());
        let token = CancellationToken::new();

        let base = transaction(state_with("USD 100", "USD 100"), vec![], "base");
        let base_id = repo.write_transaction(&base, &token).await.unwrap();

        // One side deposits 50, the other spends 20.
        let left = transaction(state_with("USD 150", "USD 150"), vec![base_id], "deposit");
        let left_id = repo.write_transaction(&left, &token).await.unwrap();

        let right = transaction(state_with("USD 80", "USD 80"), vec![base_id], "spend");
        let right_id = repo.write_transaction(&right, &token).await.unwrap();

        let merged = repo.merge(&[left_id, right_id], &token).await.unwrap();
        assert_eq!(merged.accounts.balance("checking"), bal("USD 130"));
        assert_eq!(
            merged.budget.children["groceries"].balance,
            bal("USD 130")
        );

        // A merge against an ancestor input fast-forwards to the descendant.
        let forward = repo.merge(&[base_id, left_id], &token).await.unwrap();
        assert!(forward.subtract(&left.state).is_zero());
    }

    #[tokio::test]
    async fn detect_amount_matches_committed_history() {
        let repo = Repository::new(MemoryBackend::new());
        let token = CancellationToken::new();
        let [id1, id2, _] = chain(&repo, &token).await;

        let first = repo.load_transaction(id1, &token).await.unwrap();
        let second = repo.load_transaction(id2, &token).await.unwrap();
        assert_eq!(
            detect_amount(&first.state, &second.state),
            bal("USD 50.00")
        );
    }
}
