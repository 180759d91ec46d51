//! The contract storage drivers implement.

use async_trait::async_trait;
use coffer_types::ObjectId;

use crate::error::StoreError;

/// Raw persistence operations over a single repository.
///
/// A backend stores immutable object bytes keyed by content identity, named
/// branch pointers, the current-refspec pointer, and the append-only bank
/// record index. Drivers implement this trait in separate crates; all typed
/// behavior (encoding, caching, resolution) lives in
/// [`Repository`](crate::Repository) on top of it.
///
/// Object writes must be idempotent: storing bytes under an identity that is
/// already present leaves the stored bytes unchanged. Because identities are
/// content hashes, a backend never needs to compare payloads to honor that.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Persist object bytes under `id`. A no-op when `id` is present.
    async fn put_object(&self, id: ObjectId, bytes: &[u8]) -> Result<(), StoreError>;

    /// Fetch the bytes stored under `id`, or `None` when absent.
    async fn get_object(&self, id: ObjectId) -> Result<Option<Vec<u8>>, StoreError>;

    /// True when an object is stored under `id`.
    async fn contains_object(&self, id: ObjectId) -> Result<bool, StoreError>;

    /// Point branch `name` at `id`, creating or overwriting it atomically.
    async fn write_branch(&self, name: &str, id: ObjectId) -> Result<(), StoreError>;

    /// The identity branch `name` points at, or `None` when it is unknown.
    async fn read_branch(&self, name: &str) -> Result<Option<ObjectId>, StoreError>;

    /// Every branch name, in unspecified order.
    async fn list_branches(&self) -> Result<Vec<String>, StoreError>;

    /// Store the current refspec (a branch name or a 40-hex identity).
    async fn set_current(&self, refspec: &str) -> Result<(), StoreError>;

    /// The current refspec.
    async fn current(&self) -> Result<String, StoreError>;

    /// Append a transaction identity to the index entry for `record_id`.
    async fn append_bank_record(&self, record_id: &str, id: ObjectId) -> Result<(), StoreError>;

    /// Transaction identities indexed under `record_id`, oldest first;
    /// empty when the record is unknown.
    async fn bank_record(&self, record_id: &str) -> Result<Vec<ObjectId>, StoreError>;
}
