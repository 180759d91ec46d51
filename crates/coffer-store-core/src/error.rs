//! The closed error taxonomy surfaced by storage operations.

use coffer_types::ObjectId;

/// Failures produced by repositories and their backends.
///
/// The storage layer never swallows an error; callers decide whether to
/// prompt, log, or abort.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No object is stored under the given identity.
    #[error("object {0} not found")]
    NotFound(ObjectId),
    /// No branch exists with the given name.
    #[error("branch {0:?} not found")]
    BranchNotFound(String),
    /// Stored bytes under the given identity failed to parse.
    #[error("object {id} is corrupt: {reason}")]
    CorruptObject {
        /// Identity whose stored bytes are unusable.
        id: ObjectId,
        /// What went wrong while decoding.
        reason: String,
    },
    /// The given text cannot be resolved to a transaction.
    #[error("{0:?} is not a valid refspec")]
    InvalidRefspec(String),
    /// A branch with the given name already exists.
    #[error("branch {0:?} already exists")]
    DuplicateBranch(String),
    /// The cancellation token fired before the operation completed.
    #[error("operation cancelled")]
    Cancelled,
    /// The underlying storage failed; retrying is safe.
    #[error("storage failure: {0}")]
    Storage(#[from] std::io::Error),
}

impl StoreError {
    /// Builds a [`StoreError::CorruptObject`] from any decode failure.
    pub fn corrupt(id: ObjectId, reason: impl ToString) -> Self {
        StoreError::CorruptObject {
            id,
            reason: reason.to_string(),
        }
    }
}
