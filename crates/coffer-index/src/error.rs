//! Failures surfaced while reading or writing the working tree.

use std::path::PathBuf;

use coffer_types::BalanceParseError;

/// Errors from working-tree operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The path is not inside a coffer repository.
    #[error("not a coffer repository (or any of the parent directories): {}", .0.display())]
    NotARepository(PathBuf),
    /// The path is not inside the repository's accounts directory.
    #[error("{} is not in the accounts directory", .0.display())]
    NotAnAccount(PathBuf),
    /// The path is not inside the repository's budget directory.
    #[error("{} is not in the budget directory", .0.display())]
    NotABudget(PathBuf),
    /// A cash file holds an unparseable balance literal.
    #[error("invalid balance in {}: {source}", .path.display())]
    InvalidBalance {
        /// The cash file that failed to parse.
        path: PathBuf,
        /// The underlying parse failure.
        #[source]
        source: BalanceParseError,
    },
    /// The cancellation token fired before the operation completed.
    #[error("operation cancelled")]
    Cancelled,
    /// An underlying filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
