#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **coffer-index** – Working-tree support for the coffer ledger.
//!
//! Between commits, the ledger state lives on disk as plain directories the
//! user can edit:
//!
//! ```text
//! <root>/
//!   .coffer/                       the object store, refs, and HEAD
//!   accounts/<name>/cash.txt
//!   accounts/<institution>/<sub>/cash.txt
//!   budget/cash.txt                the root envelope's own balance
//!   budget/<child>/.../cash.txt
//! ```
//!
//! Each cash file holds one balance literal. A directory without a cash
//! file has a zero own-balance but its children are still walked, and
//! dot-directories are skipped entirely.

pub mod checkout;
pub mod error;
pub mod load;
pub mod location;
pub mod write;

/// The store directory marking a repository root.
pub const REPO_DIR: &str = ".coffer";

/// The directory holding account balances.
pub const ACCOUNTS_DIR: &str = "accounts";

/// The directory holding the budget tree.
pub const BUDGET_DIR: &str = "budget";

/// The file holding a directory's own balance.
pub const CASH_FILE: &str = "cash.txt";

/// Upper bound on bytes read from one cash file.
pub const CASH_FILE_MAX: usize = 2048;

pub use checkout::{checkout_state, checkout_transaction, DEFAULT_CHECKOUT_MODE};
pub use error::IndexError;
pub use load::{load_accounts, load_budget, load_state};
pub use location::{account_name, budget_name, root_directory, store_directory};
pub use write::write_budget_node;
