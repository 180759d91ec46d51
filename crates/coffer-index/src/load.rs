//! Reading the working tree into an in-memory state.

use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use coffer_types::{Accounts, Balance, Budget, State};

use crate::error::IndexError;
use crate::location::{account_name, root_directory};
use crate::{ACCOUNTS_DIR, BUDGET_DIR, CASH_FILE, CASH_FILE_MAX};

/// Hydrates both accounts and the budget from the repository containing
/// `dir`.
pub async fn load_state(dir: &Path, token: &CancellationToken) -> Result<State, IndexError> {
    let root = root_directory(dir)?;
    let accounts = load_accounts(&root.join(ACCOUNTS_DIR), token).await?;
    let budget = load_budget(&root.join(BUDGET_DIR), token).await?;
    Ok(State { accounts, budget })
}

/// Reads account balances beneath `dir` into memory.
///
/// Every directory holding a cash file is an account; account names come
/// from the path relative to the repository's accounts directory, so nested
/// names like `citi/checking` survive. Dot-directories are skipped.
pub async fn load_accounts(
    dir: &Path,
    token: &CancellationToken,
) -> Result<Accounts, IndexError> {
    let mut found = Accounts::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        ensure_live(token)?;
        let mut entries = tokio::fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await?.is_dir() {
                if !name.starts_with('.') {
                    pending.push(entry.path());
                }
            } else if name == CASH_FILE {
                let balance = read_cash_file(&entry.path()).await?;
                found.insert(account_name(&current)?, balance);
            }
        }
    }

    Ok(found)
}

/// Reads the budget tree rooted at `dir` into memory.
///
/// A directory's own balance comes from its cash file, zero when the file
/// is absent; every non-dot subdirectory becomes a child envelope.
pub fn load_budget<'a>(
    dir: &'a Path,
    token: &'a CancellationToken,
) -> BoxFuture<'a, Result<Budget, IndexError>> {
    async move {
        ensure_live(token)?;
        let mut budget = Budget::new();

        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await?.is_dir() {
                if name.starts_with('.') {
                    continue;
                }
                let child = load_budget(&entry.path(), token).await?;
                budget.children.insert(name, child);
            } else if name == CASH_FILE {
                budget.balance = read_cash_file(&entry.path()).await?;
            }
        }

        Ok(budget)
    }
    .boxed()
}

/// Parses one cash file, honoring the read limit and trimming whitespace.
async fn read_cash_file(path: &Path) -> Result<Balance, IndexError> {
    let mut bytes = tokio::fs::read(path).await?;
    bytes.truncate(CASH_FILE_MAX);
    let text = String::from_utf8_lossy(&bytes);
    Balance::parse(text.trim()).map_err(|source| IndexError::InvalidBalance {
        path: path.to_path_buf(),
        source,
    })
}

fn ensure_live(token: &CancellationToken) -> Result<(), IndexError> {
    if token.is_cancelled() {
        Err(IndexError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::REPO_DIR;

    fn write(path: PathBuf, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn scaffold() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(REPO_DIR)).unwrap();
        write(
            dir.path().join("accounts/citi/checking/cash.txt"),
            "USD 12.34\n",
        );
        write(dir.path().join("budget/cash.txt"), "USD 2.34");
        write(dir.path().join("budget/groceries/cash.txt"), "USD 10\n");
        std::fs::create_dir_all(dir.path().join("budget/.stash")).unwrap();
        dir
    }

    #[tokio::test]
    async fn accounts_load_with_nested_names() {
        let dir = scaffold();
        let token = CancellationToken::new();

        let accounts = load_accounts(&dir.path().join("accounts"), &token)
            .await
            .unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(
            accounts.balance("citi/checking"),
            Balance::parse("USD 12.34").unwrap()
        );
    }

    #[tokio::test]
    async fn budget_loads_children_and_skips_dot_directories() {
        let dir = scaffold();
        let token = CancellationToken::new();

        let budget = load_budget(&dir.path().join("budget"), &token)
            .await
            .unwrap();
        assert_eq!(budget.balance, Balance::parse("USD 2.34").unwrap());
        assert_eq!(
            budget.children["groceries"].balance,
            Balance::parse("USD 10").unwrap()
        );
        assert!(!budget.children.contains_key(".stash"));
        assert_eq!(
            budget.recursive_balance(),
            Balance::parse("USD 12.34").unwrap()
        );
    }

    #[tokio::test]
    async fn state_pairs_both_dimensions() {
        let dir = scaffold();
        let token = CancellationToken::new();

        let state = load_state(dir.path(), &token).await.unwrap();
        assert!(state.imbalance().is_zero());
    }

    #[tokio::test]
    async fn missing_cash_file_means_zero_balance() {
        let dir = scaffold();
        let token = CancellationToken::new();
        std::fs::create_dir_all(dir.path().join("budget/empty/deep")).unwrap();
        write(dir.path().join("budget/empty/deep/cash.txt"), "USD 1");

        let budget = load_budget(&dir.path().join("budget"), &token)
            .await
            .unwrap();
        assert!(budget.children["empty"].balance.is_zero());
        assert_eq!(
            budget.children["empty"].children["deep"].balance,
            Balance::parse("USD 1").unwrap()
        );
    }

    #[tokio::test]
    async fn malformed_cash_file_is_reported_with_its_path() {
        let dir = scaffold();
        let token = CancellationToken::new();
        write(dir.path().join("budget/bad/cash.txt"), "USD banana");

        let err = load_budget(&dir.path().join("budget"), &token)
            .await
            .unwrap_err();
        match err {
            IndexError::InvalidBalance { path, .. } => {
                assert!(path.ends_with("budget/bad/cash.txt"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancellation_interrupts_loading() {
        let dir = scaffold();
        let token = CancellationToken::new();
        token.cancel();

        assert!(matches!(
            load_state(dir.path(), &token).await,
            Err(IndexError::Cancelled)
        ));
    }
}
