//! Materializing a state onto the working tree.

use std::path::Path;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use coffer_types::{Budget, State, Transaction};

use crate::error::IndexError;
use crate::location::root_directory;
use crate::write::write_cash_file;
use crate::{ACCOUNTS_DIR, BUDGET_DIR};

/// File mode applied to working-tree entries when the caller has no
/// preference.
pub const DEFAULT_CHECKOUT_MODE: u32 = 0o660;

/// Overwrites the working tree around `dir` with `state`.
///
/// The existing `accounts/` and `budget/` directories are removed first to
/// prevent an inadvertent merge with whatever was checked out before.
/// Checkout is not transactional: a crash can leave a partial tree, which
/// only affects the next commit's input, never the object store.
pub async fn checkout_state(
    state: &State,
    dir: &Path,
    mode: u32,
    token: &CancellationToken,
) -> Result<(), IndexError> {
    let root = root_directory(dir)?;

    let accounts_dir = root.join(ACCOUNTS_DIR);
    remove_dir_if_present(&accounts_dir).await?;
    create_dir(&accounts_dir, mode).await?;

    let budget_dir = root.join(BUDGET_DIR);
    remove_dir_if_present(&budget_dir).await?;
    create_dir(&budget_dir, mode).await?;

    for (name, balance) in state.accounts.iter() {
        ensure_live(token)?;
        let account_dir = accounts_dir.join(name);
        tokio::fs::create_dir_all(&account_dir).await?;
        write_cash_file(&account_dir, balance, mode).await?;
    }

    write_budget_tree(&budget_dir, &state.budget, mode, token).await
}

/// Checks out the state a transaction resulted in.
pub async fn checkout_transaction(
    transaction: &Transaction,
    dir: &Path,
    mode: u32,
    token: &CancellationToken,
) -> Result<(), IndexError> {
    checkout_state(&transaction.state, dir, mode, token).await
}

fn write_budget_tree<'a>(
    dir: &'a Path,
    budget: &'a Budget,
    mode: u32,
    token: &'a CancellationToken,
) -> BoxFuture<'a, Result<(), IndexError>> {
    async move {
        ensure_live(token)?;
        tokio::fs::create_dir_all(dir).await?;
        write_cash_file(dir, &budget.balance, mode).await?;

        for (name, child) in &budget.children {
            write_budget_tree(&dir.join(name), child, mode, token).await?;
        }
        Ok(())
    }
    .boxed()
}

async fn remove_dir_if_present(dir: &Path) -> Result<(), IndexError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

async fn create_dir(dir: &Path, mode: u32) -> Result<(), IndexError> {
    tokio::fs::create_dir(dir).await?;
    apply_mode(dir, mode | 0o110).await
}

#[cfg(unix)]
pub(crate) async fn apply_mode(path: &Path, mode: u32) -> Result<(), IndexError> {
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, Permissions::from_mode(mode)).await?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) async fn apply_mode(_path: &Path, _mode: u32) -> Result<(), IndexError> {
    Ok(())
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
    use crate::load::load_state;
    use crate::REPO_DIR;
    use coffer_types::{Accounts, Balance};
    use std::collections::BTreeMap;

    fn bal(text: &str) -> Balance {
        Balance::parse(text).unwrap()
    }

    fn scaffold() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(REPO_DIR)).unwrap();
        dir
    }

    fn nested_state() -> State {
        let mut accounts = Accounts::new();
        accounts.insert("checking", bal("USD 100.96"));
        accounts.insert("citi/savings", bal("USD 4783.02"));

        let mut children = BTreeMap::new();
        children.insert("foo".to_string(), Budget::with_balance(bal("USD 100.96")));
        let mut bar = Budget::with_balance(bal("USD 4000"));
        bar.children
            .insert("baz".to_string(), Budget::with_balance(bal("USD 783.02")));
        children.insert("bar".to_string(), bar);

        State {
            accounts,
            budget: Budget {
                balance: Balance::new(),
                children,
            },
        }
    }

    #[tokio::test]
    async fn checkout_round_trips() {
        let dir = scaffold();
        let token = CancellationToken::new();

        for state in [nested_state(), State::default()] {
            checkout_state(&state, dir.path(), DEFAULT_CHECKOUT_MODE, &token)
                .await
                .unwrap();

            let loaded = load_state(dir.path(), &token).await.unwrap();
            assert!(
                loaded.subtract(&state).is_zero(),
                "loaded tree diverged from the checked-out state"
            );
        }
    }

    #[tokio::test]
    async fn checkout_replaces_previous_contents() {
        let dir = scaffold();
        let token = CancellationToken::new();

        checkout_state(&nested_state(), dir.path(), DEFAULT_CHECKOUT_MODE, &token)
            .await
            .unwrap();

        let mut trimmed = nested_state();
        trimmed.accounts.remove("citi/savings");
        trimmed.budget.children.remove("bar");
        checkout_state(&trimmed, dir.path(), DEFAULT_CHECKOUT_MODE, &token)
            .await
            .unwrap();

        let loaded = load_state(dir.path(), &token).await.unwrap();
        assert!(!loaded.accounts.contains("citi/savings"));
        assert!(!loaded.budget.children.contains_key("bar"));
    }

    #[tokio::test]
    async fn checkout_honors_cancellation() {
        let dir = scaffold();
        let token = CancellationToken::new();
        token.cancel();

        assert!(matches!(
            checkout_state(&nested_state(), dir.path(), DEFAULT_CHECKOUT_MODE, &token).await,
            Err(IndexError::Cancelled)
        ));
    }
}
