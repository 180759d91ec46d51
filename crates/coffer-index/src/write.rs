//! Writing individual working-tree entries.

use std::path::Path;

use coffer_types::{Balance, Budget};

use crate::checkout::{apply_mode, DEFAULT_CHECKOUT_MODE};
use crate::error::IndexError;
use crate::CASH_FILE;

/// Writes an envelope's own balance to the cash file in `dir`, leaving its
/// children untouched. This is how in-place adjustments (credit, debit,
/// transfer) land on the working tree.
pub async fn write_budget_node(dir: &Path, budget: &Budget) -> Result<(), IndexError> {
    write_cash_file(dir, &budget.balance, DEFAULT_CHECKOUT_MODE).await
}

pub(crate) async fn write_cash_file(
    dir: &Path,
    balance: &Balance,
    mode: u32,
) -> Result<(), IndexError> {
    let path = dir.join(CASH_FILE);
    let mut contents = balance.to_string();
    contents.push('\n');
    tokio::fs::write(&path, contents).await?;
    apply_mode(&path, mode).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn node_write_preserves_children_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let child_dir = dir.path().join("groceries");
        std::fs::create_dir(&child_dir).unwrap();
        std::fs::write(child_dir.join(CASH_FILE), "USD 10\n").unwrap();

        let node = Budget::with_balance(Balance::parse("USD 25").unwrap());
        write_budget_node(dir.path(), &node).await.unwrap();

        let written = std::fs::read_to_string(dir.path().join(CASH_FILE)).unwrap();
        assert_eq!(written, "USD 25.000\n");
        let untouched = std::fs::read_to_string(child_dir.join(CASH_FILE)).unwrap();
        assert_eq!(untouched, "USD 10\n");
    }
}
