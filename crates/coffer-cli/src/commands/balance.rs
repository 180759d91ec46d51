//! `coffer balance` – report balances for the repository or a subtree.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use tokio_util::sync::CancellationToken;

use coffer_index::{
    account_name, budget_name, load_accounts, load_budget, root_directory, ACCOUNTS_DIR,
    BUDGET_DIR,
};
use coffer_types::{Accounts, Budget};

use crate::UserError;

#[derive(Args)]
pub struct BalanceArgs {
    /// Repository root, an accounts subtree, or a budget subtree; defaults
    /// to the current directory.
    pub path: Option<PathBuf>,
}

pub async fn run(args: BalanceArgs, token: &CancellationToken) -> anyhow::Result<ExitCode> {
    let target = args
        .path
        .unwrap_or_else(|| PathBuf::from("."))
        .canonicalize()?;
    let root = root_directory(&target)?;

    let accounts_dir = if target == root {
        Some(root.join(ACCOUNTS_DIR))
    } else if account_name(&target).is_ok() {
        Some(target.clone())
    } else {
        None
    };

    let budget_dir = if target == root {
        Some(root.join(BUDGET_DIR))
    } else if budget_name(&target).is_ok() {
        Some(target.clone())
    } else {
        None
    };

    if accounts_dir.is_none() && budget_dir.is_none() {
        return Err(UserError(format!(
            "{} is neither the repository root, an account, nor a budget",
            target.display()
        ))
        .into());
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if let Some(dir) = accounts_dir {
        let accounts = load_accounts(&dir, token).await?;
        write_account_balances(&mut out, &accounts)?;
    }
    if let Some(dir) = budget_dir {
        let budget = load_budget(&dir, token).await?;
        write_budget_balances(&mut out, &budget)?;
    }

    out.flush()?;
    Ok(ExitCode::SUCCESS)
}

fn write_account_balances(out: &mut impl Write, accounts: &Accounts) -> std::io::Result<()> {
    writeln!(out, "Accounts:")?;
    for (name, balance) in accounts.iter() {
        writeln!(out, "\t{name}: {balance}")?;
    }
    Ok(())
}

fn write_budget_balances(out: &mut impl Write, budget: &Budget) -> std::io::Result<()> {
    writeln!(out, "Total: {}", budget.recursive_balance())?;
    writeln!(out, "Balance: {}", budget.balance)?;

    if !budget.children.is_empty() {
        writeln!(out, "Children:")?;
        for (name, child) in &budget.children {
            writeln!(out, "\t{name}: {}", child.recursive_balance())?;
        }
    }
    Ok(())
}
