//! Rendering transactions and impacts for the terminal.

use std::io::Write;

use tokio_util::sync::CancellationToken;

use coffer_store_core::{Repository, StorageBackend};
use coffer_types::{Impact, ObjectId, Transaction};

/// One transaction per paragraph: identity, any recorded times, the amount,
/// and descriptive fields. Used by `log`.
pub fn concise_transaction(
    out: &mut impl Write,
    id: ObjectId,
    transaction: &Transaction,
) -> std::io::Result<()> {
    writeln!(out, "{id}")?;
    if let Some(time) = transaction.actual_time {
        writeln!(out, "\tActual Time:\t{time}")?;
    }
    if let Some(time) = transaction.posted_time {
        writeln!(out, "\tPosted Time:\t{time}")?;
    }
    if let Some(time) = transaction.entered_time {
        writeln!(out, "\tEntered Time:\t{time}")?;
    }
    writeln!(out, "\tAmount:  \t{}", transaction.amount)?;
    writeln!(out, "\tMerchant:\t{}", transaction.merchant)?;
    if !transaction.record_id.is_empty() {
        writeln!(out, "\tBank Record ID:\t{}", transaction.record_id)?;
    }
    writeln!(out, "\tComment: \t{}", transaction.comment)?;
    Ok(())
}

/// Everything `show` knows about a transaction, including per-account and
/// per-budget-path impacts computed against its first parent.
pub async fn pretty_transaction<B: StorageBackend>(
    out: &mut impl Write,
    repo: &Repository<B>,
    transaction: &Transaction,
    token: &CancellationToken,
) -> anyhow::Result<()> {
    let impact = impact_of(repo, transaction, token).await?;

    if let Some(time) = transaction.actual_time {
        writeln!(out, "Actual Time:\t{time}")?;
    }
    if let Some(time) = transaction.posted_time {
        writeln!(out, "Posted Time:\t{time}")?;
    }
    if let Some(time) = transaction.entered_time {
        writeln!(out, "Entered Time:\t{time}")?;
    }
    writeln!(out, "Merchant:\t{}", transaction.merchant)?;
    if !transaction.record_id.is_empty() {
        writeln!(out, "Bank Record ID:\t{}", transaction.record_id)?;
    }
    writeln!(out, "Amount:  \t{}", transaction.amount)?;
    for parent in &transaction.parents {
        writeln!(out, "Parent:  \t{parent}")?;
    }
    writeln!(out, "Comment: \t{}", transaction.comment)?;
    writeln!(out, "Impacts:")?;
    pretty_impact(out, &impact)?;
    Ok(())
}

/// A transaction's impact: its state against its first parent's state, or
/// the state itself viewed as deltas-from-empty for an initial transaction.
pub async fn impact_of<B: StorageBackend>(
    repo: &Repository<B>,
    transaction: &Transaction,
    token: &CancellationToken,
) -> anyhow::Result<Impact> {
    match transaction.parent() {
        Some(parent) if !parent.is_null() => {
            let parent = repo.load_transaction(parent, token).await?;
            Ok(transaction.state.subtract(&parent.state))
        }
        _ => Ok(Impact::from(transaction.state.clone())),
    }
}

/// Account deltas then flattened budget-path deltas, zero entries omitted.
pub fn pretty_impact(out: &mut impl Write, impact: &Impact) -> std::io::Result<()> {
    writeln!(out, "\tAccounts:")?;
    for (name, delta) in impact.0.accounts.iter() {
        writeln!(out, "\t\t{name}: {delta}")?;
    }

    writeln!(out, "\tBudgets:")?;
    for (path, delta) in impact.0.budget.flatten() {
        if delta.is_zero() {
            continue;
        }
        let label = if path.is_empty() { "(root)" } else { path.as_str() };
        writeln!(out, "\t\t{label}: {delta}")?;
    }
    Ok(())
}
