//! `coffer commit` – snapshot the working tree into history.

use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use coffer_index::load_state;
use coffer_store_core::{RefSpec, StoreError};
use coffer_types::{detect_amount, Balance, State, Transaction};

use crate::workspace;
use crate::UserError;

#[derive(Args)]
pub struct CommitArgs {
    /// The party receiving funds as part of this transaction.
    #[arg(short, long, default_value = "Unknown")]
    merchant: String,

    /// Notes that may be helpful later when identifying this transaction.
    #[arg(short, long, default_value = "")]
    comment: String,

    /// Explicit magnitude, e.g. `USD 12.34`; inferred from the recorded
    /// change when omitted.
    #[arg(long)]
    amount: Option<String>,

    /// Unique identifier your bank assigned to this transaction.
    #[arg(long)]
    bank_record_id: Option<String>,

    /// When the purchase or deposit actually happened (RFC 3339).
    #[arg(short = 't', long)]
    actual_time: Option<String>,

    /// When the institution posted the transaction (RFC 3339).
    #[arg(long)]
    posted_time: Option<String>,

    /// Commit even when account and budget totals disagree.
    #[arg(long)]
    force: bool,
}

pub async fn run(args: CommitArgs, token: &CancellationToken) -> anyhow::Result<ExitCode> {
    let ws = workspace::open().await?;
    let state = load_state(&ws.root, token).await?;

    let head_ref = ws.repo.current(token).await?;
    let parent_id = ws.repo.resolve(&RefSpec::head(), token).await?;
    let parent_state = if parent_id.is_null() {
        State::default()
    } else {
        ws.repo.load_transaction(parent_id, token).await?.state
    };

    let amount = match &args.amount {
        Some(text) => Balance::parse(text)?,
        None => detect_amount(&parent_state, &state),
    };

    let imbalance = state.imbalance();
    if !imbalance.is_zero() && !args.force && !confirm_imbalance(&imbalance, token).await? {
        eprintln!("Commit aborted.");
        return Ok(ExitCode::FAILURE);
    }

    let transaction = Transaction {
        state,
        parents: if parent_id.is_null() {
            Vec::new()
        } else {
            vec![parent_id]
        },
        amount,
        merchant: args.merchant,
        comment: args.comment,
        record_id: args.bank_record_id.unwrap_or_default(),
        actual_time: parse_time(args.actual_time.as_deref())?,
        posted_time: parse_time(args.posted_time.as_deref())?,
        entered_time: Some(Utc::now()),
    };

    let id = ws.repo.write_transaction(&transaction, token).await?;

    // Advance the branch HEAD names, or HEAD itself when detached.
    match ws.repo.try_read_branch(head_ref.as_str(), token).await? {
        Some(_) => ws.repo.write_branch(head_ref.as_str(), id, token).await?,
        None => ws.repo.set_current(&RefSpec::from(id), token).await?,
    }

    println!("{id}");
    Ok(ExitCode::SUCCESS)
}

fn parse_time(text: Option<&str>) -> anyhow::Result<Option<DateTime<Utc>>> {
    match text {
        None => Ok(None),
        Some(text) => {
            let parsed = DateTime::parse_from_rfc3339(text)
                .map_err(|err| UserError(format!("{text:?} is not an RFC 3339 time: {err}")))?;
            Ok(Some(parsed.with_timezone(&Utc)))
        }
    }
}

/// Asks the user to acknowledge an account/budget disagreement.
///
/// The stdin read races the cancellation token, so a timed-out commit
/// returns instead of sitting on a blocked reader.
async fn confirm_imbalance(
    imbalance: &Balance,
    token: &CancellationToken,
) -> anyhow::Result<bool> {
    eprintln!("Account and budget totals disagree by: {imbalance}");
    eprint!("Commit anyway? [y/N] ");

    let mut reader = BufReader::new(tokio::io::stdin());
    let mut line = String::new();
    tokio::select! {
        _ = token.cancelled() => Err(StoreError::Cancelled.into()),
        read = reader.read_line(&mut line) => {
            read?;
            Ok(line.trim().eq_ignore_ascii_case("y"))
        }
    }
}
