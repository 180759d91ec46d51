//! In-place working-tree adjustments: `credit`, `debit`, `transfer`, and
//! `bring-to`.
//!
//! These commands edit cash files directly; nothing is recorded in history
//! until the user commits.

use std::path::Path;
use std::process::ExitCode;

use clap::Args;
use tokio_util::sync::CancellationToken;

use coffer_index::{load_budget, write_budget_node, IndexError};
use coffer_types::{Balance, Budget};

use crate::UserError;

#[derive(Args)]
pub struct CreditArgs {
    /// Amount to add, e.g. `USD 12.34`.
    pub amount: String,

    /// Budget or account directories to credit.
    #[arg(required = true)]
    pub targets: Vec<String>,
}

#[derive(Args)]
pub struct DebitArgs {
    /// Amount to remove, e.g. `USD 12.34`.
    pub amount: String,

    /// Budget or account directories to debit.
    #[arg(required = true)]
    pub targets: Vec<String>,
}

#[derive(Args)]
pub struct TransferArgs {
    /// Amount to move, e.g. `USD 12.34`.
    pub amount: String,

    /// Directory funds come from.
    pub source: String,

    /// Directory funds go to.
    pub destination: String,
}

#[derive(Args)]
pub struct BringToArgs {
    /// The balance the destination should end up holding.
    pub balance: String,

    /// Directory the difference is drawn from.
    pub source: String,

    /// Directory brought to the requested balance.
    pub destination: String,

    /// Compare against the destination's own balance, ignoring children.
    #[arg(short, long)]
    pub immediate: bool,
}

pub async fn credit(args: CreditArgs, token: &CancellationToken) -> anyhow::Result<ExitCode> {
    let magnitude = Balance::parse(&args.amount)?;
    for target in &args.targets {
        adjust(target, &magnitude, token).await?;
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn debit(args: DebitArgs, token: &CancellationToken) -> anyhow::Result<ExitCode> {
    let magnitude = Balance::parse(&args.amount)?.negate();
    for target in &args.targets {
        adjust(target, &magnitude, token).await?;
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn transfer(args: TransferArgs, token: &CancellationToken) -> anyhow::Result<ExitCode> {
    let magnitude = Balance::parse(&args.amount)?;
    adjust(&args.source, &magnitude.negate(), token).await?;
    adjust(&args.destination, &magnitude, token).await?;
    Ok(ExitCode::SUCCESS)
}

pub async fn bring_to(args: BringToArgs, token: &CancellationToken) -> anyhow::Result<ExitCode> {
    let desired = Balance::parse(&args.balance)?;

    let mut source = load_node(&args.source, token).await?;
    let mut destination = load_node(&args.destination, token).await?;

    let current = if args.immediate {
        destination.balance.clone()
    } else {
        destination.recursive_balance()
    };
    let delta = desired.sub(&current);

    source.balance = source.balance.sub(&delta);
    destination.balance = destination.balance.add(&delta);

    write_budget_node(Path::new(&args.source), &source).await?;
    write_budget_node(Path::new(&args.destination), &destination).await?;
    Ok(ExitCode::SUCCESS)
}

/// Adds `delta` to the balance held directly at `target`.
async fn adjust(
    target: &str,
    delta: &Balance,
    token: &CancellationToken,
) -> anyhow::Result<()> {
    let mut node = load_node(target, token).await?;
    node.balance = node.balance.add(delta);
    write_budget_node(Path::new(target), &node).await?;
    Ok(())
}

/// Loads the envelope rooted at a working-tree directory, translating a
/// missing directory into a usable complaint.
async fn load_node(target: &str, token: &CancellationToken) -> anyhow::Result<Budget> {
    load_budget(Path::new(target), token)
        .await
        .map_err(|err| match err {
            IndexError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                UserError(format!(
                    "{target:?} was recognized as neither a budget nor an account"
                ))
                .into()
            }
            other => anyhow::Error::from(other),
        })
}
