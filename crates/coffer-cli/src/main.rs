#![forbid(unsafe_code)]

//! **coffer-cli** – Command-line interface for the coffer ledger.
//!
//! Budgets and accounts live on disk as directories the user edits between
//! commits; every commit snapshots that working tree into the repository's
//! content-addressed history, where it can be logged, diffed, branched,
//! merged, and checked out again.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use coffer_index::IndexError;
use coffer_store_core::StoreError;
use coffer_types::BalanceParseError;

mod commands;
mod format;
mod workspace;

use commands::{
    adjust, balance, branch, checkout, commit, diff, index, init, log, merge, rev_parse, revert,
    show,
};

//─────────────────────────────
//  CLI structure
//─────────────────────────────

#[derive(Parser)]
#[command(name = "coffer")]
#[command(about = "A content-addressed personal finance ledger")]
#[command(version)]
struct Cli {
    /// Abort any operation still running after this many seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Log filter, e.g. `warn`, `info`, or `coffer_store_core=debug`.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new repository.
    Init(init::InitArgs),
    /// Record the working tree as a new transaction.
    Commit(commit::CommitArgs),
    /// Reset the working tree to the balances at a transaction.
    Checkout(checkout::CheckoutArgs),
    /// List an overview of each transaction on the current history.
    Log(log::LogArgs),
    /// Display every known detail of one transaction.
    Show(show::ShowArgs),
    /// Compare two states, from the working tree or from history.
    Diff(diff::DiffArgs),
    /// List branches, or create one at the current transaction.
    Branch(branch::BranchArgs),
    /// Combine divergent histories into the working tree.
    Merge(merge::MergeArgs),
    /// Apply the opposite of a past transaction to the working tree.
    Revert(revert::RevertArgs),
    /// Print the transaction identity a refspec names.
    RevParse(rev_parse::RevParseArgs),
    /// Make funds available in budgets or accounts.
    Credit(adjust::CreditArgs),
    /// Remove funds from budgets or accounts.
    Debit(adjust::DebitArgs),
    /// Move funds from one place to another.
    Transfer(adjust::TransferArgs),
    /// Top a budget up (or down) to an exact balance.
    BringTo(adjust::BringToArgs),
    /// Report balances for the repository or one of its subtrees.
    Balance(balance::BalanceArgs),
    /// Inspect or reconstruct repository indexes.
    #[command(subcommand)]
    Index(index::IndexCommand),
}

//─────────────────────────────
//  Entry point
//─────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let token = CancellationToken::new();
    if let Some(secs) = cli.timeout {
        let watchdog = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            watchdog.cancel();
        });
    }

    match run(cli.command, &token).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:#}");
            exit_code_for(&err)
        }
    }
}

async fn run(command: Commands, token: &CancellationToken) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Init(args) => init::run(args).await,
        Commands::Commit(args) => commit::run(args, token).await,
        Commands::Checkout(args) => checkout::run(args, token).await,
        Commands::Log(args) => log::run(args, token).await,
        Commands::Show(args) => show::run(args, token).await,
        Commands::Diff(args) => diff::run(args, token).await,
        Commands::Branch(args) => branch::run(args, token).await,
        Commands::Merge(args) => merge::run(args, token).await,
        Commands::Revert(args) => revert::run(args, token).await,
        Commands::RevParse(args) => rev_parse::run(args, token).await,
        Commands::Credit(args) => adjust::credit(args, token).await,
        Commands::Debit(args) => adjust::debit(args, token).await,
        Commands::Transfer(args) => adjust::transfer(args, token).await,
        Commands::BringTo(args) => adjust::bring_to(args, token).await,
        Commands::Balance(args) => balance::run(args, token).await,
        Commands::Index(command) => index::run(command, token).await,
    }
}

/// A failure the user can act on directly, as opposed to an internal fault.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub(crate) struct UserError(pub String);

/// User-facing failures exit 1; anything unexpected exits 2.
fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    let user_facing = err.downcast_ref::<UserError>().is_some()
        || err.downcast_ref::<StoreError>().is_some()
        || err.downcast_ref::<IndexError>().is_some()
        || err.downcast_ref::<BalanceParseError>().is_some();
    if user_facing {
        ExitCode::FAILURE
    } else {
        ExitCode::from(2)
    }
}
