//! `coffer index` – inspect or reconstruct repository indexes.

use std::process::ExitCode;

use clap::{Args, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;

use coffer_store_core::{RefSpec, Walk, WalkMode};
use coffer_types::ObjectId;

use crate::workspace;

#[derive(Subcommand)]
pub enum IndexCommand {
    /// Find transactions by bank-assigned record ID.
    ///
    /// Exits 0 when at least one transaction carries the identifier and 1
    /// when none do.
    #[command(name = "bank-record-id", alias = "bri")]
    BankRecordId(BankRecordIdArgs),

    /// Reconstruct the bank record index from history.
    ///
    /// Walks every transaction reachable from HEAD and re-appends any
    /// record ID the index is missing. Existing entries are left in place;
    /// the index is append-only.
    Rebuild,
}

#[derive(Args)]
pub struct BankRecordIdArgs {
    /// The identifier assigned by the financial institution.
    pub record_id: String,

    /// How matching transactions should be relayed.
    #[arg(short = 'f', long, value_enum, default_value = "none")]
    pub output_format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Only the exit status carries the answer.
    None,
    /// Print `true` when any transaction matches, `false` otherwise.
    Any,
}

pub async fn run(command: IndexCommand, token: &CancellationToken) -> anyhow::Result<ExitCode> {
    match command {
        IndexCommand::BankRecordId(args) => bank_record_id(args, token).await,
        IndexCommand::Rebuild => rebuild(token).await,
    }
}

async fn bank_record_id(
    args: BankRecordIdArgs,
    token: &CancellationToken,
) -> anyhow::Result<ExitCode> {
    let ws = workspace::open().await?;
    let ids = ws
        .repo
        .transactions_by_bank_record(&args.record_id, token)
        .await?;

    if args.output_format == OutputFormat::Any {
        println!("{}", !ids.is_empty());
    }

    Ok(if ids.is_empty() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn rebuild(token: &CancellationToken) -> anyhow::Result<ExitCode> {
    let ws = workspace::open().await?;

    let head = ws.repo.resolve(&RefSpec::head(), token).await?;
    if head.is_null() {
        return Ok(ExitCode::SUCCESS);
    }

    let mut tagged: Vec<(String, ObjectId)> = Vec::new();
    ws.repo
        .walk(head, WalkMode::AllParents, token, |id, transaction| {
            if !transaction.record_id.is_empty() {
                tagged.push((transaction.record_id.clone(), id));
            }
            Walk::Continue
        })
        .await?;

    let mut restored = 0usize;
    for (record_id, id) in tagged {
        let indexed = ws
            .repo
            .transactions_by_bank_record(&record_id, token)
            .await?;
        if !indexed.contains(&id) {
            ws.repo.index_bank_record(&record_id, id, token).await?;
            restored += 1;
        }
    }

    println!("Index rebuilt; {restored} entries restored.");
    Ok(ExitCode::SUCCESS)
}
