//! `coffer show` – every known detail of one transaction.

use std::io::Write;
use std::process::ExitCode;

use clap::Args;
use tokio_util::sync::CancellationToken;

use coffer_store_core::RefSpec;

use crate::format;
use crate::workspace;

#[derive(Args)]
pub struct ShowArgs {
    /// The transaction to display.
    pub refspec: String,
}

pub async fn run(args: ShowArgs, token: &CancellationToken) -> anyhow::Result<ExitCode> {
    let ws = workspace::open().await?;

    let target = ws.repo.resolve(&RefSpec::new(&args.refspec), token).await?;
    let transaction = ws.repo.load_transaction(target, token).await?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{target}")?;
    format::pretty_transaction(&mut out, &ws.repo, &transaction, token).await?;
    out.flush()?;

    Ok(ExitCode::SUCCESS)
}
