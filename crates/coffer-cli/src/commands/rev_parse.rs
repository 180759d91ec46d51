//! `coffer rev-parse` – print the identity a refspec names.

use std::process::ExitCode;

use clap::Args;
use tokio_util::sync::CancellationToken;

use coffer_store_core::RefSpec;

use crate::workspace;

#[derive(Args)]
pub struct RevParseArgs {
    /// The refspec to realize.
    pub refspec: String,
}

pub async fn run(args: RevParseArgs, token: &CancellationToken) -> anyhow::Result<ExitCode> {
    let ws = workspace::open().await?;
    let id = ws.repo.resolve(&RefSpec::new(&args.refspec), token).await?;
    println!("{id}");
    Ok(ExitCode::SUCCESS)
}
