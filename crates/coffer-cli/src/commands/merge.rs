//! `coffer merge` – reconcile divergent histories onto the working tree.

use std::process::ExitCode;

use clap::Args;
use tokio_util::sync::CancellationToken;

use coffer_index::{checkout_state, DEFAULT_CHECKOUT_MODE};
use coffer_store_core::RefSpec;

use crate::workspace;
use crate::UserError;

#[derive(Args)]
pub struct MergeArgs {
    /// Histories to merge into the current one.
    #[arg(required = true)]
    pub refspecs: Vec<String>,
}

pub async fn run(args: MergeArgs, token: &CancellationToken) -> anyhow::Result<ExitCode> {
    let ws = workspace::open().await?;

    let mut inputs = vec![ws.repo.resolve(&RefSpec::head(), token).await?];
    for refspec in &args.refspecs {
        inputs.push(ws.repo.resolve(&RefSpec::new(refspec), token).await?);
    }
    inputs.retain(|id| !id.is_null());
    if inputs.is_empty() {
        return Err(UserError("nothing to merge in an empty repository".to_string()).into());
    }

    let merged = ws.repo.merge(&inputs, token).await?;
    checkout_state(&merged, &ws.root, DEFAULT_CHECKOUT_MODE, token).await?;

    println!(
        "Merge complete. Check balances for accuracy, make any necessary reverts, then commit."
    );
    Ok(ExitCode::SUCCESS)
}
