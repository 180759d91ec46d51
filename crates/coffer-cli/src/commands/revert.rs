//! `coffer revert` – undo a past transaction on the working tree.

use std::process::ExitCode;

use clap::Args;
use tokio_util::sync::CancellationToken;

use coffer_index::{checkout_state, DEFAULT_CHECKOUT_MODE};
use coffer_store_core::RefSpec;

use crate::format;
use crate::workspace;
use crate::UserError;

#[derive(Args)]
pub struct RevertArgs {
    /// The transaction whose effects should be undone.
    pub refspec: String,
}

pub async fn run(args: RevertArgs, token: &CancellationToken) -> anyhow::Result<ExitCode> {
    let ws = workspace::open().await?;

    let target = ws.repo.resolve(&RefSpec::new(&args.refspec), token).await?;
    let to_revert = ws.repo.load_transaction(target, token).await?;
    let impact = format::impact_of(&ws.repo, &to_revert, token).await?;

    let head = ws.repo.resolve(&RefSpec::head(), token).await?;
    if head.is_null() {
        return Err(UserError("nothing committed to revert against".to_string()).into());
    }
    let head_state = ws.repo.load_transaction(head, token).await?.state;

    let updated = head_state.add(&impact.negate());
    checkout_state(&updated, &ws.root, DEFAULT_CHECKOUT_MODE, token).await?;

    println!(
        "Undid the effects of transaction {target}. Check current balances for accuracy, make any necessary edits, then commit."
    );
    Ok(ExitCode::SUCCESS)
}
