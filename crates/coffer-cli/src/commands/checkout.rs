//! `coffer checkout` – reset the working tree to a past transaction.

use std::process::ExitCode;

use clap::Args;
use tokio_util::sync::CancellationToken;

use coffer_index::{checkout_transaction, DEFAULT_CHECKOUT_MODE};
use coffer_store_core::RefSpec;

use crate::workspace;
use crate::UserError;

#[derive(Args)]
pub struct CheckoutArgs {
    /// The transaction to materialize, e.g. a branch name or `HEAD~2`.
    pub refspec: String,
}

pub async fn run(args: CheckoutArgs, token: &CancellationToken) -> anyhow::Result<ExitCode> {
    let ws = workspace::open().await?;
    let requested = RefSpec::new(&args.refspec);

    // Checking out a branch keeps commits advancing that branch. Anything
    // else leaves HEAD detached at the literal refspec.
    let target = match ws.repo.try_read_branch(requested.as_str(), token).await? {
        Some(id) => id,
        None => {
            tracing::warn!(
                "{} is not a branch; commits made from here will not advance a branch",
                requested
            );
            ws.repo.resolve(&requested, token).await?
        }
    };

    if target.is_null() {
        return Err(UserError(format!("{requested} has no transactions yet")).into());
    }

    let transaction = ws.repo.load_transaction(target, token).await?;
    checkout_transaction(&transaction, &ws.root, DEFAULT_CHECKOUT_MODE, token).await?;
    ws.repo.set_current(&requested, token).await?;

    Ok(ExitCode::SUCCESS)
}
