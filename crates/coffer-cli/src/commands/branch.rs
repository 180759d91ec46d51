//! `coffer branch` – list branches or create one.

use std::process::ExitCode;

use clap::Args;
use tokio_util::sync::CancellationToken;

use coffer_store_core::RefSpec;

use crate::workspace;

#[derive(Args)]
pub struct BranchArgs {
    /// Create a branch with this name at the current transaction; list all
    /// branches when omitted.
    pub name: Option<String>,

    /// Move the branch if it already exists.
    #[arg(long)]
    pub force: bool,
}

pub async fn run(args: BranchArgs, token: &CancellationToken) -> anyhow::Result<ExitCode> {
    let ws = workspace::open().await?;

    match args.name {
        Some(name) => {
            let head = ws.repo.resolve(&RefSpec::head(), token).await?;
            if args.force {
                ws.repo.write_branch(&name, head, token).await?;
            } else {
                ws.repo.create_branch(&name, head, token).await?;
            }
        }
        None => {
            let head_ref = ws.repo.current(token).await?;
            let mut names = ws.repo.list_branches(token).await?;
            names.sort();
            for name in names {
                if name == head_ref.as_str() {
                    println!("{name} *");
                } else {
                    println!("{name}");
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
