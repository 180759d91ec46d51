//! `coffer init` – create a new repository.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;

use coffer_index::{ACCOUNTS_DIR, BUDGET_DIR, REPO_DIR};
use coffer_store_fs::FsBackend;

#[derive(Args)]
pub struct InitArgs {
    /// Directory to initialize; defaults to the current directory.
    pub directory: Option<PathBuf>,
}

pub async fn run(args: InitArgs) -> anyhow::Result<ExitCode> {
    let target = args.directory.unwrap_or_else(|| PathBuf::from("."));
    tokio::fs::create_dir_all(&target).await?;

    FsBackend::init(target.join(REPO_DIR)).await?;
    for dir in [ACCOUNTS_DIR, BUDGET_DIR] {
        tokio::fs::create_dir(target.join(dir)).await?;
    }

    Ok(ExitCode::SUCCESS)
}
