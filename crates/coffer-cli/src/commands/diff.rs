//! `coffer diff` – compare states from the working tree or history.

use std::io::Write;
use std::process::ExitCode;

use clap::Args;
use tokio_util::sync::CancellationToken;

use coffer_index::load_state;
use coffer_store_core::{RefSpec, Repository, StorageBackend};
use coffer_types::State;

use crate::format;
use crate::workspace;

#[derive(Args)]
pub struct DiffArgs {
    /// Compare the working tree against this transaction (default `HEAD`),
    /// or, with two refspecs, compare the second against the first.
    #[arg(num_args = 0..=2)]
    pub refspecs: Vec<String>,
}

pub async fn run(args: DiffArgs, token: &CancellationToken) -> anyhow::Result<ExitCode> {
    let ws = workspace::open().await?;

    let (left, right) = match args.refspecs.as_slice() {
        [] => (
            load_state(&ws.root, token).await?,
            state_at(&ws.repo, &RefSpec::head(), token).await?,
        ),
        [base] => (
            load_state(&ws.root, token).await?,
            state_at(&ws.repo, &RefSpec::new(base), token).await?,
        ),
        [base, target] => (
            state_at(&ws.repo, &RefSpec::new(target), token).await?,
            state_at(&ws.repo, &RefSpec::new(base), token).await?,
        ),
        _ => unreachable!("clap limits diff to two refspecs"),
    };

    let impact = left.subtract(&right);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    format::pretty_impact(&mut out, &impact)?;
    out.flush()?;

    Ok(ExitCode::SUCCESS)
}

/// The state a refspec points at; the empty repository reads as the empty
/// state.
async fn state_at<B: StorageBackend>(
    repo: &Repository<B>,
    refspec: &RefSpec,
    token: &CancellationToken,
) -> anyhow::Result<State> {
    let id = repo.resolve(refspec, token).await?;
    if id.is_null() {
        return Ok(State::default());
    }
    Ok(repo.load_transaction(id, token).await?.state)
}
