//! `coffer log` – walk the current history, newest first.

use std::io::Write;
use std::process::ExitCode;

use clap::Args;
use tokio_util::sync::CancellationToken;

use coffer_store_core::RefSpec;
use coffer_types::{Impact, ObjectId};

use crate::format;
use crate::workspace;

#[derive(Args)]
pub struct LogArgs {
    /// Restrict output to transactions touching these working-tree paths,
    /// e.g. `budget/groceries` or `accounts/citi/checking`.
    pub paths: Vec<String>,
}

pub async fn run(args: LogArgs, token: &CancellationToken) -> anyhow::Result<ExitCode> {
    let ws = workspace::open().await?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    // History follows first parents only; merges read as one line of
    // descent.
    let mut current = ws.repo.resolve(&RefSpec::head(), token).await?;
    while !current.is_null() {
        let transaction = ws.repo.load_transaction(current, token).await?;
        let impact = format::impact_of(&ws.repo, &transaction, token).await?;

        if args.paths.is_empty() || args.paths.iter().any(|path| touches(&impact, path)) {
            format::concise_transaction(&mut out, current, &transaction)?;
        }

        current = transaction.parent().unwrap_or(ObjectId::NULL);
    }

    out.flush()?;
    Ok(ExitCode::SUCCESS)
}

/// Whether an impact reaches the entity a working-tree path names.
fn touches(impact: &Impact, raw: &str) -> bool {
    let cleaned = raw.replace('\\', "/");
    let cleaned = cleaned
        .trim_start_matches("./")
        .trim_matches('/');

    if let Some(rest) = cleaned.strip_prefix("budget") {
        let rest = rest.trim_start_matches('/');
        return impact.0.budget.descendant(rest).is_some();
    }
    if let Some(rest) = cleaned.strip_prefix("accounts/") {
        return impact.0.accounts.contains(rest);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffer_types::{Balance, Budget, State};

    fn sample_impact() -> Impact {
        let mut state = State::default();
        state
            .accounts
            .insert("citi/checking", Balance::parse("USD -5").unwrap());
        state.budget.children.insert(
            "groceries".to_string(),
            Budget::with_balance(Balance::parse("USD -5").unwrap()),
        );
        Impact::from(state)
    }

    #[test]
    fn budget_and_account_paths_match() {
        let impact = sample_impact();
        assert!(touches(&impact, "budget/groceries"));
        assert!(touches(&impact, "./budget/groceries/"));
        assert!(touches(&impact, "accounts/citi/checking"));
        assert!(touches(&impact, "budget"));
    }

    #[test]
    fn unrelated_paths_do_not_match() {
        let impact = sample_impact();
        assert!(!touches(&impact, "budget/rent"));
        assert!(!touches(&impact, "accounts/chase/checking"));
        assert!(!touches(&impact, "groceries"));
    }
}
