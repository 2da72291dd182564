//! The `ledger` command: inspect or clear scrape progress.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use clap::Subcommand;
use vinedb_core::{FileLedgerStore, LedgerState, LedgerStore};

#[derive(Debug, Subcommand)]
pub enum LedgerCommands {
    /// Print per-state counts and every failed entity with its reason
    Show,
    /// Clear every entry so the next scrape starts from scratch
    Reset,
}

fn render(state: &LedgerState) -> String {
    let mut out = format!(
        "processed: {}\nupdated: {}\nskipped: {}\nfailed: {}\n",
        state.processed_ids.len(),
        state.updated_ids.len(),
        state.skipped_ids.len(),
        state.failed_ids.len()
    );
    // Writing to a String cannot fail.
    match state.last_update {
        Some(at) => {
            let _ = writeln!(out, "last update: {}", at.to_rfc3339());
        }
        None => out.push_str("last update: never\n"),
    }
    for entry in &state.failed_ids {
        let _ = writeln!(out, "  {}: {}", entry.id, entry.reason);
    }
    out
}

pub(crate) fn run_ledger(path: &Path, command: &LedgerCommands) -> anyhow::Result<()> {
    let store = FileLedgerStore::new(path);
    let mut state = store
        .load()
        .with_context(|| format!("reading ledger {}", path.display()))?;

    match command {
        LedgerCommands::Show => print!("{}", render(&state)),
        LedgerCommands::Reset => {
            let cleared = state.processed_ids.len()
                + state.updated_ids.len()
                + state.skipped_ids.len()
                + state.failed_ids.len();
            state.reset();
            store.save(&state)?;
            tracing::info!(path = %path.display(), cleared, "ledger reset");
            println!("ledger reset: {cleared} entries cleared");
        }
    }
    Ok(())
}
