//! The `scrape` command: resolve source records against the external site
//! and upsert what was found.
//!
//! Entities are processed strictly one at a time. Per-entity failures are
//! recorded in the ledger and reported at the end; they never abort the run.

mod enrich;
mod entity;
mod pipeline;
mod runner;

use std::path::PathBuf;

use clap::Args;
use vinedb_core::{
    load_sources, AppConfig, EntityKind, FileLedgerStore, LedgerStore, MemoryLedgerStore,
};
use vinedb_db::{CatalogStore, MemoryCatalogStore, PgCatalogStore, PoolConfig};

use pipeline::Pipeline;
use runner::{run_entities, RunOptions, RunSummary};

#[derive(Debug, Clone, Args)]
pub struct ScrapeArgs {
    /// Entity kind to scrape (`wine` or `winery`); both when omitted,
    /// wineries first
    #[arg(long)]
    pub kind: Option<EntityKind>,

    /// Source records file (YAML, JSON, or CSV); defaults to `VINEDB_SOURCES_PATH`
    #[arg(long)]
    pub sources: Option<PathBuf>,

    /// Progress ledger file; defaults to `VINEDB_LEDGER_PATH`
    #[arg(long)]
    pub ledger: Option<PathBuf>,

    /// Process a single entity by slug, ignoring its ledger state
    #[arg(long)]
    pub only: Option<String>,

    /// Stop after this many entities have been processed
    #[arg(long)]
    pub limit: Option<usize>,

    /// Re-scrape entities whose stored record is already complete
    #[arg(long)]
    pub force: bool,

    /// Resolve matches without writing the catalog or the ledger
    #[arg(long)]
    pub dry_run: bool,
}

impl ScrapeArgs {
    fn options(&self) -> RunOptions {
        RunOptions {
            only: self.only.clone(),
            limit: self.limit,
            force: self.force,
        }
    }
}

/// Runs the scrape pipeline over the configured source records.
///
/// # Errors
///
/// Returns an error if the source file or ledger cannot be read, the
/// database is unreachable, or the ledger cannot be saved. Individual entity
/// failures are not errors.
pub(crate) async fn run_scrape(config: &AppConfig, args: &ScrapeArgs) -> anyhow::Result<()> {
    let sources_path = args
        .sources
        .clone()
        .unwrap_or_else(|| config.sources_path.clone());
    let ledger_path = args
        .ledger
        .clone()
        .unwrap_or_else(|| config.ledger_path.clone());

    let mut records = load_sources(&sources_path)?;
    if let Some(kind) = args.kind {
        records.retain(|r| r.kind == kind);
    }
    // Wineries go first so a wine's parent exists by the time it is upserted.
    records.sort_by_key(|r| r.kind != EntityKind::Winery);
    if records.is_empty() {
        println!("no source records to scrape in {}", sources_path.display());
        return Ok(());
    }

    let mut pipeline = Pipeline::from_app_config(config)?;
    if args.dry_run {
        pipeline = pipeline.without_external_writes();
    }
    let pool =
        vinedb_db::connect_pool(&config.database_url, PoolConfig::from_app_config(config)).await?;
    let catalog = PgCatalogStore::new(pool.clone());
    let ledger = FileLedgerStore::new(&ledger_path);

    tracing::info!(
        records = records.len(),
        sources = %sources_path.display(),
        ledger = %ledger_path.display(),
        dry_run = args.dry_run,
        "starting scrape"
    );

    let summary = if args.dry_run {
        let snapshot = MemoryCatalogStore::with_entities(catalog.list(args.kind).await?);
        let scratch = MemoryLedgerStore::with_state(ledger.load()?);
        run_entities(&pipeline, &snapshot, &scratch, &records, &args.options()).await?
    } else {
        run_entities(&pipeline, &catalog, &ledger, &records, &args.options()).await?
    };

    pool.close().await;
    print_summary(&summary, args.dry_run);
    Ok(())
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    println!(
        "scrape complete: {} created, {} updated, {} skipped, {} failed, {} already done",
        summary.processed,
        summary.updated,
        summary.skipped,
        summary.failed.len(),
        summary.already_done
    );
    if !summary.failed.is_empty() {
        println!("failed entities:");
        for entry in &summary.failed {
            println!("  {}: {}", entry.id, entry.reason);
        }
    }
    if dry_run {
        println!("dry-run: catalog and ledger were not written");
    }
}

#[cfg(test)]
#[path = "scrape_test.rs"]
mod tests;
