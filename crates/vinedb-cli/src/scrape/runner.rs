//! Batch orchestration: walks the source records one entity at a time,
//! resolves, enriches, and upserts each, and records every outcome in the
//! ledger before moving on.

use anyhow::Context;
use vinedb_core::{
    EntityKind, FailedEntry, LedgerOutcome, LedgerState, LedgerStatus, LedgerStore, SourceRecord,
};
use vinedb_db::{upsert_entity, CatalogStore, UpsertOutcome};
use vinedb_scraper::{build_probe_plan, MatchTarget, ProbeTarget};

use super::enrich::enrich;
use super::entity::resolve_entity;
use super::pipeline::Pipeline;

/// Ledger key for an entity, e.g. `wine:opus-one-2019`.
pub(crate) fn ledger_id(kind: EntityKind, slug: &str) -> String {
    format!("{kind}:{slug}")
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RunOptions {
    /// Process only the entity with this slug, whatever its ledger state.
    pub only: Option<String>,
    /// Cap on entities actually processed this run.
    pub limit: Option<usize>,
    /// Re-scrape entities whose stored record is already complete.
    pub force: bool,
}

/// Totals for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RunSummary {
    pub processed: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Entities left alone because the ledger already has them in a
    /// terminal state.
    pub already_done: usize,
    pub failed: Vec<FailedEntry>,
}

impl RunSummary {
    fn count(&mut self, id: &str, outcome: &LedgerOutcome) {
        match outcome {
            LedgerOutcome::Processed => self.processed += 1,
            LedgerOutcome::Updated => self.updated += 1,
            LedgerOutcome::Skipped => self.skipped += 1,
            LedgerOutcome::Failed(reason) => self.failed.push(FailedEntry {
                id: id.to_string(),
                reason: reason.clone(),
            }),
        }
    }

    /// Entities handled this run, excluding ones already done.
    pub(crate) fn attempted(&self) -> usize {
        self.processed + self.updated + self.skipped + self.failed.len()
    }
}

/// Names of every known winery; used to penalize listing links that point
/// at a different winery's wine.
fn known_parents(records: &[SourceRecord]) -> Vec<String> {
    let mut parents: Vec<String> = Vec::new();
    let names = records.iter().flat_map(|r| match r.kind {
        EntityKind::Winery => Some(r.name_en.as_str()),
        EntityKind::Wine => r.winery.as_deref(),
    });
    for name in names {
        if !parents.iter().any(|p| p.eq_ignore_ascii_case(name)) {
            parents.push(name.to_string());
        }
    }
    parents
}

fn match_target(record: &SourceRecord, parents: &[String]) -> MatchTarget {
    let names: Vec<String> = std::iter::once(record.name_en.clone())
        .chain(record.name_zh.clone())
        .collect();
    let other_parents = parents
        .iter()
        .filter(|p| !p.eq_ignore_ascii_case(&record.name_en))
        .filter(|p| {
            record
                .winery
                .as_deref()
                .is_none_or(|own| !p.eq_ignore_ascii_case(own))
        })
        .cloned()
        .collect();
    MatchTarget {
        names,
        parent: record.winery.clone(),
        other_parents,
    }
}

/// Runs one entity to a terminal ledger outcome.
///
/// # Errors
///
/// Returns an error for store failures or an unusable site URL; the caller
/// records these as `failed`.
async fn process_entity<S: CatalogStore>(
    pipeline: &Pipeline,
    store: &S,
    record: &SourceRecord,
    parents: &[String],
    force: bool,
) -> anyhow::Result<LedgerOutcome> {
    let slug = record.slug();
    let existing = match store.find_by_slug(record.kind, &slug).await? {
        Some(found) => Some(found),
        None => {
            store
                .find_by_name(record.kind, &record.name_en, record.name_zh.as_deref())
                .await?
        }
    };

    if let Some(existing) = existing
        .as_ref()
        .filter(|e| !force && e.fields.is_complete())
    {
        tracing::info!(entity = %slug, id = %existing.id, "already complete; skipping");
        return Ok(LedgerOutcome::Skipped);
    }

    let known_url = existing
        .as_ref()
        .and_then(|e| e.fields.external_url.as_deref())
        .or(record.external_url.as_deref());
    let plan = build_probe_plan(
        &pipeline.site,
        &ProbeTarget {
            kind: record.kind,
            name_en: &record.name_en,
            name_zh: record.name_zh.as_deref(),
            parent_name: record.winery.as_deref(),
            known_url,
            country: record.country.as_deref(),
            category: record.category.as_deref(),
        },
    )
    .context("building candidate URLs")?;
    tracing::debug!(entity = %slug, probes = plan.len(), "resolving");

    let target = match_target(record, parents);
    let resolution = resolve_entity(&pipeline.fetcher, plan, &target, &pipeline.matching).await;
    let Some(candidate) = resolution.candidate.as_ref() else {
        return Ok(LedgerOutcome::Failed(resolution.failure_reason()));
    };

    let fields = enrich(
        pipeline,
        record,
        candidate,
        existing.as_ref().map(|e| &e.fields),
    )
    .await;

    let mut draft = record.to_draft();
    draft.fields.patch_from(&fields);
    let outcome = upsert_entity(store, draft)
        .await
        .context("persisting entity")?;

    Ok(match outcome {
        UpsertOutcome::Created { id } => {
            tracing::info!(entity = %slug, %id, url = %candidate.url, "created");
            LedgerOutcome::Processed
        }
        UpsertOutcome::Updated { id, fields } => {
            tracing::info!(entity = %slug, %id, fields = ?fields, "updated");
            LedgerOutcome::Updated
        }
        UpsertOutcome::Unchanged { id } => {
            tracing::info!(entity = %slug, %id, "match added nothing new");
            LedgerOutcome::Skipped
        }
    })
}

fn persist<L: LedgerStore>(ledger: &L, state: &LedgerState) -> anyhow::Result<()> {
    ledger.save(state).context("saving progress ledger")
}

/// Processes `records` sequentially, saving the ledger after every entity.
///
/// Entities the ledger marks `processed`, `updated`, or `skipped` are not
/// touched. Entities marked `failed` are promoted out of the failed list and
/// retried once. Per-entity errors are recorded and never stop the run.
///
/// # Errors
///
/// Returns an error if the ledger cannot be loaded or saved, or if `only`
/// names a slug absent from `records`.
pub(crate) async fn run_entities<S: CatalogStore, L: LedgerStore>(
    pipeline: &Pipeline,
    store: &S,
    ledger: &L,
    records: &[SourceRecord],
    options: &RunOptions,
) -> anyhow::Result<RunSummary> {
    let mut state = ledger.load().context("loading progress ledger")?;
    let parents = known_parents(records);

    let selected: Vec<&SourceRecord> = match options.only.as_deref() {
        Some(only) => {
            let found: Vec<&SourceRecord> = records.iter().filter(|r| r.slug() == only).collect();
            if found.is_empty() {
                anyhow::bail!("no source record with slug '{only}'");
            }
            found
        }
        None => records.iter().collect(),
    };

    let mut summary = RunSummary::default();
    for record in selected {
        if options.limit.is_some_and(|limit| summary.attempted() >= limit) {
            tracing::info!(limit = ?options.limit, "limit reached; stopping");
            break;
        }

        let id = ledger_id(record.kind, &record.slug());
        let status = state.status(&id);
        if status.is_terminal() && options.only.is_none() {
            summary.already_done += 1;
            continue;
        }
        if let LedgerStatus::Failed { reason } = &status {
            tracing::info!(entity = %id, previous = %reason, "retrying failed entity");
        }
        state.begin_retry(&id);

        let outcome = match process_entity(pipeline, store, record, &parents, options.force).await
        {
            Ok(outcome) => outcome,
            Err(e) => LedgerOutcome::Failed(format!("{e:#}")),
        };
        if let LedgerOutcome::Failed(reason) = &outcome {
            tracing::warn!(entity = %id, reason = %reason, "entity failed");
        }

        summary.count(&id, &outcome);
        state.record(&id, outcome);
        persist(ledger, &state)?;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: EntityKind, name: &str, winery: Option<&str>) -> SourceRecord {
        SourceRecord {
            kind,
            name_en: name.to_string(),
            name_zh: None,
            winery: winery.map(str::to_string),
            country: None,
            category: None,
            region: None,
            vintage: None,
            external_url: None,
            price: None,
        }
    }

    #[test]
    fn ledger_id_joins_kind_and_slug() {
        assert_eq!(ledger_id(EntityKind::Wine, "opus-one-2019"), "wine:opus-one-2019");
        assert_eq!(ledger_id(EntityKind::Winery, "opus-one"), "winery:opus-one");
    }

    #[test]
    fn known_parents_are_deduplicated_case_insensitively() {
        let records = vec![
            record(EntityKind::Winery, "Opus One", None),
            record(EntityKind::Wine, "Overture", Some("opus one")),
            record(EntityKind::Wine, "Tignanello 2019", Some("Antinori")),
        ];
        assert_eq!(known_parents(&records), vec!["Opus One", "Antinori"]);
    }

    #[test]
    fn match_target_excludes_own_parent_from_penalties() {
        let parents = vec!["Opus One".to_string(), "Antinori".to_string()];
        let wine = record(EntityKind::Wine, "Overture", Some("Opus One"));
        let target = match_target(&wine, &parents);
        assert_eq!(target.parent.as_deref(), Some("Opus One"));
        assert_eq!(target.other_parents, vec!["Antinori"]);

        let winery = record(EntityKind::Winery, "Antinori", None);
        let target = match_target(&winery, &parents);
        assert_eq!(target.other_parents, vec!["Opus One"]);
    }

    #[test]
    fn summary_counts_attempts() {
        let mut summary = RunSummary::default();
        summary.count("a", &LedgerOutcome::Processed);
        summary.count("b", &LedgerOutcome::Failed("no match".to_string()));
        summary.already_done = 4;
        assert_eq!(summary.attempted(), 2);
        assert_eq!(summary.failed[0].id, "b");
    }
}
