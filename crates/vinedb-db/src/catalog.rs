//! The catalog store seam and the idempotent upsert built on it.

use std::future::Future;

use uuid::Uuid;
use vinedb_core::{CatalogEntity, EntityDraft, EntityKind};

use crate::DbError;

/// Minimal operations the pipeline needs from a catalog: select by slug or
/// name, insert, and update by id.
pub trait CatalogStore: Send + Sync {
    fn find_by_slug(
        &self,
        kind: EntityKind,
        slug: &str,
    ) -> impl Future<Output = Result<Option<CatalogEntity>, DbError>> + Send;

    /// Case-insensitive match on `name_en`, or an exact match on `name_zh`
    /// when given.
    fn find_by_name(
        &self,
        kind: EntityKind,
        name_en: &str,
        name_zh: Option<&str>,
    ) -> impl Future<Output = Result<Option<CatalogEntity>, DbError>> + Send;

    fn insert(&self, entity: &CatalogEntity) -> impl Future<Output = Result<(), DbError>> + Send;

    fn update(&self, entity: &CatalogEntity) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Every entity of `kind` (or of all kinds), ordered by kind then slug.
    fn list(
        &self,
        kind: Option<EntityKind>,
    ) -> impl Future<Output = Result<Vec<CatalogEntity>, DbError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created { id: Uuid },
    Updated { id: Uuid, fields: Vec<&'static str> },
    Unchanged { id: Uuid },
}

impl UpsertOutcome {
    #[must_use]
    pub fn id(&self) -> Uuid {
        match self {
            UpsertOutcome::Created { id }
            | UpsertOutcome::Updated { id, .. }
            | UpsertOutcome::Unchanged { id } => *id,
        }
    }
}

/// Fills `slot` from `new` only when `slot` is empty.
fn fill_identity(slot: &mut Option<String>, new: Option<&String>) -> bool {
    let empty = slot.as_deref().is_none_or(|s| s.trim().is_empty());
    match new {
        Some(value) if empty && !value.trim().is_empty() => {
            *slot = Some(value.clone());
            true
        }
        _ => false,
    }
}

/// Creates or patches the entity described by `draft`.
///
/// The existing record is looked up by `(kind, slug)`, then by name. A found
/// record is patched non-destructively: only non-empty draft values that
/// differ are written, and nothing is written when nothing changed. A new
/// record gets the stable id derived from its slug. Calling this twice with
/// the same draft yields `Unchanged` the second time.
///
/// # Errors
///
/// Returns [`DbError`] if any store operation fails.
pub async fn upsert_entity<S: CatalogStore>(
    store: &S,
    draft: EntityDraft,
) -> Result<UpsertOutcome, DbError> {
    let existing = match store.find_by_slug(draft.kind, &draft.slug).await? {
        Some(found) => Some(found),
        None => {
            let by_name = store
                .find_by_name(draft.kind, &draft.name_en, draft.name_zh.as_deref())
                .await?;
            if let Some(found) = &by_name {
                tracing::debug!(
                    slug = %draft.slug,
                    existing_slug = %found.slug,
                    "slug lookup missed, matched existing record by name"
                );
            }
            by_name
        }
    };

    let Some(mut entity) = existing else {
        let entity = draft.into_entity();
        store.insert(&entity).await?;
        tracing::debug!(
            kind = %entity.kind,
            slug = %entity.slug,
            id = %entity.id,
            "created entity"
        );
        return Ok(UpsertOutcome::Created { id: entity.id });
    };

    let mut changed = entity.fields.patch_from(&draft.fields);
    if fill_identity(&mut entity.name_zh, draft.name_zh.as_ref()) {
        changed.push("name_zh");
    }
    if fill_identity(&mut entity.parent_slug, draft.parent_slug.as_ref()) {
        changed.push("parent_slug");
    }

    if changed.is_empty() {
        return Ok(UpsertOutcome::Unchanged { id: entity.id });
    }
    store.update(&entity).await?;
    tracing::debug!(
        kind = %entity.kind,
        slug = %entity.slug,
        fields = ?changed,
        "updated entity"
    );
    Ok(UpsertOutcome::Updated {
        id: entity.id,
        fields: changed,
    })
}
