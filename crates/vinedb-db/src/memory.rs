//! In-process catalog store for tests and dry runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use vinedb_core::{CatalogEntity, EntityKind};

use crate::catalog::CatalogStore;
use crate::DbError;

/// A `Vec`-backed [`CatalogStore`] with the same uniqueness rule as the
/// Postgres schema: one row per `(kind, slug)`.
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    rows: Mutex<Vec<CatalogEntity>>,
    updates: AtomicUsize,
}

impl MemoryCatalogStore {
    #[must_use]
    pub fn with_entities(entities: Vec<CatalogEntity>) -> Self {
        Self {
            rows: Mutex::new(entities),
            updates: AtomicUsize::new(0),
        }
    }

    fn rows(&self) -> Result<MutexGuard<'_, Vec<CatalogEntity>>, DbError> {
        self.rows.lock().map_err(|_| DbError::Poisoned)
    }

    /// # Errors
    ///
    /// Returns [`DbError::Poisoned`] if a writer panicked.
    pub fn len(&self) -> Result<usize, DbError> {
        Ok(self.rows()?.len())
    }

    /// # Errors
    ///
    /// Returns [`DbError::Poisoned`] if a writer panicked.
    pub fn is_empty(&self) -> Result<bool, DbError> {
        Ok(self.rows()?.is_empty())
    }

    /// Number of successful `update` calls so far.
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

impl CatalogStore for MemoryCatalogStore {
    async fn find_by_slug(
        &self,
        kind: EntityKind,
        slug: &str,
    ) -> Result<Option<CatalogEntity>, DbError> {
        Ok(self
            .rows()?
            .iter()
            .find(|e| e.kind == kind && e.slug == slug)
            .cloned())
    }

    async fn find_by_name(
        &self,
        kind: EntityKind,
        name_en: &str,
        name_zh: Option<&str>,
    ) -> Result<Option<CatalogEntity>, DbError> {
        let name_en = name_en.trim().to_lowercase();
        let name_zh = name_zh.map(str::trim).filter(|z| !z.is_empty());
        Ok(self
            .rows()?
            .iter()
            .find(|e| {
                e.kind == kind
                    && (e.name_en.trim().to_lowercase() == name_en
                        || name_zh.is_some_and(|z| e.name_zh.as_deref() == Some(z)))
            })
            .cloned())
    }

    async fn insert(&self, entity: &CatalogEntity) -> Result<(), DbError> {
        let mut rows = self.rows()?;
        if rows
            .iter()
            .any(|e| e.id == entity.id || (e.kind == entity.kind && e.slug == entity.slug))
        {
            return Err(DbError::Duplicate {
                kind: entity.kind.to_string(),
                slug: entity.slug.clone(),
            });
        }
        rows.push(entity.clone());
        Ok(())
    }

    async fn update(&self, entity: &CatalogEntity) -> Result<(), DbError> {
        let mut rows = self.rows()?;
        let slot = rows
            .iter_mut()
            .find(|e| e.id == entity.id)
            .ok_or(DbError::NotFound)?;
        *slot = entity.clone();
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list(&self, kind: Option<EntityKind>) -> Result<Vec<CatalogEntity>, DbError> {
        let mut out: Vec<CatalogEntity> = self
            .rows()?
            .iter()
            .filter(|e| kind.is_none_or(|k| e.kind == k))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            a.kind
                .as_str()
                .cmp(b.kind.as_str())
                .then_with(|| a.slug.cmp(&b.slug))
        });
        Ok(out)
    }
}
