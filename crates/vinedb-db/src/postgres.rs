//! Database operations for the `catalog_entities` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;
use vinedb_core::{CatalogEntity, EnrichableFields, EntityKind, Rating};

use crate::catalog::CatalogStore;
use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `catalog_entities` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CatalogEntityRow {
    pub id: Uuid,
    /// `"winery"` or `"wine"`; enforced by a CHECK constraint.
    pub kind: String,
    pub slug: String,
    pub name_en: String,
    pub name_zh: Option<String>,
    pub parent_slug: Option<String>,
    pub description_zh: Option<String>,
    pub description_en: Option<String>,
    pub main_image_url: Option<String>,
    pub price: Option<Decimal>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub vintage: Option<i32>,
    pub ratings: Json<Vec<Rating>>,
    pub tasting_notes: Option<String>,
    pub food_pairing: Option<String>,
    pub external_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CatalogEntityRow> for CatalogEntity {
    type Error = DbError;

    fn try_from(row: CatalogEntityRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<EntityKind>()
            .map_err(|reason| DbError::CorruptRow { id: row.id, reason })?;
        Ok(CatalogEntity {
            id: row.id,
            kind,
            slug: row.slug,
            name_en: row.name_en,
            name_zh: row.name_zh,
            parent_slug: row.parent_slug,
            fields: EnrichableFields {
                description_zh: row.description_zh,
                description_en: row.description_en,
                main_image_url: row.main_image_url,
                price: row.price,
                region: row.region,
                country: row.country,
                vintage: row.vintage,
                ratings: row.ratings.0,
                tasting_notes: row.tasting_notes,
                food_pairing: row.food_pairing,
                external_url: row.external_url,
            },
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, kind, slug, name_en, name_zh, parent_slug, \
            description_zh, description_en, main_image_url, price, region, country, vintage, \
            ratings, tasting_notes, food_pairing, external_url, created_at, updated_at \
     FROM catalog_entities";

fn map_unique_violation(err: sqlx::Error, entity: &CatalogEntity) -> DbError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => DbError::Duplicate {
            kind: entity.kind.to_string(),
            slug: entity.slug.clone(),
        },
        _ => DbError::Sqlx(err),
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns the entity with `(kind, slug)`, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::CorruptRow`]
/// if the stored kind is unknown.
pub async fn get_entity_by_slug(
    pool: &PgPool,
    kind: EntityKind,
    slug: &str,
) -> Result<Option<CatalogEntity>, DbError> {
    let row = sqlx::query_as::<_, CatalogEntityRow>(&format!(
        "{SELECT_COLUMNS} WHERE kind = $1 AND slug = $2"
    ))
    .bind(kind.as_str())
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    row.map(CatalogEntity::try_from).transpose()
}

/// Returns the oldest entity of `kind` whose English name matches
/// case-insensitively, or whose Chinese name matches exactly.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::CorruptRow`]
/// if the stored kind is unknown.
pub async fn get_entity_by_name(
    pool: &PgPool,
    kind: EntityKind,
    name_en: &str,
    name_zh: Option<&str>,
) -> Result<Option<CatalogEntity>, DbError> {
    let name_zh = name_zh.map(str::trim).filter(|z| !z.is_empty());
    let row = sqlx::query_as::<_, CatalogEntityRow>(&format!(
        "{SELECT_COLUMNS} \
         WHERE kind = $1 \
           AND (lower(btrim(name_en)) = lower(btrim($2)) \
                OR ($3::text IS NOT NULL AND name_zh = $3)) \
         ORDER BY created_at, id \
         LIMIT 1"
    ))
    .bind(kind.as_str())
    .bind(name_en)
    .bind(name_zh)
    .fetch_optional(pool)
    .await?;

    row.map(CatalogEntity::try_from).transpose()
}

/// Returns every entity, optionally restricted to one kind, ordered by kind
/// then slug.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::CorruptRow`]
/// if a stored kind is unknown.
pub async fn list_entities(
    pool: &PgPool,
    kind: Option<EntityKind>,
) -> Result<Vec<CatalogEntity>, DbError> {
    let rows = sqlx::query_as::<_, CatalogEntityRow>(&format!(
        "{SELECT_COLUMNS} WHERE ($1::text IS NULL OR kind = $1) ORDER BY kind, slug"
    ))
    .bind(kind.map(EntityKind::as_str))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(CatalogEntity::try_from).collect()
}

/// Inserts a new entity.
///
/// # Errors
///
/// Returns [`DbError::Duplicate`] if `(kind, slug)` or the id already
/// exists, or [`DbError::Sqlx`] for any other failure.
pub async fn insert_entity(pool: &PgPool, entity: &CatalogEntity) -> Result<(), DbError> {
    let fields = &entity.fields;
    sqlx::query(
        "INSERT INTO catalog_entities \
             (id, kind, slug, name_en, name_zh, parent_slug, description_zh, description_en, \
              main_image_url, price, region, country, vintage, ratings, tasting_notes, \
              food_pairing, external_url) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
    )
    .bind(entity.id)
    .bind(entity.kind.as_str())
    .bind(&entity.slug)
    .bind(&entity.name_en)
    .bind(&entity.name_zh)
    .bind(&entity.parent_slug)
    .bind(&fields.description_zh)
    .bind(&fields.description_en)
    .bind(&fields.main_image_url)
    .bind(fields.price)
    .bind(&fields.region)
    .bind(&fields.country)
    .bind(fields.vintage)
    .bind(Json(&fields.ratings))
    .bind(&fields.tasting_notes)
    .bind(&fields.food_pairing)
    .bind(&fields.external_url)
    .execute(pool)
    .await
    .map_err(|e| map_unique_violation(e, entity))?;

    Ok(())
}

/// Writes every mutable column of `entity` to the row with its id.
///
/// `kind` and `slug` are identity and never rewritten.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has the id, or [`DbError::Sqlx`]
/// if the query fails.
pub async fn update_entity(pool: &PgPool, entity: &CatalogEntity) -> Result<(), DbError> {
    let fields = &entity.fields;
    let result = sqlx::query(
        "UPDATE catalog_entities \
         SET name_en = $2, name_zh = $3, parent_slug = $4, description_zh = $5, \
             description_en = $6, main_image_url = $7, price = $8, region = $9, \
             country = $10, vintage = $11, ratings = $12, tasting_notes = $13, \
             food_pairing = $14, external_url = $15, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(entity.id)
    .bind(&entity.name_en)
    .bind(&entity.name_zh)
    .bind(&entity.parent_slug)
    .bind(&fields.description_zh)
    .bind(&fields.description_en)
    .bind(&fields.main_image_url)
    .bind(fields.price)
    .bind(&fields.region)
    .bind(&fields.country)
    .bind(fields.vintage)
    .bind(Json(&fields.ratings))
    .bind(&fields.tasting_notes)
    .bind(&fields.food_pairing)
    .bind(&fields.external_url)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// [`CatalogStore`] over a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl CatalogStore for PgCatalogStore {
    async fn find_by_slug(
        &self,
        kind: EntityKind,
        slug: &str,
    ) -> Result<Option<CatalogEntity>, DbError> {
        get_entity_by_slug(&self.pool, kind, slug).await
    }

    async fn find_by_name(
        &self,
        kind: EntityKind,
        name_en: &str,
        name_zh: Option<&str>,
    ) -> Result<Option<CatalogEntity>, DbError> {
        get_entity_by_name(&self.pool, kind, name_en, name_zh).await
    }

    async fn insert(&self, entity: &CatalogEntity) -> Result<(), DbError> {
        insert_entity(&self.pool, entity).await
    }

    async fn update(&self, entity: &CatalogEntity) -> Result<(), DbError> {
        update_entity(&self.pool, entity).await
    }

    async fn list(&self, kind: Option<EntityKind>) -> Result<Vec<CatalogEntity>, DbError> {
        list_entities(&self.pool, kind).await
    }
}
