//! Catalog entities (wineries and wines) and their non-destructive patch
//! semantics.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for deriving stable entity ids from `<kind>:<slug>`.
const ENTITY_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_93b7_4d05_8e2a_1b7c_9d30_f4a1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Winery,
    Wine,
}

impl EntityKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Winery => "winery",
            EntityKind::Wine => "wine",
        }
    }

    /// CDN folder for this kind's images.
    #[must_use]
    pub fn asset_folder(self) -> &'static str {
        match self {
            EntityKind::Winery => "wineries",
            EntityKind::Wine => "wines",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "winery" | "wineries" => Ok(EntityKind::Winery),
            "wine" | "wines" => Ok(EntityKind::Wine),
            other => Err(format!("unknown entity kind \"{other}\"")),
        }
    }
}

/// A critic or competition score, e.g. `{ source: "JS", score: "97" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub source: String,
    pub score: String,
}

/// Fields the pipeline may fill in over successive runs.
///
/// Empty means `None`, a blank string, or an empty list. Empty values never
/// overwrite populated ones; see [`EnrichableFields::patch_from`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichableFields {
    pub description_zh: Option<String>,
    pub description_en: Option<String>,
    pub main_image_url: Option<String>,
    pub price: Option<Decimal>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub vintage: Option<i32>,
    #[serde(default)]
    pub ratings: Vec<Rating>,
    pub tasting_notes: Option<String>,
    pub food_pairing: Option<String>,
    /// The external page this entity was last matched against.
    pub external_url: Option<String>,
}

fn has_text(value: Option<&String>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Copies `new` into `slot` when `new` is non-blank and differs. Returns
/// whether the slot changed.
fn patch_text(slot: &mut Option<String>, new: Option<&String>) -> bool {
    match new {
        Some(value) if !value.trim().is_empty() && slot.as_deref() != Some(value.as_str()) => {
            *slot = Some(value.clone());
            true
        }
        _ => false,
    }
}

fn patch_value<T: PartialEq + Clone>(slot: &mut Option<T>, new: Option<&T>) -> bool {
    match new {
        Some(value) if slot.as_ref() != Some(value) => {
            *slot = Some(value.clone());
            true
        }
        _ => false,
    }
}

impl EnrichableFields {
    /// Applies every non-empty value from `new` that differs from the
    /// current value and returns the names of the fields that changed.
    ///
    /// Applying the same `new` twice yields an empty list the second time.
    pub fn patch_from(&mut self, new: &EnrichableFields) -> Vec<&'static str> {
        let mut changed = Vec::new();
        let mut mark = |name: &'static str, did_change: bool| {
            if did_change {
                changed.push(name);
            }
        };

        mark(
            "description_zh",
            patch_text(&mut self.description_zh, new.description_zh.as_ref()),
        );
        mark(
            "description_en",
            patch_text(&mut self.description_en, new.description_en.as_ref()),
        );
        mark(
            "main_image_url",
            patch_text(&mut self.main_image_url, new.main_image_url.as_ref()),
        );
        mark("price", patch_value(&mut self.price, new.price.as_ref()));
        mark("region", patch_text(&mut self.region, new.region.as_ref()));
        mark("country", patch_text(&mut self.country, new.country.as_ref()));
        mark("vintage", patch_value(&mut self.vintage, new.vintage.as_ref()));
        if !new.ratings.is_empty() && self.ratings != new.ratings {
            self.ratings.clone_from(&new.ratings);
            mark("ratings", true);
        }
        mark(
            "tasting_notes",
            patch_text(&mut self.tasting_notes, new.tasting_notes.as_ref()),
        );
        mark(
            "food_pairing",
            patch_text(&mut self.food_pairing, new.food_pairing.as_ref()),
        );
        mark(
            "external_url",
            patch_text(&mut self.external_url, new.external_url.as_ref()),
        );

        changed
    }

    /// `true` when the record already has an image and both descriptions,
    /// i.e. there is nothing left for a scrape to add.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        has_text(self.main_image_url.as_ref())
            && has_text(self.description_en.as_ref())
            && has_text(self.description_zh.as_ref())
    }
}

/// A persisted winery or wine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntity {
    pub id: Uuid,
    pub kind: EntityKind,
    /// Unique per kind; the idempotency key for upserts.
    pub slug: String,
    pub name_en: String,
    pub name_zh: Option<String>,
    /// Slug of the owning winery, wines only.
    pub parent_slug: Option<String>,
    pub fields: EnrichableFields,
}

/// Data for an upsert: everything a [`CatalogEntity`] has except its id.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDraft {
    pub kind: EntityKind,
    pub slug: String,
    pub name_en: String,
    pub name_zh: Option<String>,
    pub parent_slug: Option<String>,
    pub fields: EnrichableFields,
}

impl EntityDraft {
    /// Materializes a new entity with its stable id.
    #[must_use]
    pub fn into_entity(self) -> CatalogEntity {
        CatalogEntity {
            id: stable_entity_id(self.kind, &self.slug),
            kind: self.kind,
            slug: self.slug,
            name_en: self.name_en,
            name_zh: self.name_zh,
            parent_slug: self.parent_slug,
            fields: self.fields,
        }
    }
}

/// Derives the id a new entity receives: a name-based (v5) UUID over
/// `<kind>:<slug>`, so the same logical entity always gets the same id.
#[must_use]
pub fn stable_entity_id(kind: EntityKind, slug: &str) -> Uuid {
    Uuid::new_v5(
        &ENTITY_ID_NAMESPACE,
        format!("{}:{slug}", kind.as_str()).as_bytes(),
    )
}
