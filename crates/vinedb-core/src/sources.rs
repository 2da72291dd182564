//! Source records: the noisy, partially redundant input lists of wineries and
//! wines to resolve against the external site.
//!
//! Records are loaded from YAML, JSON, or CSV and reconciled into one record
//! per `(kind, slug)` before the pipeline sees them.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{EnrichableFields, EntityDraft, EntityKind};
use crate::slug::slugify;
use crate::ConfigError;

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19[5-9]\d|20\d{2})\b").expect("valid year regex"));

/// Price as written in a source file: either a bare number or text such as
/// `"¥1,280"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

impl PriceInput {
    fn to_decimal(&self) -> Option<Decimal> {
        match self {
            PriceInput::Number(n) => Decimal::try_from(*n).ok().map(|d| d.round_dp(2)),
            PriceInput::Text(raw) => {
                let cleaned: String = raw
                    .chars()
                    .filter(|c| c.is_ascii_digit() || *c == '.')
                    .collect();
                Decimal::from_str(&cleaned).ok()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub kind: EntityKind,
    #[serde(alias = "name")]
    pub name_en: String,
    #[serde(default)]
    pub name_zh: Option<String>,
    /// Owning winery's English name, wines only.
    #[serde(default)]
    pub winery: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub vintage: Option<i32>,
    #[serde(default)]
    pub external_url: Option<String>,
    #[serde(default)]
    pub price: Option<PriceInput>,
}

impl SourceRecord {
    /// The catalog slug for this record.
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.name_en)
    }

    #[must_use]
    pub fn parent_slug(&self) -> Option<String> {
        self.winery
            .as_deref()
            .map(slugify)
            .filter(|s| !s.is_empty())
    }

    /// Builds the upsert draft carrying what the source file already knows.
    /// Scraped data is layered on top by the pipeline.
    #[must_use]
    pub fn to_draft(&self) -> EntityDraft {
        EntityDraft {
            kind: self.kind,
            slug: self.slug(),
            name_en: self.name_en.trim().to_string(),
            name_zh: self.name_zh.clone().filter(|s| !s.trim().is_empty()),
            parent_slug: self.parent_slug(),
            fields: EnrichableFields {
                region: self.region.clone(),
                country: self.country.clone(),
                vintage: self.vintage,
                price: self.price.as_ref().and_then(PriceInput::to_decimal),
                external_url: self.external_url.clone(),
                ..EnrichableFields::default()
            },
        }
    }

    /// Fills every empty field of `self` from `other`.
    fn absorb(&mut self, other: SourceRecord) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }
        fill(&mut self.name_zh, other.name_zh);
        fill(&mut self.winery, other.winery);
        fill(&mut self.country, other.country);
        fill(&mut self.category, other.category);
        fill(&mut self.region, other.region);
        fill(&mut self.vintage, other.vintage);
        fill(&mut self.external_url, other.external_url);
        fill(&mut self.price, other.price);
    }

    /// Trims text fields and turns blanks into `None`.
    fn tidy(&mut self) {
        fn blank_to_none(slot: &mut Option<String>) {
            let trimmed = slot
                .take()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            *slot = trimmed;
        }
        self.name_en = self.name_en.trim().to_string();
        blank_to_none(&mut self.name_zh);
        blank_to_none(&mut self.winery);
        blank_to_none(&mut self.country);
        blank_to_none(&mut self.category);
        blank_to_none(&mut self.region);
        blank_to_none(&mut self.external_url);
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SourcesDocument {
    Wrapped { records: Vec<SourceRecord> },
    List(Vec<SourceRecord>),
}

impl SourcesDocument {
    fn into_records(self) -> Vec<SourceRecord> {
        match self {
            SourcesDocument::Wrapped { records } | SourcesDocument::List(records) => records,
        }
    }
}

/// Load, validate, and reconcile source records from a YAML, JSON, or CSV
/// file (chosen by extension).
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or parsed, has an
/// unsupported extension, or fails validation.
pub fn load_sources(path: &Path) -> Result<Vec<SourceRecord>, ConfigError> {
    let shown = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: shown.clone(),
        source: e,
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let parse_err = |reason: String| ConfigError::SourcesFileParse {
        path: shown.clone(),
        reason,
    };

    let records = match extension.as_str() {
        "yaml" | "yml" => serde_yaml::from_str::<SourcesDocument>(&content)
            .map_err(|e| parse_err(e.to_string()))?
            .into_records(),
        "json" => serde_json::from_str::<SourcesDocument>(&content)
            .map_err(|e| parse_err(e.to_string()))?
            .into_records(),
        "csv" => parse_csv(&content).map_err(|e| parse_err(e.to_string()))?,
        other => {
            return Err(parse_err(format!(
                "unsupported extension \"{other}\"; expected yaml, yml, json, or csv"
            )))
        }
    };

    let reconciled = reconcile_records(records)?;
    tracing::debug!(path = %shown, count = reconciled.len(), "loaded source records");
    Ok(reconciled)
}

fn parse_csv(content: &str) -> Result<Vec<SourceRecord>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    reader.deserialize().collect()
}

/// Validates records and merges duplicates.
///
/// Records sharing `(kind, slug)` collapse into the first one seen; later
/// duplicates only fill fields the first left empty. Output order follows
/// first appearance. A missing vintage is inferred from a year in the name.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] for a record with an empty name or a
/// name that produces an empty slug.
pub fn reconcile_records(records: Vec<SourceRecord>) -> Result<Vec<SourceRecord>, ConfigError> {
    let mut merged: Vec<SourceRecord> = Vec::with_capacity(records.len());
    let mut index: HashMap<(EntityKind, String), usize> = HashMap::new();

    for (row, mut record) in records.into_iter().enumerate() {
        record.tidy();
        if record.name_en.is_empty() {
            return Err(ConfigError::Validation(format!(
                "record {} has an empty name_en",
                row + 1
            )));
        }
        let slug = record.slug();
        if slug.is_empty() {
            return Err(ConfigError::Validation(format!(
                "record {} (\"{}\") produces an empty slug; provide a Latin-script name_en",
                row + 1,
                record.name_en
            )));
        }
        if record.vintage.is_none() && record.kind == EntityKind::Wine {
            record.vintage = infer_vintage(&record.name_en);
        }

        if let Some(&existing) = index.get(&(record.kind, slug.clone())) {
            tracing::debug!(slug = %slug, row = row + 1, "merging duplicate source record");
            merged[existing].absorb(record);
        } else {
            index.insert((record.kind, slug), merged.len());
            merged.push(record);
        }
    }

    Ok(merged)
}

fn infer_vintage(name: &str) -> Option<i32> {
    YEAR_RE
        .captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok())
}

#[cfg(test)]
#[path = "sources_test.rs"]
mod tests;
