//! Candidate URL builder.
//!
//! Expands an entity's slug variants and context into the ordered list of
//! URLs to probe on the external site. The site exposes three URL shapes:
//! `?<kind>=<slug>` direct pages, `?s=<query>` search, and
//! `?category=<value>` browse listings.

use vinedb_core::slug::{slugify, truncate_slug, MAX_SLUG_LEN};
use vinedb_core::{AppConfig, EntityKind};

use crate::error::ScraperError;
use crate::slug::slug_variants;

/// Shape of the external site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub base_url: String,
    pub wine_param: String,
    pub winery_param: String,
    pub search_param: String,
    pub category_param: String,
    /// Path fragment that content images live under, e.g. `/uploads/`.
    pub asset_path: String,
}

impl SiteConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.site_base_url.clone(),
            wine_param: config.site_wine_param.clone(),
            winery_param: config.site_winery_param.clone(),
            search_param: config.site_search_param.clone(),
            category_param: config.site_category_param.clone(),
            asset_path: config.site_asset_path.clone(),
        }
    }

    /// Query parameter that addresses a direct page for `kind`.
    #[must_use]
    pub fn entity_param(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Wine => &self.wine_param,
            EntityKind::Winery => &self.winery_param,
        }
    }

    /// Builds `<base_url>?<param>=<value>`, replacing any query on the base.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if the base URL does not parse.
    pub fn url_with_param(&self, param: &str, value: &str) -> Result<String, ScraperError> {
        let mut url =
            reqwest::Url::parse(&self.base_url).map_err(|e| ScraperError::InvalidUrl {
                url: self.base_url.clone(),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut().clear().append_pair(param, value);
        Ok(url.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    DirectPage,
    Search,
    CategoryBrowse,
}

impl ProbeKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProbeKind::DirectPage => "direct-page",
            ProbeKind::Search => "search",
            ProbeKind::CategoryBrowse => "category-browse",
        }
    }

    /// Listing pages need a secondary in-page link match before they yield
    /// an entity page.
    #[must_use]
    pub fn is_listing(self) -> bool {
        matches!(self, ProbeKind::Search | ProbeKind::CategoryBrowse)
    }
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeUrl {
    pub url: String,
    pub kind: ProbeKind,
}

/// What the builder knows about the entity being resolved.
#[derive(Debug, Clone, Copy)]
pub struct ProbeTarget<'a> {
    pub kind: EntityKind,
    pub name_en: &'a str,
    pub name_zh: Option<&'a str>,
    /// Owning winery's name, wines only.
    pub parent_name: Option<&'a str>,
    /// External URL recorded on a previous run.
    pub known_url: Option<&'a str>,
    pub country: Option<&'a str>,
    pub category: Option<&'a str>,
}

/// Ordered probe list for one entity.
///
/// `known` is tried first and, if it resolves and matches, the generated
/// `candidates` are skipped entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbePlan {
    pub known: Option<ProbeUrl>,
    pub candidates: Vec<ProbeUrl>,
}

impl ProbePlan {
    /// Total number of URLs in the plan.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len() + usize::from(self.known.is_some())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds the probe plan: search pages, then direct slug guesses, then
/// category listings. Duplicate URLs keep their first position.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] if the site base URL is invalid.
pub fn build_probe_plan(
    site: &SiteConfig,
    target: &ProbeTarget<'_>,
) -> Result<ProbePlan, ScraperError> {
    let known = target
        .known_url
        .map(str::trim)
        .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
        .map(|u| ProbeUrl {
            url: u.to_owned(),
            kind: ProbeKind::DirectPage,
        });

    let mut candidates: Vec<ProbeUrl> = Vec::new();
    let mut push = |url: String, kind: ProbeKind| {
        let duplicate = known.as_ref().is_some_and(|k| k.url == url)
            || candidates.iter().any(|c| c.url == url);
        if !duplicate {
            candidates.push(ProbeUrl { url, kind });
        }
    };

    for query in [Some(target.name_en), target.name_zh] {
        if let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) {
            push(
                site.url_with_param(&site.search_param, query)?,
                ProbeKind::Search,
            );
        }
    }

    let variants = slug_variants(target.name_en);
    let param = site.entity_param(target.kind);
    if let Some(parent_slug) = target.parent_name.map(slugify).filter(|s| !s.is_empty()) {
        if let Some(first) = variants.first().filter(|v| !v.starts_with(&parent_slug)) {
            let compound = truncate_slug(&format!("{parent_slug}-{first}"), MAX_SLUG_LEN);
            push(site.url_with_param(param, &compound)?, ProbeKind::DirectPage);
        }
    }
    for variant in &variants {
        push(site.url_with_param(param, variant)?, ProbeKind::DirectPage);
    }

    for value in [target.category, target.country] {
        let slug = value.map(slugify).filter(|s| !s.is_empty());
        if let Some(slug) = slug {
            push(
                site.url_with_param(&site.category_param, &slug)?,
                ProbeKind::CategoryBrowse,
            );
        }
    }

    Ok(ProbePlan { known, candidates })
}
