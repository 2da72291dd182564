//! Page scorer and matcher.
//!
//! Pure functions over a [`ParsedPage`]: decide whether a page is about the
//! target entity, rank links on listing pages, and extract an image, text,
//! and price from an accepted page. Nothing here touches the network.

pub mod images;
pub mod page;
pub mod text;

use rust_decimal::Decimal;
use vinedb_core::{fold_diacritics, AppConfig, Rating};

pub use images::{rank_images, score_image, select_image, ScoredImage};
pub use page::{PageImage, PageLink, ParsedPage, TextBlock};

use crate::client::same_site;

/// Scoring thresholds. The numbers are tuning parameters, not derived
/// constants; see the defaults for the values in use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchConfig {
    /// Distinct keyword hits a direct page needs to be accepted.
    pub min_keyword_hits: usize,
    /// Points per distinct keyword hit on a page heading or link text.
    pub keyword_weight: i32,
    /// Points per distinct keyword found in a link's URL.
    pub slug_keyword_weight: i32,
    /// Bonus when a link text contains the target's name prefix.
    pub link_prefix_bonus: i32,
    pub parent_bonus: i32,
    /// Subtracted when a link names a different known parent entity.
    pub other_parent_penalty: i32,
    pub min_link_score: i32,
    pub min_image_score: i32,
    /// Characters of the normalized target name used for prefix matching.
    pub min_prefix_len: usize,
    pub max_text_len: usize,
    pub asset_path: String,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_keyword_hits: 2,
            keyword_weight: 10,
            slug_keyword_weight: 8,
            link_prefix_bonus: 25,
            parent_bonus: 20,
            other_parent_penalty: 30,
            min_link_score: 20,
            min_image_score: 40,
            min_prefix_len: 12,
            max_text_len: 2000,
            asset_path: "/uploads/".to_string(),
        }
    }
}

impl MatchConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            min_keyword_hits: config.match_min_keyword_hits,
            min_link_score: config.match_min_link_score,
            min_image_score: config.match_min_image_score,
            max_text_len: config.match_max_text_len,
            asset_path: config.site_asset_path.clone(),
            ..Self::default()
        }
    }
}

/// Lowercases, folds accents, and turns punctuation into single spaces.
#[must_use]
pub fn normalize(text: &str) -> String {
    let folded = fold_diacritics(text).to_lowercase();
    let mut out = String::with_capacity(folded.len());
    let mut pending_space = false;
    for c in folded.chars() {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else if c == '\'' {
            // d'yquem -> dyquem
        } else {
            pending_space = true;
        }
    }
    out
}

/// Normalized keyword set of `names`: tokens longer than three characters,
/// de-duplicated in first-seen order.
#[must_use]
pub fn keywords<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        for token in normalize(name.as_ref()).split(' ') {
            if token.chars().count() > 3 && !out.iter().any(|k| k == token) {
                out.push(token.to_string());
            }
        }
    }
    out
}

/// The entity being resolved, as the matcher sees it.
#[derive(Debug, Clone, Default)]
pub struct MatchTarget {
    /// English name first, then any other-language names.
    pub names: Vec<String>,
    /// Owning entity's name, e.g. the winery of a wine.
    pub parent: Option<String>,
    /// Names of other known parents; links naming one of these are
    /// penalized.
    pub other_parents: Vec<String>,
}

impl MatchTarget {
    #[must_use]
    pub fn keywords(&self) -> Vec<String> {
        keywords(&self.names)
    }

    /// Leading `len` characters of the normalized primary name, or the
    /// whole name when shorter.
    fn prefix(&self, len: usize) -> Option<String> {
        let primary = normalize(self.names.first()?);
        if primary.is_empty() {
            return None;
        }
        let cut: String = primary.chars().take(len).collect();
        Some(cut.trim_end().to_string())
    }
}

/// Counts distinct keywords present in `haystack` (already normalized).
/// ASCII keywords must match whole words; others may match anywhere.
fn keyword_hits(keywords: &[String], haystack: &str) -> usize {
    let words: Vec<&str> = haystack.split(' ').collect();
    keywords
        .iter()
        .filter(|k| {
            if k.is_ascii() {
                words.contains(&k.as_str())
            } else {
                haystack.contains(k.as_str())
            }
        })
        .count()
}

fn weighted(count: usize, weight: i32) -> i32 {
    i32::try_from(count).map_or(i32::MAX, |c| c.saturating_mul(weight))
}

/// Direct-page verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageScore {
    pub keyword_hits: usize,
    pub prefix_match: bool,
    pub score: i32,
    /// Score needed for acceptance; fixed per target.
    pub threshold: i32,
}

impl PageScore {
    #[must_use]
    pub fn accepted(&self) -> bool {
        self.score >= self.threshold
    }
}

/// Scores a page's heading and lead text against the target.
///
/// The threshold is `min_keyword_hits * keyword_weight`, whatever the
/// number of target keywords. A prefix match on the normalized name adds the
/// full threshold on its own, which is how short names with a single
/// keyword are accepted. Since the threshold depends only on the config, a
/// higher score is never rejected while a lower one is accepted.
#[must_use]
pub fn evaluate_page(page: &ParsedPage, target: &MatchTarget, config: &MatchConfig) -> PageScore {
    let keywords = target.keywords();
    let threshold = weighted(config.min_keyword_hits.max(1), config.keyword_weight);

    let haystack = normalize(&format!(
        "{} {}",
        page.heading.as_deref().unwrap_or_default(),
        page.lead_text
    ));
    let hits = keyword_hits(&keywords, &haystack);
    let prefix_match = target
        .prefix(config.min_prefix_len)
        .is_some_and(|p| haystack.contains(&p));

    let mut score = weighted(hits, config.keyword_weight);
    if prefix_match {
        score = score.saturating_add(threshold);
    }

    PageScore {
        keyword_hits: hits,
        prefix_match,
        score,
        threshold,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredLink {
    pub url: String,
    pub text: String,
    pub score: i32,
}

/// Normalized words of a URL's path and query values.
fn url_words(url: &str) -> String {
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return normalize(url);
    };
    let mut raw = parsed.path().to_string();
    for (_, value) in parsed.query_pairs() {
        raw.push(' ');
        raw.push_str(&value);
    }
    normalize(&raw)
}

/// Ranks the links of a search or category listing against the target.
///
/// Only same-site links that are not the listing itself are considered.
/// Links under the minimum score are dropped; equal scores keep document
/// order.
#[must_use]
pub fn score_links(
    page: &ParsedPage,
    target: &MatchTarget,
    config: &MatchConfig,
) -> Vec<ScoredLink> {
    let keywords = target.keywords();
    let ascii_keywords: Vec<String> = keywords.iter().filter(|k| k.is_ascii()).cloned().collect();
    let prefix = target.prefix(config.min_prefix_len);
    let parent = target.parent.as_deref().map(normalize).filter(|p| !p.is_empty());
    let parent_slug = parent.as_ref().map(|p| p.replace(' ', "-"));
    let others: Vec<String> = target
        .other_parents
        .iter()
        .map(|o| normalize(o.as_str()))
        .filter(|o| {
            !o.is_empty()
                && parent
                    .as_ref()
                    .is_none_or(|p| !p.contains(o.as_str()) && !o.contains(p.as_str()))
        })
        .collect();

    let mut scored: Vec<ScoredLink> = Vec::new();
    for link in &page.links {
        if link.href == page.url
            || !same_site(&link.href, &page.url)
            || scored.iter().any(|s| s.url == link.href)
        {
            continue;
        }
        let text = normalize(&link.text);
        let url_text = url_words(&link.href);

        let mut score = weighted(keyword_hits(&keywords, &text), config.keyword_weight);
        score = score.saturating_add(weighted(
            keyword_hits(&ascii_keywords, &url_text),
            config.slug_keyword_weight,
        ));
        if prefix.as_ref().is_some_and(|p| text.contains(p.as_str())) {
            score = score.saturating_add(config.link_prefix_bonus);
        }
        if let Some(parent) = &parent {
            let in_text = text.contains(parent.as_str());
            let in_url = parent_slug
                .as_ref()
                .is_some_and(|slug| link.href.to_lowercase().contains(slug.as_str()));
            if in_text || in_url {
                score = score.saturating_add(config.parent_bonus);
            }
        }
        if others.iter().any(|o| text.contains(o.as_str())) {
            score = score.saturating_sub(config.other_parent_penalty);
        }

        if score >= config.min_link_score {
            scored.push(ScoredLink {
                url: link.href.clone(),
                text: link.text.clone(),
                score,
            });
        }
    }

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// Data extracted from an accepted page. Transient; never persisted as is.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub url: String,
    pub image_url: Option<String>,
    pub text: Option<String>,
    pub tasting_notes: Option<String>,
    pub food_pairing: Option<String>,
    pub price: Option<Decimal>,
    pub ratings: Vec<Rating>,
    pub score: i32,
}

impl MatchCandidate {
    /// `true` when the page yielded nothing usable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.image_url.is_none()
            && self.text.is_none()
            && self.tasting_notes.is_none()
            && self.food_pairing.is_none()
            && self.price.is_none()
            && self.ratings.is_empty()
    }
}

/// Why a page produced no candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The heading and lead text do not identify the target.
    NoMatch(PageScore),
    /// The page matched but nothing could be extracted from it.
    Empty(PageScore),
}

/// Applies the direct-page rule and, if the page passes, extracts image,
/// description, tasting notes, pairing, price, and ratings.
///
/// A page that fails the keyword rule is rejected even when it carries a
/// plausible image.
///
/// # Errors
///
/// Returns the [`Rejection`] reason when the page is not usable.
pub fn extract_candidate(
    page: &ParsedPage,
    target: &MatchTarget,
    config: &MatchConfig,
) -> Result<MatchCandidate, Rejection> {
    let verdict = evaluate_page(page, target, config);
    if !verdict.accepted() {
        return Err(Rejection::NoMatch(verdict));
    }

    let keywords = target.keywords();
    let image_url = select_image(&page.images, &keywords, config).map(|img| img.src);
    let candidate = MatchCandidate {
        url: page.url.clone(),
        image_url,
        text: text::extract_section(&page.blocks, text::DESCRIPTION_MARKERS, config.max_text_len),
        tasting_notes: text::extract_section(
            &page.blocks,
            text::TASTING_MARKERS,
            config.max_text_len,
        ),
        food_pairing: text::extract_section(
            &page.blocks,
            text::PAIRING_MARKERS,
            config.max_text_len,
        ),
        price: text::extract_price(&page.full_text),
        ratings: text::extract_ratings(&page.full_text),
        score: verdict.score,
    };

    if candidate.is_empty() {
        Err(Rejection::Empty(verdict))
    } else {
        Ok(candidate)
    }
}

#[cfg(test)]
#[path = "../matcher_test.rs"]
mod tests;
