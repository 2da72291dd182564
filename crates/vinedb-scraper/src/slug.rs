//! Candidate slug generation for guessing external page identifiers.
//!
//! The external site names pages after its own slug of the product name,
//! which rarely matches ours exactly. [`slug_variants`] produces several
//! independent normalizations in a fixed priority order.

use vinedb_core::slug::{slugify, truncate_slug, MAX_SLUG_LEN};

/// Trailing words that qualify a wine's style rather than name it.
const STYLE_SUFFIXES: &[&str] = &[
    "rouge", "blanc", "rose", "red", "white", "brut", "sec", "demi", "doux", "dry", "sweet",
    "sparkling", "reserve", "reserva", "riserva", "gran", "grand", "cru", "vintage", "nv",
    "magnum", "rosso", "bianco", "tinto", "blanco", "extra", "classico", "superiore",
];

const STOP_WORDS: &[&str] = &[
    "de", "du", "la", "le", "les", "des", "di", "del", "della", "the", "of", "and", "et", "y",
    "von", "der", "das", "da", "do", "el", "a", "an",
];

/// Number of leading tokens kept by the truncated variant.
const LEADING_TOKENS: usize = 2;

fn is_year(token: &str) -> bool {
    token.len() == 4
        && token.bytes().all(|b| b.is_ascii_digit())
        && (token.starts_with("19") || token.starts_with("20"))
}

fn is_numeric(token: &str) -> bool {
    token.bytes().all(|b| b.is_ascii_digit())
}

fn join(tokens: &[&str]) -> String {
    truncate_slug(&tokens.join("-"), MAX_SLUG_LEN)
}

/// Returns ordered, de-duplicated candidate slugs for `name`:
///
/// 1. the direct slug of the full name,
/// 2. the name with 4-digit years removed,
/// 3. the name with trailing style words and years removed,
/// 4. content words only (stop-words and numbers dropped),
/// 5. all alphanumerics with no separators,
/// 6. the first two tokens, when the name has more.
///
/// Every variant matches `[a-z0-9-]{1,150}`. Empty variants are dropped.
#[must_use]
pub fn slug_variants(name: &str) -> Vec<String> {
    let direct = slugify(name);
    let tokens: Vec<&str> = direct.split('-').filter(|t| !t.is_empty()).collect();

    let without_years: Vec<&str> = tokens.iter().copied().filter(|t| !is_year(t)).collect();

    let mut without_suffix = tokens.clone();
    while let Some(last) = without_suffix.last() {
        if without_suffix.len() > 1 && (STYLE_SUFFIXES.contains(last) || is_year(last)) {
            without_suffix.pop();
        } else {
            break;
        }
    }

    let content: Vec<&str> = tokens
        .iter()
        .copied()
        .filter(|t| !STOP_WORDS.contains(t) && !is_numeric(t))
        .collect();

    let compact = truncate_slug(&tokens.concat(), MAX_SLUG_LEN);

    let mut candidates = vec![
        direct.clone(),
        join(&without_years),
        join(&without_suffix),
        join(&content),
        compact,
    ];
    if tokens.len() > LEADING_TOKENS {
        candidates.push(join(&tokens[..LEADING_TOKENS]));
    }

    let mut variants: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !candidate.is_empty() && !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}
