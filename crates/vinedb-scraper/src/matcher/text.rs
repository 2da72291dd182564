//! Labeled-section text, price, and rating extraction.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use vinedb_core::Rating;

use super::normalize;
use super::page::TextBlock;

/// Heading phrases that introduce a product description.
pub const DESCRIPTION_MARKERS: &[&str] = &[
    "description",
    "about this wine",
    "about the winery",
    "overview",
    "introduction",
    "winemaker",
    "产品介绍",
    "酒款介绍",
    "酒庄介绍",
    "简介",
];

pub const TASTING_MARKERS: &[&str] = &["tasting note", "tasting notes", "品鉴", "品酒笔记", "酒评"];

pub const PAIRING_MARKERS: &[&str] = &["food pairing", "pairing", "配餐", "搭配"];

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:price|零售价|售价|价格)\s*[:：]?\s*(?:rmb|cny|hk\$|us\$|¥|￥|\$|€|£)?\s*([0-9][0-9,]*(?:\.[0-9]{1,2})?)",
    )
    .expect("valid price regex")
});

static RATING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(RP|WA|WS|JS|JR|VM|JD|DC|WE|WW|AG)\s*[:：]?\s*(\d{2,3})\+?\s*(?:pts|points|分)?\b")
        .expect("valid rating regex")
});

/// Returns the text between the first heading containing one of `markers`
/// and the next heading, joined with blank lines and truncated to
/// `max_len` characters. `None` when no such section has text.
#[must_use]
pub fn extract_section(blocks: &[TextBlock], markers: &[&str], max_len: usize) -> Option<String> {
    let start = blocks.iter().position(|block| match block {
        TextBlock::Heading(text) => {
            let heading = normalize(text);
            markers.iter().any(|m| heading.contains(&normalize(m)))
        }
        TextBlock::Text(_) => false,
    })?;

    let paragraphs: Vec<&str> = blocks[start + 1..]
        .iter()
        .map_while(|block| match block {
            TextBlock::Text(text) => Some(text.as_str()),
            TextBlock::Heading(_) => None,
        })
        .collect();
    if paragraphs.is_empty() {
        return None;
    }

    Some(truncate_chars(&paragraphs.join("\n\n"), max_len))
}

/// Truncates to at most `max_len` characters without splitting a code point.
#[must_use]
pub fn truncate_chars(text: &str, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

/// Finds the first label-anchored price, e.g. `Price: ¥1,280.00`.
#[must_use]
pub fn extract_price(text: &str) -> Option<Decimal> {
    let caps = PRICE_RE.captures(text)?;
    let digits: String = caps.get(1)?.as_str().chars().filter(|c| *c != ',').collect();
    Decimal::from_str(&digits).ok().filter(|d| !d.is_zero())
}

/// Collects critic scores like `JS 97` or `RP: 96+ pts`, first per source.
#[must_use]
pub fn extract_ratings(text: &str) -> Vec<Rating> {
    let mut ratings: Vec<Rating> = Vec::new();
    for caps in RATING_RE.captures_iter(text) {
        let (Some(source), Some(score)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let Ok(value) = score.as_str().parse::<u32>() else {
            continue;
        };
        if !(50..=100).contains(&value) || ratings.iter().any(|r| r.source == source.as_str()) {
            continue;
        }
        ratings.push(Rating {
            source: source.as_str().to_string(),
            score: value.to_string(),
        });
    }
    ratings
}

/// `true` when more than a third of the letters are CJK ideographs.
#[must_use]
pub fn is_mostly_cjk(text: &str) -> bool {
    let mut letters = 0usize;
    let mut cjk = 0usize;
    for c in text.chars().filter(|c| c.is_alphabetic()) {
        letters += 1;
        if ('\u{4E00}'..='\u{9FFF}').contains(&c) || ('\u{3400}'..='\u{4DBF}').contains(&c) {
            cjk += 1;
        }
    }
    letters > 0 && cjk * 3 > letters
}
