//! Product image selection on an accepted page.

use std::sync::LazyLock;

use regex::Regex;

use super::page::PageImage;
use super::{normalize, MatchConfig};

/// Path or alt-text words that mark site chrome rather than products. They
/// match whole tokens (split on `/`, `-`, `_`, `.`, and spaces), optionally
/// plural, so `site-logo.png` is excluded but `penfolds-flagship.jpg` is not.
const EXCLUDED_TOKENS: &[&str] = &[
    "logo",
    "icon",
    "banner",
    "avatar",
    "favicon",
    "sprite",
    "placeholder",
    "spinner",
    "loading",
    "social",
    "payment",
    "badge",
    "flag",
    "qrcode",
    "header",
    "footer",
    "background",
];

const EXCLUDED_EXTENSIONS: &[&str] = &["svg", "ico", "gif"];

const PATH_CONVENTION_SCORE: i32 = 40;
const DATED_PATH_BONUS: i32 = 10;
const FILENAME_KEYWORD_BONUS: i32 = 15;

static DATED_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/20\d{2}/\d{2}/").expect("valid dated path regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredImage {
    pub src: String,
    pub score: i32,
}

fn url_path(src: &str) -> String {
    reqwest::Url::parse(src).map_or_else(
        |_| src.to_ascii_lowercase(),
        |u| u.path().to_ascii_lowercase(),
    )
}

fn chrome_token(token: &str) -> bool {
    let singular = token.strip_suffix('s').unwrap_or(token);
    EXCLUDED_TOKENS
        .iter()
        .any(|t| *t == token || *t == singular)
}

fn has_chrome_tokens(text: &str) -> bool {
    let tokens: Vec<&str> = text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    tokens.iter().copied().any(chrome_token)
        || tokens.windows(2).any(|pair| pair == ["qr", "code"])
}

fn is_excluded(path: &str, alt: &str) -> bool {
    let extension = path.rsplit('.').next().unwrap_or_default();
    EXCLUDED_EXTENSIONS.contains(&extension)
        || has_chrome_tokens(path)
        || has_chrome_tokens(&alt.to_ascii_lowercase())
}

fn size_adjustment(width: Option<u32>, height: Option<u32>) -> i32 {
    let smallest = match (width, height) {
        (Some(w), Some(h)) => w.min(h),
        (Some(side), None) | (None, Some(side)) => side,
        (None, None) => return 0,
    };
    match smallest {
        0..=99 => -50,
        100..=199 => -20,
        200..=399 => 15,
        _ => 30,
    }
}

/// Scores one image, or `None` when it is excluded outright: site chrome,
/// a vector or icon format, or outside the content-asset path.
#[must_use]
pub fn score_image(image: &PageImage, keywords: &[String], config: &MatchConfig) -> Option<i32> {
    let path = url_path(&image.src);
    if is_excluded(&path, &image.alt) {
        return None;
    }
    if !path.contains(&config.asset_path.to_ascii_lowercase()) {
        return None;
    }

    let mut score = PATH_CONVENTION_SCORE;
    if DATED_PATH_RE.is_match(&path) {
        score += DATED_PATH_BONUS;
    }

    let filename = path.rsplit('/').next().unwrap_or_default();
    let stem = filename.rsplit_once('.').map_or(filename, |(stem, _)| stem);
    let filename_words = normalize(stem);
    let filename_tokens: Vec<&str> = filename_words.split(' ').collect();
    let hits = keywords
        .iter()
        .filter(|k| filename_tokens.contains(&k.as_str()))
        .count();
    score += FILENAME_KEYWORD_BONUS * i32::try_from(hits).unwrap_or(0);

    score += size_adjustment(image.width, image.height);
    Some(score)
}

/// Scores every eligible image, best first. Equal scores keep document
/// order.
#[must_use]
pub fn rank_images(
    images: &[PageImage],
    keywords: &[String],
    config: &MatchConfig,
) -> Vec<ScoredImage> {
    let mut ranked: Vec<ScoredImage> = images
        .iter()
        .filter_map(|image| {
            score_image(image, keywords, config).map(|score| ScoredImage {
                src: image.src.clone(),
                score,
            })
        })
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.dedup_by(|a, b| a.src == b.src);
    ranked
}

/// The top-scoring image at or above the configured minimum. No image is
/// returned rather than a doubtful one.
#[must_use]
pub fn select_image(
    images: &[PageImage],
    keywords: &[String],
    config: &MatchConfig,
) -> Option<ScoredImage> {
    rank_images(images, keywords, config)
        .into_iter()
        .next()
        .filter(|img| img.score >= config.min_image_score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(src: &str, width: Option<u32>, height: Option<u32>) -> PageImage {
        PageImage {
            src: src.to_string(),
            alt: String::new(),
            width,
            height,
        }
    }

    fn config() -> MatchConfig {
        MatchConfig {
            asset_path: "/uploads/".to_string(),
            ..MatchConfig::default()
        }
    }

    #[test]
    fn label_beats_logo() {
        let images = vec![
            image("https://wines.example.com/theme/icons/logo.png", Some(40), Some(40)),
            image(
                "https://wines.example.com/assets/uploads/wine-label.jpg",
                Some(200),
                Some(800),
            ),
        ];
        let keywords = vec!["chateau".to_string(), "exemple".to_string()];
        let chosen = select_image(&images, &keywords, &config()).unwrap();
        assert_eq!(chosen.src, "https://wines.example.com/assets/uploads/wine-label.jpg");
    }

    #[test]
    fn logo_is_never_selected_even_under_asset_path() {
        let images = vec![image(
            "https://wines.example.com/uploads/2024/01/site-logo.png",
            Some(800),
            Some(800),
        )];
        assert!(select_image(&images, &[], &config()).is_none());
    }

    #[test]
    fn alt_text_can_exclude() {
        let mut img = image("https://wines.example.com/uploads/a.jpg", None, None);
        img.alt = "Company Logo".to_string();
        assert!(score_image(&img, &[], &config()).is_none());
    }

    #[test]
    fn chrome_words_must_be_whole_tokens() {
        let kept = [
            "https://wines.example.com/uploads/penfolds-flagship-shiraz.jpg",
            "https://wines.example.com/uploads/siliconvalley-cab.jpg",
            "https://wines.example.com/uploads/bannerman-estate_reserve.jpg",
        ];
        for src in kept {
            assert!(
                score_image(&image(src, None, None), &[], &config()).is_some(),
                "{src} should be eligible"
            );
        }

        let dropped = [
            "https://wines.example.com/uploads/flags/fr.png",
            "https://wines.example.com/uploads/2024/01/payment_icons.jpg",
            "https://wines.example.com/uploads/shop-qr-code.jpg",
        ];
        for src in dropped {
            assert!(
                score_image(&image(src, None, None), &[], &config()).is_none(),
                "{src} should be excluded"
            );
        }
    }

    #[test]
    fn images_outside_asset_path_are_ignored() {
        let images = vec![image(
            "https://wines.example.com/static/bottle.jpg",
            Some(600),
            Some(900),
        )];
        assert!(select_image(&images, &[], &config()).is_none());
    }

    #[test]
    fn small_images_fall_below_minimum() {
        let images = vec![image(
            "https://wines.example.com/uploads/thumb.jpg",
            Some(80),
            Some(120),
        )];
        assert!(select_image(&images, &[], &config()).is_none());
    }

    #[test]
    fn filename_keywords_and_dated_path_raise_score() {
        let keywords = vec!["opus".to_string()];
        let plain = image("https://wines.example.com/uploads/bottle.jpg", None, None);
        let named = image("https://wines.example.com/uploads/2023/04/opus-one.jpg", None, None);
        assert_eq!(score_image(&plain, &keywords, &config()), Some(40));
        assert_eq!(score_image(&named, &keywords, &config()), Some(65));
    }

    #[test]
    fn ties_keep_document_order() {
        let images = vec![
            image("https://wines.example.com/uploads/first.jpg", None, None),
            image("https://wines.example.com/uploads/second.jpg", None, None),
        ];
        let chosen = select_image(&images, &[], &config()).unwrap();
        assert!(chosen.src.ends_with("first.jpg"));
    }
}
