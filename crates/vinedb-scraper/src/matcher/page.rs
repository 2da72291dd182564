//! DOM extraction: turns raw HTML into the plain values the scoring
//! functions work on.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static H1: LazyLock<Selector> = LazyLock::new(|| sel("h1"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| sel("title"));
static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| sel("p"));
static BODY: LazyLock<Selector> = LazyLock::new(|| sel("body"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| sel("a[href]"));
static IMG: LazyLock<Selector> = LazyLock::new(|| sel("img"));
static BLOCK: LazyLock<Selector> =
    LazyLock::new(|| sel("h1, h2, h3, h4, h5, h6, dt, p, dd, blockquote"));
static FILENAME_SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-(\d{2,5})x(\d{2,5})\.[A-Za-z0-9]+$").expect("valid filename size regex")
});

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// Number of leading paragraphs treated as the page's lead text.
const LEAD_PARAGRAPHS: usize = 3;

/// Elements whose text is never content.
const NOISE_TAGS: &[&str] = &[
    "script", "style", "noscript", "svg", "template", "iframe", "nav", "header", "footer",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    /// Absolute URL, fragment removed.
    pub href: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// Absolute URL.
    pub src: String,
    pub alt: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextBlock {
    Heading(String),
    Text(String),
}

/// A fetched page reduced to what matching needs.
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub url: String,
    /// First `h1`, else `<title>`.
    pub heading: Option<String>,
    pub lead_text: String,
    pub links: Vec<PageLink>,
    pub images: Vec<PageImage>,
    /// Headings and text paragraphs in document order.
    pub blocks: Vec<TextBlock>,
    /// All visible body text, whitespace-collapsed.
    pub full_text: String,
}

impl ParsedPage {
    /// Parses `html` fetched from `url`. Relative links and image sources
    /// are resolved against `url`; ones that cannot be resolved are dropped.
    #[must_use]
    pub fn parse(html: &str, url: &str) -> Self {
        let document = Html::parse_document(html);
        let base = reqwest::Url::parse(url).ok();

        let heading = document
            .select(&H1)
            .filter(|h| !in_noise(*h))
            .map(element_text)
            .find(|t| !t.is_empty())
            .or_else(|| {
                document
                    .select(&TITLE)
                    .map(element_text)
                    .find(|t| !t.is_empty())
            });

        let lead_text = document
            .select(&PARAGRAPH)
            .filter(|p| !in_noise(*p))
            .map(element_text)
            .filter(|t| !t.is_empty())
            .take(LEAD_PARAGRAPHS)
            .collect::<Vec<_>>()
            .join(" ");

        let links = document
            .select(&ANCHOR)
            .filter_map(|a| {
                let href = resolve(base.as_ref(), a.value().attr("href")?)?;
                let mut text = element_text(a);
                if text.is_empty() {
                    text = a
                        .value()
                        .attr("title")
                        .map(collapse_whitespace)
                        .or_else(|| {
                            a.select(&IMG)
                                .find_map(|img| img.value().attr("alt").map(collapse_whitespace))
                        })
                        .unwrap_or_default();
                }
                Some(PageLink { href, text })
            })
            .collect();

        let images = document
            .select(&IMG)
            .filter_map(|img| parse_image(img, base.as_ref()))
            .collect();

        let blocks = document
            .select(&BLOCK)
            .filter(|el| !in_noise(*el))
            .filter_map(|el| {
                let text = element_text(el);
                if text.is_empty() {
                    return None;
                }
                let name = el.value().name();
                if (name.len() == 2 && name.starts_with('h')) || name == "dt" {
                    Some(TextBlock::Heading(text))
                } else {
                    Some(TextBlock::Text(text))
                }
            })
            .collect();

        let mut parts = Vec::new();
        if let Some(body) = document.select(&BODY).next() {
            collect_visible_text(body, &mut parts);
        }
        let full_text = collapse_whitespace(&parts.join(" "));

        Self {
            url: url.to_owned(),
            heading,
            lead_text,
            links,
            images,
            blocks,
            full_text,
        }
    }
}

fn parse_image(img: ElementRef<'_>, base: Option<&reqwest::Url>) -> Option<PageImage> {
    let attrs = img.value();
    let raw_src = ["src", "data-src", "data-lazy-src", "data-original"]
        .into_iter()
        .filter_map(|name| attrs.attr(name))
        .map(str::trim)
        .find(|v| !v.is_empty() && !v.starts_with("data:"))?;
    let src = resolve(base, raw_src)?;

    let mut width = attrs.attr("width").and_then(parse_dimension);
    let mut height = attrs.attr("height").and_then(parse_dimension);
    if width.is_none() || height.is_none() {
        if let Some((w, h)) = filename_dimensions(&src) {
            width = width.or(Some(w));
            height = height.or(Some(h));
        }
    }

    Some(PageImage {
        src,
        alt: attrs.attr("alt").map(collapse_whitespace).unwrap_or_default(),
        width,
        height,
    })
}

/// Reads `"800"` or `"800px"`; anything else (percentages, `auto`) is unknown.
fn parse_dimension(raw: &str) -> Option<u32> {
    raw.trim().trim_end_matches("px").parse::<u32>().ok()
}

/// Parses a `-<W>x<H>` thumbnail suffix such as `label-300x900.jpg`.
fn filename_dimensions(src: &str) -> Option<(u32, u32)> {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    let caps = FILENAME_SIZE_RE.captures(path)?;
    let w = caps.get(1)?.as_str().parse().ok()?;
    let h = caps.get(2)?.as_str().parse().ok()?;
    Some((w, h))
}

fn resolve(base: Option<&reqwest::Url>, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty()
        || raw.starts_with('#')
        || raw.starts_with("javascript:")
        || raw.starts_with("mailto:")
        || raw.starts_with("tel:")
    {
        return None;
    }
    let mut url = match base {
        Some(base) => base.join(raw).ok()?,
        None => reqwest::Url::parse(raw).ok()?,
    };
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

fn in_noise(el: ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| NOISE_TAGS.contains(&a.value().name()))
}

fn collect_visible_text(element: ElementRef<'_>, parts: &mut Vec<String>) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if NOISE_TAGS.contains(&child_element.value().name()) {
                continue;
            }
            collect_visible_text(child_element, parts);
        } else if let Some(text) = child.value().as_text() {
            parts.push(text.text.to_string());
        }
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!doctype html>
<html><head><title>Opus One 2019 | Wine Cellar</title></head>
<body>
  <header><nav><a href="/">Home</a><h1>Wine Cellar</h1></nav></header>
  <main>
    <h1> Opus One
         2019 </h1>
    <p>A Bordeaux-style blend from Oakville.</p>
    <img src="/wp-content/uploads/2023/04/opus-one-2019-300x900.jpg" alt="Opus One bottle">
    <img data-src="https://wines.example.com/uploads/lazy.jpg" src="data:image/gif;base64,R0lGOD" width="400px" height="auto">
    <a href="?wine=overture#top">Overture</a>
    <a href="javascript:void(0)">Share</a>
    <a href="/?wine=opus-one-2018"><img src="/uploads/thumb.jpg" alt="Opus One 2018"></a>
    <h2>Description</h2>
    <p>Deep ruby.</p>
  </main>
  <script>var price = "Price: 999";</script>
  <footer><p>Copyright</p></footer>
</body></html>"#;

    fn parsed() -> ParsedPage {
        ParsedPage::parse(PAGE, "https://wines.example.com/?wine=opus-one-2019")
    }

    #[test]
    fn heading_prefers_main_h1_over_site_chrome() {
        assert_eq!(parsed().heading.as_deref(), Some("Opus One 2019"));
    }

    #[test]
    fn heading_falls_back_to_title() {
        let page = ParsedPage::parse(
            "<html><head><title>Sassicaia</title></head><body></body></html>",
            "https://wines.example.com/",
        );
        assert_eq!(page.heading.as_deref(), Some("Sassicaia"));
    }

    #[test]
    fn lead_text_skips_footer() {
        let page = parsed();
        assert!(page.lead_text.starts_with("A Bordeaux-style blend"));
        assert!(!page.lead_text.contains("Copyright"));
    }

    #[test]
    fn links_are_absolute_and_filtered() {
        let page = parsed();
        let hrefs: Vec<&str> = page.links.iter().map(|l| l.href.as_str()).collect();
        assert!(hrefs.contains(&"https://wines.example.com/?wine=overture"));
        assert!(!hrefs.iter().any(|h| h.starts_with("javascript")));
        let image_link = page
            .links
            .iter()
            .find(|l| l.href.ends_with("opus-one-2018"))
            .unwrap();
        assert_eq!(image_link.text, "Opus One 2018");
    }

    #[test]
    fn images_read_lazy_sources_and_filename_sizes() {
        let page = parsed();
        let wp = &page.images[0];
        assert_eq!(
            wp.src,
            "https://wines.example.com/wp-content/uploads/2023/04/opus-one-2019-300x900.jpg"
        );
        assert_eq!((wp.width, wp.height), (Some(300), Some(900)));

        let lazy = &page.images[1];
        assert_eq!(lazy.src, "https://wines.example.com/uploads/lazy.jpg");
        assert_eq!((lazy.width, lazy.height), (Some(400), None));
    }

    #[test]
    fn blocks_keep_document_order() {
        let page = parsed();
        let pos_heading = page
            .blocks
            .iter()
            .position(|b| *b == TextBlock::Heading("Description".to_string()))
            .unwrap();
        assert_eq!(
            page.blocks[pos_heading + 1],
            TextBlock::Text("Deep ruby.".to_string())
        );
        assert!(!page
            .blocks
            .contains(&TextBlock::Heading("Wine Cellar".to_string())));
    }

    #[test]
    fn full_text_excludes_scripts() {
        let page = parsed();
        assert!(page.full_text.contains("Deep ruby."));
        assert!(!page.full_text.contains("var price"));
    }
}
