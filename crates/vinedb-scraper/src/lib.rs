//! Scraping side of the pipeline: candidate slugs and probe URLs, the
//! throttled fetcher, the page matcher, asset validation, and the optional
//! CDN and generation collaborators.

pub mod cdn;
pub mod client;
pub mod error;
pub mod generation;
pub mod matcher;
pub mod probe;
mod rate_limit;
pub mod slug;
pub mod validate;

pub use cdn::{object_name, CdnClient};
pub use client::{FetchConfig, FetchedBytes, FetchedPage, HeadInfo, PageFetcher};
pub use error::{FetchError, ScraperError};
pub use generation::{DescriptionSubject, Descriptions, GenerationClient, InlineImage};
pub use matcher::{
    evaluate_page, extract_candidate, score_links, MatchCandidate, MatchConfig, MatchTarget,
    PageScore, ParsedPage, Rejection, ScoredLink,
};
pub use probe::{build_probe_plan, ProbeKind, ProbePlan, ProbeTarget, ProbeUrl, SiteConfig};
pub use slug::slug_variants;
pub use validate::{AssetValidator, AssetVerdict};
