//! Asset validation: is an extracted image plausibly the product photo?

use crate::client::{FetchedBytes, PageFetcher};
use crate::error::FetchError;
use crate::generation::{GenerationClient, InlineImage};

/// Confidence assigned when only the lightweight check ran.
const HEURISTIC_CONFIDENCE: f32 = 0.6;

#[derive(Debug, Clone)]
pub struct AssetVerdict {
    pub accepted: bool,
    pub confidence: f32,
    pub reason: String,
    /// Image bytes, when validation had to download them.
    pub payload: Option<FetchedBytes>,
}

impl AssetVerdict {
    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            confidence: 0.0,
            reason: reason.into(),
            payload: None,
        }
    }
}

fn is_image_type(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
}

/// Checks reachability and content type, then optionally asks a vision
/// service. The vision step can only refine a verdict; when it errors the
/// lightweight verdict stands.
#[derive(Debug, Clone)]
pub struct AssetValidator {
    fetcher: PageFetcher,
    vision: Option<GenerationClient>,
}

impl AssetValidator {
    #[must_use]
    pub fn new(fetcher: PageFetcher, vision: Option<GenerationClient>) -> Self {
        Self { fetcher, vision }
    }

    pub async fn validate(&self, image_url: &str, entity_name: &str) -> AssetVerdict {
        let (content_type, mut payload) = match self.fetcher.head(image_url).await {
            Ok(info) => (info.content_type, None),
            // Some asset hosts refuse HEAD; fall back to a full download.
            Err(FetchError::UnexpectedStatus { status: 405, .. }) => {
                match self.fetcher.get_bytes(image_url).await {
                    Ok(bytes) => (bytes.content_type.clone(), Some(bytes)),
                    Err(e) => return AssetVerdict::rejected(format!("image unreachable: {e}")),
                }
            }
            Err(e) => return AssetVerdict::rejected(format!("image unreachable: {e}")),
        };

        if !is_image_type(content_type.as_deref()) {
            return AssetVerdict::rejected(format!(
                "content type {} is not an image",
                content_type.as_deref().unwrap_or("(none)")
            ));
        }
        let content_type = content_type.unwrap_or_default();

        let heuristic = AssetVerdict {
            accepted: true,
            confidence: HEURISTIC_CONFIDENCE,
            reason: format!("reachable {content_type}"),
            payload: None,
        };
        let Some(vision) = &self.vision else {
            return AssetVerdict { payload, ..heuristic };
        };

        if payload.is_none() {
            match self.fetcher.get_bytes(image_url).await {
                Ok(bytes) => payload = Some(bytes),
                Err(e) => {
                    tracing::warn!(
                        url = image_url,
                        error = %e,
                        "image download for vision check failed"
                    );
                    return heuristic;
                }
            }
        }
        let Some(bytes) = payload.as_ref() else {
            return heuristic;
        };

        let image = InlineImage {
            bytes: &bytes.bytes,
            content_type: bytes.content_type.as_deref().unwrap_or(&content_type),
        };
        let outcome = vision.classify_image(image, entity_name).await;
        match outcome {
            Ok(verdict) => {
                tracing::debug!(
                    url = image_url,
                    matches = verdict.matches,
                    confidence = verdict.confidence,
                    "vision verdict"
                );
                AssetVerdict {
                    accepted: verdict.matches,
                    confidence: verdict.confidence,
                    reason: verdict.reason,
                    payload,
                }
            }
            Err(e) => {
                tracing::warn!(
                    url = image_url,
                    error = %e,
                    "vision check failed, keeping heuristic verdict"
                );
                AssetVerdict { payload, ..heuristic }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_type_detection() {
        assert!(is_image_type(Some("image/jpeg")));
        assert!(is_image_type(Some(" Image/PNG")));
        assert!(!is_image_type(Some("text/html; charset=utf-8")));
        assert!(!is_image_type(None));
    }
}
