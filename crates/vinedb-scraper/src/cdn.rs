//! Upload client for the asset CDN (a Supabase-style storage endpoint).

use std::time::Duration;

use sha2::{Digest, Sha256};
use vinedb_core::app_config::CdnSettings;

use crate::error::ScraperError;

/// Hex characters of the content hash kept in object names.
const HASH_PREFIX_LEN: usize = 12;

#[derive(Debug, Clone)]
pub struct CdnClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    bucket: String,
}

impl CdnClient {
    /// # Errors
    ///
    /// Returns [`ScraperError::Upload`] if the HTTP client cannot be built.
    pub fn new(settings: &CdnSettings, timeout: Duration) -> Result<Self, ScraperError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScraperError::Upload {
                path: settings.base_url.clone(),
                reason: format!("client build failed: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            bucket: settings.bucket.clone(),
        })
    }

    /// Durable public URL of `folder/name` in the configured bucket.
    #[must_use]
    pub fn public_url(&self, folder: &str, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{folder}/{name}",
            self.base_url, self.bucket
        )
    }

    /// Uploads `bytes` as `folder/name`, replacing any existing object, and
    /// returns its public URL.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Upload`] on transport failure or a non-2xx
    /// response.
    pub async fn upload(
        &self,
        folder: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ScraperError> {
        let path = format!("{folder}/{name}");
        let endpoint = format!(
            "{}/storage/v1/object/{}/{path}",
            self.base_url, self.bucket
        );
        let size = bytes.len();

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| ScraperError::Upload {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScraperError::Upload {
                path,
                reason: format!("HTTP {}: {}", status.as_u16(), body.trim()),
            });
        }

        tracing::debug!(path = %path, size, "uploaded asset");
        Ok(self.public_url(folder, name))
    }
}

/// File extension for an image, from its content type, then the source URL,
/// defaulting to `jpg`.
fn image_extension(content_type: Option<&str>, source_url: &str) -> &'static str {
    let from_type = content_type.and_then(|ct| {
        let essence = ct.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
            "image/png" => Some("png"),
            "image/webp" => Some("webp"),
            "image/gif" => Some("gif"),
            _ => None,
        }
    });
    if let Some(ext) = from_type {
        return ext;
    }

    let path = source_url
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "png",
        Some("webp") => "webp",
        Some("gif") => "gif",
        _ => "jpg",
    }
}

/// Object name for an uploaded image: `<slug>-<hash>.<ext>`, where `hash` is
/// a prefix of the SHA-256 of the payload. Identical payloads map to the
/// same name, so re-uploads overwrite rather than accumulate.
#[must_use]
pub fn object_name(
    slug: &str,
    bytes: &[u8],
    content_type: Option<&str>,
    source_url: &str,
) -> String {
    let digest = Sha256::digest(bytes);
    let hash: String = digest
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<String>()
        .chars()
        .take(HASH_PREFIX_LEN)
        .collect();
    format!("{slug}-{hash}.{}", image_extension(content_type, source_url))
}
