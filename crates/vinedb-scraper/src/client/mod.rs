//! Rate-limited, retrying HTTP client for the external wine site.

mod origin;
mod throttle;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use vinedb_core::AppConfig;

use crate::error::FetchError;
use crate::rate_limit::retry_with_backoff;

pub use origin::{extract_host, extract_origin, same_site};
use throttle::Throttle;

/// Timeout and retry policy for [`PageFetcher`]. Tests build this directly
/// with zero delays.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub request_timeout: Duration,
    pub user_agent: String,
    pub accept_language: String,
    /// Additional attempts after the first failure for transient errors.
    pub max_retries: u32,
    /// Linear backoff base: retry `n` waits `n * backoff_ms`.
    pub backoff_ms: u64,
    /// Minimum spacing between any two requests from this fetcher and its
    /// clones.
    pub min_interval: Duration,
}

impl FetchConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            request_timeout: Duration::from_secs(config.scraper_request_timeout_secs),
            user_agent: config.scraper_user_agent.clone(),
            accept_language: config.scraper_accept_language.clone(),
            max_retries: config.scraper_max_retries,
            backoff_ms: config.scraper_retry_backoff_ms,
            min_interval: Duration::from_millis(config.scraper_inter_request_delay_ms),
        }
    }
}

/// A successfully fetched HTML page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// Result of a `HEAD` existence check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadInfo {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

/// Downloaded binary payload.
#[derive(Debug, Clone)]
pub struct FetchedBytes {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// HTTP client for the external site.
///
/// Every request goes through one shared throttle, so cloning a fetcher
/// does not multiply the request rate. `404` is surfaced as
/// [`FetchError::NotFound`] without retrying; timeouts, network failures,
/// 429, and 5xx are retried with linear backoff.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    config: FetchConfig,
    throttle: Throttle,
}

impl PageFetcher {
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout.min(Duration::from_secs(10)))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(FetchError::Client)?;
        let throttle = Throttle::new(config.min_interval);
        Ok(Self {
            client,
            config,
            throttle,
        })
    }

    /// Fetches `url` as text.
    ///
    /// # Errors
    ///
    /// - [`FetchError::NotFound`]: HTTP 404, not retried.
    /// - [`FetchError::UnexpectedStatus`]: other 4xx (not retried), or a
    ///   5xx when retries are disabled.
    /// - [`FetchError::ExhaustedRetries`]: every attempt hit a transient error.
    /// - [`FetchError::Timeout`] / [`FetchError::Network`]: transient error
    ///   with a zero retry budget.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        retry_with_backoff(
            url,
            self.config.max_retries,
            self.config.backoff_ms,
            move || async move {
                let response = self.send(self.client.get(url), url).await?;
                let final_url = response.url().to_string();
                let status = response.status().as_u16();
                let body = response
                    .text()
                    .await
                    .map_err(|e| FetchError::from_reqwest(url, e))?;
                tracing::debug!(url, status, bytes = body.len(), "fetched page");
                Ok(FetchedPage {
                    url: final_url,
                    status,
                    body,
                })
            },
        )
        .await
    }

    /// Lightweight existence check.
    ///
    /// # Errors
    ///
    /// Same classification as [`Self::fetch`].
    pub async fn head(&self, url: &str) -> Result<HeadInfo, FetchError> {
        retry_with_backoff(
            url,
            self.config.max_retries,
            self.config.backoff_ms,
            move || async move {
                let response = self.send(self.client.head(url), url).await?;
                let content_type = header_string(&response, reqwest::header::CONTENT_TYPE);
                let content_length = header_string(&response, reqwest::header::CONTENT_LENGTH)
                    .and_then(|v| v.parse::<u64>().ok());
                Ok(HeadInfo {
                    status: response.status().as_u16(),
                    content_type,
                    content_length,
                })
            },
        )
        .await
    }

    /// Downloads a binary resource such as an image.
    ///
    /// # Errors
    ///
    /// Same classification as [`Self::fetch`].
    pub async fn get_bytes(&self, url: &str) -> Result<FetchedBytes, FetchError> {
        retry_with_backoff(
            url,
            self.config.max_retries,
            self.config.backoff_ms,
            move || async move {
                let response = self.send(self.client.get(url), url).await?;
                let content_type = header_string(&response, reqwest::header::CONTENT_TYPE);
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| FetchError::from_reqwest(url, e))?;
                Ok(FetchedBytes {
                    bytes: bytes.to_vec(),
                    content_type,
                })
            },
        )
        .await
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<reqwest::Response, FetchError> {
        self.throttle.wait().await;

        let response = request
            .header(reqwest::header::ACCEPT_LANGUAGE, &self.config.accept_language)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,image/*;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::REFERER, extract_origin(url))
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                url: url.to_owned(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }
        Ok(response)
    }
}

fn header_string(
    response: &reqwest::Response,
    name: reqwest::header::HeaderName,
) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
