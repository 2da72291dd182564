//! The collaborators one scrape run needs, built once from config.

use std::time::Duration;

use vinedb_core::AppConfig;
use vinedb_scraper::{
    AssetValidator, CdnClient, FetchConfig, GenerationClient, MatchConfig, PageFetcher, SiteConfig,
};

/// Generation and CDN calls are slower than page fetches; they get a longer
/// timeout of their own.
const COLLABORATOR_TIMEOUT_SECS: u64 = 90;

#[derive(Debug, Clone)]
pub(crate) struct Pipeline {
    pub fetcher: PageFetcher,
    pub site: SiteConfig,
    pub matching: MatchConfig,
    pub validator: AssetValidator,
    pub cdn: Option<CdnClient>,
    pub generation: Option<GenerationClient>,
}

impl Pipeline {
    /// Builds the fetcher and the optional CDN and generation clients.
    ///
    /// # Errors
    ///
    /// Returns an error if any HTTP client cannot be constructed.
    pub(crate) fn from_app_config(config: &AppConfig) -> anyhow::Result<Self> {
        let fetcher = PageFetcher::new(FetchConfig::from_app_config(config))?;
        let timeout = Duration::from_secs(COLLABORATOR_TIMEOUT_SECS);

        let generation = config
            .generation
            .as_ref()
            .map(|settings| GenerationClient::new(settings, timeout))
            .transpose()?;
        let cdn = config
            .cdn
            .as_ref()
            .map(|settings| CdnClient::new(settings, timeout))
            .transpose()?;

        if cdn.is_none() {
            tracing::info!("CDN not configured; source image URLs will be stored as is");
        }
        if generation.is_none() {
            tracing::info!("generation service not configured; no vision checks or descriptions");
        }

        Ok(Self {
            validator: AssetValidator::new(fetcher.clone(), generation.clone()),
            site: SiteConfig::from_app_config(config),
            matching: MatchConfig::from_app_config(config),
            fetcher,
            cdn,
            generation,
        })
    }

    /// Drops the collaborators that write or bill outside this process: CDN
    /// uploads, generated descriptions, and vision checks. Dry runs use this.
    pub(crate) fn without_external_writes(mut self) -> Self {
        if self.cdn.take().is_some() {
            tracing::info!("dry run: CDN uploads disabled; source image URLs are reported as is");
        }
        if self.generation.take().is_some() {
            tracing::info!("dry run: generation service disabled");
        }
        self.validator = AssetValidator::new(self.fetcher.clone(), None);
        self
    }
}
