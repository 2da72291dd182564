use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Connection details for the asset CDN. Present only when all three
/// `VINEDB_CDN_*` variables are set.
#[derive(Clone)]
pub struct CdnSettings {
    pub base_url: String,
    pub api_key: String,
    pub bucket: String,
}

/// Connection details for the optional text/vision generation service.
#[derive(Clone)]
pub struct GenerationSettings {
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub sources_path: PathBuf,
    pub ledger_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub site_base_url: String,
    pub site_wine_param: String,
    pub site_winery_param: String,
    pub site_search_param: String,
    pub site_category_param: String,
    pub site_asset_path: String,
    pub scraper_request_timeout_secs: u64,
    pub scraper_user_agent: String,
    pub scraper_accept_language: String,
    pub scraper_inter_request_delay_ms: u64,
    pub scraper_max_retries: u32,
    pub scraper_retry_backoff_ms: u64,
    pub match_min_keyword_hits: usize,
    pub match_min_link_score: i32,
    pub match_min_image_score: i32,
    pub match_max_text_len: usize,
    pub cdn: Option<CdnSettings>,
    pub generation: Option<GenerationSettings>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("sources_path", &self.sources_path)
            .field("ledger_path", &self.ledger_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("site_base_url", &self.site_base_url)
            .field("site_wine_param", &self.site_wine_param)
            .field("site_winery_param", &self.site_winery_param)
            .field("site_search_param", &self.site_search_param)
            .field("site_category_param", &self.site_category_param)
            .field("site_asset_path", &self.site_asset_path)
            .field(
                "scraper_request_timeout_secs",
                &self.scraper_request_timeout_secs,
            )
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field("scraper_accept_language", &self.scraper_accept_language)
            .field(
                "scraper_inter_request_delay_ms",
                &self.scraper_inter_request_delay_ms,
            )
            .field("scraper_max_retries", &self.scraper_max_retries)
            .field("scraper_retry_backoff_ms", &self.scraper_retry_backoff_ms)
            .field("match_min_keyword_hits", &self.match_min_keyword_hits)
            .field("match_min_link_score", &self.match_min_link_score)
            .field("match_min_image_score", &self.match_min_image_score)
            .field("match_max_text_len", &self.match_max_text_len)
            .field(
                "cdn",
                &self
                    .cdn
                    .as_ref()
                    .map(|c| format!("{} (bucket {}, key [redacted])", c.base_url, c.bucket)),
            )
            .field(
                "generation",
                &self
                    .generation
                    .as_ref()
                    .map(|g| format!("{} (model {}, key [redacted])", g.url, g.model)),
            )
            .finish()
    }
}
