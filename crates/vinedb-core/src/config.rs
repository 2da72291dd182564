use std::path::PathBuf;

use thiserror::Error;

use crate::app_config::{AppConfig, CdnSettings, Environment, GenerationSettings};

pub(crate) const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sources file {path}: {source}")]
    SourcesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sources file {path}: {reason}")]
    SourcesFileParse { path: String, reason: String },

    #[error("source validation failed: {0}")]
    Validation(String),
}

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation are decoupled from the real environment so tests
/// can drive this with a plain `HashMap`.
#[allow(clippy::too_many_lines)] // one binding per env var
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_i32 = |var: &str, default: &str| -> Result<i32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<i32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;
    let site_base_url = require("VINEDB_SITE_BASE_URL")?;
    if !(site_base_url.starts_with("http://") || site_base_url.starts_with("https://")) {
        return Err(ConfigError::InvalidEnvVar {
            var: "VINEDB_SITE_BASE_URL".to_string(),
            reason: format!("\"{site_base_url}\" must start with http:// or https://"),
        });
    }

    let env = parse_environment(&or_default("VINEDB_ENV", "development"))?;
    let log_level = or_default("VINEDB_LOG_LEVEL", "info");
    let sources_path = PathBuf::from(or_default("VINEDB_SOURCES_PATH", "./config/sources.yaml"));
    let ledger_path = PathBuf::from(or_default(
        "VINEDB_LEDGER_PATH",
        "./data/scrape-progress.json",
    ));

    let db_max_connections = parse_u32("VINEDB_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("VINEDB_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("VINEDB_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let site_wine_param = or_default("VINEDB_SITE_WINE_PARAM", "wine");
    let site_winery_param = or_default("VINEDB_SITE_WINERY_PARAM", "winery");
    let site_search_param = or_default("VINEDB_SITE_SEARCH_PARAM", "s");
    let site_category_param = or_default("VINEDB_SITE_CATEGORY_PARAM", "category");
    let site_asset_path = or_default("VINEDB_SITE_ASSET_PATH", "/uploads/");

    let scraper_request_timeout_secs = parse_u64("VINEDB_SCRAPER_REQUEST_TIMEOUT_SECS", "30")?;
    let scraper_user_agent = or_default("VINEDB_SCRAPER_USER_AGENT", DEFAULT_USER_AGENT);
    let scraper_accept_language = or_default(
        "VINEDB_SCRAPER_ACCEPT_LANGUAGE",
        "en-US,en;q=0.9,zh-CN;q=0.8",
    );
    let scraper_inter_request_delay_ms =
        parse_u64("VINEDB_SCRAPER_INTER_REQUEST_DELAY_MS", "1500")?;
    let scraper_max_retries = parse_u32("VINEDB_SCRAPER_MAX_RETRIES", "3")?;
    let scraper_retry_backoff_ms = parse_u64("VINEDB_SCRAPER_RETRY_BACKOFF_MS", "1000")?;

    let match_min_keyword_hits = parse_usize("VINEDB_MATCH_MIN_KEYWORD_HITS", "2")?;
    if match_min_keyword_hits == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "VINEDB_MATCH_MIN_KEYWORD_HITS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let match_min_link_score = parse_i32("VINEDB_MATCH_MIN_LINK_SCORE", "20")?;
    let match_min_image_score = parse_i32("VINEDB_MATCH_MIN_IMAGE_SCORE", "40")?;
    let match_max_text_len = parse_usize("VINEDB_MATCH_MAX_TEXT_LEN", "2000")?;

    let cdn = parse_cdn_settings(
        optional("VINEDB_CDN_URL"),
        optional("VINEDB_CDN_KEY"),
        optional("VINEDB_CDN_BUCKET"),
    )?;

    let generation = optional("VINEDB_GENERATION_URL").map(|url| GenerationSettings {
        url,
        api_key: optional("VINEDB_GENERATION_API_KEY"),
        model: or_default("VINEDB_GENERATION_MODEL", "gpt-4o-mini"),
    });

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        sources_path,
        ledger_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        site_base_url,
        site_wine_param,
        site_winery_param,
        site_search_param,
        site_category_param,
        site_asset_path,
        scraper_request_timeout_secs,
        scraper_user_agent,
        scraper_accept_language,
        scraper_inter_request_delay_ms,
        scraper_max_retries,
        scraper_retry_backoff_ms,
        match_min_keyword_hits,
        match_min_link_score,
        match_min_image_score,
        match_max_text_len,
        cdn,
        generation,
    })
}

/// The CDN is all-or-nothing: either every `VINEDB_CDN_*` variable is set or
/// none is.
fn parse_cdn_settings(
    url: Option<String>,
    key: Option<String>,
    bucket: Option<String>,
) -> Result<Option<CdnSettings>, ConfigError> {
    match (url, key, bucket) {
        (Some(base_url), Some(api_key), Some(bucket)) => Ok(Some(CdnSettings {
            base_url,
            api_key,
            bucket,
        })),
        (None, None, None) => Ok(None),
        (url, key, bucket) => {
            let missing: Vec<&str> = [
                ("VINEDB_CDN_URL", url.is_none()),
                ("VINEDB_CDN_KEY", key.is_none()),
                ("VINEDB_CDN_BUCKET", bucket.is_none()),
            ]
            .into_iter()
            .filter_map(|(var, absent)| absent.then_some(var))
            .collect();
            Err(ConfigError::InvalidEnvVar {
                var: "VINEDB_CDN_URL".to_string(),
                reason: format!("partial CDN configuration; also set {}", missing.join(", ")),
            })
        }
    }
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "VINEDB_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
