use thiserror::Error;

/// Terminal outcome of fetching one URL.
///
/// `NotFound`, `UnexpectedStatus`, and `ExhaustedRetries` end the probe of a
/// single URL; the caller moves on to the next candidate. `Timeout` and
/// `Network` are what the retry loop absorbs; they only surface when the
/// retry budget is zero.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("request timed out: {url}")]
    Timeout { url: String },

    #[error("network error for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("gave up on {url} after {attempts} attempts: {last}")]
    ExhaustedRetries {
        url: String,
        attempts: u32,
        last: Box<FetchError>,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("HTTP client could not be built: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    /// `true` for conditions worth retrying after a backoff delay.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout { .. } | FetchError::Network { .. } => true,
            FetchError::UnexpectedStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_owned(),
            }
        } else {
            FetchError::Network {
                url: url.to_owned(),
                source: err,
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("generation service error: {0}")]
    Generation(String),

    #[error("CDN upload failed for {path}: {reason}")]
    Upload { path: String, reason: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
