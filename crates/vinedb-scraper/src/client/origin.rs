//! URL origin and host helpers for the page fetcher and link scoring.

/// Extracts the scheme+host origin from a URL.
///
/// Given `"https://wines.example.com/?wine=opus-one"`, returns
/// `"https://wines.example.com"`. Used as the `Referer` for site requests.
#[must_use]
pub fn extract_origin(url: &str) -> String {
    reqwest::Url::parse(url).map_or_else(
        |e| {
            tracing::debug!(url, error = %e, "could not parse URL, splitting for origin");
            url.trim_end_matches('/')
                .splitn(4, '/')
                .take(3)
                .collect::<Vec<_>>()
                .join("/")
        },
        |u| u.origin().ascii_serialization(),
    )
}

/// Extracts the host from a URL, lowercased. Returns `None` when the URL
/// does not parse or has no host.
#[must_use]
pub fn extract_host(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

/// `true` when both URLs resolve to the same host, ignoring a leading `www.`.
#[must_use]
pub fn same_site(a: &str, b: &str) -> bool {
    match (extract_host(a), extract_host(b)) {
        (Some(ha), Some(hb)) => ha.trim_start_matches("www.") == hb.trim_start_matches("www."),
        _ => false,
    }
}
