//! Image URL verification for stored catalog entities.

use futures::stream::{self, StreamExt};
use reqwest::StatusCode;
use vinedb_core::EntityKind;
use vinedb_db::CatalogStore;

/// HEAD-checks every stored `main_image_url` and prints aggregate totals.
///
/// Non-200 URLs are logged for cleanup. These are CDN or source-site
/// assets, so the external-site throttle does not apply.
pub(crate) async fn run_verify_images<S: CatalogStore>(
    store: &S,
    kind: Option<EntityKind>,
    concurrency: usize,
) -> anyhow::Result<(usize, usize)> {
    let targets: Vec<(String, String)> = store
        .list(kind)
        .await?
        .into_iter()
        .filter_map(|e| {
            let label = format!("{}:{}", e.kind, e.slug);
            e.fields.main_image_url.map(|url| (label, url))
        })
        .collect();

    if targets.is_empty() {
        println!("no image URLs found to verify");
        return Ok((0, 0));
    }

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(12))
        .user_agent("vinedb-verifier/1.0")
        .build()?;

    let checks = stream::iter(targets.into_iter().map(|(label, url)| {
        let client = client.clone();
        async move {
            let result = client.head(&url).send().await;
            (label, url, result)
        }
    }))
    .buffer_unordered(concurrency.max(1))
    .collect::<Vec<_>>()
    .await;

    let mut ok_count = 0usize;
    let mut bad_count = 0usize;
    for (label, url, result) in checks {
        match result {
            Ok(resp) if resp.status() == StatusCode::OK => ok_count += 1,
            Ok(resp) => {
                bad_count += 1;
                tracing::warn!(
                    entity = %label,
                    status = resp.status().as_u16(),
                    url = %url,
                    "image URL verification failed"
                );
            }
            Err(e) => {
                bad_count += 1;
                tracing::warn!(
                    entity = %label,
                    error = %e,
                    url = %url,
                    "image URL verification failed"
                );
            }
        }
    }

    println!("verified image URLs: {ok_count} OK, {bad_count} bad");
    Ok((ok_count, bad_count))
}
