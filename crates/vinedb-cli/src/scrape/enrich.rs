//! Turns an accepted match into catalog fields: validates and re-hosts the
//! image, sorts extracted text by language, and fills missing descriptions
//! from the generation service. Every external call here degrades to
//! "skip this enhancement" on failure.

use vinedb_core::{EnrichableFields, SourceRecord};
use vinedb_scraper::matcher::text::is_mostly_cjk;
use vinedb_scraper::{object_name, DescriptionSubject, FetchedBytes, MatchCandidate};

use super::pipeline::Pipeline;

/// Builds the fields to upsert from `candidate`.
///
/// `stored` is the entity's current record, if any; generated descriptions
/// only fill what it lacks and never replace existing text.
pub(crate) async fn enrich(
    pipeline: &Pipeline,
    record: &SourceRecord,
    candidate: &MatchCandidate,
    stored: Option<&EnrichableFields>,
) -> EnrichableFields {
    let mut fields = EnrichableFields {
        external_url: Some(candidate.url.clone()),
        tasting_notes: candidate.tasting_notes.clone(),
        food_pairing: candidate.food_pairing.clone(),
        price: candidate.price,
        ratings: candidate.ratings.clone(),
        ..EnrichableFields::default()
    };
    if let Some(text) = &candidate.text {
        if is_mostly_cjk(text) {
            fields.description_zh = Some(text.clone());
        } else {
            fields.description_en = Some(text.clone());
        }
    }

    if let Some(src) = &candidate.image_url {
        let verdict = pipeline.validator.validate(src, &record.name_en).await;
        if verdict.accepted {
            fields.main_image_url = Some(store_image(pipeline, record, src, verdict.payload).await);
        } else {
            tracing::warn!(
                entity = %record.slug(),
                url = %src,
                reason = %verdict.reason,
                "image rejected by validation; keeping extracted text"
            );
        }
    }

    if candidate.text.is_none() {
        fill_generated_descriptions(pipeline, record, stored, &mut fields).await;
    }

    fields
}

/// Re-hosts the image on the CDN when one is configured. Any failure keeps
/// the source URL.
async fn store_image(
    pipeline: &Pipeline,
    record: &SourceRecord,
    src: &str,
    payload: Option<FetchedBytes>,
) -> String {
    let Some(cdn) = &pipeline.cdn else {
        return src.to_string();
    };

    let payload = match payload {
        Some(payload) => payload,
        None => match pipeline.fetcher.get_bytes(src).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(url = %src, error = %e, "image download failed; keeping source URL");
                return src.to_string();
            }
        },
    };

    let content_type = payload
        .content_type
        .clone()
        .unwrap_or_else(|| "image/jpeg".to_string());
    let name = object_name(
        &record.slug(),
        &payload.bytes,
        Some(content_type.as_str()),
        src,
    );
    match cdn
        .upload(record.kind.asset_folder(), &name, payload.bytes, &content_type)
        .await
    {
        Ok(public_url) => {
            tracing::debug!(entity = %record.slug(), url = %public_url, "image uploaded to CDN");
            public_url
        }
        Err(e) => {
            tracing::warn!(entity = %record.slug(), error = %e, "CDN upload failed; keeping source URL");
            src.to_string()
        }
    }
}

async fn fill_generated_descriptions(
    pipeline: &Pipeline,
    record: &SourceRecord,
    stored: Option<&EnrichableFields>,
    fields: &mut EnrichableFields,
) {
    let Some(generation) = &pipeline.generation else {
        return;
    };
    let has = |pick: fn(&EnrichableFields) -> Option<&String>| {
        stored
            .and_then(pick)
            .is_some_and(|text| !text.trim().is_empty())
    };
    let need_en = !has(|f| f.description_en.as_ref());
    let need_zh = !has(|f| f.description_zh.as_ref());
    if !need_en && !need_zh {
        return;
    }

    let subject = DescriptionSubject {
        kind_label: record.kind.as_str(),
        name_en: &record.name_en,
        name_zh: record.name_zh.as_deref(),
        parent_name: record.winery.as_deref(),
        region: record.region.as_deref(),
        country: record.country.as_deref(),
    };
    let descriptions = generation.describe(&subject).await;
    tracing::debug!(
        entity = %record.slug(),
        generated = descriptions.generated,
        "filled missing descriptions"
    );
    if need_en {
        fields.description_en = Some(descriptions.description_en);
    }
    if need_zh {
        fields.description_zh = Some(descriptions.description_zh);
    }
}
