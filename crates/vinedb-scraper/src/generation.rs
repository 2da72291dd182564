//! Client for an OpenAI-compatible text/vision generation service.
//!
//! The service is an optional collaborator. Replies are free-form text that
//! should contain a JSON object; every caller must cope with a reply that
//! does not.

use std::time::Duration;

use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};
use vinedb_core::app_config::GenerationSettings;

use crate::error::ScraperError;

#[derive(Debug, Clone)]
pub struct GenerationClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

/// An image passed inline as a `data:` URL.
#[derive(Debug, Clone, Copy)]
pub struct InlineImage<'a> {
    pub bytes: &'a [u8],
    pub content_type: &'a str,
}

impl InlineImage<'_> {
    fn data_url(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(self.bytes);
        format!("data:{};base64,{encoded}", self.content_type)
    }
}

/// What a description prompt knows about the entity.
#[derive(Debug, Clone, Copy)]
pub struct DescriptionSubject<'a> {
    pub kind_label: &'a str,
    pub name_en: &'a str,
    pub name_zh: Option<&'a str>,
    pub parent_name: Option<&'a str>,
    pub region: Option<&'a str>,
    pub country: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptions {
    pub description_en: String,
    pub description_zh: String,
    /// `false` when the deterministic fallback was used.
    pub generated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisionVerdict {
    pub matches: bool,
    pub confidence: f32,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl GenerationClient {
    /// # Errors
    ///
    /// Returns [`ScraperError::Generation`] if the HTTP client cannot be
    /// built.
    pub fn new(settings: &GenerationSettings, timeout: Duration) -> Result<Self, ScraperError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScraperError::Generation(format!("client build failed: {e}")))?;
        Ok(Self {
            client,
            url: settings.url.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }

    /// Sends one prompt, optionally with an inline image, and returns the
    /// reply text.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Generation`] on transport failure, a non-2xx
    /// status, or a reply with no text.
    pub async fn complete(
        &self,
        prompt: &str,
        image: Option<InlineImage<'_>>,
    ) -> Result<String, ScraperError> {
        let content = match image {
            Some(image) => json!([
                { "type": "text", "text": prompt },
                { "type": "image_url", "image_url": { "url": image.data_url() } },
            ]),
            None => Value::String(prompt.to_owned()),
        };
        let body = json!({
            "model": self.model,
            "temperature": 0.3,
            "messages": [{ "role": "user", "content": content }],
        });

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ScraperError::Generation(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::Generation(format!(
                "HTTP {} from {}",
                status.as_u16(),
                self.url
            )));
        }
        let text = response
            .text()
            .await
            .map_err(|e| ScraperError::Generation(e.to_string()))?;
        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|source| ScraperError::Deserialize {
                context: format!("chat completion from {}", self.url),
                source,
            })?;

        parsed
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ScraperError::Generation("reply had no content".to_string()))
    }

    /// Asks for English and Chinese descriptions. Never fails: transport
    /// errors and unusable replies fall back to [`default_descriptions`].
    pub async fn describe(&self, subject: &DescriptionSubject<'_>) -> Descriptions {
        let prompt = description_prompt(subject);
        match self.complete(&prompt, None).await {
            Ok(reply) => parse_descriptions(&reply).unwrap_or_else(|| {
                tracing::warn!(
                    entity = subject.name_en,
                    "generation reply had no usable JSON, using default descriptions"
                );
                default_descriptions(subject)
            }),
            Err(e) => {
                tracing::warn!(
                    entity = subject.name_en,
                    error = %e,
                    "description generation failed, using default descriptions"
                );
                default_descriptions(subject)
            }
        }
    }

    /// Asks whether `image` shows the named product.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Generation`] if the call fails or the reply
    /// carries no parseable verdict.
    pub async fn classify_image(
        &self,
        image: InlineImage<'_>,
        entity_name: &str,
    ) -> Result<VisionVerdict, ScraperError> {
        let prompt = format!(
            "Does this image show the product \"{entity_name}\" (a bottle, label, or estate \
             photo)? Reply with only a JSON object: \
             {{\"match\": true|false, \"confidence\": 0.0-1.0, \"reason\": \"...\"}}"
        );
        let reply = self.complete(&prompt, Some(image)).await?;
        let value = extract_json_object(&reply)
            .ok_or_else(|| ScraperError::Generation("vision reply had no JSON".to_string()))?;
        let matches = value
            .get("match")
            .and_then(Value::as_bool)
            .ok_or_else(|| ScraperError::Generation("vision reply missing \"match\"".to_string()))?;
        #[allow(clippy::cast_possible_truncation)]
        let confidence = value
            .get("confidence")
            .and_then(Value::as_f64)
            .map_or(0.5, |c| c.clamp(0.0, 1.0) as f32);
        let reason = value
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or("vision classification")
            .to_string();
        Ok(VisionVerdict {
            matches,
            confidence,
            reason,
        })
    }
}

fn description_prompt(subject: &DescriptionSubject<'_>) -> String {
    let mut facts = vec![format!("{}: {}", subject.kind_label, subject.name_en)];
    if let Some(zh) = subject.name_zh {
        facts.push(format!("Chinese name: {zh}"));
    }
    if let Some(parent) = subject.parent_name {
        facts.push(format!("Winery: {parent}"));
    }
    if let Some(region) = subject.region {
        facts.push(format!("Region: {region}"));
    }
    if let Some(country) = subject.country {
        facts.push(format!("Country: {country}"));
    }
    format!(
        "Write a short, factual catalog description for this {kind}.\n{facts}\n\
         Reply with only a JSON object: \
         {{\"description_en\": \"...\", \"description_zh\": \"...\"}}",
        kind = subject.kind_label,
        facts = facts.join("\n"),
    )
}

/// Parses the first JSON object in `reply` into descriptions. Both fields
/// must be non-empty strings.
#[must_use]
pub fn parse_descriptions(reply: &str) -> Option<Descriptions> {
    let value = extract_json_object(reply)?;
    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    };
    Some(Descriptions {
        description_en: field("description_en")?,
        description_zh: field("description_zh")?,
        generated: true,
    })
}

/// Deterministic descriptions built from the entity's name, parent, and
/// region.
#[must_use]
pub fn default_descriptions(subject: &DescriptionSubject<'_>) -> Descriptions {
    let origin = match (subject.region, subject.country) {
        (Some(region), Some(country)) => format!(" from {region}, {country}"),
        (Some(place), None) | (None, Some(place)) => format!(" from {place}"),
        (None, None) => String::new(),
    };
    let by = subject
        .parent_name
        .map(|p| format!(" by {p}"))
        .unwrap_or_default();
    let description_en = format!("{}{by}{origin}.", subject.name_en);

    let name_zh = subject.name_zh.unwrap_or(subject.name_en);
    let origin_zh = match (subject.country, subject.region) {
        (Some(country), Some(region)) => format!("，产自{country} {region}"),
        (Some(place), None) | (None, Some(place)) => format!("，产自{place}"),
        (None, None) => String::new(),
    };
    let by_zh = subject
        .parent_name
        .map(|p| format!("，由{p}出品"))
        .unwrap_or_default();
    let description_zh = format!("{name_zh}{by_zh}{origin_zh}。");

    Descriptions {
        description_en,
        description_zh,
        generated: false,
    }
}

/// Finds the first balanced `{...}` in `text` that parses as a JSON object.
/// Tolerates prose and code fences around it.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut start = 0;
    while let Some(offset) = text[start..].find('{') {
        let open = start + offset;
        if let Some(close) = matching_brace(bytes, open) {
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&text[open..=close])
            {
                return Some(value);
            }
        }
        start = open + 1;
    }
    None
}

/// Index of the `}` closing the `{` at `open`, skipping braces inside JSON
/// strings.
fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
