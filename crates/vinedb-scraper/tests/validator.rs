//! Integration tests for `AssetValidator` against `wiremock` servers standing
//! in for the image host and the vision service.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vinedb_core::app_config::GenerationSettings;
use vinedb_scraper::{AssetValidator, FetchConfig, GenerationClient, PageFetcher};

fn test_fetcher() -> PageFetcher {
    PageFetcher::new(FetchConfig {
        request_timeout: Duration::from_secs(5),
        user_agent: "vinedb-test/0.1".to_string(),
        accept_language: "en-US".to_string(),
        max_retries: 0,
        backoff_ms: 0,
        min_interval: Duration::ZERO,
    })
    .expect("failed to build test PageFetcher")
}

fn vision_client(server: &MockServer) -> GenerationClient {
    GenerationClient::new(
        &GenerationSettings {
            url: format!("{}/v1/chat/completions", server.uri()),
            api_key: Some("test-key".to_string()),
            model: "vision-test".to_string(),
        },
        Duration::from_secs(5),
    )
    .expect("failed to build test GenerationClient")
}

async fn mount_image(server: &MockServer, content_type: &str) {
    Mock::given(method("HEAD"))
        .and(path("/uploads/label.jpg"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", content_type))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/uploads/label.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", content_type)
                .set_body_bytes(vec![0xFF, 0xD8, 0xFF]),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn reachable_image_is_accepted_without_vision() {
    let server = MockServer::start().await;
    mount_image(&server, "image/jpeg").await;

    let validator = AssetValidator::new(test_fetcher(), None);
    let verdict = validator
        .validate(&format!("{}/uploads/label.jpg", server.uri()), "Opus One")
        .await;

    assert!(verdict.accepted, "expected acceptance, got: {verdict:?}");
    assert!(verdict.confidence > 0.0);
    assert!(verdict.payload.is_none(), "HEAD alone should not download");
}

#[tokio::test]
async fn non_image_content_type_is_rejected() {
    let server = MockServer::start().await;
    mount_image(&server, "text/html; charset=utf-8").await;

    let validator = AssetValidator::new(test_fetcher(), None);
    let verdict = validator
        .validate(&format!("{}/uploads/label.jpg", server.uri()), "Opus One")
        .await;

    assert!(!verdict.accepted);
    assert!(verdict.reason.contains("not an image"), "{}", verdict.reason);
}

#[tokio::test]
async fn missing_image_is_rejected() {
    let server = MockServer::start().await;

    let validator = AssetValidator::new(test_fetcher(), None);
    let verdict = validator
        .validate(&format!("{}/uploads/gone.jpg", server.uri()), "Opus One")
        .await;

    assert!(!verdict.accepted);
    assert!(verdict.reason.contains("unreachable"), "{}", verdict.reason);
}

#[tokio::test]
async fn head_refused_falls_back_to_download() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/uploads/label.jpg"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/uploads/label.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(vec![0xFF, 0xD8]),
        )
        .mount(&server)
        .await;

    let validator = AssetValidator::new(test_fetcher(), None);
    let verdict = validator
        .validate(&format!("{}/uploads/label.jpg", server.uri()), "Opus One")
        .await;

    assert!(verdict.accepted);
    assert_eq!(verdict.payload.map(|p| p.bytes), Some(vec![0xFF, 0xD8]));
}

#[tokio::test]
async fn vision_rejection_overrides_heuristic() {
    let server = MockServer::start().await;
    mount_image(&server, "image/jpeg").await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "content": "```json\n{\"match\": false, \"confidence\": 0.9, \"reason\": \"shows a site logo\"}\n```"
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let validator = AssetValidator::new(test_fetcher(), Some(vision_client(&server)));
    let verdict = validator
        .validate(&format!("{}/uploads/label.jpg", server.uri()), "Opus One")
        .await;

    assert!(!verdict.accepted);
    assert!((verdict.confidence - 0.9).abs() < f32::EPSILON);
    assert_eq!(verdict.reason, "shows a site logo");
}

#[tokio::test]
async fn vision_error_keeps_heuristic_verdict() {
    let server = MockServer::start().await;
    mount_image(&server, "image/jpeg").await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let validator = AssetValidator::new(test_fetcher(), Some(vision_client(&server)));
    let verdict = validator
        .validate(&format!("{}/uploads/label.jpg", server.uri()), "Opus One")
        .await;

    assert!(verdict.accepted, "vision failure must not reject: {verdict:?}");
    assert!(verdict.payload.is_some());
}
