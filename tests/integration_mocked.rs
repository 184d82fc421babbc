/// Integration tests with mocked upstreams
/// Exercises the full fan-out/merge workflow without hitting Gemini, OpenAI or Instagram
use rust_kyc_api::config::Config;
use rust_kyc_api::enrichment::ProfileAggregator;
use rust_kyc_api::errors::AppError;
use rust_kyc_api::models::{ProfileRecord, NOT_PUBLICLY_AVAILABLE};
use rust_kyc_api::services::{GeminiService, InstagramService, OpenAiService, ScrapeError};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{any, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GEMINI_PATH: &str = "/v1beta/models/gemini-1.5-pro:generateContent";
const OPENAI_PATH: &str = "/v1/chat/completions";
const INSTAGRAM_PATH: &str = "/api/v1/users/web_profile_info/";

/// Helper function to create test config with every upstream on the mock server
fn create_test_config(base_url: String) -> Config {
    Config {
        port: 8080,
        database_url: None,
        gemini_api_key: Some("test_gemini_key".to_string()),
        gemini_base_url: base_url.clone(),
        gemini_model: "gemini-1.5-pro".to_string(),
        openai_api_key: Some("test_openai_key".to_string()),
        openai_base_url: base_url.clone(),
        openai_model: "gpt-4o-mini".to_string(),
        instagram_base_url: base_url,
        instagram_app_id: "936619743392459".to_string(),
        llm_timeout_secs: 5,
        scrape_timeout_secs: 2,
        history_capacity: 100,
    }
}

fn gemini_body(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
    })
}

fn openai_body(text: &str) -> serde_json::Value {
    json!({
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": text } }]
    })
}

fn instagram_body(followers: u64, following: u64, posts: u64, pic: &str) -> serde_json::Value {
    json!({
        "data": {
            "user": {
                "username": "brandco",
                "full_name": "",
                "biography": "",
                "edge_followed_by": { "count": followers },
                "edge_follow": { "count": following },
                "edge_owner_to_timeline_media": { "count": posts, "edges": [] },
                "profile_pic_url_hd": pic,
                "is_private": false,
                "is_verified": true
            }
        }
    })
}

async fn mount_gemini(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .and(query_param("key", "test_gemini_key"))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_openai(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(OPENAI_PATH))
        .and(header("authorization", "Bearer test_openai_key"))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_instagram(server: &MockServer, username: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(INSTAGRAM_PATH))
        .and(query_param("username", username))
        .and(header("x-ig-app-id", "936619743392459"))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_all_sources_fail_yields_sentinel_record() {
    let mock_server = MockServer::start().await;

    // Empty bodies from both models, not-found from the scrape
    mount_gemini(&mock_server, ResponseTemplate::new(200)).await;
    mount_openai(&mock_server, ResponseTemplate::new(200)).await;
    mount_instagram(
        &mock_server,
        "nouser404",
        ResponseTemplate::new(404).set_body_json(json!({"error": "User not found"})),
    )
    .await;

    let aggregator = ProfileAggregator::new(&create_test_config(mock_server.uri())).unwrap();
    let before = chrono::Utc::now();
    let record = aggregator.fetch_client_profile("nouser404").await.unwrap();

    assert_eq!(
        record,
        ProfileRecord::unavailable("nouser404", record.last_fetched)
    );
    assert_eq!(record.full_name, NOT_PUBLICLY_AVAILABLE);
    assert_eq!(record.instagram_followers, NOT_PUBLICLY_AVAILABLE);
    assert!(record.last_fetched >= before);
}

#[tokio::test]
async fn test_scrape_counts_override_generative_sources() {
    let mock_server = MockServer::start().await;

    let gemini_text = "Sure! Here is the profile:\n```json\n{\"fullName\": \"Brand Co\", \"instagramFollowers\": \"1.2M\", \"profilePictureUrl\": \"https://model/guess.jpg\"}\n```";
    mount_gemini(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(gemini_body(gemini_text)),
    )
    .await;
    mount_openai(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(openai_body(
            r#"{"profession": "Retail", "fullName": "Not Publicly Available", "confidenceScore": 65}"#,
        )),
    )
    .await;
    mount_instagram(
        &mock_server,
        "brandco",
        ResponseTemplate::new(200).set_body_json(instagram_body(50000, 12, 340, "https://x/y.jpg")),
    )
    .await;

    let aggregator = ProfileAggregator::new(&create_test_config(mock_server.uri())).unwrap();
    let record = aggregator.fetch_client_profile("@brandco").await.unwrap();

    assert_eq!(record.id, "brandco");
    assert_eq!(record.instagram_followers, "50000");
    assert_eq!(record.instagram_following, "12");
    assert_eq!(record.instagram_posts_count, "340");
    assert_eq!(record.profile_picture_url, "https://x/y.jpg");
    assert_eq!(record.full_name, "Brand Co");
    assert_eq!(record.profession, "Retail");
    assert_eq!(record.confidence_score, 65);
    assert_eq!(
        record.enriched_sources,
        vec!["gemini", "openai", "instagram"]
    );
}

#[tokio::test]
async fn test_one_failing_source_does_not_block_others() {
    let mock_server = MockServer::start().await;

    mount_gemini(
        &mock_server,
        ResponseTemplate::new(500).set_body_string("Internal Server Error"),
    )
    .await;
    // Slow but successful: the join must still wait for it
    mount_openai(
        &mock_server,
        ResponseTemplate::new(200)
            .set_body_json(openai_body(r#"{"country": "Portugal"}"#))
            .set_delay(Duration::from_millis(300)),
    )
    .await;
    mount_instagram(
        &mock_server,
        "jane.doe",
        ResponseTemplate::new(429).set_body_string("Too Many Requests"),
    )
    .await;

    let aggregator = ProfileAggregator::new(&create_test_config(mock_server.uri())).unwrap();
    let record = aggregator
        .fetch_client_profile("https://instagram.com/Jane.Doe/")
        .await
        .unwrap();

    assert_eq!(record.id, "jane.doe");
    assert_eq!(record.country, "Portugal");
    assert_eq!(record.instagram_followers, NOT_PUBLICLY_AVAILABLE);
    assert_eq!(record.enriched_sources, vec!["openai"]);
}

#[tokio::test]
async fn test_repeated_lookup_is_idempotent() {
    let mock_server = MockServer::start().await;

    mount_gemini(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(gemini_body(r#"{"education": "MIT"}"#)),
    )
    .await;
    mount_openai(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(openai_body("no idea, sorry")),
    )
    .await;
    mount_instagram(
        &mock_server,
        "brandco",
        ResponseTemplate::new(200).set_body_json(instagram_body(10, 20, 30, "https://x/p.jpg")),
    )
    .await;

    let aggregator = ProfileAggregator::new(&create_test_config(mock_server.uri())).unwrap();
    let first = aggregator.fetch_client_profile("brandco").await.unwrap();
    let mut second = aggregator.fetch_client_profile("BrandCo").await.unwrap();

    assert!(second.last_fetched >= first.last_fetched);
    second.last_fetched = first.last_fetched;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_invalid_handle_makes_no_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let aggregator = ProfileAggregator::new(&create_test_config(mock_server.uri())).unwrap();
    let result = aggregator.fetch_client_profile("not a handle!").await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn test_missing_api_key_skips_the_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;
    mount_openai(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(openai_body(r#"{"awards": "None"}"#)),
    )
    .await;
    mount_instagram(&mock_server, "jane.doe", ResponseTemplate::new(404)).await;

    let mut config = create_test_config(mock_server.uri());
    config.gemini_api_key = None;

    let aggregator = ProfileAggregator::new(&config).unwrap();
    let record = aggregator.fetch_client_profile("jane.doe").await.unwrap();

    assert_eq!(record.awards, "None");
    assert_eq!(record.enriched_sources, vec!["openai"]);
}

#[tokio::test]
async fn test_gemini_service_joins_text_parts() {
    let mock_server = MockServer::start().await;

    mount_gemini(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"a\": " }, { "text": "1}" }] } }]
        })),
    )
    .await;

    let service = GeminiService::new(&create_test_config(mock_server.uri())).unwrap();
    let text = service.generate_text("prompt").await.unwrap();

    assert_eq!(text, "{\"a\": 1}");
}

#[tokio::test]
async fn test_openai_service_error_status() {
    let mock_server = MockServer::start().await;

    mount_openai(
        &mock_server,
        ResponseTemplate::new(429).set_body_string("slow down"),
    )
    .await;

    let service = OpenAiService::new(&create_test_config(mock_server.uri())).unwrap();
    let result = service.complete("prompt").await;

    assert!(matches!(result, Err(AppError::RateLimited(_))));
}

#[tokio::test]
async fn test_instagram_service_classifies_failures() {
    let mock_server = MockServer::start().await;

    mount_instagram(&mock_server, "missing", ResponseTemplate::new(404)).await;
    mount_instagram(&mock_server, "busy", ResponseTemplate::new(429)).await;
    mount_instagram(&mock_server, "broken", ResponseTemplate::new(503)).await;
    mount_instagram(
        &mock_server,
        "nouser",
        ResponseTemplate::new(200).set_body_json(json!({"data": {"user": null}})),
    )
    .await;
    mount_instagram(
        &mock_server,
        "garbled",
        ResponseTemplate::new(200).set_body_string("<html>login</html>"),
    )
    .await;

    let service = InstagramService::new(&create_test_config(mock_server.uri())).unwrap();

    assert_eq!(
        service.fetch_profile("missing").await,
        Err(ScrapeError::NotFound)
    );
    assert_eq!(
        service.fetch_profile("busy").await,
        Err(ScrapeError::RateLimited)
    );
    assert_eq!(
        service.fetch_profile("broken").await,
        Err(ScrapeError::Upstream(503))
    );
    assert_eq!(
        service.fetch_profile("nouser").await,
        Err(ScrapeError::NotFound)
    );
    assert!(matches!(
        service.fetch_profile("garbled").await,
        Err(ScrapeError::Parse(_))
    ));
}

#[tokio::test]
async fn test_instagram_service_timeout() {
    let mock_server = MockServer::start().await;

    mount_instagram(
        &mock_server,
        "sleepy",
        ResponseTemplate::new(200)
            .set_body_json(instagram_body(1, 1, 1, ""))
            .set_delay(Duration::from_secs(3)),
    )
    .await;

    let mut config = create_test_config(mock_server.uri());
    config.scrape_timeout_secs = 1;

    let service = InstagramService::new(&config).unwrap();
    assert_eq!(
        service.fetch_profile("sleepy").await,
        Err(ScrapeError::Timeout)
    );
}

#[tokio::test]
async fn test_concurrent_lookups() {
    let mock_server = MockServer::start().await;

    mount_gemini(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(gemini_body("{}")),
    )
    .await;
    mount_openai(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(openai_body("{}")),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(INSTAGRAM_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(instagram_body(5, 5, 5, "https://x/p.jpg")),
        )
        .expect(10)
        .mount(&mock_server)
        .await;

    let aggregator = ProfileAggregator::new(&create_test_config(mock_server.uri())).unwrap();

    let mut handles = vec![];
    for i in 0..10 {
        let aggregator = aggregator.clone();
        handles.push(tokio::spawn(async move {
            aggregator.fetch_client_profile(&format!("user{}", i)).await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let record = handle.await.unwrap().unwrap();
        assert_eq!(record.id, format!("user{}", i));
        assert_eq!(record.instagram_followers, "5");
    }
}
