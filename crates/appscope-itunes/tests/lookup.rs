//! Integration tests for `LookupClient` and `enrich_terms` using wiremock HTTP mocks.

use appscope_core::{LookupSettings, Platform};
use appscope_itunes::{enrich_terms, LookupClient, LookupError};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> LookupClient {
    let settings = LookupSettings {
        base_url: base_url.to_string(),
        country: "us".to_string(),
        result_limit: 20,
        timeout_secs: 5,
        user_agent: "appscope-test/0.1".to_string(),
        inter_request_delay_ms: 0,
        max_retries: 1,
        retry_backoff_ms: 0,
    };
    LookupClient::new(&settings).expect("client construction should not fail")
}

fn app_json(track_id: i64, name: &str, genre: &str, rating: f64) -> serde_json::Value {
    json!({
        "trackId": track_id,
        "trackName": name,
        "artistName": "Example Inc.",
        "primaryGenreName": genre,
        "averageUserRating": rating,
        "userRatingCount": 1200,
        "price": 0.0,
        "currency": "USD",
        "fileSizeBytes": "1048576",
        "currentVersionReleaseDate": "2024-02-01T10:00:00Z",
        "version": "1.0"
    })
}

fn results(apps: Vec<serde_json::Value>) -> serde_json::Value {
    json!({ "resultCount": apps.len(), "results": apps })
}

fn terms(list: &[&str]) -> Vec<String> {
    list.iter().map(|t| (*t).to_string()).collect()
}

#[tokio::test]
async fn search_sends_catalogue_parameters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("term", "spotify"))
        .and(query_param("country", "us"))
        .and(query_param("media", "software"))
        .and(query_param("entity", "software"))
        .and(query_param("limit", "20"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(results(vec![app_json(1, "Spotify", "Music", 4.8)])),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let apps = client.search("spotify").await.expect("should parse results");

    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].track_id, Some(1));
    assert_eq!(apps[0].track_name.as_deref(), Some("Spotify"));
}

#[tokio::test]
async fn search_maps_429_to_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = test_client(&server.uri()).search("x").await.unwrap_err();
    assert!(matches!(err, LookupError::RateLimited { .. }));
}

#[tokio::test]
async fn search_rejects_non_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = test_client(&server.uri()).search("x").await.unwrap_err();
    assert!(matches!(err, LookupError::Deserialize { .. }));
}

#[tokio::test]
async fn zero_results_is_a_miss_and_other_terms_continue() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("term", "XYZ-App-Does-Not-Exist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(results(vec![])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("term", "weather"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(results(vec![app_json(7, "Weather Pro", "Weather", 4.5)])),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let out = enrich_terms(&client, &terms(&["XYZ-App-Does-Not-Exist", "weather"])).await;

    assert_eq!(out.report.misses, vec!["XYZ-App-Does-Not-Exist".to_string()]);
    assert_eq!(out.report.resolved, 1);
    assert!(out.report.failures.is_empty());
    assert_eq!(out.records.len(), 1);
    assert_eq!(out.records[0].platform, Platform::Ios);
    assert_eq!(out.records[0].category, "Weather");
}

#[tokio::test]
async fn rate_limited_term_is_retried_once_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("term", "music"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("term", "music"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(results(vec![app_json(3, "Tunes", "Music", 4.1)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let out = enrich_terms(&client, &terms(&["music"])).await;

    assert_eq!(out.report.resolved, 1);
    assert!(out.report.failures.is_empty());
    assert_eq!(out.records.len(), 1);
}

#[tokio::test]
async fn persistent_server_error_skips_term_after_one_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("term", "broken"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("term", "notes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(results(vec![app_json(9, "Notes", "Productivity", 4.0)])),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let out = enrich_terms(&client, &terms(&["broken", "notes"])).await;

    assert_eq!(out.report.failures.len(), 1);
    assert_eq!(out.report.failures[0].term, "broken");
    assert_eq!(out.report.resolved, 1);
    assert_eq!(out.records.len(), 1);
    assert_eq!(out.report.completeness().terms_attempted, 2);
    assert_eq!(out.report.completeness().terms_resolved, 1);
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let out = enrich_terms(&client, &terms(&["gone"])).await;
    assert_eq!(out.report.failures.len(), 1);
}

#[tokio::test]
async fn duplicate_track_ids_keep_first_occurrence() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("term", "chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(results(vec![
            app_json(42, "Chat First", "Social Networking", 4.0),
            app_json(42, "Chat Repeat", "Social Networking", 3.0),
            json!({ "trackName": "No id" }),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("term", "social"))
        .respond_with(ResponseTemplate::new(200).set_body_json(results(vec![app_json(
            42,
            "Chat Again",
            "Social Networking",
            2.0,
        )])))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let out = enrich_terms(&client, &terms(&["chat", "social"])).await;

    assert_eq!(out.records.len(), 1);
    assert_eq!(out.records[0].name, "Chat First");
    assert_eq!(out.records[0].category, "Social");
    assert_eq!(out.report.duplicates_skipped, 2);
    assert_eq!(out.report.unusable_entries, 1);
    assert_eq!(out.report.resolved, 2);
}
