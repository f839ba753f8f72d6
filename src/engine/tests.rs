//! Tests for the sync engine

use super::*;
use crate::http::RateLimiterConfig;
use crate::sink::MemorySink;
use crate::state::format_bookmark;
use crate::types::JsonValue;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::tempdir;
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

fn engine(server: &MockServer, sink: &Arc<MemorySink>, state: StateManager) -> SyncEngine {
    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .api_key("key")
        .rate_limit(RateLimiterConfig::new(1000))
        .build();
    let sink: Arc<dyn RecordSink> = sink.clone();
    SyncEngine::new(ApiClient::new(&config).unwrap(), sink, state)
}

fn catalog(streams: &[&str]) -> Catalog {
    let mut catalog = Catalog::discover().unwrap();
    catalog.select(streams);
    catalog
}

fn page(rows: Vec<JsonValue>, total: usize) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("x-total-count", total.to_string().as_str())
        .set_body_json(rows)
}

fn contact(id: u64) -> JsonValue {
    json!({"CONTACT_ID": id, "FIRST_NAME": format!("c{id}"), "CUSTOMFIELDS": []})
}

fn requests_to<'a>(requests: &'a [Request], p: &str) -> Vec<&'a Request> {
    requests.iter().filter(|r| r.url.path() == p).collect()
}

fn query(request: &Request, key: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

// ============================================================================
// Extraction Tests
// ============================================================================

#[tokio::test]
async fn test_pages_fetched_in_order() {
    let server = MockServer::start().await;
    for skip in [0u64, 500, 1000] {
        let rows = (skip..(skip + 500).min(1200)).map(contact).collect();
        Mock::given(method("GET"))
            .and(path("/contacts"))
            .and(query_param("skip", skip.to_string().as_str()))
            .and(query_param("top", "500"))
            .respond_with(page(rows, 1200))
            .expect(1)
            .mount(&server)
            .await;
    }

    let sink = Arc::new(MemorySink::new());
    let stats = engine(&server, &sink, StateManager::in_memory())
        .run(&catalog(&["contacts"]))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let skips: Vec<_> = requests_to(&requests, "/contacts")
        .iter()
        .map(|r| query(r, "skip").unwrap())
        .collect();
    assert_eq!(skips, vec!["0", "500", "1000"]);

    let ids: Vec<u64> = sink
        .records("contacts")
        .iter()
        .map(|r| r["CONTACT_ID"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, (0..1200).collect::<Vec<_>>());
    assert_eq!(stats.records_for("contacts"), 1200);
    assert_eq!(stats.pages_fetched, 3);
    assert_eq!(stats.streams_synced, 1);
}

#[tokio::test]
async fn test_note_body_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notes"))
        .respond_with(page(
            vec![json!({"NOTE_ID": 1, "TITLE": "t", "BODY": "x".repeat(1500)})],
            1,
        ))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    engine(&server, &sink, StateManager::in_memory())
        .run(&catalog(&["notes"]))
        .await
        .unwrap();

    let notes = sink.records("notes");
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["BODY"].as_str().unwrap().len(), 900);
    assert_eq!(notes[0]["TITLE"], "t");
}

#[tokio::test]
async fn test_custom_fields_flattened() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/opportunities"))
        .respond_with(page(
            vec![json!({
                "OPPORTUNITY_ID": 9,
                "CUSTOMFIELDS": [{"FIELD_NAME": "X", "FIELD_VALUE": "Y"}]
            })],
            1,
        ))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    engine(&server, &sink, StateManager::in_memory())
        .run(&catalog(&["opportunities"]))
        .await
        .unwrap();

    let rows = sink.records("opportunities");
    assert_eq!(
        JsonValue::Object(rows[0].clone()),
        json!({"OPPORTUNITY_ID": 9, "custom_fields": "{\"X\":\"Y\"}"})
    );
}

#[tokio::test]
async fn test_incremental_filter_only_where_supported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contacts/Search"))
        .and(query_param("updated_after_utc", "2024-01-01 00:00:00"))
        .respond_with(page(vec![contact(1)], 1))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/notes"))
        .and(query_param_is_missing("updated_after_utc"))
        .respond_with(page(vec![json!({"NOTE_ID": 2})], 1))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param_is_missing("updated_after_utc"))
        .respond_with(page(vec![json!({"USER_ID": 3})], 1))
        .expect(1)
        .mount(&server)
        .await;

    let state = StateManager::from_json(
        r#"{"bookmarks": {
            "contacts": {"since": "2024-01-01 00:00:00"},
            "notes": {"since": "2024-01-01 00:00:00"}
        }}"#,
    )
    .unwrap();
    let sink = Arc::new(MemorySink::new());
    engine(&server, &sink, state)
        .run(&catalog(&["contacts", "notes", "users"]))
        .await
        .unwrap();

    assert_eq!(sink.records("contacts").len(), 1);
    assert_eq!(sink.records("notes").len(), 1);
    assert_eq!(sink.records("users").len(), 1);
}

#[tokio::test]
async fn test_bookmark_is_extraction_time() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(page(vec![json!({"USER_ID": 1}), json!({"USER_ID": 2})], 2))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let engine = engine(&server, &sink, StateManager::in_memory());
    engine.run(&catalog(&["users"])).await.unwrap();

    let times = sink.extraction_times("users");
    assert_eq!(times.len(), 2);
    assert_eq!(times[0], times[1]);

    let expected = format_bookmark(times[0]);
    assert_eq!(
        engine.state().get_since("users").await.as_deref(),
        Some(expected.as_str())
    );
    let states = sink.states();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].get_since("users"), Some(expected.as_str()));
}

// ============================================================================
// Links Tests
// ============================================================================

#[tokio::test]
async fn test_links_fetched_per_row() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contacts"))
        .respond_with(page(vec![contact(1), contact(2)], 2))
        .mount(&server)
        .await;
    for id in [1, 2] {
        Mock::given(method("GET"))
            .and(path(format!("/contacts/{id}/Links")))
            .and(query_param("count_total", "true"))
            .respond_with(page(
                vec![json!({"LINK_ID": id * 10, "OBJECT_ID": id, "EXTRA": "dropped"})],
                1,
            ))
            .expect(1)
            .mount(&server)
            .await;
    }

    let sink = Arc::new(MemorySink::new());
    let stats = engine(&server, &sink, StateManager::in_memory())
        .run(&catalog(&["contacts", "links"]))
        .await
        .unwrap();

    assert_eq!(sink.declared_streams(), vec!["links", "contacts"]);
    let mut links: Vec<_> = sink
        .records("links")
        .into_iter()
        .map(JsonValue::Object)
        .collect();
    links.sort_by_key(|l| l["LINK_ID"].as_u64());
    assert_eq!(
        links,
        vec![
            json!({"LINK_ID": 10, "OBJECT_ID": 1}),
            json!({"LINK_ID": 20, "OBJECT_ID": 2})
        ]
    );
    assert_eq!(stats.link_lookups, 2);
    assert_eq!(stats.records_for("links"), 2);
}

#[tokio::test]
async fn test_links_start_after_pages_and_commit() {
    let server = MockServer::start().await;
    for skip in [0u64, 2, 4] {
        Mock::given(method("GET"))
            .and(path("/contacts"))
            .and(query_param("skip", skip.to_string().as_str()))
            .respond_with(page(vec![contact(skip + 1), contact(skip + 2)], 6))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path_regex(r"^/contacts/\d+/Links$"))
        .respond_with(page(vec![json!({"LINK_ID": 1})], 1).set_delay(Duration::from_millis(50)))
        .expect(6)
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .api_key("key")
        .rate_limit(RateLimiterConfig::new(1000))
        .max_concurrency(1)
        .build();
    let sink = Arc::new(MemorySink::new());
    let dyn_sink: Arc<dyn RecordSink> = sink.clone();
    SyncEngine::new(ApiClient::new(&config).unwrap(), dyn_sink, StateManager::in_memory())
        .with_config(SyncConfig::new().with_page_size(2))
        .run(&catalog(&["contacts", "links"]))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let last_page = requests
        .iter()
        .rposition(|r| r.url.path() == "/contacts")
        .unwrap();
    let links_before_last_page = requests[..last_page]
        .iter()
        .filter(|r| r.url.path().ends_with("/Links"))
        .count();
    assert_eq!(links_before_last_page, 0);
    assert_eq!(requests.len(), 9);

    let messages = sink.messages();
    let state_at = messages.iter().position(|m| m.is_state()).unwrap();
    let first_link = messages
        .iter()
        .position(|m| m.is_record() && m.stream() == Some("links"))
        .unwrap();
    assert!(state_at < first_link);
}

#[tokio::test]
async fn test_links_not_fetched_unless_selected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contacts"))
        .respond_with(page(vec![contact(1)], 1))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/contacts/1/Links"))
        .respond_with(page(vec![], 0))
        .expect(0)
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    engine(&server, &sink, StateManager::in_memory())
        .run(&catalog(&["contacts"]))
        .await
        .unwrap();

    assert_eq!(sink.declared_streams(), vec!["contacts"]);
}

#[tokio::test]
async fn test_links_selected_alone_does_nothing() {
    let server = MockServer::start().await;
    let sink = Arc::new(MemorySink::new());

    let stats = engine(&server, &sink, StateManager::in_memory())
        .run(&catalog(&["links"]))
        .await
        .unwrap();

    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(sink.declared_streams().is_empty());
    assert_eq!(stats.total_records(), 0);
}

#[tokio::test]
async fn test_links_failure_keeps_committed_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contacts"))
        .respond_with(page(vec![contact(1), contact(2)], 2))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/contacts/1/Links"))
        .respond_with(page(vec![json!({"LINK_ID": 10})], 1))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/contacts/2/Links"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    let sink = Arc::new(MemorySink::new());
    let err = engine(&server, &sink, StateManager::new(&state_path))
        .run(&catalog(&["contacts", "links"]))
        .await
        .unwrap_err();

    match err {
        Error::LinksFailed { failed, first } => {
            assert_eq!(failed, 1);
            assert_eq!(first.status(), Some(500));
        }
        other => panic!("unexpected error: {other}"),
    }

    let states = sink.states();
    assert_eq!(states.len(), 1);
    assert!(states[0].get_since("contacts").is_some());

    let saved: JsonValue =
        serde_json::from_str(&std::fs::read_to_string(&state_path).unwrap()).unwrap();
    assert!(saved["bookmarks"]["contacts"]["since"].is_string());
    assert_eq!(sink.records("links").len(), 1);
}

// ============================================================================
// Failure Policy Tests
// ============================================================================

#[tokio::test]
async fn test_wait_all_finishes_siblings_without_commit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    for (skip, ids) in [("0", vec![1, 2]), ("2", vec![3])] {
        let rows = ids
            .into_iter()
            .map(|id| json!({"PIPELINE_ID": id}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/pipelines"))
            .and(query_param("skip", skip))
            .respond_with(page(rows, 3))
            .expect(1)
            .mount(&server)
            .await;
    }

    let dir = tempdir().unwrap();
    let state_path = dir.path().join("state.json");
    let sink = Arc::new(MemorySink::new());
    let err = engine(&server, &sink, StateManager::new(&state_path))
        .with_config(SyncConfig::new().with_page_size(2))
        .run(&catalog(&["pipelines", "users"]))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(sink.records("pipelines").len(), 3);
    assert!(sink.states().is_empty());
    assert!(!state_path.exists());
}

#[tokio::test]
async fn test_fail_fast_returns_first_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pipelines"))
        .respond_with(page(vec![json!({"PIPELINE_ID": 1})], 1))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let err = engine(&server, &sink, StateManager::in_memory())
        .with_config(SyncConfig::new().with_failure_policy(FailurePolicy::FailFast))
        .run(&catalog(&["pipelines", "users"]))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert!(sink.states().is_empty());
}

#[tokio::test]
async fn test_multiple_failures_aggregated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let err = engine(&server, &sink, StateManager::in_memory())
        .run(&catalog(&["pipelines", "users"]))
        .await
        .unwrap_err();

    match err {
        Error::ResourcesFailed { failed, first } => {
            assert_eq!(failed, 2);
            assert_eq!(first.status(), Some(503));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_invalid_record_fails_resource() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(page(vec![json!({"USER_ID": "not a number"})], 1))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let err = engine(&server, &sink, StateManager::in_memory())
        .run(&catalog(&["users"]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation { ref resource, .. } if resource == "users"));
    assert!(sink.states().is_empty());
}

#[tokio::test]
async fn test_missing_custom_fields_fails_resource() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/contacts"))
        .respond_with(page(vec![json!({"CONTACT_ID": 1})], 1))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let err = engine(&server, &sink, StateManager::in_memory())
        .run(&catalog(&["contacts"]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transform { .. }));
    assert!(sink.records("contacts").is_empty());
}

// ============================================================================
// Stats Tests
// ============================================================================

#[test]
fn test_sync_stats() {
    let mut stats = SyncStats::new();
    stats.add_records("contacts", 3);
    stats.add_records("links", 2);
    stats.add_records("contacts", 1);
    assert_eq!(stats.records_for("contacts"), 4);
    assert_eq!(stats.records_for("users"), 0);
    assert_eq!(stats.total_records(), 6);
}

#[test]
fn test_sync_config_from_tap_config() {
    let mut tap = TapConfig::new("key");
    tap.page_size = 50;
    tap.failure_policy = FailurePolicy::FailFast;
    let config = SyncConfig::from(&tap);
    assert_eq!(config.page_size, 50);
    assert_eq!(config.failure_policy, FailurePolicy::FailFast);
}
