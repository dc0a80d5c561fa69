//! Tests for pagination module

use super::*;
use crate::http::{HttpClient, HttpClientConfig, Params};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// NextPage Tests
// ============================================================================

#[test]
fn test_next_page_with_param() {
    let next = NextPage::with_param("start", 101);
    assert!(next.is_continue());
    assert!(!next.is_done());

    if let NextPage::Continue { params } = next {
        assert_eq!(params.get("start"), Some("101"));
    } else {
        panic!("Expected Continue");
    }
}

// ============================================================================
// Strategy Tests
// ============================================================================

#[test]
fn test_start_paginator_follows_next_start() {
    let paginator = StartPaginator::new(1, 2);
    let mut state = PaginationState::new();

    let initial = paginator.initial_params(&state);
    assert_eq!(initial.get("start"), Some("1"));
    assert_eq!(initial.get("num"), Some("2"));

    let next = paginator.process_response(&json!({"nextStart": 3, "total": 3}), 2, &mut state);
    match next {
        NextPage::Continue { params } => assert_eq!(params.get("start"), Some("3")),
        NextPage::Done => panic!("Expected Continue"),
    }

    let next = paginator.process_response(&json!({"nextStart": -1, "total": 3}), 1, &mut state);
    assert!(next.is_done());
    assert!(state.done);
    assert_eq!(state.total_fetched, 3);
    assert_eq!(state.pages, 2);
}

#[test]
fn test_offset_paginator_transfer_limit() {
    let paginator = OffsetPaginator::feature_query(2);
    let mut state = PaginationState::new();

    let initial = paginator.initial_params(&state);
    assert_eq!(initial.get("resultOffset"), Some("0"));
    assert_eq!(initial.get("resultRecordCount"), Some("2"));

    let next = paginator.process_response(&json!({"exceededTransferLimit": true}), 2, &mut state);
    match next {
        NextPage::Continue { params } => assert_eq!(params.get("resultOffset"), Some("2")),
        NextPage::Done => panic!("Expected Continue"),
    }

    // A full page without the flag still ends the query
    let next = paginator.process_response(&json!({}), 2, &mut state);
    assert!(next.is_done());
}

#[test]
fn test_offset_paginator_short_page() {
    let paginator = OffsetPaginator::new("offset", "limit", 10);
    let mut state = PaginationState::new();

    assert!(paginator
        .process_response(&json!({}), 10, &mut state)
        .is_continue());
    assert!(paginator.process_response(&json!({}), 4, &mut state).is_done());
    assert_eq!(state.offset, 10);
    assert_eq!(state.total_fetched, 14);
}

#[test]
fn test_offset_paginator_empty_page() {
    let paginator = OffsetPaginator::new("offset", "limit", 0);
    let mut state = PaginationState::new();
    assert!(paginator.process_response(&json!({}), 0, &mut state).is_done());
    assert!(state.done);
}

// ============================================================================
// Stream Tests
// ============================================================================

fn client() -> HttpClient {
    HttpClient::with_config(HttpClientConfig::default()).unwrap()
}

#[tokio::test]
async fn test_pages_stream_portal_search() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sharing/rest/search"))
        .and(query_param("start", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 3, "start": 1, "num": 2, "nextStart": 3,
            "results": [{"id": "a"}, {"id": "b"}]
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sharing/rest/search"))
        .and(query_param("start", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 3, "start": 3, "num": 2, "nextStart": -1,
            "results": [{"id": "c"}]
        })))
        .mount(&mock_server)
        .await;

    let client = client();
    let url = format!("{}/sharing/rest/search", mock_server.uri());

    let pages: Vec<_> = pages(
        &client,
        &url,
        Params::new().with("q", "roads"),
        StartPaginator::new(1, 2),
        "results",
    )
    .collect()
    .await;
    assert_eq!(pages.len(), 2);

    let records = fetch_all(
        &client,
        &url,
        Params::new().with("q", "roads"),
        StartPaginator::new(1, 2),
        "results",
    )
    .await
    .unwrap();
    let ids: Vec<_> = records.iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_pages_stream_stops_on_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"code": 400, "message": "Pagination is not supported.", "details": []}
        })))
        .mount(&mock_server)
        .await;

    let client = client();
    let url = format!("{}/query", mock_server.uri());
    let err = fetch_all(
        &client,
        &url,
        Params::new(),
        OffsetPaginator::feature_query(100),
        "features",
    )
    .await
    .unwrap_err();

    assert!(matches!(err, crate::Error::Api { code: 400, .. }));
}
