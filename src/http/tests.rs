//! Tests for the HTTP client module

use super::*;
use crate::auth::{PortalCredentials, SecurityConfig};
use crate::error::Error;
use crate::types::BackoffType;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use test_case::test_case;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer) -> HttpClient {
    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(10),
            Duration::from_secs(1),
        )
        .no_rate_limit()
        .build();
    HttpClient::with_config(config).unwrap()
}

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.max_retries, 3);
    assert!(config.base_url.is_none());
    assert!(config.rate_limit.is_none());
    assert!(config.user_agent.starts_with("arcrest/"));
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .base_url("https://gis.local/arcgis/rest/services")
        .timeout(Duration::from_secs(120))
        .max_retries(5)
        .backoff(
            BackoffType::Linear,
            Duration::from_millis(200),
            Duration::from_secs(30),
        )
        .header("X-Custom", "value")
        .user_agent("test-agent/1.0")
        .proxy("http://proxy.local:8080")
        .build();

    assert_eq!(
        config.base_url,
        Some("https://gis.local/arcgis/rest/services".to_string())
    );
    assert_eq!(config.timeout, Duration::from_secs(120));
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.backoff_type, BackoffType::Linear);
    assert_eq!(
        config.default_headers.get("X-Custom"),
        Some(&"value".to_string())
    );
    assert_eq!(config.proxy.as_deref(), Some("http://proxy.local:8080"));

    let client = HttpClient::with_config(config).unwrap();
    assert!(!client.is_authenticated());
}

#[test]
fn test_request_config_builder() {
    let config = RequestConfig::new()
        .query("where", "1=1")
        .query("returnGeometry", false)
        .query("resultRecordCount", 10)
        .header("X-Request-Id", "abc123")
        .form(Params::new().with("features", json!([{"attributes": {"a": 1}}])))
        .timeout(Duration::from_secs(10))
        .retries(2);

    assert_eq!(config.query.get("where"), Some("1=1"));
    assert_eq!(config.query.get("returnGeometry"), Some("false"));
    assert_eq!(config.query.get("resultRecordCount"), Some("10"));
    assert_eq!(
        config.form.as_ref().and_then(|f| f.get("features")),
        Some(r#"[{"attributes":{"a":1}}]"#)
    );
    assert_eq!(config.timeout, Some(Duration::from_secs(10)));
    assert_eq!(config.max_retries, Some(2));
}

#[test]
fn test_params_conversions() {
    let mut params = Params::new()
        .with("text", "abc")
        .with("flag", true)
        .with("count", 250)
        .with("ratio", 0.5)
        .with("outSR", json!({"wkid": 4326}))
        .with_opt("missing", None::<String>);

    assert_eq!(params.get("text"), Some("abc"));
    assert_eq!(params.get("flag"), Some("true"));
    assert_eq!(params.get("count"), Some("250"));
    assert_eq!(params.get("ratio"), Some("0.5"));
    assert_eq!(params.get("outSR"), Some(r#"{"wkid":4326}"#));
    assert!(!params.contains("missing"));

    params.set("text", serde_json::Value::Null);
    assert!(!params.contains("text"));

    params.set_default("count", "1");
    params.set_default("f", "json");
    assert_eq!(params.get("count"), Some("250"));
    assert_eq!(params.get("f"), Some("json"));

    let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["count", "f", "flag", "outSR", "ratio"]);
}

#[test]
fn test_params_extend_and_merge() {
    let mut object = crate::types::JsonObject::new();
    object.insert("a".to_string(), json!("1"));
    object.insert("b".to_string(), json!(null));

    let mut params = Params::new().with("b", "keep");
    params.extend_object(&object);
    assert_eq!(params.get("a"), Some("1"));
    assert!(!params.contains("b"));

    let other: Params = [("a", "2"), ("c", "3")].into_iter().collect();
    params.merge(&other);
    assert_eq!(params.get("a"), Some("2"));
    assert_eq!(params.len(), 2);
}

#[test_case("roads.csv", "text/csv" ; "csv")]
#[test_case("Parcels.SD", "File/sd" ; "service definition")]
#[test_case("data.zip", "application/zip" ; "zip")]
#[test_case("thumb.PNG", "image/png" ; "png upper case")]
#[test_case("points.geojson", "application/json" ; "geojson")]
#[test_case("layer.gdb", "File/gdb" ; "unknown extension")]
fn test_content_type_for(file_name: &str, expected: &str) {
    assert_eq!(content_type_for(file_name), expected);
}

#[tokio::test]
async fn test_upload_file_from_missing_path() {
    let err = UploadFile::from_path("file", "/definitely/not/here.csv")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::FileNotFound { .. }));
}

#[tokio::test]
async fn test_upload_file_from_path() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("roads.csv");
    std::fs::write(&file_path, "id,name\n1,Main St\n").unwrap();

    let upload = UploadFile::from_path("file", &file_path).await.unwrap();
    assert_eq!(upload.file_name, "roads.csv");
    assert_eq!(upload.content_type, "text/csv");
    assert_eq!(upload.len(), 18);
}

#[tokio::test]
async fn test_get_json_adds_format() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/arcgis/rest/services"))
        .and(query_param("f", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "currentVersion": 10.91,
            "folders": ["Utilities"]
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let data = client
        .get_json("/arcgis/rest/services", Params::new())
        .await
        .unwrap();

    assert_eq!(data["folders"][0], "Utilities");
}

#[tokio::test]
async fn test_explicit_format_is_kept() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/export"))
        .and(query_param("f", "pjson"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let data = client
        .get_json("/export", Params::new().with("f", "pjson"))
        .await
        .unwrap();
    assert_eq!(data["ok"], true);
}

#[tokio::test]
async fn test_post_json_sends_form() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/FeatureServer/0/addFeatures"))
        .and(body_string_contains("rollbackOnFailure=true"))
        .and(body_string_contains("f=json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "addResults": [{"objectId": 1, "success": true}]
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let data = client
        .post_json(
            "/FeatureServer/0/addFeatures",
            Params::new().with("rollbackOnFailure", true),
        )
        .await
        .unwrap();
    assert_eq!(data["addResults"][0]["objectId"], 1);
}

#[tokio::test]
async fn test_error_envelope_with_http_200() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/MapServer/99"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"code": 400, "message": "Invalid or missing input parameters.", "details": []}
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .get_json("/MapServer/99", Params::new())
        .await
        .unwrap_err();

    match err {
        Error::Api { code, message, .. } => {
            assert_eq!(code, 400);
            assert_eq!(message, "Invalid or missing input parameters.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_non_json_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Sign in</html>"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.get_json("/login", Params::new()).await.unwrap_err();
    assert!(matches!(err, Error::Resource { .. }));
    assert!(err.to_string().contains("<html>Sign in</html>"));
}

#[tokio::test]
async fn test_http_404_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.get_json("/missing", Params::new()).await.unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 404, .. }));
}

#[tokio::test]
async fn test_retry_on_500() {
    let mock_server = MockServer::start().await;

    // First two calls return 500, third succeeds
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let data = client.get_json("/flaky", Params::new()).await.unwrap();
    assert_eq!(data["ok"], true);
}

#[tokio::test]
async fn test_max_retries_exceeded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/always-fail"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .max_retries(2)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(10),
            Duration::from_secs(1),
        )
        .build();
    let client = HttpClient::with_config(config).unwrap();

    let err = client
        .get_json("/always-fail", Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
}

#[tokio::test]
async fn test_static_token_is_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/info"))
        .and(query_param("token", "abc"))
        .and(header("Referer", "https://app.local"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_security(
        HttpClientConfig::builder().base_url(mock_server.uri()).build(),
        SecurityConfig::Token {
            token: "abc".to_string(),
            referer: Some("https://app.local".to_string()),
        },
    )
    .unwrap();

    assert!(client.is_authenticated());
    client.get_json("/rest/info", Params::new()).await.unwrap();
}

#[tokio::test]
async fn test_invalid_token_regenerates_once() {
    let mock_server = MockServer::start().await;
    let expires = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp_millis();

    Mock::given(method("POST"))
        .and(path("/sharing/rest/generateToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "stale", "expires": expires
        })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/sharing/rest/generateToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "fresh", "expires": expires
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sharing/rest/portals/self"))
        .and(query_param("token", "stale"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"code": 498, "message": "Invalid token.", "details": []}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sharing/rest/portals/self"))
        .and(query_param("token", "fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "org1"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut creds = PortalCredentials::new("jdoe", "pw", mock_server.uri());
    creds.token_url = Some(format!("{}/sharing/rest/generateToken", mock_server.uri()));
    let client = HttpClient::with_security(
        HttpClientConfig::builder().base_url(mock_server.uri()).build(),
        SecurityConfig::Portal(creds),
    )
    .unwrap();

    let data = client
        .get_json("/sharing/rest/portals/self", Params::new())
        .await
        .unwrap();
    assert_eq!(data["id"], "org1");
}

#[tokio::test]
async fn test_invalid_static_token_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"code": 499, "message": "Token Required", "details": []}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_security(
        HttpClientConfig::builder().base_url(mock_server.uri()).build(),
        SecurityConfig::Token {
            token: "bad".to_string(),
            referer: None,
        },
    )
    .unwrap();

    let err = client.get_json("/info", Params::new()).await.unwrap_err();
    assert!(err.is_invalid_token());
}

#[tokio::test]
async fn test_multipart_upload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/uploads/upload"))
        .and(body_string_contains("filename=\"roads.csv\""))
        .and(body_string_contains("name=\"description\""))
        .and(body_string_contains("id,name"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "item": {"itemID": "i1"}
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let data = client
        .post_multipart(
            "/uploads/upload",
            Params::new().with("description", "roads"),
            vec![UploadFile::new("file", "roads.csv", "id,name\n")],
        )
        .await
        .unwrap();
    assert_eq!(data["item"]["itemID"], "i1");
}

#[tokio::test]
async fn test_download_uses_disposition_name() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/content/items/abc/data"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", "attachment; filename=\"roads.zip\"")
                .insert_header("Content-Type", "application/zip")
                .set_body_bytes(b"PK\x03\x04".to_vec()),
        )
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = test_client(&mock_server);
    let saved = client
        .download("/content/items/abc/data", Params::new(), dir.path(), None)
        .await
        .unwrap();

    assert_eq!(saved, dir.path().join("roads.zip"));
    assert_eq!(std::fs::read(&saved).unwrap(), b"PK\x03\x04".to_vec());
}

#[tokio::test]
async fn test_download_keeps_traversal_names_inside_dir() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/content/items/abc/data"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", "attachment; filename=\"../escaped.txt\"")
                .set_body_bytes(b"data".to_vec()),
        )
        .mount(&mock_server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("downloads");
    let client = test_client(&mock_server);
    let saved = client
        .download("/content/items/abc/data", Params::new(), &dir, None)
        .await
        .unwrap();

    assert_eq!(saved, dir.join("escaped.txt"));
    assert!(!root.path().join("escaped.txt").exists());

    let err = client
        .download("/content/items/abc/data", Params::new(), &dir, Some(".."))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));
}

#[test_case("roads.zip", Some("roads.zip") ; "plain")]
#[test_case("../../etc/passwd", Some("passwd") ; "parent segments")]
#[test_case("/tmp/abs.txt", Some("abs.txt") ; "absolute")]
#[test_case("..\\..\\win.ini", Some("win.ini") ; "backslashes")]
#[test_case("..", None ; "parent only")]
#[test_case("", None ; "empty")]
fn test_safe_file_name(name: &str, expected: Option<&str>) {
    assert_eq!(
        super::client::safe_file_name(name).as_deref(),
        expected
    );
}

#[tokio::test]
async fn test_download_explicit_name_and_fallback() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/files/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/pdf")
                .set_body_bytes(b"%PDF".to_vec()),
        )
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = test_client(&mock_server);

    let named = client
        .download("/files/report.pdf", Params::new(), dir.path(), Some("copy.pdf"))
        .await
        .unwrap();
    assert_eq!(named, dir.path().join("copy.pdf"));

    let fallback = client
        .download("/files/report.pdf", Params::new(), dir.path(), None)
        .await
        .unwrap();
    assert_eq!(fallback, dir.path().join("report.pdf"));
}

#[tokio::test]
async fn test_download_error_envelope() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/content/items/missing/data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"code": 400, "message": "Item does not exist or is inaccessible.", "details": []}
        })))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = test_client(&mock_server);
    let err = client
        .download("/content/items/missing/data", Params::new(), dir.path(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Api { code: 400, .. }));
}

#[test]
fn test_calculate_backoff_linear() {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Linear,
            Duration::from_millis(100),
            Duration::from_secs(10),
        )
        .build();

    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(client.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(1), Duration::from_millis(200));
    assert_eq!(client.calculate_backoff(2), Duration::from_millis(300));
}

#[test]
fn test_calculate_backoff_exponential_respects_max() {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Exponential,
            Duration::from_millis(100),
            Duration::from_millis(500),
        )
        .build();

    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(client.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(2), Duration::from_millis(400));
    assert_eq!(client.calculate_backoff(10), Duration::from_millis(500));
}

#[test]
fn test_http_client_debug() {
    let client = HttpClient::new().unwrap();
    let debug_str = format!("{:?}", client);
    assert!(debug_str.contains("HttpClient"));
    assert!(debug_str.contains("has_authenticator"));
}

#[tokio::test]
async fn test_http_client_with_rate_limiter() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .rate_limit(RateLimiterConfig::new(100, 10))
        .build();

    let client = HttpClient::with_config(config).unwrap();
    assert!(client.has_rate_limiter());

    for _ in 0..3 {
        client.get_json("/data", Params::new()).await.unwrap();
    }
}
