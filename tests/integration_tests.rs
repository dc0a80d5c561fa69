//! Integration tests using mock ArcGIS servers
//!
//! Tests the end-to-end flow: YAML profile → token generation → REST calls

use arcrest::ags::{FeatureLayer, Query};
use arcrest::common::Feature;
use arcrest::config::ConnectionProfile;
use arcrest::enrichment::{study_area, EnrichOptions, GeoEnrichment};
use arcrest::manage_ags::AgsAdministration;
use arcrest::portal::{Administration, SearchParams};
use arcrest::template::TemplateContext;
use arcrest::Error;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LAYER: &str = "/arcgis/rest/services/Parcels/FeatureServer/0";

fn portal_profile(server: &MockServer) -> ConnectionProfile {
    let yaml = format!(
        r#"
name: test-org
security:
  security_type: portal
  username: gisadmin
  password: "{{{{ env.ARCGIS_PASSWORD }}}}"
  org_url: {uri}
  token_url: {uri}/sharing/rest/generateToken
http:
  max_retries: 0
"#,
        uri = server.uri()
    );
    let mut ctx = TemplateContext::new();
    ctx.set_env("ARCGIS_PASSWORD", "s3cret");
    ConnectionProfile::from_yaml_with(&yaml, &ctx).unwrap()
}

fn token_profile() -> ConnectionProfile {
    let yaml = "security:\n  security_type: token\n  token: static-token\nhttp:\n  max_retries: 0\n";
    ConnectionProfile::from_yaml_with(yaml, &TemplateContext::new()).unwrap()
}

async fn mount_generate_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/sharing/rest/generateToken"))
        .and(body_string_contains("username=gisadmin"))
        .and(body_string_contains("password=s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "portal-token",
            "expires": 4_102_444_800_000_i64,
            "ssl": false
        })))
        .expect(1)
        .mount(server)
        .await;
}

// ============================================================================
// Portal
// ============================================================================

#[tokio::test]
async fn test_profile_token_is_generated_once_and_reused() {
    let server = MockServer::start().await;
    mount_generate_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/sharing/rest/search"))
        .and(query_param("token", "portal-token"))
        .and(query_param("q", "title:Parcels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 1,
            "start": 1,
            "num": 10,
            "nextStart": -1,
            "results": [{"id": "abc123", "title": "Parcels", "type": "Feature Service"}]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = portal_profile(&server).build_client().unwrap();
    let admin = Administration::new(Arc::clone(&client), None).unwrap();
    assert_eq!(admin.url(), format!("{}/sharing/rest", server.uri()));

    let params = SearchParams::new("title:Parcels");
    let first = admin.search(&params).await.unwrap();
    let second = admin.search(&params).await.unwrap();
    assert_eq!(first.total, 1);
    assert_eq!(first.results[0]["id"], json!("abc123"));
    assert_eq!(second.next_start, -1);
}

#[tokio::test]
async fn test_find_item_uses_signed_in_user() {
    let server = MockServer::start().await;
    mount_generate_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/sharing/rest/search"))
        .and(query_param(
            "q",
            r#"Parcels owner:gisadmin (type:"Feature Service")"#,
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 1,
            "nextStart": -1,
            "results": [{"id": "abc123"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = portal_profile(&server).build_client().unwrap();
    let admin = Administration::new(client, None).unwrap();
    let items = admin
        .find_item("Parcels", &["Feature Service"], false)
        .await
        .unwrap();
    assert_eq!(items, vec![json!({"id": "abc123"})]);
}

#[tokio::test]
async fn test_rejected_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sharing/rest/generateToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"code": 400, "message": "Unable to generate token.", "details": ["Invalid username or password."]}
        })))
        .mount(&server)
        .await;

    let client = portal_profile(&server).build_client().unwrap();
    let admin = Administration::new(client, None).unwrap();
    let err = admin
        .search(&SearchParams::new("title:Parcels"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TokenGeneration { .. }), "{err:?}");
}

// ============================================================================
// Feature layers
// ============================================================================

#[tokio::test]
async fn test_query_all_fetches_id_batches() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{LAYER}/query")))
        .and(body_string_contains("returnIdsOnly=true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "objectIdFieldName": "OBJECTID",
            "objectIds": [1, 2, 3]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{LAYER}/query")))
        .and(body_string_contains("objectIds=1%2C2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "features": [
                {"attributes": {"OBJECTID": 1}},
                {"attributes": {"OBJECTID": 2}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{LAYER}/query")))
        .and(body_string_contains("objectIds=3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "features": [{"attributes": {"OBJECTID": 3}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = token_profile().build_client().unwrap();
    let layer = FeatureLayer::new(client, format!("{}{LAYER}", server.uri()));
    let features = layer
        .query_all(&Query::new().where_clause("ACRES > 5"), Some(2))
        .await
        .unwrap();

    let ids: Vec<i64> = features
        .features
        .iter()
        .filter_map(|f| f.attributes.get("OBJECTID").and_then(|v| v.as_i64()))
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_add_features_sends_static_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{LAYER}/addFeatures")))
        .and(query_param("token", "static-token"))
        .and(body_string_contains("rollbackOnFailure=true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "addResults": [{"objectId": 10, "success": true}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = token_profile().build_client().unwrap();
    let layer = FeatureLayer::new(client, format!("{}{LAYER}", server.uri()));
    let mut attributes = serde_json::Map::new();
    attributes.insert("NAME".to_string(), json!("Lot 7"));
    let feature = Feature {
        attributes,
        geometry: None,
    };

    let results = layer.add_features_chunked(&[feature], None).await.unwrap();
    assert_eq!(results.add_results.len(), 1);
    assert!(results.errors.is_empty());
}

#[tokio::test]
async fn test_count_error_envelope_is_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{LAYER}/query")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"code": 400, "message": "Unable to complete operation.", "details": ["Invalid query"]}
        })))
        .mount(&server)
        .await;

    let client = token_profile().build_client().unwrap();
    let layer = FeatureLayer::new(client, format!("{}{LAYER}", server.uri()));
    let err = layer
        .query_count(&Query::new().where_clause("NOPE = 1"))
        .await
        .unwrap_err();
    match err {
        Error::Api { code, details, .. } => {
            assert_eq!(code, 400);
            assert_eq!(details, vec!["Invalid query".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// ============================================================================
// Administration and services
// ============================================================================

#[tokio::test]
async fn test_admin_info_with_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/arcgis/admin"))
        .and(query_param("token", "static-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resources": ["machines", "services", "security"],
            "currentVersion": 11.1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = token_profile().build_client().unwrap();
    let admin = AgsAdministration::new(client, format!("{}/arcgis/admin", server.uri()));
    let info = admin.info().await.unwrap();
    assert_eq!(info.get("currentVersion"), Some(&json!(11.1)));
}

#[tokio::test]
async fn test_enrich_point() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ge/Geoenrichment/Enrich"))
        .and(query_param("studyareas", r#"[{"geometry":{"x":-117.19,"y":34.05}}]"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"value": {"FeatureSet": [{"features": [{"attributes": {"TOTPOP": 1234}}]}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = token_profile().build_client().unwrap();
    let ge = GeoEnrichment::new(client, format!("{}/ge", server.uri()));
    let point = serde_json::from_value(json!({"x": -117.19, "y": 34.05})).unwrap();
    let area = study_area(&point).unwrap();
    let body = ge.enrich(&[area], &EnrichOptions::default()).await.unwrap();
    assert_eq!(
        body["results"][0]["value"]["FeatureSet"][0]["features"][0]["attributes"]["TOTPOP"],
        json!(1234)
    );
}
