//! Tests for lazy resources

use super::*;
use crate::http::HttpClientConfig;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceInfo {
    current_version: Option<f64>,
    #[serde(default)]
    folders: Vec<String>,
    #[serde(flatten)]
    extra: JsonObject,
}

impl_properties!(ServiceInfo, "ServiceInfo");

fn client() -> Arc<HttpClient> {
    Arc::new(HttpClient::with_config(HttpClientConfig::default()).unwrap())
}

#[test]
fn test_loaded_maps_known_and_unknown_keys() {
    let loaded = Loaded::<ServiceInfo>::from_value(
        "https://gis.local/arcgis/rest/services",
        json!({"currentVersion": 11.1, "folders": ["Utilities"], "fullVersion": "11.1.0"}),
    )
    .unwrap();

    assert_eq!(loaded.current_version, Some(11.1));
    assert_eq!(loaded.folders, vec!["Utilities".to_string()]);
    assert_eq!(loaded.extra.len(), 1);
    assert_eq!(loaded.get("fullVersion"), Some(&json!("11.1.0")));
    assert_eq!(loaded.raw().len(), 3);
}

#[test]
fn test_loaded_rejects_non_objects() {
    let err = Loaded::<ServiceInfo>::from_value("https://gis.local/x", json!([1, 2])).unwrap_err();
    assert!(matches!(err, Error::Resource { .. }));
}

#[tokio::test]
async fn test_resource_loads_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/arcgis/rest/services"))
        .and(query_param("f", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "currentVersion": 10.81,
            "folders": ["Hydro"]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let resource: Resource<ServiceInfo> = Resource::new(
        client(),
        format!("{}/arcgis/rest/services/", mock_server.uri()),
    );
    assert!(!resource.is_loaded().await);

    let first = resource.get().await.unwrap();
    let second = resource.get().await.unwrap();

    assert!(resource.is_loaded().await);
    assert_eq!(first.folders, second.folders);
    assert!(resource.url().ends_with("/arcgis/rest/services"));
}

#[tokio::test]
async fn test_refresh_and_invalidate_reload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/layer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"currentVersion": 1})))
        .expect(3)
        .mount(&mock_server)
        .await;

    let resource: Resource<ServiceInfo> =
        Resource::new(client(), format!("{}/layer", mock_server.uri()));

    resource.get().await.unwrap();
    resource.refresh().await.unwrap();

    resource.invalidate().await;
    assert!(!resource.is_loaded().await);
    resource.get().await.unwrap();
}

#[tokio::test]
async fn test_preloaded_skips_request() {
    let resource: Resource<JsonObject> = Resource::preloaded(
        client(),
        "https://gis.local/items/abc",
        json!({"id": "abc", "title": "Roads"}),
    )
    .unwrap();

    assert!(resource.is_loaded().await);
    let raw = resource.raw().await.unwrap();
    assert_eq!(raw["title"], "Roads");
    assert_eq!(resource.child("/data"), "https://gis.local/items/abc/data");
}

#[tokio::test]
async fn test_rest_resource_surface() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/svc"))
        .and(query_param("returnUpdates", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "svc"})))
        .mount(&mock_server)
        .await;

    let resource: Resource<JsonObject> = Resource::new(client(), format!("{}/svc", mock_server.uri()))
        .with_params(Params::new().with("returnUpdates", true));

    let as_trait: &dyn RestResource = &resource;
    let json = as_trait.json().await.unwrap();
    assert_eq!(json["name"], "svc");
    as_trait.refresh().await.unwrap();
}
