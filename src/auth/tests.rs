//! Tests for the security handlers

use super::*;
use pretty_assertions::assert_eq;
use test_case::test_case;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn far_future_ms() -> i64 {
    (chrono::Utc::now() + chrono::Duration::hours(2)).timestamp_millis()
}

fn portal_creds(server: &MockServer) -> PortalCredentials {
    let mut creds = PortalCredentials::new("jdoe", "s3cret", server.uri());
    creds.token_url = Some(format!("{}/sharing/rest/generateToken", server.uri()));
    creds
}

#[test_case("www.arcgis.com", "http://www.arcgis.com/sharing/rest", "https://www.arcgis.com/sharing/rest/generateToken" ; "adds scheme")]
#[test_case("https://myorg.maps.arcgis.com/", "https://myorg.maps.arcgis.com/sharing/rest", "https://myorg.maps.arcgis.com/sharing/rest/generateToken" ; "keeps https")]
#[test_case("http://gis.local/portal/sharing/rest", "http://gis.local/portal/sharing/rest", "https://gis.local/portal/sharing/rest/generateToken" ; "keeps sharing rest")]
#[test_case("", "http://www.arcgis.com/sharing/rest", "https://www.arcgis.com/sharing/rest/generateToken" ; "default org")]
fn test_portal_urls(org_url: &str, expected_url: &str, expected_token_url: &str) {
    let urls = PortalUrls::from_org_url(org_url).unwrap();
    assert_eq!(urls.url, expected_url);
    assert_eq!(urls.token_url, expected_token_url);
}

#[test]
fn test_portal_urls_referer_defaults_to_org() {
    let urls = PortalUrls::from_org_url("http://gis.local/portal/sharing/rest").unwrap();
    assert_eq!(urls.referer, "http://gis.local/portal");
    assert_eq!(urls.org_url, "http://gis.local/portal");
}

#[test_case("https://gis.local:6443/arcgis/rest/services", "https://gis.local:6443/arcgis/tokens/generateToken" ; "services url")]
#[test_case("https://gis.local/server/admin", "https://gis.local/server/tokens/generateToken" ; "admin url")]
#[test_case("http://gis.local", "http://gis.local/arcgis/tokens/generateToken" ; "bare host")]
#[test_case("https://gis.local/rest/services", "https://gis.local/arcgis/tokens/generateToken" ; "services without instance")]
#[test_case("https://gis.local/server/rest/services/Hydro/FeatureServer/0", "https://gis.local/server/tokens/generateToken" ; "layer url")]
#[test_case("https://gis.local/server/tokens/generateToken", "https://gis.local/server/tokens/generateToken" ; "token url")]
fn test_server_token_url(server_url: &str, expected: &str) {
    assert_eq!(server_token_url(server_url).unwrap(), expected);
}

#[tokio::test]
async fn test_anonymous_adds_nothing() {
    let auth = Authenticator::new(SecurityConfig::None);
    let client = reqwest::Client::new();
    let req = auth
        .apply(client.get("https://example.com/arcgis/rest/services"))
        .await
        .unwrap();

    let built = req.build().unwrap();
    assert!(built.url().query().is_none());
    assert!(built.headers().get("Referer").is_none());
    assert_eq!(auth.token().await.unwrap(), None);
}

#[tokio::test]
async fn test_static_token_and_referer() {
    let auth = Authenticator::new(SecurityConfig::Token {
        token: "abc123".to_string(),
        referer: Some("https://app.example.com".to_string()),
    });

    let client = reqwest::Client::new();
    let req = auth.apply(client.get("https://example.com/query")).await.unwrap();

    let built = req.build().unwrap();
    assert_eq!(built.url().query(), Some("token=abc123"));
    assert_eq!(
        built.headers().get("Referer").unwrap(),
        "https://app.example.com"
    );
    assert!(!auth.can_regenerate());
}

#[tokio::test]
async fn test_portal_token_generation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sharing/rest/generateToken"))
        .and(body_string_contains("username=jdoe"))
        .and(body_string_contains("password=s3cret"))
        .and(body_string_contains("client=referer"))
        .and(body_string_contains("expiration=60"))
        .and(body_string_contains("f=json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": "portal-token",
            "expires": far_future_ms(),
            "ssl": true
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(SecurityConfig::Portal(portal_creds(&mock_server)));

    // Second call is served from the cache
    assert_eq!(auth.token().await.unwrap(), Some("portal-token".to_string()));
    assert_eq!(auth.token().await.unwrap(), Some("portal-token".to_string()));
    assert_eq!(auth.username(), Some("jdoe"));
    assert_eq!(auth.referer(), Some(mock_server.uri()));
}

#[tokio::test]
async fn test_token_error_envelope() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sharing/rest/generateToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": {
                "code": 400,
                "message": "Unable to generate token.",
                "details": ["Invalid username or password."]
            }
        })))
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(SecurityConfig::Portal(portal_creds(&mock_server)));
    let err = assert_err!(auth.validate().await);

    assert!(matches!(err, crate::Error::TokenGeneration { .. }));
    assert!(err.to_string().contains("Unable to generate token."));
}

#[tokio::test]
async fn test_server_token_generation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/arcgis/tokens/generateToken"))
        .and(body_string_contains("username=admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": "server-token",
            "expires": far_future_ms()
        })))
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(SecurityConfig::Server {
        username: "admin".to_string(),
        password: "pw".to_string(),
        server_url: format!("{}/arcgis/rest/services", mock_server.uri()),
        token_url: None,
        referer: None,
        expiration: 30,
    });

    assert_eq!(auth.token().await.unwrap(), Some("server-token".to_string()));
}

#[tokio::test]
async fn test_portal_server_exchange() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sharing/rest/generateToken"))
        .and(body_string_contains("username=jdoe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": "portal-token",
            "expires": far_future_ms()
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/sharing/rest/generateToken"))
        .and(body_string_contains("token=portal-token"))
        .and(body_string_contains("serverUrl="))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": "federated-token",
            "expires": far_future_ms()
        })))
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(SecurityConfig::PortalServer {
        portal: portal_creds(&mock_server),
        server_url: "https://gis.local/server".to_string(),
    });

    assert_eq!(
        auth.token().await.unwrap(),
        Some("federated-token".to_string())
    );
}

#[tokio::test]
async fn test_oauth_client_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sharing/rest/oauth2/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=my-app"))
        .and(body_string_contains("client_secret=my-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "app-token",
            "expires_in": 7200
        })))
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(SecurityConfig::OAuth {
        client_id: "my-app".to_string(),
        client_secret: "my-secret".to_string(),
        org_url: mock_server.uri(),
        token_url: Some(format!("{}/sharing/rest/oauth2/token", mock_server.uri())),
        expiration: 120,
    });

    let client = reqwest::Client::new();
    let built = auth
        .apply(client.get("https://example.com/items"))
        .await
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(built.url().query(), Some("token=app-token"));
}

#[tokio::test]
async fn test_oauth_http_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(SecurityConfig::OAuth {
        client_id: "bad".to_string(),
        client_secret: "bad".to_string(),
        org_url: mock_server.uri(),
        token_url: Some(format!("{}/oauth2/token", mock_server.uri())),
        expiration: 60,
    });

    let err = auth.token().await.unwrap_err();
    assert!(matches!(err, crate::Error::OAuth2 { .. }));
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn test_clear_cache_forces_new_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sharing/rest/generateToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": "t",
            "expires": far_future_ms()
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(SecurityConfig::Portal(portal_creds(&mock_server)));
    assert_ok!(auth.validate().await);
    auth.clear_cache().await;
    assert_ok!(auth.validate().await);
}
