//! Authenticator implementation
//!
//! Generates and caches tokens, and applies them to outgoing requests.

use super::types::{server_token_url, CachedToken, PortalCredentials, PortalUrls, SecurityConfig};
use crate::error::{Error, Result};
use reqwest::header::REFERER;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Applies a security handler to HTTP requests
pub struct Authenticator {
    /// Security configuration
    config: SecurityConfig,
    /// Cached token for generated-token handlers
    cached_token: Arc<RwLock<Option<CachedToken>>>,
    /// HTTP client for token requests
    http_client: Client,
}

impl Authenticator {
    /// Create a new authenticator with the given config
    pub fn new(config: SecurityConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create an authenticator with a custom HTTP client
    pub fn with_client(config: SecurityConfig, http_client: Client) -> Self {
        Self {
            config,
            cached_token: Arc::new(RwLock::new(None)),
            http_client,
        }
    }

    /// Apply the token and referer to a request builder
    pub async fn apply(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        let mut req = req;
        if let Some(referer) = self.referer() {
            req = req.header(REFERER, referer);
        }
        match self.token().await? {
            Some(token) => Ok(req.query(&[("token", token)])),
            None => Ok(req),
        }
    }

    /// Get a valid token, generating one if necessary
    ///
    /// Returns `None` for anonymous access.
    pub async fn token(&self) -> Result<Option<String>> {
        match &self.config {
            SecurityConfig::None => Ok(None),
            SecurityConfig::Token { token, .. } => Ok(Some(token.clone())),
            _ => self.get_or_refresh_token().await.map(Some),
        }
    }

    /// Check that credentials produce a token
    pub async fn validate(&self) -> Result<()> {
        self.token().await.map(|_| ())
    }

    /// Check if requests go out without credentials
    pub fn is_anonymous(&self) -> bool {
        matches!(self.config, SecurityConfig::None)
    }

    /// Check if a rejected token can be replaced by generating a new one
    pub fn can_regenerate(&self) -> bool {
        !matches!(
            self.config,
            SecurityConfig::None | SecurityConfig::Token { .. }
        )
    }

    /// Referer sent with every request
    pub fn referer(&self) -> Option<String> {
        match &self.config {
            SecurityConfig::None => None,
            SecurityConfig::Token { referer, .. } | SecurityConfig::Server { referer, .. } => {
                referer.clone()
            }
            SecurityConfig::Portal(creds) | SecurityConfig::PortalServer { portal: creds, .. } => {
                creds.urls().ok().map(|u| u.referer)
            }
            SecurityConfig::OAuth { .. } => None,
        }
    }

    /// Named user behind the credentials
    pub fn username(&self) -> Option<&str> {
        match &self.config {
            SecurityConfig::Portal(creds) | SecurityConfig::PortalServer { portal: creds, .. } => {
                Some(&creds.username)
            }
            SecurityConfig::Server { username, .. } => Some(username),
            _ => None,
        }
    }

    /// Organization URL for portal-based handlers
    pub fn org_url(&self) -> Option<String> {
        match &self.config {
            SecurityConfig::Portal(creds) | SecurityConfig::PortalServer { portal: creds, .. } => {
                creds.urls().ok().map(|u| u.org_url)
            }
            SecurityConfig::OAuth { org_url, .. } => Some(org_url.clone()),
            _ => None,
        }
    }

    /// Get a valid token, refreshing if necessary
    async fn get_or_refresh_token(&self) -> Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired() {
                    return Ok(token.token.clone());
                }
            }
        }

        let mut cached = self.cached_token.write().await;

        // Another task may have refreshed while we waited for the write lock
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.token.clone());
            }
        }

        let new_token = self.fetch_new_token().await?;
        let token_str = new_token.token.clone();
        *cached = Some(new_token);

        Ok(token_str)
    }

    /// Generate a new token based on handler type
    async fn fetch_new_token(&self) -> Result<CachedToken> {
        match &self.config {
            SecurityConfig::Portal(creds) => self.fetch_portal_token(creds).await,

            SecurityConfig::Server {
                username,
                password,
                server_url,
                token_url,
                referer,
                expiration,
            } => {
                let token_url = match token_url {
                    Some(url) => url.clone(),
                    None => server_token_url(server_url)?,
                };
                let referer = referer.clone().unwrap_or_else(|| server_url.clone());
                let expiration = expiration.to_string();
                let form = [
                    ("username", username.as_str()),
                    ("password", password.as_str()),
                    ("client", "referer"),
                    ("referer", referer.as_str()),
                    ("expiration", expiration.as_str()),
                    ("f", "json"),
                ];
                self.generate_token(&token_url, &form).await
            }

            SecurityConfig::PortalServer { portal, server_url } => {
                let portal_token = self.fetch_portal_token(portal).await?;
                let urls = portal.urls()?;
                let form = [
                    ("token", portal_token.token.as_str()),
                    ("serverUrl", server_url.as_str()),
                    ("referer", urls.referer.as_str()),
                    ("f", "json"),
                ];
                debug!("Exchanging portal token for {}", server_url);
                self.generate_token(&urls.token_url, &form).await
            }

            SecurityConfig::OAuth {
                client_id,
                client_secret,
                org_url,
                token_url,
                expiration,
            } => {
                let token_url = match token_url {
                    Some(url) => url.clone(),
                    None => format!(
                        "{}/oauth2/token",
                        PortalUrls::from_org_url(org_url)?.secure_url
                    ),
                };
                self.fetch_oauth_token(&token_url, client_id, client_secret, *expiration)
                    .await
            }

            SecurityConfig::None | SecurityConfig::Token { .. } => Err(Error::auth(format!(
                "token generation not supported for '{}' security",
                self.config.kind()
            ))),
        }
    }

    async fn fetch_portal_token(&self, creds: &PortalCredentials) -> Result<CachedToken> {
        let urls = creds.urls()?;
        let expiration = creds.expiration.to_string();
        let form = [
            ("username", creds.username.as_str()),
            ("password", creds.password.as_str()),
            ("client", "referer"),
            ("referer", urls.referer.as_str()),
            ("expiration", expiration.as_str()),
            ("f", "json"),
        ];
        self.generate_token(&urls.token_url, &form).await
    }

    /// POST to a `generateToken` endpoint
    async fn generate_token(&self, token_url: &str, form: &[(&str, &str)]) -> Result<CachedToken> {
        let response = self
            .http_client
            .post(token_url)
            .form(form)
            .send()
            .await
            .map_err(Error::Http)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::token(format!(
                "token request to {token_url} failed with status {status}: {body}"
            )));
        }

        let body: Value = response.json().await.map_err(Error::Http)?;
        if let Some(err) = Error::from_envelope(&body) {
            return Err(Error::token(err.to_string()));
        }

        let token: GenerateTokenResponse = serde_json::from_value(body)
            .map_err(|e| Error::token(format!("unexpected token response: {e}")))?;
        debug!("Generated token from {}", token_url);
        Ok(token.into_cached_token())
    }

    /// Fetch an application token using the client credentials flow
    async fn fetch_oauth_token(
        &self,
        token_url: &str,
        client_id: &str,
        client_secret: &str,
        expiration: u32,
    ) -> Result<CachedToken> {
        let expiration = expiration.to_string();
        let form = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", "client_credentials"),
            ("expiration", expiration.as_str()),
            ("f", "json"),
        ];

        let response = self
            .http_client
            .post(token_url)
            .form(&form)
            .send()
            .await
            .map_err(Error::Http)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::OAuth2 {
                message: format!("Token request failed with status {status}: {body}"),
            });
        }

        let body: Value = response.json().await.map_err(Error::Http)?;
        if let Some(err) = Error::from_envelope(&body) {
            return Err(Error::OAuth2 {
                message: err.to_string(),
            });
        }

        let token: OAuthTokenResponse = serde_json::from_value(body).map_err(|e| Error::OAuth2 {
            message: format!("unexpected token response: {e}"),
        })?;
        Ok(token.into_cached_token())
    }

    /// Clear the cached token, forcing a new one on the next request
    pub async fn clear_cache(&self) {
        let mut cached = self.cached_token.write().await;
        *cached = None;
    }

    /// Get the current security config
    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("kind", &self.config.kind())
            .finish_non_exhaustive()
    }
}

/// `generateToken` response
#[derive(Debug, Deserialize)]
struct GenerateTokenResponse {
    token: String,
    #[serde(default)]
    expires: Option<i64>,
}

impl GenerateTokenResponse {
    fn into_cached_token(self) -> CachedToken {
        match self.expires {
            Some(ms) => CachedToken::expires_at_ms(self.token, ms),
            None => CachedToken::new(self.token, None),
        }
    }
}

/// OAuth2 token response
#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl OAuthTokenResponse {
    fn into_cached_token(self) -> CachedToken {
        match self.expires_in {
            Some(secs) => CachedToken::expires_in(self.access_token, secs),
            None => CachedToken::new(self.access_token, None),
        }
    }
}
