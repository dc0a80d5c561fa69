//! Connection profiles
//!
//! A profile is a small YAML document naming the security handler, its
//! credentials, an optional proxy and HTTP tuning:
//!
//! ```yaml
//! security:
//!   security_type: portal
//!   username: gisadmin
//!   password: "{{ env.ARCGIS_PASSWORD }}"
//!   org_url: https://myorg.maps.arcgis.com
//! proxy_url: proxy.local
//! proxy_port: 8080
//! http:
//!   timeout_seconds: 120
//!   rate_limit:
//!     requests_per_second: 5
//! ```

use crate::auth::{PortalCredentials, SecurityConfig, DEFAULT_EXPIRATION_MINUTES};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RateLimiterConfig};
use crate::template::{render, TemplateContext};
use crate::types::{BackoffType, OptionStringExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

// ============================================================================
// Profile
// ============================================================================

/// Everything needed to build a client for one site
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,

    /// Security handler
    #[serde(default)]
    pub security: SecurityDef,

    /// Proxy host or URL
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// Proxy port, appended to `proxy_url`
    #[serde(default)]
    pub proxy_port: Option<u16>,

    /// HTTP client tuning
    #[serde(default)]
    pub http: HttpConfig,
}

impl ConnectionProfile {
    /// Parse a profile, resolving placeholders from the process environment
    pub fn from_yaml(text: &str) -> Result<Self> {
        Self::from_yaml_with(text, &TemplateContext::from_env())
    }

    /// Parse a profile, resolving placeholders from `ctx`
    pub fn from_yaml_with(text: &str, ctx: &TemplateContext) -> Result<Self> {
        let rendered = render(text, ctx)?;
        Ok(serde_yaml::from_str(&rendered)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        debug!("Loading connection profile {}", path.display());
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    /// Proxy URL with scheme and port
    pub fn proxy(&self) -> Option<String> {
        let url = self.proxy_url.as_deref()?.trim_end_matches('/');
        let url = if url.contains("://") {
            url.to_string()
        } else {
            format!("http://{url}")
        };
        Some(match self.proxy_port {
            Some(port) => format!("{url}:{port}"),
            None => url,
        })
    }

    pub fn security_config(&self) -> Result<SecurityConfig> {
        self.security.to_security_config()
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut config = self.http.to_client_config();
        config.proxy = self.proxy();
        config
    }

    /// Shared client for every wrapper of this site
    pub fn build_client(&self) -> Result<Arc<HttpClient>> {
        let security = self.security_config()?;
        debug!("Building client with {} security", security.kind());
        Ok(Arc::new(HttpClient::with_security(
            self.http_client_config(),
            security,
        )?))
    }
}

// ============================================================================
// Security
// ============================================================================

/// Security handler definition as written in a profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityDef {
    /// `none`, `token`, `portal` (or `arcgis`), `server`, `portal_server`, `oauth`
    #[serde(default = "default_security_type")]
    pub security_type: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Organization URL for portal and OAuth logins
    #[serde(default)]
    pub org_url: Option<String>,

    /// ArcGIS Server URL for server and federated logins
    #[serde(default)]
    pub server_url: Option<String>,

    /// Explicit token endpoint
    #[serde(default)]
    pub token_url: Option<String>,

    #[serde(default)]
    pub referer_url: Option<String>,

    /// Pre-issued token for `token`
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub client_secret: Option<String>,

    /// Token lifetime in minutes
    #[serde(default = "default_expiration")]
    pub expiration: u32,
}

impl Default for SecurityDef {
    fn default() -> Self {
        Self {
            security_type: default_security_type(),
            username: None,
            password: None,
            org_url: None,
            server_url: None,
            token_url: None,
            referer_url: None,
            token: None,
            client_id: None,
            client_secret: None,
            expiration: default_expiration(),
        }
    }
}

fn default_security_type() -> String {
    "none".to_string()
}

fn default_expiration() -> u32 {
    DEFAULT_EXPIRATION_MINUTES
}

impl SecurityDef {
    pub fn to_security_config(&self) -> Result<SecurityConfig> {
        let security_type = self.security_type.to_lowercase();
        match security_type.as_str() {
            "none" | "anonymous" => Ok(SecurityConfig::None),
            "token" => Ok(SecurityConfig::Token {
                token: required(&self.token, "security.token")?,
                referer: self.referer_url.clone(),
            }),
            "portal" | "arcgis" => Ok(SecurityConfig::Portal(self.portal_credentials()?)),
            "server" => Ok(SecurityConfig::Server {
                username: required(&self.username, "security.username")?,
                password: required(&self.password, "security.password")?,
                server_url: required(&self.server_url, "security.server_url")?,
                token_url: self.token_url.clone(),
                referer: self.referer_url.clone(),
                expiration: self.expiration,
            }),
            "portal_server" => Ok(SecurityConfig::PortalServer {
                portal: self.portal_credentials()?,
                server_url: required(&self.server_url, "security.server_url")?,
            }),
            "oauth" => Ok(SecurityConfig::OAuth {
                client_id: required(&self.client_id, "security.client_id")?,
                client_secret: required(&self.client_secret, "security.client_secret")?,
                org_url: required(&self.org_url, "security.org_url")?,
                token_url: self.token_url.clone(),
                expiration: self.expiration,
            }),
            "ntlm" | "pki" | "ldap" => Err(Error::UnsupportedSecurity { security_type }),
            _ => Err(Error::InvalidConfigValue {
                field: "security.security_type".to_string(),
                message: format!("unknown security type '{}'", self.security_type),
            }),
        }
    }

    fn portal_credentials(&self) -> Result<PortalCredentials> {
        let mut creds = PortalCredentials::new(
            required(&self.username, "security.username")?,
            required(&self.password, "security.password")?,
            self.org_url.clone().unwrap_or_default(),
        );
        creds.token_url = self.token_url.clone();
        creds.referer = self.referer_url.clone();
        creds.expiration = self.expiration;
        Ok(creds)
    }
}

fn required(value: &Option<String>, field: &str) -> Result<String> {
    value
        .clone()
        .none_if_empty()
        .ok_or_else(|| Error::missing_field(field))
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub retry_backoff: BackoffConfig,

    /// Client-side throttling; unlimited when absent
    #[serde(default)]
    pub rate_limit: Option<RateLimiterConfig>,

    #[serde(default)]
    pub user_agent: Option<String>,

    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            retry_backoff: BackoffConfig::default(),
            rate_limit: None,
            user_agent: None,
            headers: HashMap::new(),
        }
    }
}

fn default_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

impl HttpConfig {
    pub fn to_client_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .timeout(Duration::from_secs(self.timeout_seconds))
            .max_retries(self.max_retries)
            .backoff(
                self.retry_backoff.backoff_type,
                Duration::from_millis(self.retry_backoff.initial_ms),
                Duration::from_millis(self.retry_backoff.max_ms),
            );
        if let Some(rate_limit) = &self.rate_limit {
            builder = builder.rate_limit(rate_limit.clone());
        }
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.as_str());
        }
        for (key, value) in &self.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        builder.build()
    }
}

/// Retry backoff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    250
}

fn default_max_ms() -> u64 {
    60_000
}
