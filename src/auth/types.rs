//! Security handler configuration types

use crate::ags::server_base_url;
use crate::error::Result;
use chrono::{DateTime, Utc};
use url::Url;

/// Organization used when none is given
pub const DEFAULT_ORG_URL: &str = "http://www.arcgis.com";

/// Default token lifetime requested from token endpoints, in minutes
pub const DEFAULT_EXPIRATION_MINUTES: u32 = 60;

/// Credentials for a portal (ArcGIS Online or Portal for ArcGIS) login
#[derive(Debug, Clone)]
pub struct PortalCredentials {
    /// Named user
    pub username: String,
    /// Password
    pub password: String,
    /// Organization URL (e.g. "https://myorg.maps.arcgis.com")
    pub org_url: String,
    /// Explicit token endpoint; derived from `org_url` when absent
    pub token_url: Option<String>,
    /// Referer sent with the token request and every call
    pub referer: Option<String>,
    /// Requested token lifetime in minutes
    pub expiration: u32,
}

impl PortalCredentials {
    /// Credentials for an organization with default token settings
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        org_url: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            org_url: org_url.into(),
            token_url: None,
            referer: None,
            expiration: DEFAULT_EXPIRATION_MINUTES,
        }
    }

    /// Resolved endpoint URLs
    pub fn urls(&self) -> Result<PortalUrls> {
        let mut urls = PortalUrls::from_org_url(&self.org_url)?;
        if let Some(token_url) = &self.token_url {
            urls.token_url = token_url.clone();
        }
        if let Some(referer) = &self.referer {
            urls.referer = referer.clone();
        }
        Ok(urls)
    }
}

/// Security handler configuration
#[derive(Debug, Clone, Default)]
pub enum SecurityConfig {
    /// Anonymous access
    #[default]
    None,

    /// A token issued elsewhere
    Token {
        /// The token value
        token: String,
        /// Referer the token was issued for
        referer: Option<String>,
    },

    /// ArcGIS Online / Portal named-user token (`/sharing/rest/generateToken`)
    Portal(PortalCredentials),

    /// Stand-alone ArcGIS Server token (`/tokens/generateToken`)
    Server {
        /// Server user
        username: String,
        /// Password
        password: String,
        /// Any URL on the server (services or admin)
        server_url: String,
        /// Explicit token endpoint; derived from `server_url` when absent
        token_url: Option<String>,
        /// Referer sent with the token request and every call
        referer: Option<String>,
        /// Requested token lifetime in minutes
        expiration: u32,
    },

    /// Federated server token exchanged from a portal token
    PortalServer {
        /// Portal login used to obtain the portal token
        portal: PortalCredentials,
        /// Federated server root (e.g. "https://gis.local/server")
        server_url: String,
    },

    /// App login with OAuth2 client credentials (`/oauth2/token`)
    OAuth {
        /// Registered application client id
        client_id: String,
        /// Application secret
        client_secret: String,
        /// Organization URL
        org_url: String,
        /// Explicit token endpoint; `<secure org>/oauth2/token` when absent
        token_url: Option<String>,
        /// Requested token lifetime in minutes
        expiration: u32,
    },
}

impl SecurityConfig {
    /// Short name used in logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Token { .. } => "token",
            Self::Portal(_) => "portal",
            Self::Server { .. } => "server",
            Self::PortalServer { .. } => "portal_server",
            Self::OAuth { .. } => "oauth",
        }
    }
}

/// Endpoint URLs derived from an organization URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalUrls {
    /// Organization URL as given, with a scheme
    pub org_url: String,
    /// Sharing REST root (`<org>/sharing/rest`)
    pub url: String,
    /// HTTPS form of the sharing REST root
    pub secure_url: String,
    /// Token endpoint (`<secure>/generateToken`)
    pub token_url: String,
    /// Referer, defaulting to the organization URL
    pub referer: String,
}

impl PortalUrls {
    /// Derive the sharing endpoints from an organization URL
    ///
    /// A missing scheme becomes `http://`; `/sharing/rest` is appended unless
    /// the URL already contains it.
    pub fn from_org_url(org_url: &str) -> Result<Self> {
        let org_url = org_url.trim().trim_end_matches('/');
        let org_url = if org_url.is_empty() {
            DEFAULT_ORG_URL.to_string()
        } else if org_url.starts_with("http://") || org_url.starts_with("https://") {
            org_url.to_string()
        } else {
            format!("http://{org_url}")
        };

        // Validate early so a typo fails at construction, not at first request
        Url::parse(&org_url)?;

        let url = if org_url.to_lowercase().contains("/sharing/rest") {
            org_url.clone()
        } else {
            format!("{org_url}/sharing/rest")
        };

        let secure_url = match url.strip_prefix("http://") {
            Some(rest) => format!("https://{rest}"),
            None => url.clone(),
        };

        let token_url = format!("{secure_url}/generateToken");
        let referer = match org_url.find("/sharing/rest") {
            Some(idx) => org_url[..idx].to_string(),
            None => org_url.clone(),
        };

        Ok(Self {
            org_url: referer.clone(),
            url,
            secure_url,
            token_url,
            referer,
        })
    }
}

/// Derive the token endpoint of a stand-alone ArcGIS Server
///
/// `https://host:6443/arcgis/rest/services` → `https://host:6443/arcgis/tokens/generateToken`
pub fn server_token_url(server_url: &str) -> Result<String> {
    Ok(format!("{}/tokens/generateToken", server_base_url(server_url)?))
}

/// Cached token with expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Create a token that expires in N seconds from now
    pub fn expires_in(token: String, seconds: i64) -> Self {
        let expires_at = Utc::now() + chrono::Duration::seconds(seconds);
        Self {
            token,
            expires_at: Some(expires_at),
        }
    }

    /// Create a token from an epoch-milliseconds expiry (`generateToken` responses)
    pub fn expires_at_ms(token: String, expires_ms: i64) -> Self {
        Self {
            token,
            expires_at: DateTime::from_timestamp_millis(expires_ms),
        }
    }

    /// Check if the token is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(30);
                Utc::now() + buffer >= expires_at
            }
            None => false, // No expiration = never expires
        }
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_cached_token_not_expired() {
        let token = CachedToken::expires_in("test".to_string(), 3600);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_cached_token_expired() {
        let token = CachedToken::expires_in("test".to_string(), -100);
        assert!(token.is_expired());
    }

    #[test]
    fn test_cached_token_within_buffer_is_expired() {
        let token = CachedToken::expires_in("test".to_string(), 10);
        assert!(token.is_expired());
    }

    #[test]
    fn test_cached_token_from_millis() {
        let future = (Utc::now() + chrono::Duration::hours(1)).timestamp_millis();
        let token = CachedToken::expires_at_ms("abc".to_string(), future);
        assert!(!token.is_expired());
        assert!(CachedToken::expires_at_ms("abc".to_string(), 1_000).is_expired());
    }

    #[test]
    fn test_security_config_default() {
        let config = SecurityConfig::default();
        assert!(matches!(config, SecurityConfig::None));
        assert_eq!(config.kind(), "none");
    }
}
