//! Security handlers
//!
//! Supports: anonymous access, pre-issued tokens, ArcGIS Online / Portal
//! named users, stand-alone ArcGIS Server users, federated server tokens
//! and OAuth2 app logins.
//!
//! The `Authenticator` generates tokens on demand, caches them until shortly
//! before they expire, and attaches them (with the referer they were issued
//! for) to every request.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::{
    server_token_url, CachedToken, PortalCredentials, PortalUrls, SecurityConfig,
    DEFAULT_EXPIRATION_MINUTES, DEFAULT_ORG_URL,
};

#[cfg(test)]
mod tests;
