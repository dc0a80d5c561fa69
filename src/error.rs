//! Crate-wide error type
//!
//! Transport failures, security handler failures and ArcGIS error envelopes
//! all end up in [`Error`].

use serde_json::Value;
use thiserror::Error;

/// Everything that can go wrong talking to an ArcGIS site
#[derive(Error, Debug)]
pub enum Error {
    // -- profiles and local input ------------------------------------------
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Invalid YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Invalid JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Undefined template variable: {variable}")]
    UndefinedVariable { variable: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -- security handlers -------------------------------------------------
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Token generation failed: {message}")]
    TokenGeneration { message: String },

    #[error("OAuth2 error: {message}")]
    OAuth2 { message: String },

    #[error("Security type '{security_type}' is not supported")]
    UnsupportedSecurity { security_type: String },

    // -- transport ---------------------------------------------------------
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Throttled by the server, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("No response within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Gave up after {max_retries} retries")]
    MaxRetriesExceeded { max_retries: u32 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // -- ArcGIS ------------------------------------------------------------
    /// An error envelope, or an HTTP error whose body was one
    #[error("ArcGIS error {code}: {message}")]
    Api {
        code: i64,
        message: String,
        details: Vec<String>,
    },

    #[error("Invalid argument '{name}': {message}")]
    InvalidArgument { name: String, message: String },

    /// A response that is not the document the wrapper expected
    #[error("Unexpected response from {url}: {message}")]
    Resource { url: String, message: String },

    #[error("Job {job_id} ended with status '{status}'")]
    JobFailed { job_id: String, status: String },

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn token(message: impl Into<String>) -> Self {
        Self::TokenGeneration {
            message: message.into(),
        }
    }

    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    pub fn api(code: i64, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn resource(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resource {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Build an error from an ArcGIS error envelope, if the document is one.
    ///
    /// Recognizes the REST form `{"error": {"code", "message", "details"}}`
    /// and the admin form `{"status": "error", "messages": [...]}`.
    pub fn from_envelope(body: &Value) -> Option<Self> {
        if let Some(err) = body.get("error").and_then(Value::as_object) {
            let code = err.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Some(Self::Api {
                code,
                message,
                details: string_list(err.get("details")),
            });
        }

        if body.get("status").and_then(Value::as_str) == Some("error") {
            let details = string_list(body.get("messages"));
            let message = if details.is_empty() {
                "request failed".to_string()
            } else {
                details.join("; ")
            };
            return Some(Self::Api {
                code: body.get("code").and_then(Value::as_i64).unwrap_or(500),
                message,
                details,
            });
        }

        None
    }

    /// 498 (invalid token) or 499 (token required)
    pub fn is_invalid_token(&self) -> bool {
        matches!(self, Error::Api { code: 498 | 499, .. })
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Result type alias for arcrest
pub type Result<T> = std::result::Result<T, Error>;
