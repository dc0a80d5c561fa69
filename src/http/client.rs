//! The one HTTP client behind every resource wrapper
//!
//! Requests get `f=json`, the security handler's token and referer, an
//! optional token bucket and retries. ArcGIS reports most failures as an
//! error envelope inside a 200 response; those surface as `Error::Api`.

use super::params::Params;
use super::rate_limit::{RateLimiter, RateLimiterConfig};
use super::upload::UploadFile;
use crate::auth::{Authenticator, SecurityConfig};
use crate::error::{Error, Result};
use crate::types::BackoffType;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Transport settings shared by all requests of a client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Prefix for request paths that are not absolute URLs
    pub base_url: Option<String>,
    pub timeout: Duration,
    /// Extra attempts after a transient failure
    pub max_retries: u32,
    pub initial_backoff: Duration,
    /// Upper bound of any single backoff delay
    pub max_backoff: Duration,
    pub backoff_type: BackoffType,
    /// Client-side throttling, off when `None`
    pub rate_limit: Option<RateLimiterConfig>,
    /// Headers added to every request
    pub default_headers: HashMap<String, String>,
    pub user_agent: String,
    /// HTTP proxy (e.g. "http://proxy.local:8080")
    pub proxy: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(60),
            max_retries: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(60),
            backoff_type: BackoffType::Exponential,
            rate_limit: None,
            default_headers: HashMap::new(),
            user_agent: format!("arcrest/{}", env!("CARGO_PKG_VERSION")),
            proxy: None,
        }
    }
}

impl HttpClientConfig {
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Fluent construction of [`HttpClientConfig`]
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Backoff strategy with its first and largest delay
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.backoff_type = backoff_type;
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self
    }

    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Send requests unthrottled
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Route requests through a proxy
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy.into());
        self
    }

    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Per-request parameters, body and overrides
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Query string parameters
    pub query: Params,
    /// Form body parameters (text parts for multipart requests)
    pub form: Option<Params>,
    /// Files sent as multipart parts
    pub files: Vec<UploadFile>,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Override timeout for this request
    pub timeout: Option<Duration>,
    /// Override max retries for this request
    pub max_retries: Option<u32>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one query string parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.set(key, value);
        self
    }

    #[must_use]
    pub fn query_params(mut self, params: Params) -> Self {
        self.query = params;
        self
    }

    /// Send parameters as a form body
    #[must_use]
    pub fn form(mut self, params: Params) -> Self {
        self.form = Some(params);
        self
    }

    /// Attach a file part (turns the request into multipart)
    #[must_use]
    pub fn file(mut self, file: UploadFile) -> Self {
        self.files.push(file);
        self
    }

    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the client's retry count
    #[must_use]
    pub fn retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Default the response format to JSON wherever parameters are sent
    fn with_json_format(mut self) -> Self {
        match self.form.as_mut() {
            Some(form) => {
                form.set_default("f", "json");
            }
            None => {
                self.query.set_default("f", "json");
            }
        }
        self
    }
}

/// HTTP client shared by every ArcGIS resource wrapper
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    authenticator: Option<Authenticator>,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create an anonymous client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create an anonymous client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent);

        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
        }

        let client = builder.build()?;
        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            authenticator: None,
            rate_limiter,
        })
    }

    /// Create a client that authenticates with the given security handler
    pub fn with_security(config: HttpClientConfig, security: SecurityConfig) -> Result<Self> {
        let mut client = Self::with_config(config)?;
        client.set_security(security);
        Ok(client)
    }

    /// Replace the security handler
    pub fn set_security(&mut self, security: SecurityConfig) {
        self.authenticator = match security {
            SecurityConfig::None => None,
            security => Some(Authenticator::with_client(security, self.client.clone())),
        };
    }

    /// The security handler, if any
    pub fn authenticator(&self) -> Option<&Authenticator> {
        self.authenticator.as_ref()
    }

    /// Whether a security handler is installed
    pub fn is_authenticated(&self) -> bool {
        self.authenticator.is_some()
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// GET a JSON resource
    pub async fn get_json(&self, url: &str, params: Params) -> Result<Value> {
        self.send_json(Method::GET, url, RequestConfig::new().query_params(params))
            .await
    }

    /// POST a form and parse the JSON response
    pub async fn post_json(&self, url: &str, params: Params) -> Result<Value> {
        self.send_json(Method::POST, url, RequestConfig::new().form(params))
            .await
    }

    /// POST a multipart request with file parts and parse the JSON response
    pub async fn post_multipart(
        &self,
        url: &str,
        params: Params,
        files: Vec<UploadFile>,
    ) -> Result<Value> {
        let config = files
            .into_iter()
            .fold(RequestConfig::new().form(params), RequestConfig::file);
        self.send_json(Method::POST, url, config).await
    }

    /// Make a request and deserialize the JSON response
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        config: RequestConfig,
    ) -> Result<T> {
        let body = self.send_json(method, url, config).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Make a request expecting a JSON document
    ///
    /// An ArcGIS error envelope becomes `Error::Api`. When the server reports
    /// an invalid token and the handler can generate a new one, the request
    /// is repeated once with a fresh token.
    pub async fn send_json(
        &self,
        method: Method,
        url: &str,
        config: RequestConfig,
    ) -> Result<Value> {
        let config = config.with_json_format();

        match self.fetch_json(method.clone(), url, config.clone()).await {
            Err(e) if e.is_invalid_token() => match &self.authenticator {
                Some(auth) if auth.can_regenerate() => {
                    warn!("Token rejected by {}, generating a new one", url);
                    auth.clear_cache().await;
                    self.fetch_json(method, url, config).await
                }
                _ => Err(e),
            },
            other => other,
        }
    }

    async fn fetch_json(&self, method: Method, url: &str, config: RequestConfig) -> Result<Value> {
        let full_url = self.build_url(url);
        let response = self.request(method, &full_url, config).await?;
        let text = response.text().await?;
        parse_json_body(&full_url, &text)
    }

    /// Download a file resource into `dir`
    ///
    /// The saved file is named after `file_name`, the `Content-Disposition`
    /// header, or the last URL segment, in that order.
    pub async fn download(
        &self,
        url: &str,
        params: Params,
        dir: &Path,
        file_name: Option<&str>,
    ) -> Result<PathBuf> {
        let full_url = self.build_url(url);
        let response = self
            .request(
                Method::GET,
                &full_url,
                RequestConfig::new().query_params(params),
            )
            .await?;

        let headers = response.headers().clone();
        let bytes = response.bytes().await?;

        if is_json_response(&headers) {
            if let Ok(body) = serde_json::from_slice::<Value>(&bytes) {
                if let Some(err) = Error::from_envelope(&body) {
                    return Err(err);
                }
            }
        }

        let name = file_name
            .map(str::to_string)
            .or_else(|| disposition_file_name(&headers))
            .unwrap_or_else(|| last_segment(&full_url));
        let name = safe_file_name(&name).ok_or_else(|| {
            Error::invalid_argument("file_name", format!("'{name}' is not a file name"))
        })?;

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(name);
        tokio::fs::write(&path, &bytes).await?;
        debug!("Downloaded {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }

    /// Send a request, retrying transient failures
    ///
    /// A 429 waits for `Retry-After`; gateway errors, timeouts and refused
    /// connections back off per the configured strategy. Other HTTP errors
    /// fail at once, as an `Error::Api` when the body is an error envelope.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        config: RequestConfig,
    ) -> Result<Response> {
        let max_retries = config.max_retries.unwrap_or(self.config.max_retries);
        let timeout = config.timeout.unwrap_or(self.config.timeout);

        for attempt in 0..=max_retries {
            if let Some(limiter) = &self.rate_limiter {
                limiter.wait().await;
            }

            let can_retry = attempt < max_retries;
            let req = self.build_request(&method, url, &config, timeout).await?;
            let (delay, reason) = match req.send().await {
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let retry_after = extract_retry_after(&response);
                    if !can_retry {
                        return Err(Error::RateLimited {
                            retry_after_seconds: retry_after,
                        });
                    }
                    (Duration::from_secs(retry_after), "rate limited".to_string())
                }
                Ok(response) if can_retry && is_retryable_status(response.status()) => (
                    self.calculate_backoff(attempt),
                    format!("status {}", response.status().as_u16()),
                ),
                Ok(response) => return error_for_status(response).await,
                Err(e) if e.is_timeout() => {
                    if !can_retry {
                        return Err(Error::Timeout {
                            timeout_ms: timeout.as_millis() as u64,
                        });
                    }
                    (self.calculate_backoff(attempt), "timed out".to_string())
                }
                Err(e) if can_retry && e.is_connect() => {
                    (self.calculate_backoff(attempt), e.to_string())
                }
                Err(e) => return Err(Error::Http(e)),
            };

            warn!(
                "{} {} {}, attempt {}/{}, retrying in {:?}",
                method,
                url,
                reason,
                attempt + 1,
                max_retries + 1,
                delay
            );
            tokio::time::sleep(delay).await;
        }

        Err(Error::MaxRetriesExceeded { max_retries })
    }

    /// Assemble one attempt of a request
    async fn build_request(
        &self,
        method: &Method,
        url: &str,
        config: &RequestConfig,
        timeout: Duration,
    ) -> Result<RequestBuilder> {
        let mut req = self.client.request(method.clone(), url).timeout(timeout);

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }
        for (key, value) in &config.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if !config.query.is_empty() {
            req = req.query(&config.query.as_pairs());
        }

        if !config.files.is_empty() {
            let mut form = reqwest::multipart::Form::new();
            if let Some(params) = &config.form {
                for (key, value) in params.iter() {
                    form = form.text(key.to_string(), value.to_string());
                }
            }
            for file in &config.files {
                form = form.part(file.field.clone(), file.to_part()?);
            }
            req = req.multipart(form);
        } else if let Some(params) = &config.form {
            req = req.form(&params.as_pairs());
        }

        if let Some(ref auth) = self.authenticator {
            req = auth.apply(req).await?;
        }

        Ok(req)
    }

    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Absolute URLs pass through; anything else hangs off `base_url`
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        match &self.config.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                let path = path.trim_start_matches('/');
                format!("{base}/{path}")
            }
            None => path.to_string(),
        }
    }

    /// Delay before retry number `attempt + 1`
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = match self.config.backoff_type {
            BackoffType::Constant => self.config.initial_backoff,
            BackoffType::Linear => self.config.initial_backoff * (attempt + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.config.initial_backoff * factor
            }
        };

        std::cmp::min(delay, self.config.max_backoff)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_authenticator", &self.authenticator.is_some())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Parse a response body and surface the ArcGIS error envelope
pub(crate) fn parse_json_body(url: &str, text: &str) -> Result<Value> {
    let body: Value = serde_json::from_str(text).map_err(|e| {
        let preview: String = text.chars().take(200).collect();
        Error::resource(url, format!("response is not JSON ({e}): {preview}"))
    })?;

    match Error::from_envelope(&body) {
        Some(err) => Err(err),
        None => Ok(body),
    }
}

/// Pass successful responses through; turn error statuses into errors
async fn error_for_status(response: Response) -> Result<Response> {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        debug!("{} {}", status.as_u16(), response.url());
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    // some servers pair the error envelope with a real status code
    let envelope = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| Error::from_envelope(&value));
    Err(envelope.unwrap_or_else(|| Error::http_status(status.as_u16(), body)))
}

/// Statuses worth another attempt (Cloudflare 52x included)
fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status.as_u16(),
        429 | 500 | 502 | 503 | 504 | 520 | 521 | 522 | 523 | 524
    )
}

/// `Retry-After` seconds, one minute when absent
fn extract_retry_after(response: &Response) -> u64 {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(60)
}

fn is_json_response(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("json") || ct.starts_with("text/plain"))
}

/// File name from a `Content-Disposition: attachment; filename="x"` header
pub(crate) fn disposition_file_name(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    value.split(';').map(str::trim).find_map(|part| {
        part.strip_prefix("filename=")
            .map(|name| name.trim_matches('"').to_string())
            .filter(|name| !name.is_empty())
    })
}

/// Final path component of a server-supplied name, so saves stay inside
/// the target directory
pub(crate) fn safe_file_name(name: &str) -> Option<String> {
    let name = name.trim().replace('\\', "/");
    let base = Path::new(&name).file_name()?.to_str()?;
    match base {
        "" | "." | ".." => None,
        base => Some(base.to_string()),
    }
}

fn last_segment(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("download")
        .to_string()
}
