//! Base HTTP operations shared by every resource wrapper
//!
//! # Features
//!
//! - **ArcGIS conventions**: `f=json` defaults, token and referer injection,
//!   error envelope detection
//! - **Payloads**: query strings, form posts, multipart uploads, file downloads
//! - **Automatic Retries**: Configurable retry logic with backoff
//! - **Rate Limiting**: Token bucket rate limiter using governor

mod client;
mod params;
mod rate_limit;
mod upload;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use params::{to_param_string, Params};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use upload::{content_type_for, UploadFile};

#[cfg(test)]
mod tests;
