//! Client-side request throttling
//!
//! ArcGIS Online enforces per-organization request quotas. A governor
//! token bucket keeps bulk jobs (chunked edits, paged queries) under them.

use governor::{DefaultDirectRateLimiter, Quota};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Requests allowed per second, with a burst allowance
///
/// ```yaml
/// rate_limit:
///   requests_per_second: 10
///   burst_size: 20
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    pub requests_per_second: u32,
    /// Requests that may go out back to back before throttling starts
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

fn default_burst() -> u32 {
    5
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 5,
            burst_size: default_burst(),
        }
    }
}

impl RateLimiterConfig {
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
        }
    }
}

/// Shared token bucket; clones draw from the same quota
#[derive(Clone)]
pub struct RateLimiter {
    bucket: Arc<DefaultDirectRateLimiter>,
}

impl RateLimiter {
    /// Zero rates and bursts are treated as one.
    pub fn new(config: &RateLimiterConfig) -> Self {
        let at_least_one = |n: u32| NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_second(at_least_one(config.requests_per_second))
            .allow_burst(at_least_one(config.burst_size));

        Self {
            bucket: Arc::new(DefaultDirectRateLimiter::direct(quota)),
        }
    }

    /// Block until the bucket has a token
    pub async fn wait(&self) {
        self.bucket.until_ready().await;
    }

    /// Take a token if one is available right now
    pub fn try_acquire(&self) -> bool {
        self.bucket.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish()
    }
}
