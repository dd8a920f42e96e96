//! HTTP client for the GitHub API.
//!
//! Wraps a `reqwest` client with the headers GitHub expects, reads rate limit
//! headers, and classifies every response before the retry loop decides what
//! to do with it.

use crate::auth::Bearer;
use crate::config::ApiConfig;
use crate::error::{ConfigError, DataSource, FetchError, FetchErrorKind};
use crate::retry::RetryPolicy;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use time::OffsetDateTime;
use tracing::{debug, warn};
use url::Url;

/// Media type for GitHub REST and GraphQL JSON.
pub const GITHUB_JSON: &str = "application/vnd.github+json";

/// Media type for SCIM responses.
pub const SCIM_JSON: &str = "application/scim+json";

/// Pinned REST API version.
pub const API_VERSION: &str = "2022-11-28";

/// Wait applied to a rate-limited response that carries no hint.
const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Rate limit information from GitHub API.
///
/// GitHub provides rate limit information in response headers:
/// - `X-RateLimit-Limit`: Maximum number of requests per hour
/// - `X-RateLimit-Remaining`: Number of requests remaining
/// - `X-RateLimit-Reset`: Unix timestamp when the rate limit resets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Maximum number of requests allowed per hour.
    pub limit: u32,
    /// Number of requests remaining in the current window.
    pub remaining: u32,
    /// Unix timestamp when the rate limit resets.
    pub reset_at: u64,
}

impl RateLimitInfo {
    /// Reads rate limit headers. Returns `None` unless all three are present.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        Some(Self {
            limit: header_number(headers, "x-ratelimit-limit")?,
            remaining: header_number(headers, "x-ratelimit-remaining")?,
            reset_at: header_number(headers, "x-ratelimit-reset")?,
        })
    }

    /// Checks if we're approaching the rate limit.
    ///
    /// Returns true if remaining requests are less than 10% of the limit.
    pub fn is_approaching_limit(&self) -> bool {
        let threshold = self.limit / 10;
        self.remaining < threshold
    }

    /// Time until the rate limit resets, relative to `now` (Unix seconds).
    pub fn time_until_reset(&self, now: u64) -> Duration {
        Duration::from_secs(self.reset_at.saturating_sub(now))
    }
}

/// How a response should be treated by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 2xx.
    Success,
    /// Explicit rate limit signal; retry after `wait`.
    RateLimited {
        /// Delay suggested by GitHub.
        wait: Duration,
    },
    /// Any other 4xx or 5xx; retry with backoff.
    Transient {
        /// HTTP status code.
        status: u16,
    },
    /// Informational or redirect status that reqwest did not resolve.
    Unexpected {
        /// HTTP status code.
        status: u16,
    },
}

impl ResponseClass {
    /// Classifies a response from its status and headers.
    ///
    /// Rate limiting is a 429, or a 403 that either reports zero remaining
    /// requests or carries `Retry-After` (secondary rate limits). The wait
    /// comes from [`ResponseClass::rate_limit_wait`].
    pub fn classify(status: StatusCode, headers: &HeaderMap, now: u64) -> Self {
        if status.is_success() {
            return ResponseClass::Success;
        }

        let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
            || (status == StatusCode::FORBIDDEN
                && (remaining_exhausted(headers) || headers.contains_key("retry-after")));

        if rate_limited {
            return ResponseClass::RateLimited {
                wait: Self::rate_limit_wait(headers, now),
            };
        }

        if status.is_client_error() || status.is_server_error() {
            ResponseClass::Transient {
                status: status.as_u16(),
            }
        } else {
            ResponseClass::Unexpected {
                status: status.as_u16(),
            }
        }
    }

    /// Wait suggested by a rate-limited response.
    ///
    /// `Retry-After` when present, otherwise the time until
    /// `X-RateLimit-Reset` if no requests remain, otherwise one minute.
    pub fn rate_limit_wait(headers: &HeaderMap, now: u64) -> Duration {
        match (
            header_number::<u64>(headers, "retry-after"),
            header_number::<u64>(headers, "x-ratelimit-reset"),
        ) {
            (Some(seconds), _) => Duration::from_secs(seconds),
            (None, Some(reset_at)) if remaining_exhausted(headers) => {
                Duration::from_secs(reset_at.saturating_sub(now))
            }
            _ => DEFAULT_RATE_LIMIT_WAIT,
        }
    }
}

fn remaining_exhausted(headers: &HeaderMap) -> bool {
    header_number::<u32>(headers, "x-ratelimit-remaining") == Some(0)
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
}

/// GitHub API client.
///
/// Cheap to clone; clones share the connection pool but no mutable state.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http_client: reqwest::Client,
    api: ApiConfig,
}

impl GitHubClient {
    /// Creates a client for the given API settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api: ApiConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&api.user_agent)
                .map_err(|e| ConfigError::HttpClient(format!("invalid user agent: {}", e)))?,
        );
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(api.request_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { http_client, api })
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// API settings in use.
    pub fn api(&self) -> &ApiConfig {
        &self.api
    }

    /// REST base URL.
    pub fn api_url(&self) -> &Url {
        &self.api.api_url
    }

    /// Items requested per page.
    pub fn page_size(&self) -> u32 {
        self.api.page_size
    }

    fn retry(&self) -> &RetryPolicy {
        &self.api.retry
    }

    /// Sends a request built by `build` as `token`, retrying per the retry
    /// policy, and decodes the successful body.
    ///
    /// `build` is called once per attempt, and the token's expiry is checked
    /// before every send. `body_rate_limited` inspects a decoded 2xx body for
    /// in-band rate limiting (GraphQL answers 200 with a `RATE_LIMITED`
    /// error); such a body is retried like a 429.
    pub async fn execute<T, F, R>(
        &self,
        data_source: DataSource,
        token: &dyn Bearer,
        build: F,
        body_rate_limited: R,
    ) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
        R: Fn(&T) -> bool,
    {
        let policy = self.retry();
        let fail = |kind: FetchErrorKind| FetchError::new(data_source, kind);
        let mut failures = 0u32;
        let mut rate_limited = 0u32;

        loop {
            if token.is_expired_at(OffsetDateTime::now_utc()) {
                let expired_at = token
                    .expires_at()
                    .map(|at| at.to_string())
                    .unwrap_or_default();
                warn!("{} request not sent: token expired at {}", data_source, expired_at);
                return Err(fail(FetchErrorKind::TokenExpired(expired_at)));
            }

            let response = match build().bearer_auth(token.secret()).send().await {
                Ok(response) => response,
                Err(error) => {
                    failures += 1;
                    let timed_out = error.is_timeout();
                    if failures >= policy.max_attempts {
                        warn!(
                            "{} request failed after {} attempts: {}",
                            data_source, failures, error
                        );
                        let kind = if timed_out {
                            FetchErrorKind::Timeout
                        } else {
                            FetchErrorKind::ExhaustedRetries {
                                attempts: failures,
                                last_status: None,
                            }
                        };
                        return Err(fail(kind));
                    }

                    let delay = policy.backoff_delay(failures);
                    warn!(
                        "{} request failed (attempt {}): {}. Retrying in {:.1}s...",
                        data_source,
                        failures,
                        error,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            let now = unix_now();
            if let Some(info) = RateLimitInfo::from_headers(response.headers()) {
                if info.is_approaching_limit() {
                    warn!(
                        "GitHub API rate limit low: {} of {} requests left, resets in {}s",
                        info.remaining,
                        info.limit,
                        info.time_until_reset(now).as_secs()
                    );
                }
            }

            let wait = match ResponseClass::classify(response.status(), response.headers(), now) {
                ResponseClass::Success => {
                    let status = response.status();
                    let wait = ResponseClass::rate_limit_wait(response.headers(), now);
                    let body: T = response.json().await.map_err(|e| {
                        if e.is_timeout() {
                            fail(FetchErrorKind::Timeout)
                        } else {
                            fail(FetchErrorKind::InvalidResponse(e.to_string()))
                        }
                    })?;

                    if !body_rate_limited(&body) {
                        debug!("{} request succeeded with {}", data_source, status);
                        return Ok(body);
                    }
                    wait
                }
                ResponseClass::RateLimited { wait } => wait,
                ResponseClass::Transient { status } => {
                    failures += 1;
                    if failures >= policy.max_attempts {
                        let body = response.text().await.unwrap_or_default();
                        warn!(
                            "{} request failed after {} attempts with HTTP {}: {}",
                            data_source, failures, status, body
                        );
                        return Err(fail(FetchErrorKind::ExhaustedRetries {
                            attempts: failures,
                            last_status: Some(status),
                        }));
                    }

                    let delay = policy.backoff_delay(failures);
                    warn!(
                        "{} request failed with HTTP {} (attempt {}). Retrying in {:.1}s...",
                        data_source,
                        status,
                        failures,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                ResponseClass::Unexpected { status } => {
                    return Err(fail(FetchErrorKind::HttpFailure { status }));
                }
            };

            rate_limited += 1;
            if rate_limited >= policy.max_rate_limit_attempts {
                warn!(
                    "{} still rate limited after {} attempts",
                    data_source, rate_limited
                );
                return Err(fail(FetchErrorKind::RateLimited {
                    attempts: rate_limited,
                }));
            }

            let delay = policy.rate_limit_delay(wait);
            warn!(
                "{} request rate limited (attempt {}). Waiting {:.1}s...",
                data_source,
                rate_limited,
                delay.as_secs_f64()
            );
            tokio::time::sleep(delay).await;
        }
    }
}
