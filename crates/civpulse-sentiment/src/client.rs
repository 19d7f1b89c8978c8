//! Quota-tracking, retrying HTTP client wrapping one external source.
//!
//! Every fetch reserves a slot in the source's [`SourceQuota`] before the
//! network call. Transient failures (connect/timeout errors, 5xx) are retried
//! with capped exponential backoff; once attempts are exhausted the source is
//! reported as [`SentimentError::SourceUnavailable`]. An upstream 429 blocks
//! the quota for the advertised `Retry-After` and fails fast with
//! [`SentimentError::RateLimited`]. Payloads are never cached.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use civpulse_core::RetrySettings;
use reqwest::Client;
use tokio::time::Instant;

use crate::error::SentimentError;
use crate::quota::{SourceQuota, MAX_BLOCK};
use crate::types::Platform;

/// Bounded retry schedule: the wait before retry `n` (1-based) is
/// `base_delay * 2^(n-1)`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per fetch, including the first try.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl From<RetrySettings> for RetryPolicy {
    fn from(settings: RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.backoff_base_ms),
            max_delay: Duration::from_millis(settings.backoff_cap_ms),
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after `failed_attempts` consecutive failures.
    #[must_use]
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(20);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

/// A GET request against a source API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub params: Vec<(String, String)>,
    pub bearer_token: Option<String>,
}

impl FetchRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: Vec::new(),
            bearer_token: None,
        }
    }

    #[must_use]
    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer_token = Some(token.to_string());
        self
    }
}

/// Returns `true` for failures worth another attempt.
///
/// Network-level failures and 5xx responses are transient. Rate limits,
/// other HTTP statuses and unparseable bodies are not: retrying would either
/// burn quota or return the same result.
pub(crate) fn is_transient(err: &SentimentError) -> bool {
    match err {
        SentimentError::Http(e) => {
            e.is_timeout()
                || e.is_connect()
                || e.is_request()
                || e.status().is_some_and(|s| s.is_server_error())
        }
        SentimentError::UnexpectedStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

fn ceil_secs(wait: Duration) -> u64 {
    wait.as_secs() + u64::from(wait.subsec_nanos() > 0)
}

pub struct RateLimitedClient {
    platform: Platform,
    client: Client,
    quota: Mutex<SourceQuota>,
    policy: RetryPolicy,
}

impl RateLimitedClient {
    #[must_use]
    pub fn new(platform: Platform, client: Client, quota: SourceQuota, policy: RetryPolicy) -> Self {
        Self {
            platform,
            client,
            quota: Mutex::new(quota),
            policy,
        }
    }

    /// Creates a client with its own `reqwest::Client` using the given
    /// timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn build(
        platform: Platform,
        timeout_secs: u64,
        user_agent: &str,
        quota: SourceQuota,
        policy: RetryPolicy,
    ) -> Result<Self, SentimentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self::new(platform, client, quota, policy))
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Copy of the current quota state.
    #[must_use]
    pub fn quota(&self) -> SourceQuota {
        self.with_quota(|q| q.clone())
    }

    fn with_quota<T>(&self, f: impl FnOnce(&mut SourceQuota) -> T) -> T {
        let mut guard = self.quota.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    fn acquire(&self) -> Result<(), SentimentError> {
        self.with_quota(|q| q.try_acquire(Instant::now()))
            .map_err(|wait| SentimentError::RateLimited {
                platform: self.platform,
                retry_after_secs: ceil_secs(wait),
            })
    }

    /// Fetch one JSON payload, honouring the quota and retry policy.
    ///
    /// # Errors
    ///
    /// - [`SentimentError::RateLimited`] when the quota is spent or the
    ///   platform answered 429; the caller may retry after the wait.
    /// - [`SentimentError::SourceUnavailable`] for everything else, after
    ///   retries when the failure was transient.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<serde_json::Value, SentimentError> {
        let mut attempts = 0u32;

        loop {
            self.acquire()?;
            attempts += 1;

            let err = match self.send_once(request).await {
                Ok(payload) => return Ok(payload),
                Err(err) => err,
            };
            self.with_quota(SourceQuota::release);

            if matches!(err, SentimentError::RateLimited { .. }) {
                return Err(err);
            }
            if !is_transient(&err) || attempts >= self.policy.max_attempts {
                tracing::warn!(
                    platform = %self.platform,
                    attempts,
                    error = %err,
                    "source fetch failed"
                );
                return Err(SentimentError::SourceUnavailable {
                    platform: self.platform,
                    attempts,
                    reason: err.to_string(),
                });
            }

            let delay = self.policy.delay_for(attempts);
            tracing::warn!(
                platform = %self.platform,
                attempt = attempts,
                max_attempts = self.policy.max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "transient source error, retrying after backoff"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn send_once(&self, request: &FetchRequest) -> Result<serde_json::Value, SentimentError> {
        let mut builder = self
            .client
            .get(&request.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&request.params);
        if let Some(token) = &request.bearer_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let wait = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map_or_else(|| self.with_quota(|q| q.window_duration()), Duration::from_secs)
                .min(MAX_BLOCK);
            self.with_quota(|q| q.block_for(Instant::now(), wait));
            tracing::warn!(
                platform = %self.platform,
                retry_after_secs = wait.as_secs(),
                "platform returned 429, pausing source"
            );
            return Err(SentimentError::RateLimited {
                platform: self.platform,
                retry_after_secs: ceil_secs(wait),
            });
        }

        if !status.is_success() {
            return Err(SentimentError::UnexpectedStatus {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| SentimentError::Deserialize {
            context: format!("{} payload from {}", self.platform, request.url),
            source: e,
        })
    }
}
