// src/fetch.rs
//! Resilient fetch client: bounded retries with *linear* backoff.
//!
//! Attempt `n` that fails with a transport error, HTTP 429 or a 5xx is
//! followed by a sleep of `initial_backoff * n`. Other 4xx answers are not
//! transient and fail at once. Total blocking per call is bounded by
//! `max_attempts * (timeout + backoff)`.

use metrics::counter;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{target}: rate limited (HTTP 429) after {attempts} attempt(s)")]
    RateLimited { target: String, attempts: u32 },

    #[error("{target}: HTTP {status} after {attempts} attempt(s)")]
    Status {
        target: String,
        status: StatusCode,
        attempts: u32,
    },

    #[error("{target}: no response after {attempts} attempt(s): {source}")]
    Transport {
        target: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("{target}: could not decode response: {reason}")]
    Decode { target: String, reason: String },
}

impl FetchError {
    pub fn target(&self) -> &str {
        match self {
            FetchError::RateLimited { target, .. }
            | FetchError::Status { target, .. }
            | FetchError::Transport { target, .. }
            | FetchError::Decode { target, .. } => target,
        }
    }

    /// HTTP status of the last answer, when there was one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::RateLimited { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Transport { .. } | FetchError::Decode { .. } => None,
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    1_000
}
fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Per-attempt timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RetryPolicy {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Sleep after failed attempt `attempt` (1-based).
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        self.initial_backoff() * attempt
    }

    /// Upper bound on wall-clock time spent in one fetch.
    pub fn budget(&self) -> Duration {
        let attempts = self.max_attempts.max(1);
        let sleeps: Duration = (1..attempts).map(|a| self.backoff_after(a)).sum();
        self.timeout() * attempts + sleeps
    }

    pub fn sanitized(mut self) -> Self {
        self.max_attempts = self.max_attempts.max(1);
        self.timeout_secs = self.timeout_secs.max(1);
        self
    }
}

enum Failure {
    RateLimited,
    Status(StatusCode),
    Transport(reqwest::Error),
}

/// Drive `send` until it yields a success status or the attempts run out.
///
/// `send` is called once per attempt and must build a fresh request each
/// time. `target` only labels errors, logs and metrics.
pub async fn with_retry<F, Fut>(
    target: &str,
    policy: &RetryPolicy,
    mut send: F,
) -> Result<Response, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = reqwest::Result<Response>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let failure = match send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return Ok(resp);
                }
                if status == StatusCode::TOO_MANY_REQUESTS {
                    Failure::RateLimited
                } else if status.is_server_error() {
                    Failure::Status(status)
                } else {
                    return Err(FetchError::Status {
                        target: target.to_string(),
                        status,
                        attempts: attempt,
                    });
                }
            }
            Err(e) => Failure::Transport(e),
        };

        if attempt >= max_attempts {
            return Err(match failure {
                Failure::RateLimited => FetchError::RateLimited {
                    target: target.to_string(),
                    attempts: attempt,
                },
                Failure::Status(status) => FetchError::Status {
                    target: target.to_string(),
                    status,
                    attempts: attempt,
                },
                Failure::Transport(source) => FetchError::Transport {
                    target: target.to_string(),
                    attempts: attempt,
                    source,
                },
            });
        }

        let wait = policy.backoff_after(attempt);
        match &failure {
            Failure::RateLimited => {
                tracing::warn!(target: "fetch", upstream = %target, attempt, wait_ms = wait.as_millis() as u64, "rate limited, backing off")
            }
            Failure::Status(status) => {
                tracing::warn!(target: "fetch", upstream = %target, attempt, %status, wait_ms = wait.as_millis() as u64, "upstream error, retrying")
            }
            Failure::Transport(e) => {
                tracing::warn!(target: "fetch", upstream = %target, attempt, error = %e, wait_ms = wait.as_millis() as u64, "request failed, retrying")
            }
        }
        counter!("fetch_retries_total", "target" => target.to_string()).increment(1);
        tokio::time::sleep(wait).await;
    }
}

/// `reqwest::Client` plus the retry policy, shared by all upstream adapters.
#[derive(Clone)]
pub struct FetchClient {
    http: Client,
    policy: RetryPolicy,
}

impl FetchClient {
    pub fn new(policy: RetryPolicy) -> anyhow::Result<Self> {
        let policy = policy.sanitized();
        let http = Client::builder()
            .user_agent(concat!("market-pulse-bot/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(policy.timeout())
            .build()?;
        Ok(Self { http, policy })
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url` with retries. `target` names the upstream in errors and logs.
    pub async fn get(&self, target: &str, url: &str) -> Result<Response, FetchError> {
        with_retry(target, &self.policy, || self.http.get(url).send()).await
    }

    pub async fn get_text(&self, target: &str, url: &str) -> Result<String, FetchError> {
        let resp = self.get(target, url).await?;
        resp.text().await.map_err(|e| FetchError::Decode {
            target: target.to_string(),
            reason: e.to_string(),
        })
    }

    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        target: &str,
        url: &str,
    ) -> Result<T, FetchError> {
        let body = self.get_text(target, url).await?;
        serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            target: target.to_string(),
            reason: e.to_string(),
        })
    }
}
