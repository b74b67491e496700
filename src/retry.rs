// src/retry.rs
//! Retry executor with exponential backoff and transient/permanent error
//! classification. Retry happens *inside* an adapter; falling over to the
//! next adapter is the chain's job, never this module's.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Failure of a single source fetch, classified for retry purposes.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Timeouts, connection resets, rate limits, 5xx. Worth retrying.
    #[error("transient source failure: {0}")]
    Transient(#[source] anyhow::Error),
    /// Malformed queries, other 4xx, unparseable payloads. Retrying is futile.
    #[error("permanent source failure: {0}")]
    Permanent(#[source] anyhow::Error),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        FetchError::Transient(anyhow::anyhow!(msg.into()))
    }

    pub fn permanent(msg: impl Into<String>) -> Self {
        FetchError::Permanent(anyhow::anyhow!(msg.into()))
    }

    /// Classify a reqwest error. Rate limits and server-side errors are
    /// transient; the remaining 4xx family means our request is wrong.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            return FetchError::Transient(err.into());
        }
        if let Some(status) = err.status() {
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS
                || status == reqwest::StatusCode::REQUEST_TIMEOUT
                || status.is_server_error()
            {
                return FetchError::Transient(err.into());
            }
            if status.is_client_error() {
                return FetchError::Permanent(err.into());
            }
        }
        // No status: the request never made it out or the body was cut short.
        FetchError::Transient(err.into())
    }
}

/// Exponential-backoff parameters. Built once per adapter invocation,
/// consumed across attempts, discarded after success or exhaustion.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always >= 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before the retry that follows `attempt` (1-based):
    /// `base_delay * 2^(attempt-1)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    /// The terminal error is surfaced to the caller, never swallowed.
    pub async fn run<T, F, Fut>(&self, source: &str, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        target: "collect",
                        source,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(target: "collect", source, attempt, error = %e, "giving up");
                    return Err(e);
                }
            }
        }
    }
}
