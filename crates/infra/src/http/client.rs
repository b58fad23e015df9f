//! Bearer-authenticated GET transport for the mail API
//!
//! Only reads go through here, so every request is safe to repeat.
//! Throttling (429) and transient 5xx answers are retried after the
//! server's `Retry-After` hint or an exponential backoff; connection
//! failures and timeouts are retried the same way. Whatever the last try
//! returns is handed back for the caller to interpret.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Response};
use thiserror::Error;
use tracing::{debug, warn};

use super::retry::{is_transient, RetryPolicy};

const USER_AGENT: &str = concat!("mailauth/", env!("CARGO_PKG_VERSION"));

/// No response could be obtained.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("failed to build HTTP client: {0}")]
    Build(String),

    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// GET-only client with retry.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    policy: RetryPolicy,
}

impl HttpClient {
    /// # Errors
    /// `HttpError::Build` if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration, policy: RetryPolicy) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;

        let policy = RetryPolicy { max_attempts: policy.max_attempts.max(1), ..policy };
        Ok(Self { client, policy })
    }

    /// Retry budget applied to every request.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// GET `url` with a bearer token and query parameters.
    ///
    /// # Errors
    /// `HttpError::Request` when the last try produced no response at all.
    pub async fn get(
        &self,
        url: &str,
        bearer: &str,
        query: &[(&str, &str)],
    ) -> Result<Response, HttpError> {
        let mut attempt = 1;

        loop {
            let result = self.client.get(url).bearer_auth(bearer).query(query).send().await;
            let last = attempt >= self.policy.max_attempts;

            let delay = match result {
                Ok(response) if last || !is_transient(response.status()) => {
                    debug!(attempt, status = %response.status(), "mail API responded");
                    return Ok(response);
                }
                Ok(response) => {
                    let status = response.status();
                    let delay =
                        self.policy.delay_after(attempt, Some(response.headers()), Utc::now());
                    warn!(attempt, %status, ?delay, "transient mail API status; retrying");
                    delay
                }
                Err(err) if !last && (err.is_connect() || err.is_timeout()) => {
                    let delay = self.policy.delay_after(attempt, None, Utc::now());
                    warn!(attempt, error = %err, ?delay, "mail API unreachable; retrying");
                    delay
                }
                Err(err) => return Err(err.into()),
            };

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }
}
