//! Mail API client
//!
//! Every request asks the [`AccessTokenProvider`] for a token first, so an
//! expiring token is refreshed before the call rather than after a 401.

use std::path::Path;
use std::sync::Arc;

use mailauth_domain::MailSettings;
use reqwest::{Response, StatusCode};
use tracing::{debug, info, instrument};

use super::auth::AccessTokenProvider;
use super::errors::MailError;
use super::types::{ErrorEnvelope, MessagePage, MessageSummary, MESSAGE_SELECT};
use crate::http::{HttpClient, RetryPolicy};

/// Upper bound the API accepts for `$top`.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Client for the mailbox endpoints.
pub struct MailClient {
    http: HttpClient,
    base_url: String,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl MailClient {
    /// # Errors
    /// Returns `MailError::Network` if the HTTP client cannot be built.
    pub fn new(
        settings: &MailSettings,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, MailError> {
        let http = HttpClient::new(settings.timeout(), RetryPolicy::default())?;

        Ok(Self::with_http_client(http, &settings.base_url, tokens))
    }

    /// Client over an existing transport, for custom retry budgets.
    pub fn with_http_client(
        http: HttpClient,
        base_url: &str,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_string(), tokens }
    }

    /// API root without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Newest messages first, at most `top` of them.
    ///
    /// # Errors
    /// `Auth` when no token is available or the API rejects it, `Client` /
    /// `Server` for other error statuses, `InvalidResponse` for a body that
    /// is not a message collection.
    #[instrument(skip(self))]
    pub async fn list_messages(&self, top: u32) -> Result<Vec<MessageSummary>, MailError> {
        let top = top.clamp(1, MAX_PAGE_SIZE);
        let url = format!("{}/me/messages", self.base_url);
        let token = self.tokens.access_token().await?;

        let top = top.to_string();
        let query = [
            ("$top", top.as_str()),
            ("$select", MESSAGE_SELECT),
            ("$orderby", "receivedDateTime desc"),
        ];

        let response = check_status(self.http.get(&url, &token, &query).await?).await?;
        let page: MessagePage = response
            .json()
            .await
            .map_err(|err| MailError::InvalidResponse(err.to_string()))?;

        debug!(count = page.value.len(), "listed messages");
        Ok(page.value)
    }

    /// Save the raw MIME content of one message to `destination`.
    ///
    /// Returns the number of bytes written. Nothing is written when the
    /// request fails.
    ///
    /// # Errors
    /// Same statuses as [`MailClient::list_messages`], plus `Io` when the
    /// file cannot be written.
    #[instrument(skip(self, destination), fields(destination = %destination.display()))]
    pub async fn download_message(
        &self,
        message_id: &str,
        destination: &Path,
    ) -> Result<u64, MailError> {
        let url =
            format!("{}/me/messages/{}/$value", self.base_url, urlencoding::encode(message_id));
        let token = self.tokens.access_token().await?;

        let response = check_status(self.http.get(&url, &token, &[]).await?).await?;
        let body = response.bytes().await.map_err(|err| MailError::Network(err.to_string()))?;

        tokio::fs::write(destination, &body).await?;

        let written = body.len() as u64;
        info!(bytes = written, "message saved");
        Ok(written)
    }
}

async fn check_status(response: Response) -> Result<Response, MailError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(map_status_error(status, &body))
}

fn map_status_error(status: StatusCode, body: &str) -> MailError {
    let message = error_message(body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    let code = status.as_u16();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        MailError::Auth(message)
    } else if status.is_client_error() {
        MailError::Client { status: code, message }
    } else {
        MailError::Server { status: code, message }
    }
}

/// `code: message` from an API error envelope, if the body is one.
fn error_message(body: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    match (envelope.error.code, envelope.error.message) {
        (Some(code), Some(message)) => Some(format!("{code}: {message}")),
        (Some(text), None) | (None, Some(text)) => Some(text),
        (None, None) => None,
    }
}
