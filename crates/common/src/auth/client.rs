//! OAuth 2.0 client implementation with PKCE support
//!
//! Handles the provider-facing half of the flow:
//! - Authorization URL building
//! - Authorization code exchange
//! - Token refresh
//!
//! Token endpoint responses are normalized into [`TokenRecord`]s. Providers
//! may report errors in-band with an HTTP 200, so the body is inspected for
//! an `error` field before the status code is considered.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use mailauth_domain::{AuthError, AuthResult, AuthSettings};
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use super::pkce::PkceParameters;
use super::traits::TokenExchanger;
use super::types::{Credentials, TokenGrant, TokenRecord, TokenResponse};

const HTTP_TIMEOUT_SECS: u64 = 30;

/// Build the browser authorization URL for one attempt.
///
/// Carries `client_id`, `response_type=code`, `redirect_uri`,
/// `response_mode=query`, the scope list, `state`, `code_challenge` and
/// `code_challenge_method=S256`.
#[must_use]
pub fn build_authorization_url(
    settings: &AuthSettings,
    client_id: &str,
    pkce: &PkceParameters,
) -> String {
    let params = [
        ("client_id", client_id.to_string()),
        ("response_type", "code".to_string()),
        ("redirect_uri", settings.redirect_uri()),
        ("response_mode", "query".to_string()),
        ("scope", settings.scope_string()),
        ("state", pkce.state.clone()),
        ("code_challenge", pkce.challenge.clone()),
        ("code_challenge_method", pkce.challenge_method().to_string()),
    ];

    let query_string = params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if settings.authorize_url.contains('?') { '&' } else { '?' };
    format!("{}{separator}{query_string}", settings.authorize_url)
}

/// OAuth 2.0 client for the authorization code + PKCE flow.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    settings: AuthSettings,
    client: Client,
}

impl OAuthClient {
    /// Create a new OAuth client with the given settings
    ///
    /// # Errors
    /// Returns `AuthError::Config` if an endpoint is not a valid URL and
    /// `AuthError::Transport` if the HTTP client cannot be built.
    pub fn new(settings: AuthSettings) -> AuthResult<Self> {
        validate_endpoint(&settings.authorize_url, "authorization")?;
        validate_endpoint(&settings.token_url, "token")?;

        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| AuthError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { settings, client })
    }

    /// Browser authorization URL for one attempt with these settings.
    #[must_use]
    pub fn authorization_url(&self, client_id: &str, pkce: &PkceParameters) -> String {
        build_authorization_url(&self.settings, client_id, pkce)
    }

    /// Get a reference to the auth settings
    #[must_use]
    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    async fn request_token(
        &self,
        grant_type: &'static str,
        form: Vec<(&'static str, String)>,
    ) -> AuthResult<TokenRecord> {
        debug!(grant_type, url = %self.settings.token_url, "requesting token");

        let response = self
            .client
            .post(&self.settings.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::Transport(format!("token request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Transport(format!("failed to read token response: {e}")))?;

        let parsed = serde_json::from_str::<TokenResponse>(&body);

        if let Ok(TokenResponse { error: Some(error), error_description, .. }) = &parsed {
            warn!(grant_type, %status, error = %error, "token endpoint reported an error");
            return Err(AuthError::TokenExchangeFailed {
                error: error.clone(),
                description: error_description.clone(),
            });
        }

        if !status.is_success() {
            return Err(AuthError::Transport(format!("token endpoint returned {status}")));
        }

        let response = parsed.map_err(|e| AuthError::TokenExchangeFailed {
            error: "invalid_response".to_string(),
            description: Some(format!("unparseable token response: {e}")),
        })?;

        let access_token = response.access_token.filter(|t| !t.is_empty()).ok_or_else(|| {
            AuthError::TokenExchangeFailed {
                error: "invalid_response".to_string(),
                description: Some("token response is missing access_token".to_string()),
            }
        })?;

        let grant = TokenGrant {
            access_token,
            refresh_token: response.refresh_token.filter(|t| !t.is_empty()),
            expires_in: response.expires_in,
            scope: response.scope,
            token_type: response.token_type,
        };

        let record = TokenRecord::from_grant(grant, &self.settings.scope_string(), Utc::now())?;
        info!(grant_type, "token endpoint returned a new access token");
        Ok(record)
    }
}

#[async_trait]
impl TokenExchanger for OAuthClient {
    async fn exchange_code(
        &self,
        credentials: &Credentials,
        code: &str,
        verifier: &str,
    ) -> AuthResult<TokenRecord> {
        let form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("client_id", credentials.client_id.clone()),
            ("client_secret", credentials.client_secret.clone()),
            ("code", code.to_string()),
            ("redirect_uri", self.settings.redirect_uri()),
            ("code_verifier", verifier.to_string()),
            ("scope", self.settings.scope_string()),
        ];

        self.request_token("authorization_code", form).await
    }

    async fn refresh(
        &self,
        credentials: &Credentials,
        refresh_token: &str,
    ) -> AuthResult<TokenRecord> {
        if refresh_token.is_empty() {
            return Err(AuthError::TokenExchangeFailed {
                error: "invalid_grant".to_string(),
                description: Some("no refresh token stored".to_string()),
            });
        }

        let form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("client_id", credentials.client_id.clone()),
            ("client_secret", credentials.client_secret.clone()),
            ("refresh_token", refresh_token.to_string()),
            ("scope", self.settings.scope_string()),
        ];

        self.request_token("refresh_token", form).await
    }
}

fn validate_endpoint(endpoint: &str, name: &str) -> AuthResult<()> {
    let url = Url::parse(endpoint)
        .map_err(|e| AuthError::Config(format!("invalid {name} endpoint URL: {e}")))?;

    match url.scheme() {
        "https" => Ok(()),
        "http" if matches!(url.host_str(), Some("localhost" | "127.0.0.1")) => Ok(()),
        other => Err(AuthError::Config(format!(
            "{name} endpoint must use https (got {other}://{})",
            url.host_str().unwrap_or_default()
        ))),
    }
}
