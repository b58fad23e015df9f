//! OAuth 2.0 types and structures
//!
//! Defines the persisted token record, the client credential pair, and the
//! raw provider response the token exchanger normalizes.

use std::fmt;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use mailauth_domain::constants::{DEFAULT_EXPIRES_IN_SECS, DEFAULT_TOKEN_TYPE};
use mailauth_domain::{AuthError, AuthResult};
use serde::{Deserialize, Serialize};

/// OAuth client identifier/secret pair.
///
/// Loaded fresh on every invocation and never persisted by anything other
/// than the credential resolver.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// OAuth application (client) id.
    pub client_id: String,
    /// Client secret sent with every token request.
    pub client_secret: String,
}

impl Credentials {
    /// Pair from any string-like values.
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self { client_id: client_id.into(), client_secret: client_secret.into() }
    }

    /// Both fields present and non-blank.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Persisted OAuth token record.
///
/// `expires_at` is an absolute instant computed when the provider response
/// is received and serialized as milliseconds since the Unix epoch. Records
/// are replaced wholesale on refresh, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Bearer token for API calls.
    pub access_token: String,

    /// May be empty when the provider never issued one.
    pub refresh_token: String,

    /// Absolute expiry, persisted as epoch milliseconds.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,

    /// Granted scopes (space-separated)
    pub scope: String,

    /// Usually `Bearer`.
    pub token_type: String,
}

impl TokenRecord {
    /// Build a record from a successful provider response.
    ///
    /// `expires_at` is `now + expires_in` (3600 s when omitted), truncated to
    /// millisecond precision so it survives a round-trip through the token
    /// file unchanged.
    ///
    /// # Errors
    /// `TokenExchangeFailed { error: "invalid_response" }` when `expires_in`
    /// is negative or does not yield a representable instant.
    pub fn from_grant(
        grant: TokenGrant,
        requested_scope: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<Self> {
        let expires_in = grant.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let expires_at = (expires_in >= 0)
            .then(|| Duration::try_seconds(expires_in))
            .flatten()
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| AuthError::TokenExchangeFailed {
                error: "invalid_response".to_string(),
                description: Some(format!("expires_in out of range: {expires_in}")),
            })?;

        Ok(Self {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token.unwrap_or_default(),
            expires_at: expires_at.trunc_subsecs(3),
            scope: grant.scope.unwrap_or_else(|| requested_scope.to_string()),
            token_type: grant.token_type.unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
        })
    }

    /// Successor record after a refresh.
    ///
    /// Providers may or may not rotate the refresh token; when the refresh
    /// response omits it the previous one carries over.
    #[must_use]
    pub fn superseded_by(&self, mut next: Self) -> Self {
        if next.refresh_token.is_empty() {
            next.refresh_token.clone_from(&self.refresh_token);
        }
        next
    }

    /// Whether the token expires within `buffer` of `now` (or already has).
    ///
    /// A buffer reaching past the representable range counts as "within".
    #[must_use]
    pub fn expires_within(&self, buffer: Duration, now: DateTime<Utc>) -> bool {
        match now.checked_add_signed(buffer) {
            Some(deadline) => deadline >= self.expires_at,
            None => true,
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Seconds until expiry; negative once expired.
    #[must_use]
    pub fn seconds_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds()
    }

    #[must_use]
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }
}

/// Successful grant extracted from a token endpoint response.
#[derive(Debug, Clone, Default)]
pub struct TokenGrant {
    pub access_token: String,
    /// Absent when the provider keeps the previous refresh token valid.
    pub refresh_token: Option<String>,
    /// Lifetime in seconds from the time of issue.
    pub expires_in: Option<i64>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

/// Raw token endpoint body.
///
/// Providers report failures in-band (sometimes with HTTP 200), so every
/// field is optional and `error` is checked before anything else.
#[derive(Debug, Default, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}
