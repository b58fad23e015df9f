//! Error types used throughout the application

use std::time::Duration;

use thiserror::Error;

/// Failure taxonomy for the authentication subsystem.
///
/// Every public operation in `mailauth-common::auth` returns this type so that
/// callers (CLI, mail client) can decide between "re-run login" and "retry
/// later" without inspecting strings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Neither the credentials file nor the secret manager yielded a complete
    /// client id/secret pair.
    #[error("Client credentials not found: {0}")]
    CredentialsNotFound(String),

    /// No token record exists in any consulted scope.
    #[error("No stored token found; run the login command first")]
    TokenNotFound,

    /// The provider redirected back with an `error` parameter.
    #[error("Authorization denied by provider: {}", describe(.error, .description.as_deref()))]
    ProviderDenied { error: String, description: Option<String> },

    /// Callback `state` did not match the value sent with the authorization
    /// request.
    #[error("State mismatch in authorization callback (possible CSRF or stale callback)")]
    StateMismatch { expected: String, received: Option<String> },

    /// No terminal callback arrived before the listener deadline.
    #[error("Timed out after {0:?} waiting for the authorization callback")]
    AuthTimeout(Duration),

    /// The token endpoint reported an error in its response body.
    #[error("Token exchange failed: {}", describe(.error, .description.as_deref()))]
    TokenExchangeFailed { error: String, description: Option<String> },

    /// Network or HTTP failure distinct from a provider-reported error.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Token or credentials file could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The callback listener could not be started.
    #[error("Callback listener error: {0}")]
    Listener(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Stable label suitable for structured logging.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::CredentialsNotFound(_) => "credentials_not_found",
            Self::TokenNotFound => "token_not_found",
            Self::ProviderDenied { .. } => "provider_denied",
            Self::StateMismatch { .. } => "state_mismatch",
            Self::AuthTimeout(_) => "auth_timeout",
            Self::TokenExchangeFailed { .. } => "token_exchange_failed",
            Self::Transport(_) => "transport",
            Self::Storage(_) => "storage",
            Self::Listener(_) => "listener",
            Self::Config(_) => "config",
        }
    }

    /// Whether the user has to go through the interactive login again to
    /// recover.
    #[must_use]
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::TokenNotFound
                | Self::ProviderDenied { .. }
                | Self::StateMismatch { .. }
                | Self::AuthTimeout(_)
                | Self::TokenExchangeFailed { .. }
        )
    }
}

fn describe(error: &str, description: Option<&str>) -> String {
    match description {
        Some(desc) if !desc.is_empty() => format!("{error}: {desc}"),
        _ => error.to_string(),
    }
}

/// Result type alias for authentication operations
pub type AuthResult<T> = std::result::Result<T, AuthError>;
