use mailauth_domain::AuthError;
use thiserror::Error;

use crate::http::HttpError;

/// Mail API failure
#[derive(Debug, Error)]
pub enum MailError {
    /// No usable token, or the API rejected it (401/403).
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("request rejected ({status}): {message}")]
    Client { status: u16, message: String },

    #[error("mail service error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MailError {
    /// Whether logging in again is the way out.
    #[must_use]
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

impl From<AuthError> for MailError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Transport(msg) => Self::Network(msg),
            other => Self::Auth(other.to_string()),
        }
    }
}

impl From<HttpError> for MailError {
    fn from(err: HttpError) -> Self {
        Self::Network(err.to_string())
    }
}
