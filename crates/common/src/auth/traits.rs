//! Traits for OAuth, secret-manager and browser operations
//!
//! These traits enable dependency injection and testing by abstracting
//! external dependencies (the provider's token endpoint, the platform
//! keychain, the user's browser).

use async_trait::async_trait;
use mailauth_domain::AuthResult;

use super::types::{Credentials, TokenRecord};
use crate::security::KeychainError;

/// Token endpoint interactions.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Exchange an authorization code for a token record.
    ///
    /// # Errors
    /// `TokenExchangeFailed` when the provider reports an error in the body,
    /// `Transport` for network/HTTP failures.
    async fn exchange_code(
        &self,
        credentials: &Credentials,
        code: &str,
        verifier: &str,
    ) -> AuthResult<TokenRecord>;

    /// Obtain a fresh record from a refresh token.
    ///
    /// The returned record's `refresh_token` is empty when the provider did
    /// not rotate it; callers merge with the previous record.
    ///
    /// # Errors
    /// Same classification as [`TokenExchanger::exchange_code`].
    async fn refresh(&self, credentials: &Credentials, refresh_token: &str)
        -> AuthResult<TokenRecord>;
}

/// Named secrets in a secret manager.
pub trait SecretSource: Send + Sync {
    /// Look up a secret by its reference name.
    ///
    /// # Errors
    /// `KeychainError::NotFound` when no entry exists, other variants when the
    /// backend is unavailable.
    fn get_secret(&self, reference: &str) -> Result<String, KeychainError>;

    /// Create or replace a secret.
    ///
    /// # Errors
    /// `KeychainError::AccessFailed` when the backend rejects the write.
    fn set_secret(&self, reference: &str, value: &str) -> Result<(), KeychainError>;

    /// Remove a secret; a missing entry is not an error.
    ///
    /// # Errors
    /// `KeychainError::AccessFailed` when the backend rejects the removal.
    fn delete_secret(&self, reference: &str) -> Result<(), KeychainError>;
}

/// Opens the authorization URL for the user.
pub trait BrowserOpener: Send + Sync {
    /// Best-effort launch; failure is reported, never fatal.
    ///
    /// # Errors
    /// Returns a human-readable reason when no browser could be launched.
    fn open(&self, url: &str, browser_hint: Option<&str>) -> Result<(), String>;
}
