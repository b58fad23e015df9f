//! Platform keychain access for named secrets
//!
//! Thin wrapper over the `keyring` crate covering macOS Keychain Access,
//! Windows Credential Manager and the Linux kernel keyutils store. Secrets
//! live under one service name and are addressed by an account key (the
//! credential resolver uses `client-id` and `client-secret`).
//!
//! ```no_run
//! use mailauth_common::security::KeychainProvider;
//!
//! let keychain = KeychainProvider::new("mailauth");
//! keychain.set_secret("client-id", "my-app")?;
//! assert_eq!(keychain.get_secret("client-id")?, "my-app");
//! # Ok::<(), mailauth_common::security::KeychainError>(())
//! ```

use keyring::Entry;
use thiserror::Error;
use tracing::debug;

use crate::auth::traits::SecretSource;

/// Keychain-backed secret storage for one service name.
#[derive(Debug, Clone)]
pub struct KeychainProvider {
    service_name: String,
}

impl KeychainProvider {
    /// Provider whose entries live under `service_name`.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Store a secret value in the platform keychain
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if keychain access fails
    pub fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "storing secret in keychain");

        let entry = self.create_entry(key)?;
        entry.set_password(value).map_err(|e| {
            KeychainError::AccessFailed(format!("failed to store secret for {key}: {e}"))
        })
    }

    /// Retrieve a secret value from the platform keychain
    ///
    /// # Errors
    /// Returns `KeychainError::NotFound` if the secret doesn't exist,
    /// `KeychainError::AccessFailed` if keychain access fails
    pub fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
        debug!(service = %self.service_name, key = %key, "retrieving secret from keychain");

        let entry = self.create_entry(key)?;
        entry.get_password().map_err(|e| classify_read_error(key, &e))
    }

    /// Delete a secret (idempotent)
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` for anything but a missing entry
    pub fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "deleting secret from keychain");

        let entry = self.create_entry(key)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                Err(KeychainError::AccessFailed(format!("failed to delete secret for {key}: {e}")))
            }
        }
    }

    fn create_entry(&self, account: &str) -> Result<Entry, KeychainError> {
        Entry::new(&self.service_name, account).map_err(|e| {
            KeychainError::AccessFailed(format!("failed to create keychain entry: {e}"))
        })
    }
}

impl SecretSource for KeychainProvider {
    fn get_secret(&self, reference: &str) -> Result<String, KeychainError> {
        KeychainProvider::get_secret(self, reference)
    }

    fn set_secret(&self, reference: &str, value: &str) -> Result<(), KeychainError> {
        KeychainProvider::set_secret(self, reference, value)
    }

    fn delete_secret(&self, reference: &str) -> Result<(), KeychainError> {
        KeychainProvider::delete_secret(self, reference)
    }
}

fn classify_read_error(key: &str, err: &keyring::Error) -> KeychainError {
    if matches!(err, keyring::Error::NoEntry) {
        KeychainError::NotFound
    } else {
        KeychainError::AccessFailed(format!("failed to retrieve secret for {key}: {err}"))
    }
}

/// Keychain error types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeychainError {
    /// Keychain access failed (permission denied, backend unavailable, etc.)
    #[error("keychain access failed: {0}")]
    AccessFailed(String),

    #[error("entry not found")]
    NotFound,
}
