//! Client credential resolution
//!
//! Sources are consulted in a fixed order on every call (nothing is cached):
//!
//! 1. the credentials file (`<config_root>/credentials.json`), used only when
//!    both fields are non-empty
//! 2. the secret manager, used only when both references resolve
//!
//! When neither yields a complete pair the result is `CredentialsNotFound`.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use mailauth_domain::{AuthError, AuthResult, StorageSettings};
use tracing::{debug, warn};

use super::store::write_atomic;
use super::traits::SecretSource;
use super::types::Credentials;
use crate::security::{KeychainError, KeychainProvider};

/// Resolves the OAuth client id/secret pair.
#[derive(Clone)]
pub struct CredentialResolver {
    credentials_path: PathBuf,
    secrets: Arc<dyn SecretSource>,
    client_id_ref: String,
    client_secret_ref: String,
}

impl CredentialResolver {
    /// Resolver reading from the configured file and the given secret source.
    ///
    /// # Errors
    /// `AuthError::Config` when the config root cannot be resolved.
    pub fn new(settings: &StorageSettings, secrets: Arc<dyn SecretSource>) -> AuthResult<Self> {
        Ok(Self {
            credentials_path: settings.credentials_path()?,
            secrets,
            client_id_ref: settings.client_id_ref.clone(),
            client_secret_ref: settings.client_secret_ref.clone(),
        })
    }

    /// Resolver backed by the platform keychain under the configured service.
    ///
    /// # Errors
    /// `AuthError::Config` when the config root cannot be resolved.
    pub fn with_keychain(settings: &StorageSettings) -> AuthResult<Self> {
        let keychain = KeychainProvider::new(settings.keychain_service.clone());
        Self::new(settings, Arc::new(keychain))
    }

    #[must_use]
    pub fn credentials_path(&self) -> &PathBuf {
        &self.credentials_path
    }

    /// Resolve credentials from the first source holding a complete pair.
    ///
    /// # Errors
    /// `CredentialsNotFound` naming the sources that were tried.
    pub fn load_credentials(&self) -> AuthResult<Credentials> {
        if let Some(credentials) = self.from_file() {
            debug!(path = %self.credentials_path.display(), "credentials loaded from file");
            return Ok(credentials);
        }

        if let Some(credentials) = self.from_secret_manager() {
            debug!("credentials loaded from secret manager");
            return Ok(credentials);
        }

        Err(AuthError::CredentialsNotFound(format!(
            "no complete client id/secret in {} or the secret manager",
            self.credentials_path.display()
        )))
    }

    /// Write `credentials` to the credentials file (owner-only on Unix).
    ///
    /// # Errors
    /// `Config` for an incomplete pair, `Storage` on filesystem failure.
    pub fn save_to_file(&self, credentials: &Credentials) -> AuthResult<()> {
        if !credentials.is_complete() {
            return Err(AuthError::Config("client id and secret must both be non-empty".to_string()));
        }

        let json = serde_json::to_vec_pretty(credentials)
            .map_err(|e| AuthError::Storage(format!("failed to encode credentials: {e}")))?;
        write_atomic(&self.credentials_path, &json)?;

        debug!(path = %self.credentials_path.display(), "credentials saved");
        Ok(())
    }

    /// Store `credentials` in the secret manager under the configured
    /// reference names.
    ///
    /// # Errors
    /// `Config` for an incomplete pair, `Storage` when the secret manager
    /// rejects the write.
    pub fn save_to_secret_manager(&self, credentials: &Credentials) -> AuthResult<()> {
        if !credentials.is_complete() {
            return Err(AuthError::Config("client id and secret must both be non-empty".to_string()));
        }

        self.secrets
            .set_secret(&self.client_id_ref, &credentials.client_id)
            .and_then(|()| self.secrets.set_secret(&self.client_secret_ref, &credentials.client_secret))
            .map_err(|e| AuthError::Storage(format!("secret manager write failed: {e}")))?;

        debug!(reference = %self.client_id_ref, "credentials saved to secret manager");
        Ok(())
    }

    /// Remove credentials from both sources. Idempotent.
    ///
    /// # Errors
    /// `Storage` when the file or a secret exists but cannot be removed.
    pub fn forget(&self) -> AuthResult<()> {
        match fs::remove_file(&self.credentials_path) {
            Ok(()) => debug!(path = %self.credentials_path.display(), "credentials file removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(AuthError::Storage(format!(
                    "failed to remove {}: {e}",
                    self.credentials_path.display()
                )))
            }
        }

        for reference in [&self.client_id_ref, &self.client_secret_ref] {
            self.secrets
                .delete_secret(reference)
                .map_err(|e| AuthError::Storage(format!("secret manager delete failed: {e}")))?;
        }
        Ok(())
    }

    fn from_file(&self) -> Option<Credentials> {
        let contents = match fs::read_to_string(&self.credentials_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.credentials_path.display(), error = %e, "credentials file unreadable");
                return None;
            }
        };

        match serde_json::from_str::<Credentials>(&contents) {
            Ok(credentials) if credentials.is_complete() => Some(credentials),
            Ok(_) => {
                debug!("credentials file incomplete; trying secret manager");
                None
            }
            Err(e) => {
                warn!(path = %self.credentials_path.display(), error = %e, "credentials file malformed");
                None
            }
        }
    }

    fn from_secret_manager(&self) -> Option<Credentials> {
        let client_id = self.secret(&self.client_id_ref)?;
        let client_secret = self.secret(&self.client_secret_ref)?;

        Some(Credentials::new(client_id, client_secret)).filter(Credentials::is_complete)
    }

    fn secret(&self, reference: &str) -> Option<String> {
        match self.secrets.get_secret(reference) {
            Ok(value) => Some(value),
            Err(KeychainError::NotFound) => None,
            Err(e) => {
                warn!(reference, error = %e, "secret manager lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::credentials.
    use tempfile::TempDir;

    use super::*;
    use crate::testing::MockKeychainProvider;

    fn resolver(config: &TempDir, keychain: &MockKeychainProvider) -> CredentialResolver {
        let settings = StorageSettings::with_roots(config.path(), config.path());
        CredentialResolver::new(&settings, Arc::new(keychain.clone())).unwrap()
    }

    fn write_file(config: &TempDir, json: &str) {
        fs::write(config.path().join("credentials.json"), json).unwrap();
    }

    #[test]
    fn test_file_takes_priority() {
        let config = TempDir::new().unwrap();
        let keychain = MockKeychainProvider::with_credentials("kc-id", "kc-secret");
        write_file(&config, r#"{"client_id":"file-id","client_secret":"file-secret"}"#);

        let creds = resolver(&config, &keychain).load_credentials().unwrap();
        assert_eq!(creds, Credentials::new("file-id", "file-secret"));
        assert_eq!(keychain.lookups(), 0);
    }

    #[test]
    fn test_incomplete_file_falls_through_to_secret_manager() {
        let config = TempDir::new().unwrap();
        let keychain = MockKeychainProvider::with_credentials("kc-id", "kc-secret");
        write_file(&config, r#"{"client_id":"file-id","client_secret":""}"#);

        let creds = resolver(&config, &keychain).load_credentials().unwrap();
        assert_eq!(creds, Credentials::new("kc-id", "kc-secret"));
    }

    #[test]
    fn test_malformed_file_falls_through() {
        let config = TempDir::new().unwrap();
        let keychain = MockKeychainProvider::with_credentials("kc-id", "kc-secret");
        write_file(&config, "client_id=abc");

        let creds = resolver(&config, &keychain).load_credentials().unwrap();
        assert_eq!(creds.client_id, "kc-id");
    }

    #[test]
    fn test_half_configured_secret_manager_is_not_found() {
        let config = TempDir::new().unwrap();
        let keychain = MockKeychainProvider::new("mailauth");
        keychain.set_secret("client-id", "kc-id").unwrap();

        let result = resolver(&config, &keychain).load_credentials();
        assert!(matches!(result, Err(AuthError::CredentialsNotFound(_))));
    }

    #[test]
    fn test_unavailable_secret_manager_is_not_found() {
        let config = TempDir::new().unwrap();
        let keychain = MockKeychainProvider::new("mailauth");
        keychain.fail_with("backend locked");

        let result = resolver(&config, &keychain).load_credentials();
        assert!(matches!(result, Err(AuthError::CredentialsNotFound(_))));
    }

    #[test]
    fn test_not_cached_between_calls() {
        let config = TempDir::new().unwrap();
        let keychain = MockKeychainProvider::new("mailauth");
        let resolver = resolver(&config, &keychain);

        assert!(resolver.load_credentials().is_err());
        write_file(&config, r#"{"client_id":"late","client_secret":"arrival"}"#);
        assert_eq!(resolver.load_credentials().unwrap().client_id, "late");
    }

    #[test]
    fn test_save_then_load() {
        let config = TempDir::new().unwrap();
        let keychain = MockKeychainProvider::new("mailauth");
        let resolver = resolver(&config, &keychain);

        resolver.save_to_file(&Credentials::new("saved-id", "saved-secret")).unwrap();

        assert_eq!(resolver.load_credentials().unwrap(), Credentials::new("saved-id", "saved-secret"));
        assert_eq!(keychain.lookups(), 0);
    }

    #[test]
    fn test_secret_manager_save_then_load() {
        let config = TempDir::new().unwrap();
        let keychain = MockKeychainProvider::new("mailauth");
        let resolver = resolver(&config, &keychain);

        resolver.save_to_secret_manager(&Credentials::new("kc-id", "kc-secret")).unwrap();

        assert!(!config.path().join("credentials.json").exists());
        assert_eq!(resolver.load_credentials().unwrap(), Credentials::new("kc-id", "kc-secret"));
    }

    #[test]
    fn test_secret_manager_save_surfaces_backend_failure() {
        let config = TempDir::new().unwrap();
        let keychain = MockKeychainProvider::new("mailauth");
        keychain.fail_with("locked");

        let result = resolver(&config, &keychain).save_to_secret_manager(&Credentials::new("a", "b"));
        assert!(matches!(result, Err(AuthError::Storage(_))));
    }

    #[test]
    fn test_forget_clears_both_sources() {
        let config = TempDir::new().unwrap();
        let keychain = MockKeychainProvider::with_credentials("kc-id", "kc-secret");
        let resolver = resolver(&config, &keychain);
        resolver.save_to_file(&Credentials::new("file-id", "file-secret")).unwrap();

        resolver.forget().unwrap();
        resolver.forget().unwrap();

        assert!(!config.path().join("credentials.json").exists());
        assert!(!keychain.contains("client-id"));
        assert!(!keychain.contains("client-secret"));
        assert!(matches!(resolver.load_credentials(), Err(AuthError::CredentialsNotFound(_))));
    }

    #[test]
    fn test_save_rejects_incomplete_pair() {
        let config = TempDir::new().unwrap();
        let keychain = MockKeychainProvider::new("mailauth");

        let result = resolver(&config, &keychain).save_to_file(&Credentials::new("id", " "));
        assert!(matches!(result, Err(AuthError::Config(_))));
        assert!(!config.path().join("credentials.json").exists());
    }
}
