//! Configuration structures
//!
//! Every field carries a serde default so a partial config file (or none at
//! all) yields a working configuration. Filesystem roots are explicit values
//! rather than hidden lookups: tests point them at temporary directories.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    APP_DIR_NAME, CALLBACK_TIMEOUT_SECS, CLIENT_ID_REF, CLIENT_SECRET_REF, CREDENTIALS_FILE,
    DEFAULT_AUTHORIZE_URL, DEFAULT_MAIL_BASE_URL, DEFAULT_REDIRECT_HOST, DEFAULT_REDIRECT_PATH,
    DEFAULT_REDIRECT_PORT, DEFAULT_SCOPES, DEFAULT_TOKEN_URL, GLOBAL_TOKEN_FILE,
    KEYCHAIN_SERVICE, MAIL_REQUEST_TIMEOUT_SECS, PROJECT_TOKEN_PATH, REFRESH_BUFFER_SECS,
};
use crate::errors::{AuthError, AuthResult};
use crate::types::TokenScope;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub auth: AuthSettings,
    pub storage: StorageSettings,
    pub mail: MailSettings,
}

/// Provider endpoints and the shape of the interactive flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub authorize_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
    pub redirect_host: String,
    /// Fixed callback port. `0` binds an ephemeral port (tests only).
    pub redirect_port: u16,
    pub redirect_path: String,
    pub callback_timeout_secs: u64,
    /// Tokens expiring within this many seconds are refreshed before use.
    pub refresh_buffer_secs: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect(),
            redirect_host: DEFAULT_REDIRECT_HOST.to_string(),
            redirect_port: DEFAULT_REDIRECT_PORT,
            redirect_path: DEFAULT_REDIRECT_PATH.to_string(),
            callback_timeout_secs: CALLBACK_TIMEOUT_SECS,
            refresh_buffer_secs: REFRESH_BUFFER_SECS,
        }
    }
}

impl AuthSettings {
    /// Redirect URI registered with the provider for the given port.
    #[must_use]
    pub fn redirect_uri_for_port(&self, port: u16) -> String {
        format!("http://{}:{}{}", self.redirect_host, port, self.normalized_redirect_path())
    }

    /// Redirect URI for the configured port.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        self.redirect_uri_for_port(self.redirect_port)
    }

    /// Redirect path with a guaranteed leading slash.
    #[must_use]
    pub fn normalized_redirect_path(&self) -> String {
        if self.redirect_path.starts_with('/') {
            self.redirect_path.clone()
        } else {
            format!("/{}", self.redirect_path)
        }
    }

    /// Space-separated scope list as sent to the provider.
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }

    #[must_use]
    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback_timeout_secs)
    }
}

/// Where tokens and credentials live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Root for project-scoped state; the invocation directory when unset.
    pub project_root: Option<PathBuf>,
    /// Root for global state; `<user config dir>/mailauth` when unset.
    pub config_root: Option<PathBuf>,
    pub project_token_path: PathBuf,
    pub global_token_file: String,
    pub credentials_file: String,
    pub keychain_service: String,
    pub client_id_ref: String,
    pub client_secret_ref: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            project_root: None,
            config_root: None,
            project_token_path: PathBuf::from(PROJECT_TOKEN_PATH),
            global_token_file: GLOBAL_TOKEN_FILE.to_string(),
            credentials_file: CREDENTIALS_FILE.to_string(),
            keychain_service: KEYCHAIN_SERVICE.to_string(),
            client_id_ref: CLIENT_ID_REF.to_string(),
            client_secret_ref: CLIENT_SECRET_REF.to_string(),
        }
    }
}

impl StorageSettings {
    /// Settings rooted at explicit directories.
    #[must_use]
    pub fn with_roots(project_root: impl Into<PathBuf>, config_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: Some(project_root.into()),
            config_root: Some(config_root.into()),
            ..Self::default()
        }
    }

    /// Resolve the project root.
    ///
    /// # Errors
    /// Returns `AuthError::Config` if the current directory is unavailable.
    pub fn resolve_project_root(&self) -> AuthResult<PathBuf> {
        match &self.project_root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir()
                .map_err(|e| AuthError::Config(format!("cannot determine current directory: {e}"))),
        }
    }

    /// Resolve the user configuration root.
    ///
    /// # Errors
    /// Returns `AuthError::Config` if the platform has no config directory.
    pub fn resolve_config_root(&self) -> AuthResult<PathBuf> {
        match &self.config_root {
            Some(root) => Ok(root.clone()),
            None => dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME)).ok_or_else(|| {
                AuthError::Config("cannot determine user configuration directory".to_string())
            }),
        }
    }

    /// Absolute path of the token file for `scope`.
    ///
    /// # Errors
    /// Propagates root resolution failures.
    pub fn token_path(&self, scope: TokenScope) -> AuthResult<PathBuf> {
        match scope {
            TokenScope::Project => {
                Ok(self.resolve_project_root()?.join(&self.project_token_path))
            }
            TokenScope::Global => Ok(self.resolve_config_root()?.join(&self.global_token_file)),
        }
    }

    /// Absolute path of the credentials file.
    ///
    /// # Errors
    /// Propagates root resolution failures.
    pub fn credentials_path(&self) -> AuthResult<PathBuf> {
        Ok(self.resolve_config_root()?.join(&self.credentials_file))
    }
}

/// Mail API client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self { base_url: DEFAULT_MAIL_BASE_URL.to_string(), timeout_secs: MAIL_REQUEST_TIMEOUT_SECS }
    }
}

impl MailSettings {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_uri_uses_host_port_and_path() {
        let settings = AuthSettings::default();
        assert_eq!(settings.redirect_uri(), "http://localhost:8765/callback");

        let custom = AuthSettings { redirect_path: "oauth/done".to_string(), ..settings };
        assert_eq!(custom.redirect_uri_for_port(9000), "http://localhost:9000/oauth/done");
    }

    #[test]
    fn scope_string_is_space_separated() {
        let settings = AuthSettings {
            scopes: vec!["offline_access".to_string(), "Mail.Read".to_string()],
            ..AuthSettings::default()
        };
        assert_eq!(settings.scope_string(), "offline_access Mail.Read");
    }

    #[test]
    fn token_paths_follow_roots() {
        let storage = StorageSettings::with_roots("/work/repo", "/home/u/.config/mailauth");
        assert_eq!(
            storage.token_path(TokenScope::Project).unwrap(),
            PathBuf::from("/work/repo/.mailauth/token.json")
        );
        assert_eq!(
            storage.token_path(TokenScope::Global).unwrap(),
            PathBuf::from("/home/u/.config/mailauth/token.json")
        );
        assert_eq!(
            storage.credentials_path().unwrap(),
            PathBuf::from("/home/u/.config/mailauth/credentials.json")
        );
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [auth]
            redirect_port = 9999
            "#,
        )
        .unwrap();
        assert_eq!(config.auth.redirect_port, 9999);
        assert_eq!(config.auth.redirect_path, "/callback");
        assert_eq!(config.storage.keychain_service, "mailauth");
        assert_eq!(config.mail.timeout_secs, 30);
    }
}
