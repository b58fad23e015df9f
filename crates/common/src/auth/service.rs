//! High-level authentication orchestrator
//!
//! Ties credential resolution, PKCE, the callback listener, the token
//! exchanger and the token store into the two public flows:
//!
//! - [`AuthService::authenticate`]: the interactive browser login
//! - [`AuthService::get_valid_access_token`]: the silent path every API call
//!   uses; it refreshes when needed but never opens a browser

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use mailauth_domain::{AppConfig, AuthError, AuthResult, AuthSettings, TokenScope};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::browser::SystemBrowser;
use super::callback::CallbackListener;
use super::client::{build_authorization_url, OAuthClient};
use super::credentials::CredentialResolver;
use super::pkce::PkceParameters;
use super::store::TokenStore;
use super::traits::{BrowserOpener, TokenExchanger};

/// What the caller should show the user while the flow waits.
#[derive(Debug, Clone)]
pub struct AuthorizationPrompt {
    /// URL to visit; always shown so the user can open it by hand.
    pub url: String,
    /// Port the callback listener is bound to.
    pub port: u16,
    /// Why the browser could not be launched, if it could not.
    pub browser_error: Option<String>,
}

/// Snapshot of the stored authentication state.
///
/// Built from local files only: no network traffic and no refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub scope: Option<TokenScope>,
    pub token_path: Option<PathBuf>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expired: bool,
    /// Inside the refresh buffer; the next silent call will refresh.
    pub needs_refresh: bool,
    pub granted_scope: Option<String>,
    pub has_refresh_token: bool,
    pub credentials_configured: bool,
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    settings: AuthSettings,
    credentials: CredentialResolver,
    store: TokenStore,
    exchanger: Arc<dyn TokenExchanger>,
    browser: Arc<dyn BrowserOpener>,
}

impl AuthService {
    #[must_use]
    pub fn new(
        settings: AuthSettings,
        credentials: CredentialResolver,
        store: TokenStore,
        exchanger: Arc<dyn TokenExchanger>,
        browser: Arc<dyn BrowserOpener>,
    ) -> Self {
        Self { settings, credentials, store, exchanger, browser }
    }

    /// Production wiring: HTTP token exchanger, platform keychain and the
    /// system browser.
    ///
    /// # Errors
    /// `Config` for invalid endpoints or unresolvable roots, `Transport` if
    /// the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> AuthResult<Self> {
        let exchanger = OAuthClient::new(config.auth.clone())?;
        let credentials = CredentialResolver::with_keychain(&config.storage)?;
        let store = TokenStore::new(config.storage.clone());

        Ok(Self::new(
            config.auth.clone(),
            credentials,
            store,
            Arc::new(exchanger),
            Arc::new(SystemBrowser),
        ))
    }

    #[must_use]
    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    #[must_use]
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialResolver {
        &self.credentials
    }

    /// Run the interactive authorization code + PKCE flow and persist the
    /// resulting token at `scope`.
    ///
    /// Credentials are resolved before anything else so a misconfigured
    /// client never opens a browser. The listener is bound before the
    /// browser is launched; `on_prompt` is called once in between with the
    /// URL to display.
    ///
    /// # Errors
    /// `CredentialsNotFound`, `Listener`, `ProviderDenied`, `StateMismatch`,
    /// `AuthTimeout`, `TokenExchangeFailed`, `Transport` or `Storage`. Nothing
    /// is persisted on failure.
    pub async fn authenticate<F>(
        &self,
        scope: TokenScope,
        browser_hint: Option<&str>,
        on_prompt: F,
    ) -> AuthResult<PathBuf>
    where
        F: FnOnce(&AuthorizationPrompt) + Send,
    {
        let credentials = self.credentials.load_credentials()?;
        let pkce = PkceParameters::generate();
        let url = build_authorization_url(&self.settings, &credentials.client_id, &pkce);

        let listener = CallbackListener::bind(
            self.settings.redirect_port,
            &self.settings.normalized_redirect_path(),
            pkce.state.clone(),
        )
        .await?;

        let browser_error = match self.browser.open(&url, browser_hint) {
            Ok(()) => None,
            Err(reason) => {
                warn!(reason = %reason, "could not launch browser; continuing with manual URL");
                Some(reason)
            }
        };
        on_prompt(&AuthorizationPrompt { url, port: listener.port(), browser_error });

        let code = listener.wait(self.settings.callback_timeout()).await?;
        debug!("authorization code received; exchanging");

        let record = self.exchanger.exchange_code(&credentials, &code, &pkce.verifier).await?;
        let path = self.store.write(&record, scope)?;

        info!(scope = %scope, expires_at = %record.expires_at, "login complete");
        Ok(path)
    }

    /// Return a usable access token, refreshing it first when it expires
    /// within the refresh buffer.
    ///
    /// A refreshed record is written back to the scope it was read from;
    /// the previous refresh token is kept when the provider does not rotate
    /// it. Never starts the interactive flow.
    ///
    /// # Errors
    /// `CredentialsNotFound`, `TokenNotFound`, `Storage`, and for a failed
    /// refresh `TokenExchangeFailed` or `Transport` (the stored record is
    /// left untouched).
    pub async fn get_valid_access_token(&self) -> AuthResult<String> {
        let credentials = self.credentials.load_credentials()?;
        let (record, scope) = self.store.read(None)?;

        if !record.expires_within(self.refresh_buffer(), Utc::now()) {
            debug!(scope = %scope, "stored access token still valid");
            return Ok(record.access_token);
        }

        if !record.has_refresh_token() {
            return Err(AuthError::TokenExchangeFailed {
                error: "invalid_grant".to_string(),
                description: Some("stored token has no refresh token".to_string()),
            });
        }

        info!(scope = %scope, expires_at = %record.expires_at, "refreshing access token");
        let refreshed = self.exchanger.refresh(&credentials, &record.refresh_token).await?;
        let next = record.superseded_by(refreshed);
        self.store.write(&next, scope)?;

        info!(scope = %scope, expires_at = %next.expires_at, "access token refreshed");
        Ok(next.access_token)
    }

    /// Report stored token state without touching the network.
    ///
    /// # Errors
    /// `Storage` when a token file exists but is unreadable.
    pub fn status(&self) -> AuthResult<AuthStatus> {
        let credentials_configured = self.credentials.load_credentials().is_ok();

        let (record, scope) = match self.store.read(None) {
            Ok(found) => found,
            Err(AuthError::TokenNotFound) => {
                return Ok(AuthStatus {
                    authenticated: false,
                    scope: None,
                    token_path: None,
                    expires_at: None,
                    expired: false,
                    needs_refresh: false,
                    granted_scope: None,
                    has_refresh_token: false,
                    credentials_configured,
                });
            }
            Err(e) => return Err(e),
        };

        let now = Utc::now();
        Ok(AuthStatus {
            authenticated: true,
            scope: Some(scope),
            token_path: Some(self.store.path(scope)?),
            expires_at: Some(record.expires_at),
            expired: record.is_expired(now),
            needs_refresh: record.expires_within(self.refresh_buffer(), now),
            granted_scope: Some(record.scope.clone()),
            has_refresh_token: record.has_refresh_token(),
            credentials_configured,
        })
    }

    /// Configured refresh buffer; negative values mean none, values too
    /// large to represent saturate.
    fn refresh_buffer(&self) -> Duration {
        Duration::try_seconds(self.settings.refresh_buffer_secs.max(0)).unwrap_or(Duration::MAX)
    }

    /// Remove the stored token at `scope`. Returns whether one existed.
    ///
    /// # Errors
    /// `Storage` when the file cannot be removed.
    pub fn logout(&self, scope: TokenScope) -> AuthResult<bool> {
        self.store.delete(scope)
    }
}
