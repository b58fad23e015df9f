//! Mock implementations of the auth collaborator traits
//!
//! Each mock is cheap to clone and shares its state across clones, so a test
//! can hand one copy to the code under test and inspect another.

// Test doubles: failure modes are visible in the return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use mailauth_domain::{AuthError, AuthResult};
use url::Url;

use crate::auth::traits::{BrowserOpener, SecretSource, TokenExchanger};
use crate::auth::types::{Credentials, TokenRecord};
use crate::security::KeychainError;

type StorageData = Arc<Mutex<HashMap<String, String>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory stand-in for the platform keychain.
#[derive(Debug, Clone)]
pub struct MockKeychainProvider {
    storage: StorageData,
    failure: Arc<Mutex<Option<String>>>,
    lookups: Arc<Mutex<usize>>,
    service_name: String,
}

impl MockKeychainProvider {
    /// Empty in-memory keychain.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            storage: Arc::default(),
            failure: Arc::default(),
            lookups: Arc::default(),
            service_name: service_name.into(),
        }
    }

    /// Keychain pre-populated under the default `client-id`/`client-secret`
    /// references.
    pub fn with_credentials(client_id: &str, client_secret: &str) -> Self {
        let keychain = Self::default();
        {
            let mut storage = lock(&keychain.storage);
            storage.insert(mailauth_domain::constants::CLIENT_ID_REF.to_string(), client_id.to_string());
            storage.insert(
                mailauth_domain::constants::CLIENT_SECRET_REF.to_string(),
                client_secret.to_string(),
            );
        }
        keychain
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        self.check_available()?;
        lock(&self.storage).insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
        *lock(&self.lookups) += 1;
        self.check_available()?;
        lock(&self.storage).get(key).cloned().ok_or(KeychainError::NotFound)
    }

    pub fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        self.check_available()?;
        lock(&self.storage).remove(key);
        Ok(())
    }

    /// Whether `key` is stored, without counting as a lookup.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        lock(&self.storage).contains_key(key)
    }

    fn check_available(&self) -> Result<(), KeychainError> {
        match lock(&self.failure).clone() {
            Some(reason) => Err(KeychainError::AccessFailed(reason)),
            None => Ok(()),
        }
    }

    /// Make every subsequent call fail as if the backend were unavailable.
    pub fn fail_with(&self, reason: &str) {
        *lock(&self.failure) = Some(reason.to_string());
    }

    /// Number of `get_secret` calls so far.
    #[must_use]
    pub fn lookups(&self) -> usize {
        *lock(&self.lookups)
    }
}

impl Default for MockKeychainProvider {
    fn default() -> Self {
        Self::new("mailauth-test")
    }
}

impl SecretSource for MockKeychainProvider {
    fn get_secret(&self, reference: &str) -> Result<String, KeychainError> {
        MockKeychainProvider::get_secret(self, reference)
    }

    fn set_secret(&self, reference: &str, value: &str) -> Result<(), KeychainError> {
        MockKeychainProvider::set_secret(self, reference, value)
    }

    fn delete_secret(&self, reference: &str) -> Result<(), KeychainError> {
        MockKeychainProvider::delete_secret(self, reference)
    }
}

/// One recorded call to a [`MockTokenExchanger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeCall {
    /// Authorization code redeemed with its PKCE verifier.
    AuthorizationCode { client_id: String, code: String, verifier: String },
    /// Refresh-token grant.
    Refresh { client_id: String, refresh_token: String },
}

/// Token exchanger that returns scripted results and records every call.
#[derive(Debug, Clone)]
pub struct MockTokenExchanger {
    calls: Arc<Mutex<Vec<ExchangeCall>>>,
    exchange_result: Arc<Mutex<AuthResult<TokenRecord>>>,
    refresh_result: Arc<Mutex<AuthResult<TokenRecord>>>,
}

impl MockTokenExchanger {
    #[must_use]
    pub fn new() -> Self {
        let unscripted = || {
            Arc::new(Mutex::new(Err(AuthError::TokenExchangeFailed {
                error: "unscripted".to_string(),
                description: Some("mock exchanger has no scripted response".to_string()),
            })))
        };
        Self { calls: Arc::default(), exchange_result: unscripted(), refresh_result: unscripted() }
    }

    pub fn set_exchange_result(&self, result: AuthResult<TokenRecord>) {
        *lock(&self.exchange_result) = result;
    }

    pub fn set_refresh_result(&self, result: AuthResult<TokenRecord>) {
        *lock(&self.refresh_result) = result;
    }

    #[must_use]
    pub fn calls(&self) -> Vec<ExchangeCall> {
        lock(&self.calls).clone()
    }

    #[must_use]
    pub fn refresh_count(&self) -> usize {
        lock(&self.calls).iter().filter(|c| matches!(c, ExchangeCall::Refresh { .. })).count()
    }

    #[must_use]
    pub fn exchange_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| matches!(c, ExchangeCall::AuthorizationCode { .. }))
            .count()
    }
}

impl Default for MockTokenExchanger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenExchanger for MockTokenExchanger {
    async fn exchange_code(
        &self,
        credentials: &Credentials,
        code: &str,
        verifier: &str,
    ) -> AuthResult<TokenRecord> {
        lock(&self.calls).push(ExchangeCall::AuthorizationCode {
            client_id: credentials.client_id.clone(),
            code: code.to_string(),
            verifier: verifier.to_string(),
        });
        lock(&self.exchange_result).clone()
    }

    async fn refresh(
        &self,
        credentials: &Credentials,
        refresh_token: &str,
    ) -> AuthResult<TokenRecord> {
        lock(&self.calls).push(ExchangeCall::Refresh {
            client_id: credentials.client_id.clone(),
            refresh_token: refresh_token.to_string(),
        });
        lock(&self.refresh_result).clone()
    }
}

/// What a [`ScriptedBrowser`] does with the authorization URL it is handed.
#[derive(Debug, Clone)]
pub enum RedirectBehavior {
    /// Redirect back with `code` and the original `state`.
    Approve { code: String },
    /// Redirect back with an `error` parameter.
    Deny { error: String, description: Option<String> },
    /// Redirect back with `code` but a different `state`.
    ForgeState { code: String },
    /// Record the URL and never redirect (the user walked away).
    Ignore,
    /// Report that no browser could be launched.
    FailToLaunch,
}

/// Browser double that plays the user's part of the flow.
///
/// On `open` it reads `redirect_uri` and `state` from the authorization URL
/// and issues the redirect request against the local listener from a
/// background task.
#[derive(Debug, Clone)]
pub struct ScriptedBrowser {
    behavior: RedirectBehavior,
    opened: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl ScriptedBrowser {
    #[must_use]
    pub fn new(behavior: RedirectBehavior) -> Self {
        Self { behavior, opened: Arc::default() }
    }

    #[must_use]
    pub fn approving(code: &str) -> Self {
        Self::new(RedirectBehavior::Approve { code: code.to_string() })
    }

    /// Authorization URLs opened so far, with the browser hint used.
    #[must_use]
    pub fn opened(&self) -> Vec<(String, Option<String>)> {
        lock(&self.opened).clone()
    }

    fn redirect_target(&self, authorize_url: &str) -> Result<Option<String>, String> {
        let parsed = Url::parse(authorize_url).map_err(|e| format!("bad authorization URL: {e}"))?;
        let param = |name: &str| {
            parsed.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned())
        };
        let redirect_uri = param("redirect_uri").ok_or("authorization URL lacks redirect_uri")?;
        let state = param("state").unwrap_or_default();

        let mut target = Url::parse(&redirect_uri).map_err(|e| format!("bad redirect URI: {e}"))?;
        {
            let mut query = target.query_pairs_mut();
            match &self.behavior {
                RedirectBehavior::Approve { code } => {
                    query.append_pair("code", code).append_pair("state", &state);
                }
                RedirectBehavior::Deny { error, description } => {
                    query.append_pair("error", error);
                    if let Some(description) = description {
                        query.append_pair("error_description", description);
                    }
                    query.append_pair("state", &state);
                }
                RedirectBehavior::ForgeState { code } => {
                    query.append_pair("code", code).append_pair("state", "forged-state");
                }
                RedirectBehavior::Ignore | RedirectBehavior::FailToLaunch => return Ok(None),
            }
        }
        Ok(Some(target.to_string()))
    }
}

impl BrowserOpener for ScriptedBrowser {
    fn open(&self, url: &str, browser_hint: Option<&str>) -> Result<(), String> {
        lock(&self.opened).push((url.to_string(), browser_hint.map(str::to_string)));

        if matches!(self.behavior, RedirectBehavior::FailToLaunch) {
            return Err("no browser available".to_string());
        }

        if let Some(target) = self.redirect_target(url)? {
            let runtime = tokio::runtime::Handle::try_current()
                .map_err(|e| format!("scripted browser needs a tokio runtime: {e}"))?;
            runtime.spawn(async move {
                if let Err(err) = reqwest::get(&target).await {
                    tracing::debug!(error = %err, "scripted redirect failed");
                }
            });
        }
        Ok(())
    }
}
