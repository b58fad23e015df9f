//! OAuth 2.0 authorization code + PKCE authentication
//!
//! Obtains, stores and refreshes a delegated access token for a mail API on
//! behalf of a command-line user.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   AuthService   │  authenticate / get_valid_access_token / status / logout
//! └────────┬────────┘
//!          │
//!          ├──► CredentialResolver  (credentials file, then secret manager)
//!          ├──► PkceParameters      (verifier, challenge, state)
//!          ├──► CallbackListener    (loopback redirect receiver)
//!          ├──► TokenExchanger      (OAuthClient over HTTP)
//!          └──► TokenStore          (project / global JSON files)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use mailauth_common::auth::AuthService;
//! use mailauth_domain::{AppConfig, TokenScope};
//!
//! # async fn run() -> Result<(), mailauth_domain::AuthError> {
//! let service = AuthService::from_config(&AppConfig::default())?;
//!
//! service
//!     .authenticate(TokenScope::Project, None, |prompt| {
//!         eprintln!("Open this URL to sign in: {}", prompt.url);
//!     })
//!     .await?;
//!
//! // Later, on every API call:
//! let access_token = service.get_valid_access_token().await?;
//! # let _ = access_token;
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - **[`types`]**: `TokenRecord`, `Credentials`, raw token responses
//! - **[`pkce`]**: PKCE parameter generation
//! - **[`callback`]**: redirect listener
//! - **[`client`]**: authorization URL and token endpoint client
//! - **[`credentials`]**: client credential resolution
//! - **[`store`]**: token persistence
//! - **[`service`]**: orchestrator

mod browser;
pub mod callback;
pub mod client;
pub mod credentials;
pub mod pkce;
pub mod service;
pub mod store;
pub mod traits;
pub mod types;

pub use browser::SystemBrowser;
pub use callback::CallbackListener;
pub use client::{build_authorization_url, OAuthClient};
pub use credentials::CredentialResolver;
pub use pkce::{generate_code_challenge, generate_code_verifier, generate_state, PkceParameters};
pub use service::{AuthService, AuthStatus, AuthorizationPrompt};
pub use store::TokenStore;
pub use traits::{BrowserOpener, SecretSource, TokenExchanger};
pub use types::{Credentials, TokenRecord};
