//! Authentication subsystem shared by the mailauth crates.
//!
//! - [`auth`]: the OAuth 2.0 authorization code + PKCE flow, token storage
//!   and silent refresh
//! - [`security`]: platform keychain access
//! - `testing`: in-memory doubles for the auth collaborators (enabled under
//!   `cfg(test)` or the `test-utils` feature)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;
pub mod security;

#[cfg(any(feature = "test-utils", test))]
pub mod testing;

pub use auth::{AuthService, AuthStatus, Credentials, TokenRecord};
pub use security::{KeychainError, KeychainProvider};
