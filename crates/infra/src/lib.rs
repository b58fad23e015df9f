//! # mailauth infrastructure
//!
//! The impure edges around the token lifecycle in `mailauth-common`:
//! - configuration loading (files plus environment overrides)
//! - an HTTP client with retry
//! - the mail API client that consumes access tokens
//! - logging setup for the binary

pub mod config;
pub mod http;
pub mod mail;
pub mod observability;

pub use http::{HttpClient, HttpError};
pub use mail::{AccessTokenProvider, MailClient, MailError, MessageSummary};
