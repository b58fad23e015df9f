//! Mailbox access over the REST mail API

pub mod auth;
pub mod client;
pub mod errors;
pub mod types;

pub use auth::{AccessTokenProvider, StaticToken};
pub use client::{MailClient, MAX_PAGE_SIZE};
pub use errors::MailError;
pub use types::{EmailAddress, MessageSummary, Recipient};
