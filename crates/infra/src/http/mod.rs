//! HTTP transport for mail API reads

pub mod client;
pub mod retry;

pub use client::{HttpClient, HttpError};
pub use retry::RetryPolicy;
