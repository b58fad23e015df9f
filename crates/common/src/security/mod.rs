//! Secret-manager integration
//!
//! The platform keychain is the second source the credential resolver
//! consults after the credentials file.

pub mod keychain;

pub use keychain::{KeychainError, KeychainProvider};
