//! # mailauth domain
//!
//! Domain types shared by every mailauth crate.
//!
//! This crate contains:
//! - The authentication error taxonomy and `AuthResult`
//! - Configuration structures with their documented defaults
//! - Storage and provider constants
//!
//! ## Architecture
//! - No dependencies on other mailauth crates
//! - Only external dependencies allowed

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
