//! Testing utilities and helpers
//!
//! - **[`mocks`]**: in-memory keychain, recording token exchanger, scripted
//!   browser
//! - **[`fixtures`]**: token records and temporary storage roots
//!
//! Available to this crate's tests and, through the `test-utils` feature, to
//! downstream crates.

pub mod fixtures;
pub mod mocks;

pub use fixtures::{free_port, token_record, token_record_at, TempRoots};
pub use mocks::{
    ExchangeCall, MockKeychainProvider, MockTokenExchanger, RedirectBehavior, ScriptedBrowser,
};
