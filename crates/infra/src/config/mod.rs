//! Configuration loading
//!
//! Layers defaults, an optional config file and `MAILAUTH_*` environment
//! overrides into an [`AppConfig`](mailauth_domain::AppConfig).

pub mod loader;

pub use loader::{apply_env_overrides, load, load_from_file, load_with_env, find_config_file};
