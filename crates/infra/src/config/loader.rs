//! Configuration loader
//!
//! Builds an [`AppConfig`] in three layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. A config file: an explicit path, or `config.toml` / `config.json` under
//!    the config root
//! 3. Environment overrides
//!
//! ## Environment Variables
//! - `MAILAUTH_CONFIG_ROOT`: global state directory (also where the config
//!   file is looked up)
//! - `MAILAUTH_PROJECT_ROOT`: project state directory
//! - `MAILAUTH_REDIRECT_PORT`: loopback callback port
//! - `MAILAUTH_AUTHORIZE_URL`: provider authorization endpoint
//! - `MAILAUTH_TOKEN_URL`: provider token endpoint
//! - `MAILAUTH_MAIL_BASE_URL`: mail API base URL
//!
//! Environment access goes through a lookup function so callers (and tests)
//! can supply their own.

use std::path::{Path, PathBuf};

use mailauth_domain::constants::CONFIG_FILE_STEM;
use mailauth_domain::{AppConfig, AuthError, AuthResult, StorageSettings};

pub const ENV_CONFIG_ROOT: &str = "MAILAUTH_CONFIG_ROOT";
pub const ENV_PROJECT_ROOT: &str = "MAILAUTH_PROJECT_ROOT";
pub const ENV_REDIRECT_PORT: &str = "MAILAUTH_REDIRECT_PORT";
pub const ENV_AUTHORIZE_URL: &str = "MAILAUTH_AUTHORIZE_URL";
pub const ENV_TOKEN_URL: &str = "MAILAUTH_TOKEN_URL";
pub const ENV_MAIL_BASE_URL: &str = "MAILAUTH_MAIL_BASE_URL";

/// Load configuration from defaults, the optional config file and the
/// process environment.
///
/// # Errors
/// Returns `AuthError::Config` if an explicit file is missing, a file is
/// malformed, or an override has an invalid value.
pub fn load(explicit: Option<PathBuf>) -> AuthResult<AppConfig> {
    load_with_env(explicit, |key| std::env::var(key).ok())
}

/// [`load`] with a caller-supplied environment lookup.
///
/// # Errors
/// Same as [`load`].
pub fn load_with_env<F>(explicit: Option<PathBuf>, env: F) -> AuthResult<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let config_path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(AuthError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            Some(path)
        }
        None => lookup_root(&env).and_then(|root| find_config_file(&root)),
    };

    let mut config = match config_path {
        Some(path) => load_from_file(&path)?,
        None => {
            tracing::debug!("no config file found; using defaults");
            AppConfig::default()
        }
    };

    apply_env_overrides(&mut config, &env)?;
    Ok(config)
}

/// Load configuration from a file
///
/// Format is picked by extension (`.toml` or `.json`); fields not present in
/// the file keep their defaults.
///
/// # Errors
/// Returns `AuthError::Config` if the file cannot be read or parsed.
pub fn load_from_file(path: &Path) -> AuthResult<AppConfig> {
    tracing::info!(path = %path.display(), "loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| AuthError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, path)
}

fn parse_config(contents: &str, path: &Path) -> AuthResult<AppConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| AuthError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| AuthError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(AuthError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing `config.toml` / `config.json` under `config_root`.
#[must_use]
pub fn find_config_file(config_root: &Path) -> Option<PathBuf> {
    ["toml", "json"]
        .iter()
        .map(|ext| config_root.join(format!("{CONFIG_FILE_STEM}.{ext}")))
        .find(|path| path.exists())
}

fn lookup_root<F>(env: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    env_path(env, ENV_CONFIG_ROOT)
        .or_else(|| StorageSettings::default().resolve_config_root().ok())
}

/// Apply `MAILAUTH_*` overrides on top of `config`.
///
/// # Errors
/// Returns `AuthError::Config` for an unparseable port.
pub fn apply_env_overrides<F>(config: &mut AppConfig, env: &F) -> AuthResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(root) = env_path(env, ENV_CONFIG_ROOT) {
        config.storage.config_root = Some(root);
    }
    if let Some(root) = env_path(env, ENV_PROJECT_ROOT) {
        config.storage.project_root = Some(root);
    }
    if let Some(port) = env_value(env, ENV_REDIRECT_PORT) {
        config.auth.redirect_port = port.parse::<u16>().map_err(|e| {
            AuthError::Config(format!("Invalid {ENV_REDIRECT_PORT} '{port}': {e}"))
        })?;
    }
    if let Some(url) = env_value(env, ENV_AUTHORIZE_URL) {
        config.auth.authorize_url = url;
    }
    if let Some(url) = env_value(env, ENV_TOKEN_URL) {
        config.auth.token_url = url;
    }
    if let Some(url) = env_value(env, ENV_MAIL_BASE_URL) {
        config.mail.base_url = url;
    }
    Ok(())
}

/// Non-blank, trimmed environment value.
fn env_value<F>(env: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_path<F>(env: &F, key: &str) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    env_value(env, key).map(PathBuf::from)
}
