//! Test fixture generators

use chrono::{DateTime, Duration, SubsecRound, Utc};
use mailauth_domain::StorageSettings;
use tempfile::TempDir;

use crate::auth::types::TokenRecord;

/// Token record expiring `expires_in` from now, millisecond precision.
#[must_use]
pub fn token_record(access_token: &str, refresh_token: &str, expires_in: Duration) -> TokenRecord {
    token_record_at(access_token, refresh_token, Utc::now() + expires_in)
}

#[must_use]
pub fn token_record_at(
    access_token: &str,
    refresh_token: &str,
    expires_at: DateTime<Utc>,
) -> TokenRecord {
    TokenRecord {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.to_string(),
        expires_at: expires_at.trunc_subsecs(3),
        scope: "offline_access https://graph.microsoft.com/Mail.Read".to_string(),
        token_type: "Bearer".to_string(),
    }
}

/// Temporary project and config roots, removed on drop.
pub struct TempRoots {
    pub project: TempDir,
    pub config: TempDir,
}

impl TempRoots {
    /// # Errors
    /// Fails when the temp directories cannot be created.
    pub fn new() -> std::io::Result<Self> {
        Ok(Self { project: TempDir::new()?, config: TempDir::new()? })
    }

    #[must_use]
    pub fn storage_settings(&self) -> StorageSettings {
        StorageSettings::with_roots(self.project.path(), self.config.path())
    }
}

/// A loopback port that was free a moment ago.
///
/// # Errors
/// Fails when no ephemeral port can be bound.
pub fn free_port() -> std::io::Result<u16> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}
