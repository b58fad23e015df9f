//! File-backed token persistence
//!
//! One JSON file per [`TokenScope`]. Reads without an explicit scope walk
//! [`TokenScope::RESOLUTION_ORDER`] and return the first record found;
//! records are never merged across scopes. Writes replace the whole file
//! via a temp file renamed over the target.
//!
//! There is no inter-process locking: two concurrent writers race and the
//! last rename wins.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use mailauth_domain::{AuthError, AuthResult, StorageSettings, TokenScope};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::types::TokenRecord;

const GITIGNORE: &str = ".gitignore";

/// Reads and writes token records at the configured scope locations.
#[derive(Debug, Clone)]
pub struct TokenStore {
    settings: StorageSettings,
}

impl TokenStore {
    #[must_use]
    pub fn new(settings: StorageSettings) -> Self {
        Self { settings }
    }

    /// Token file location for `scope`.
    ///
    /// # Errors
    /// `AuthError::Config` when the scope root cannot be resolved.
    pub fn path(&self, scope: TokenScope) -> AuthResult<PathBuf> {
        self.settings.token_path(scope)
    }

    /// Read a record, either from `scope` or by resolution order.
    ///
    /// Returns the record together with the scope it was found in, so a
    /// refreshed record can be written back to the same place.
    ///
    /// # Errors
    /// `TokenNotFound` when no file exists, `Storage` when a file exists but
    /// cannot be read or parsed.
    pub fn read(&self, scope: Option<TokenScope>) -> AuthResult<(TokenRecord, TokenScope)> {
        let candidates: &[TokenScope] = match &scope {
            Some(scope) => std::slice::from_ref(scope),
            None => &TokenScope::RESOLUTION_ORDER,
        };

        for &candidate in candidates {
            if let Some(record) = self.read_scope(candidate)? {
                debug!(scope = %candidate, "token record loaded");
                return Ok((record, candidate));
            }
        }

        Err(AuthError::TokenNotFound)
    }

    fn read_scope(&self, scope: TokenScope) -> AuthResult<Option<TokenRecord>> {
        let path = self.path(scope)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_error("read", &path, &e)),
        };

        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            AuthError::Storage(format!("malformed token file {}: {e}", path.display()))
        })
    }

    /// Persist `record` at `scope`, replacing any previous file.
    ///
    /// Writing to the project scope also makes sure the project's
    /// `.gitignore` covers the token directory. Failing to update it is
    /// logged and does not fail the write.
    ///
    /// # Errors
    /// `Storage` on any filesystem failure; the previous file is left
    /// untouched in that case.
    pub fn write(&self, record: &TokenRecord, scope: TokenScope) -> AuthResult<PathBuf> {
        let path = self.path(scope)?;
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| AuthError::Storage(format!("failed to encode token record: {e}")))?;

        write_atomic(&path, &json)?;
        info!(scope = %scope, path = %path.display(), "token record persisted");

        if scope == TokenScope::Project {
            if let Err(err) = self.ensure_gitignored() {
                warn!(error = %err, "token saved but .gitignore could not be updated");
            }
        }

        Ok(path)
    }

    /// Remove the token file for `scope`.
    ///
    /// Returns whether a file was actually removed.
    ///
    /// # Errors
    /// `Storage` when the file exists but cannot be removed.
    pub fn delete(&self, scope: TokenScope) -> AuthResult<bool> {
        let path = self.path(scope)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(scope = %scope, path = %path.display(), "token record removed");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(storage_error("remove", &path, &e)),
        }
    }

    /// Pattern written to the project `.gitignore`: the top-level directory
    /// of the project token path, or the path itself when it has no parent.
    fn ignore_pattern(&self) -> String {
        let relative = &self.settings.project_token_path;
        let mut components = relative.components();
        match (components.next(), components.next()) {
            (Some(first), Some(_)) => format!("{}/", first.as_os_str().to_string_lossy()),
            _ => relative.to_string_lossy().into_owned(),
        }
    }

    fn ensure_gitignored(&self) -> AuthResult<()> {
        let root = self.settings.resolve_project_root()?;
        let gitignore = root.join(GITIGNORE);
        let pattern = self.ignore_pattern();

        let existing = match fs::read_to_string(&gitignore) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(storage_error("read", &gitignore, &e)),
        };

        if is_ignored(&existing, &pattern) {
            return Ok(());
        }

        let mut updated = existing;
        if !updated.is_empty() && !updated.ends_with('\n') {
            updated.push('\n');
        }
        updated.push_str(&pattern);
        updated.push('\n');

        fs::write(&gitignore, updated).map_err(|e| storage_error("update", &gitignore, &e))?;
        debug!(path = %gitignore.display(), pattern = %pattern, "added token path to .gitignore");
        Ok(())
    }
}

fn is_ignored(contents: &str, pattern: &str) -> bool {
    let bare = pattern.trim_end_matches('/');
    contents.lines().map(str::trim).any(|line| {
        let line = line.trim_start_matches('/');
        line == pattern || line == bare
    })
}

/// Write `bytes` to `path` through a sibling temp file so readers never see
/// a partially written record. The file is owner-only on Unix.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> AuthResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| AuthError::Storage(format!("{} has no parent directory", path.display())))?;
    fs::create_dir_all(dir).map_err(|e| storage_error("create", dir, &e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| storage_error("create temp file in", dir, &e))?;
    tmp.write_all(bytes).map_err(|e| storage_error("write", tmp.path(), &e))?;
    tmp.as_file().sync_all().map_err(|e| storage_error("sync", tmp.path(), &e))?;
    restrict_permissions(tmp.as_file()).map_err(|e| storage_error("chmod", tmp.path(), &e))?;

    tmp.persist(path).map_err(|e| storage_error("replace", path, &e.error))?;
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> io::Result<()> {
    Ok(())
}

fn storage_error(action: &str, path: &Path, err: &io::Error) -> AuthError {
    AuthError::Storage(format!("failed to {action} {}: {err}", path.display()))
}
