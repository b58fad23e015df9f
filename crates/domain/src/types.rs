//! Shared value types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AuthError;

/// Storage partition for a token record.
///
/// `Project` resolves relative to the invocation directory, `Global` relative
/// to the user configuration root. Reads without an explicit scope try
/// `Project` first and fall back to `Global`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenScope {
    #[default]
    Project,
    Global,
}

impl TokenScope {
    /// Lookup order used when no scope is requested.
    pub const RESOLUTION_ORDER: [Self; 2] = [Self::Project, Self::Global];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Global => "global",
        }
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenScope {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "project" => Ok(Self::Project),
            "global" => Ok(Self::Global),
            other => Err(AuthError::Config(format!("unknown token scope: {other}"))),
        }
    }
}
