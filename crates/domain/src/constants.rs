//! Application constants
//!
//! Centralized location for the defaults that make up the on-disk and
//! provider-facing contract. Paths listed here must stay stable across
//! releases so that previously stored tokens keep resolving.

// Provider endpoints
pub const DEFAULT_AUTHORIZE_URL: &str =
    "https://login.microsoftonline.com/common/oauth2/v2.0/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";
pub const DEFAULT_SCOPES: &[&str] =
    &["offline_access", "https://graph.microsoft.com/Mail.Read", "https://graph.microsoft.com/User.Read"];

// Redirect listener
pub const DEFAULT_REDIRECT_HOST: &str = "localhost";
pub const DEFAULT_REDIRECT_PORT: u16 = 8765;
pub const DEFAULT_REDIRECT_PATH: &str = "/callback";
pub const CALLBACK_TIMEOUT_SECS: u64 = 300;

// Token lifecycle
pub const REFRESH_BUFFER_SECS: i64 = 300;
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

// Storage layout
pub const APP_DIR_NAME: &str = "mailauth";
pub const PROJECT_TOKEN_PATH: &str = ".mailauth/token.json";
pub const GLOBAL_TOKEN_FILE: &str = "token.json";
pub const CREDENTIALS_FILE: &str = "credentials.json";
pub const CONFIG_FILE_STEM: &str = "config";

// Secret manager references
pub const KEYCHAIN_SERVICE: &str = "mailauth";
pub const CLIENT_ID_REF: &str = "client-id";
pub const CLIENT_SECRET_REF: &str = "client-secret";

// Mail API
pub const DEFAULT_MAIL_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const MAIL_REQUEST_TIMEOUT_SECS: u64 = 30;
