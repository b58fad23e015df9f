//! `tracing-subscriber` initialisation
//!
//! The filter comes from `MAILAUTH_LOG`, then `RUST_LOG`, then the given
//! default. Output goes to stderr so stdout stays clean for command results
//! (the `token` command prints the bare access token).

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Primary filter variable; `RUST_LOG` is consulted when it is unset.
pub const LOG_ENV: &str = "MAILAUTH_LOG";

/// Default directive when neither variable is set.
pub const DEFAULT_DIRECTIVE: &str = "warn";

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Build the env filter from an optional `MAILAUTH_LOG` / `RUST_LOG` value
/// pair, falling back to `default_directive` when both are unset or invalid.
#[must_use]
pub fn build_filter(
    mailauth_log: Option<&str>,
    rust_log: Option<&str>,
    default_directive: &str,
) -> EnvFilter {
    [mailauth_log, rust_log]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .find_map(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive))
}

/// Install the global subscriber.
///
/// Safe to call more than once: later calls are no-ops.
pub fn init_logging(format: LogFormat) {
    let mailauth_log = std::env::var(LOG_ENV).ok();
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = build_filter(mailauth_log.as_deref(), rust_log.as_deref(), DEFAULT_DIRECTIVE);

    let result = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("logging already initialised");
    }
}
