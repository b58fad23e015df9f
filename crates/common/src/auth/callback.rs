//! Loopback HTTP listener for the OAuth redirect
//!
//! Binds the redirect port *before* the browser is pointed at the provider,
//! then waits for exactly one terminal request on the redirect path:
//!
//! - `error` present: `ProviderDenied` (takes precedence over `code`)
//! - `state` differs from the expected value: `StateMismatch`
//! - otherwise the `code` is returned
//!
//! Other paths answer 404 and keep the wait going. The outcome travels over
//! a one-shot channel raced against a timer; the server is torn down on
//! every exit path, including drop.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use mailauth_domain::{AuthError, AuthResult};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

type Outcome = AuthResult<String>;

struct ListenerState {
    expected_state: String,
    outcome_tx: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl ListenerState {
    /// Deliver the first terminal outcome; later ones are dropped.
    fn complete(&self, outcome: Outcome) -> bool {
        let sender = match self.outcome_tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }
}

/// A bound, listening redirect receiver for one authorization attempt.
pub struct CallbackListener {
    local_addr: SocketAddr,
    path: String,
    outcome_rx: Option<oneshot::Receiver<Outcome>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CallbackListener {
    /// Bind the redirect port and start serving.
    ///
    /// Returns only once the socket is listening, so a browser opened
    /// afterwards cannot race ahead of the listener.
    ///
    /// # Errors
    /// Returns `AuthError::Listener` if the port cannot be bound.
    pub async fn bind(port: u16, path: &str, expected_state: String) -> AuthResult<Self> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            error!(port, error = %e, "failed to bind callback listener");
            AuthError::Listener(format!("cannot listen on {addr}: {e}"))
        })?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| AuthError::Listener(format!("failed to determine port: {e}")))?;

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let state = Arc::new(ListenerState {
            expected_state,
            outcome_tx: Mutex::new(Some(outcome_tx)),
        });

        let app = Router::new()
            .route(path, get(handle_callback))
            .fallback(handle_not_found)
            .with_state(state);

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!(error = %err, "callback listener error");
            }
        });

        info!(port = local_addr.port(), path, "callback listener started");

        Ok(Self {
            local_addr,
            path: path.to_string(),
            outcome_rx: Some(outcome_rx),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Port actually bound (differs from the request only for port 0).
    #[must_use]
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Loopback URL of the redirect path on the bound port.
    #[must_use]
    pub fn callback_url(&self) -> String {
        format!("http://{}{}", self.local_addr, self.path)
    }

    /// Wait for the terminal callback, then tear the listener down.
    ///
    /// # Errors
    /// `ProviderDenied`, `StateMismatch`, or `AuthTimeout` when nothing
    /// terminal arrives within `timeout`.
    pub async fn wait(mut self, timeout: Duration) -> AuthResult<String> {
        let outcome = match self.outcome_rx.take() {
            Some(rx) => match tokio::time::timeout(timeout, rx).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(_)) => {
                    Err(AuthError::Listener("callback channel closed unexpectedly".to_string()))
                }
                Err(_) => {
                    warn!(timeout_secs = timeout.as_secs(), "authorization callback timed out");
                    Err(AuthError::AuthTimeout(timeout))
                }
            },
            None => Err(AuthError::Listener("callback listener already consumed".to_string())),
        };

        self.shutdown().await;
        outcome
    }

    async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut handle) = self.handle.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
                debug!("callback listener did not drain in time; aborting");
                handle.abort();
                let _ = handle.await;
            }
        }

        info!(port = self.local_addr.port(), "callback listener stopped");
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                handle.abort();
            }
        }
    }
}

async fn handle_callback(
    State(state): State<Arc<ListenerState>>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Html<String>) {
    let outcome = evaluate_callback(&params, &state.expected_state);

    let response = match &outcome {
        Ok(_) => (
            StatusCode::OK,
            page("Authorization Successful", "You can close this window and return to the terminal."),
        ),
        Err(err) => (StatusCode::BAD_REQUEST, page("Authorization Failed", &err.to_string())),
    };

    if !state.complete(outcome) {
        debug!("ignoring callback after the flow already completed");
    }

    response
}

async fn handle_not_found() -> (StatusCode, Html<String>) {
    (StatusCode::NOT_FOUND, page("Not Found", "This address only handles the login redirect."))
}

/// Classify a redirect request. `error` wins over everything, then the state
/// check, then the code.
fn evaluate_callback(params: &HashMap<String, String>, expected_state: &str) -> Outcome {
    if let Some(error) = params.get("error") {
        return Err(AuthError::ProviderDenied {
            error: error.clone(),
            description: params.get("error_description").cloned(),
        });
    }

    let received = params.get("state");
    if received.map(String::as_str) != Some(expected_state) {
        return Err(AuthError::StateMismatch {
            expected: expected_state.to_string(),
            received: received.cloned(),
        });
    }

    match params.get("code") {
        Some(code) if !code.is_empty() => Ok(code.clone()),
        _ => Err(AuthError::ProviderDenied {
            error: "missing_code".to_string(),
            description: Some("redirect did not include an authorization code".to_string()),
        }),
    }
}

fn page(title: &str, message: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{title}</title></head>\n<body><h1>{title}</h1><p>{}</p></body>\n</html>",
        escape_html(message)
    ))
}

fn escape_html(input: &str) -> String {
    input.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}
