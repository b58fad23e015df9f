//! `mailauth` command-line entry point.
//!
//! This is a CLI tool, so `println!` and `eprintln!` are the user-facing
//! output; `tracing` carries diagnostics.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::process::ExitCode;

use mailauth_domain::AuthError;
use mailauth_infra::config;
use mailauth_infra::mail::MailError;
use mailauth_infra::observability::{init_logging, LogFormat};

mod args;
mod commands;

#[tokio::main]
async fn main() -> ExitCode {
    let invocation = match args::parse(std::env::args().skip(1)) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!();
            commands::print_help();
            return ExitCode::FAILURE;
        }
    };

    init_logging(if invocation.options.log_json { LogFormat::Json } else { LogFormat::Pretty });

    let result = match config::load(invocation.options.config.clone()) {
        Ok(config) => commands::run(invocation.command, &config).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<AuthError>() {
                Some(auth) => tracing::debug!(error = auth.label(), "command failed"),
                None => tracing::debug!(error = %e, "command failed"),
            }
            eprintln!("Error: {e:#}");
            if needs_login(&e) {
                eprintln!("Run `mailauth login` to sign in again.");
            }
            ExitCode::FAILURE
        }
    }
}

fn needs_login(error: &anyhow::Error) -> bool {
    if let Some(auth) = error.downcast_ref::<AuthError>() {
        return auth.requires_login();
    }
    error.downcast_ref::<MailError>().is_some_and(MailError::requires_login)
}
