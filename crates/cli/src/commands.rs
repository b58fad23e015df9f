//! Command handlers
//!
//! Results go to stdout; prompts and diagnostics go to stderr so that
//! `mailauth token` can be captured by scripts.

use std::sync::Arc;

use anyhow::Context;
use mailauth_common::auth::{AuthorizationPrompt, CredentialResolver};
use mailauth_common::{AuthService, AuthStatus, Credentials};
use mailauth_domain::{AppConfig, TokenScope};
use mailauth_infra::mail::MailClient;

use crate::args::Command;

pub async fn run(command: Command, config: &AppConfig) -> anyhow::Result<()> {
    match command {
        Command::Login { scope, browser } => login(config, scope, browser.as_deref()).await,
        Command::Status { json } => status(config, json),
        Command::Token => token(config).await,
        Command::Logout { scope } => logout(config, scope),
        Command::SetCredentials { client_id, client_secret, keychain } => {
            set_credentials(config, &Credentials::new(client_id, client_secret), keychain)
        }
        Command::ClearCredentials => {
            CredentialResolver::with_keychain(&config.storage)?.forget()?;
            println!("Client credentials removed.");
            Ok(())
        }
        Command::Messages { count } => messages(config, count).await,
        Command::Download { id, destination } => {
            let client = mail_client(config)?;
            let bytes = client.download_message(&id, &destination).await?;
            println!("Saved {bytes} bytes to {}", destination.display());
            Ok(())
        }
        Command::Help => {
            print_help();
            Ok(())
        }
    }
}

async fn login(config: &AppConfig, scope: TokenScope, browser: Option<&str>) -> anyhow::Result<()> {
    let service = AuthService::from_config(config)?;
    let path = service.authenticate(scope, browser, show_prompt).await?;
    println!("Logged in ({scope} scope). Token saved to {}", path.display());
    Ok(())
}

fn show_prompt(prompt: &AuthorizationPrompt) {
    if let Some(reason) = &prompt.browser_error {
        eprintln!("Could not open a browser ({reason}).");
    }
    eprintln!("Sign in at this URL to continue:");
    eprintln!();
    eprintln!("    {}", prompt.url);
    eprintln!();
    eprintln!("Waiting for the redirect on port {}...", prompt.port);
}

fn status(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let report = AuthService::from_config(config)?.status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_status(&report);
    }
    Ok(())
}

fn print_status(report: &AuthStatus) {
    println!(
        "Credentials:   {}",
        if report.credentials_configured { "configured" } else { "missing" }
    );

    if !report.authenticated {
        println!("Token:         none (run `mailauth login`)");
        return;
    }

    if let (Some(scope), Some(path)) = (report.scope, &report.token_path) {
        println!("Token:         {scope} ({})", path.display());
    }
    if let Some(expires_at) = report.expires_at {
        let state = if report.expired {
            "expired"
        } else if report.needs_refresh {
            "refresh due"
        } else {
            "valid"
        };
        println!("Expires:       {} ({state})", expires_at.to_rfc3339());
    }
    if let Some(granted) = &report.granted_scope {
        println!("Granted scope: {granted}");
    }
    println!("Refresh token: {}", if report.has_refresh_token { "yes" } else { "no" });
}

async fn token(config: &AppConfig) -> anyhow::Result<()> {
    let service = AuthService::from_config(config)?;
    println!("{}", service.get_valid_access_token().await?);
    Ok(())
}

fn logout(config: &AppConfig, scope: TokenScope) -> anyhow::Result<()> {
    let service = AuthService::from_config(config)?;
    if service.logout(scope)? {
        println!("Removed {scope} token.");
    } else {
        println!("No {scope} token stored.");
    }
    Ok(())
}

fn set_credentials(
    config: &AppConfig,
    credentials: &Credentials,
    keychain: bool,
) -> anyhow::Result<()> {
    let resolver = CredentialResolver::with_keychain(&config.storage)?;
    if keychain {
        resolver.save_to_secret_manager(credentials).context("failed to save credentials")?;
        println!("Credentials saved to the system keychain");
    } else {
        resolver.save_to_file(credentials).context("failed to save credentials")?;
        println!("Credentials saved to {}", resolver.credentials_path().display());
    }
    Ok(())
}

async fn messages(config: &AppConfig, count: u32) -> anyhow::Result<()> {
    let client = mail_client(config)?;
    let messages = client.list_messages(count).await?;

    if messages.is_empty() {
        println!("No messages.");
    }
    for message in messages {
        let received =
            message.received_date_time.map(|t| t.format("%Y-%m-%d %H:%M").to_string());
        println!(
            "{} {:<16}  {:<30}  {}",
            if message.is_read { ' ' } else { '*' },
            received.as_deref().unwrap_or("-"),
            message.sender().unwrap_or("(unknown sender)"),
            message.subject.as_deref().unwrap_or("(no subject)"),
        );
        println!("  id: {}", message.id);
    }
    Ok(())
}

fn mail_client(config: &AppConfig) -> anyhow::Result<MailClient> {
    let service = AuthService::from_config(config)?;
    Ok(MailClient::new(&config.mail, Arc::new(service))?)
}

pub fn print_help() {
    println!("mailauth - OAuth sign-in and token management for the mail API");
    println!();
    println!("USAGE:");
    println!("    mailauth [--config <path>] [--log-json] <COMMAND>");
    println!();
    println!("COMMANDS:");
    println!("    login [--global] [--browser <name>]   Sign in through the browser");
    println!("    status [--json]                       Show stored token state");
    println!("    token                                 Print a valid access token");
    println!("    logout [--global]                     Remove the stored token");
    println!("    set-credentials [--keychain] <id> <secret>");
    println!("                                          Save the client credentials");
    println!("    clear-credentials                     Remove saved client credentials");
    println!("    messages [N]                          List the newest N messages");
    println!("    download <id> <file>                  Save a message as raw MIME");
    println!("    help                                  Show this help message");
    println!();
    println!("Tokens are stored per project (.mailauth/token.json) unless --global is given.");
    println!("Logging is controlled with MAILAUTH_LOG or RUST_LOG.");
}
