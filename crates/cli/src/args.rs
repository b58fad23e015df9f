//! Argument parsing

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use mailauth_domain::TokenScope;

/// Default number of messages listed by `messages`.
pub const DEFAULT_MESSAGE_COUNT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Browser sign-in, optionally with a named browser.
    Login { scope: TokenScope, browser: Option<String> },
    /// Report the stored token for both scopes.
    Status { json: bool },
    /// Print a valid access token, refreshing first if needed.
    Token,
    /// Delete the stored token for one scope.
    Logout { scope: TokenScope },
    /// Store the client id/secret pair in the file or the keychain.
    SetCredentials { client_id: String, client_secret: String, keychain: bool },
    /// Remove stored client credentials from every source.
    ClearCredentials,
    /// List the newest messages.
    Messages { count: u32 },
    /// Save one message as raw MIME.
    Download { id: String, destination: PathBuf },
    Help,
}

/// Options accepted before or after the command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    /// Explicit config file, bypassing discovery.
    pub config: Option<PathBuf>,
    /// Emit logs as JSON lines.
    pub log_json: bool,
}

/// A fully parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub options: GlobalOptions,
    pub command: Command,
}

/// Parse everything after the program name.
pub fn parse<I>(args: I) -> anyhow::Result<Invocation>
where
    I: IntoIterator<Item = String>,
{
    let mut options = GlobalOptions::default();
    let mut rest = Vec::new();

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or_else(|| anyhow!("--config needs a path"))?;
                options.config = Some(PathBuf::from(path));
            }
            "--log-json" => options.log_json = true,
            _ => rest.push(arg),
        }
    }

    let mut rest = rest.into_iter();
    let command = match rest.next().as_deref() {
        Some("login") => parse_login(rest)?,
        Some("status") => {
            let json = parse_flags(rest, &["--json"])?.contains(&"--json");
            Command::Status { json }
        }
        Some("token") => {
            parse_flags(rest, &[])?;
            Command::Token
        }
        Some("logout") => {
            let global = parse_flags(rest, &["--global"])?.contains(&"--global");
            Command::Logout { scope: scope_for(global) }
        }
        Some("set-credentials") => {
            let (keychain, rest): (Vec<String>, Vec<String>) =
                rest.partition(|arg| arg == "--keychain");
            let [client_id, client_secret] = positionals(
                rest.into_iter(),
                "set-credentials [--keychain] <client-id> <client-secret>",
            )?;
            Command::SetCredentials { client_id, client_secret, keychain: !keychain.is_empty() }
        }
        Some("clear-credentials") => {
            parse_flags(rest, &[])?;
            Command::ClearCredentials
        }
        Some("messages") => {
            let count = match rest.next() {
                Some(n) => {
                    n.parse::<u32>().with_context(|| format!("invalid message count '{n}'"))?
                }
                None => DEFAULT_MESSAGE_COUNT,
            };
            if let Some(extra) = rest.next() {
                bail!("unexpected argument '{extra}'");
            }
            Command::Messages { count }
        }
        Some("download") => {
            let [id, destination] = positionals(rest, "download <id> <file>")?;
            Command::Download { id, destination: PathBuf::from(destination) }
        }
        Some("help" | "--help" | "-h") | None => Command::Help,
        Some(unknown) => bail!("unknown command '{unknown}'"),
    };

    Ok(Invocation { options, command })
}

fn parse_login(mut rest: impl Iterator<Item = String>) -> anyhow::Result<Command> {
    let mut global = false;
    let mut browser = None;

    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--global" => global = true,
            "--browser" => {
                browser = Some(rest.next().ok_or_else(|| anyhow!("--browser needs a name"))?);
            }
            other => bail!("unexpected argument '{other}'"),
        }
    }

    Ok(Command::Login { scope: scope_for(global), browser })
}

/// Accept only the listed flags; returns the ones present.
fn parse_flags(
    rest: impl Iterator<Item = String>,
    allowed: &[&'static str],
) -> anyhow::Result<Vec<&'static str>> {
    rest.map(|arg| {
        allowed
            .iter()
            .find(|flag| **flag == arg)
            .copied()
            .ok_or_else(|| anyhow!("unexpected argument '{arg}'"))
    })
    .collect()
}

fn positionals<const N: usize>(
    rest: impl Iterator<Item = String>,
    usage: &str,
) -> anyhow::Result<[String; N]> {
    let values: Vec<String> = rest.collect();
    values.try_into().map_err(|_| anyhow!("usage: mailauth {usage}"))
}

fn scope_for(global: bool) -> TokenScope {
    if global {
        TokenScope::Global
    } else {
        TokenScope::Project
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(line: &str) -> anyhow::Result<Invocation> {
        parse(line.split_whitespace().map(str::to_string))
    }

    #[test]
    fn test_login_defaults_to_project_scope() {
        let parsed = parse_str("login").unwrap();
        assert_eq!(parsed.command, Command::Login { scope: TokenScope::Project, browser: None });
    }

    #[test]
    fn test_login_with_global_and_browser() {
        let parsed = parse_str("login --browser firefox --global").unwrap();
        assert_eq!(
            parsed.command,
            Command::Login { scope: TokenScope::Global, browser: Some("firefox".to_string()) }
        );
    }

    #[test]
    fn test_global_options_anywhere() {
        let parsed = parse_str("status --log-json --config /tmp/m.toml --json").unwrap();
        assert_eq!(parsed.command, Command::Status { json: true });
        assert!(parsed.options.log_json);
        assert_eq!(parsed.options.config, Some(PathBuf::from("/tmp/m.toml")));
    }

    #[test]
    fn test_messages_count() {
        assert_eq!(
            parse_str("messages").unwrap().command,
            Command::Messages { count: DEFAULT_MESSAGE_COUNT }
        );
        assert_eq!(parse_str("messages 25").unwrap().command, Command::Messages { count: 25 });
        assert!(parse_str("messages many").is_err());
    }

    #[test]
    fn test_download_needs_two_arguments() {
        assert!(parse_str("download abc").is_err());
        assert_eq!(
            parse_str("download abc out.eml").unwrap().command,
            Command::Download { id: "abc".to_string(), destination: PathBuf::from("out.eml") }
        );
    }

    #[test]
    fn test_set_credentials_target() {
        assert_eq!(
            parse_str("set-credentials id secret").unwrap().command,
            Command::SetCredentials {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
                keychain: false,
            }
        );
        assert_eq!(
            parse_str("set-credentials --keychain id secret").unwrap().command,
            Command::SetCredentials {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
                keychain: true,
            }
        );
        assert!(parse_str("set-credentials --keychain id").is_err());
    }

    #[test]
    fn test_clear_credentials_takes_no_arguments() {
        assert_eq!(parse_str("clear-credentials").unwrap().command, Command::ClearCredentials);
        assert!(parse_str("clear-credentials now").is_err());
    }

    #[test]
    fn test_rejects_unknown_input() {
        assert!(parse_str("frobnicate").is_err());
        assert!(parse_str("logout --everywhere").is_err());
        assert!(parse_str("token extra").is_err());
    }

    #[test]
    fn test_no_arguments_is_help() {
        assert_eq!(parse_str("").unwrap().command, Command::Help);
    }
}
