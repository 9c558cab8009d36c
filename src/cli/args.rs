//! Command-line argument parsing for ragchat.
//!
//! This module turns `std::env::args()` into a [`Cli`] value describing the
//! command to run.

use thiserror::Error;

pub const USAGE: &str = "\
Usage: ragchat [-v] <command>

Commands:
  build <url>                   Build a RAG session from a source URL
  status <session-id>           Show the build status of a session
  ask <session-id> <query...>   Ask a question and print the full answer
  stream <session-id> <query...>
                                Stream the answer as it is generated (Ctrl-C aborts)
  history <session-id>          Print the chat history of a session
  chat <url>                    Build a session and chat interactively
                                (/quit exits, /reset clears the transcript)

Options:
  -v, --verbose                 Debug logging (RUST_LOG overrides)
  -V, --version                 Print version
  -h, --help                    Print this help

Environment:
  RAGCHAT_API_URL, RAGCHAT_STREAM_PATH, RAGCHAT_POLL_INTERVAL_MS,
  RAGCHAT_MAX_POLL_ATTEMPTS, RAGCHAT_FLUSH_TRAILING";

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    Build { url: String },
    Status { session_id: String },
    Ask { session_id: String, query: String },
    Stream { session_id: String, query: String },
    History { session_id: String },
    /// Build a session, wait for it, then run an interactive loop
    Chat { url: String },
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub command: CliCommand,
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("no command given")]
    MissingCommand,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("unknown option '{0}'")]
    UnknownOption(String),
    #[error("'{command}' requires {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },
    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),
}

/// Parse command-line arguments and return the command to run.
///
/// The first item is the program name and is skipped. `--version` and
/// `--help` win over everything else.
///
/// # Examples
///
/// ```
/// use ragchat::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["ragchat".to_string(), "status".to_string(), "abc".to_string()];
/// let cli = parse_args(args.into_iter()).unwrap();
/// assert_eq!(cli.command, CliCommand::Status { session_id: "abc".to_string() });
/// ```
pub fn parse_args<I>(args: I) -> Result<Cli, UsageError>
where
    I: Iterator<Item = String>,
{
    let mut verbose = false;
    let mut positional = Vec::new();

    for arg in args.skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                return Ok(Cli {
                    command: CliCommand::Version,
                    verbose,
                })
            }
            "--help" | "-h" => {
                return Ok(Cli {
                    command: CliCommand::Help,
                    verbose,
                })
            }
            "--verbose" | "-v" => verbose = true,
            flag if flag.starts_with('-') && flag.len() > 1 && positional.is_empty() => {
                return Err(UsageError::UnknownOption(flag.to_string()));
            }
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let name = positional.next().ok_or(UsageError::MissingCommand)?;
    let rest: Vec<String> = positional.collect();

    let command = match name.as_str() {
        "build" => CliCommand::Build {
            url: single(rest, "build", "a URL")?,
        },
        "chat" => CliCommand::Chat {
            url: single(rest, "chat", "a URL")?,
        },
        "status" => CliCommand::Status {
            session_id: single(rest, "status", "a session id")?,
        },
        "history" => CliCommand::History {
            session_id: single(rest, "history", "a session id")?,
        },
        "ask" => {
            let (session_id, query) = session_and_query(rest, "ask")?;
            CliCommand::Ask { session_id, query }
        }
        "stream" => {
            let (session_id, query) = session_and_query(rest, "stream")?;
            CliCommand::Stream { session_id, query }
        }
        _ => return Err(UsageError::UnknownCommand(name)),
    };

    Ok(Cli { command, verbose })
}

fn single(
    rest: Vec<String>,
    command: &'static str,
    what: &'static str,
) -> Result<String, UsageError> {
    let mut rest = rest.into_iter();
    let value = rest
        .next()
        .ok_or(UsageError::MissingArgument { command, what })?;
    match rest.next() {
        Some(extra) => Err(UsageError::UnexpectedArgument(extra)),
        None => Ok(value),
    }
}

/// `<session-id> <query...>`; the query words are joined with spaces.
fn session_and_query(
    rest: Vec<String>,
    command: &'static str,
) -> Result<(String, String), UsageError> {
    let mut rest = rest.into_iter();
    let session_id = rest.next().ok_or(UsageError::MissingArgument {
        command,
        what: "a session id",
    })?;
    let query = rest.collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        return Err(UsageError::MissingArgument {
            command,
            what: "a query",
        });
    }
    Ok((session_id, query))
}
