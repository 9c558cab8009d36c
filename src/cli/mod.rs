//! CLI module for ragchat.
//!
//! This module provides the command-line interface:
//! - Argument parsing
//! - Version display
//! - The `build`, `status`, `ask`, `stream`, `history` and `chat` commands
//!
//! # Usage
//!
//! ```ignore
//! use ragchat::cli::{parse_args, run};
//!
//! let cli = parse_args(std::env::args())?;
//! runtime.block_on(run(cli.command))?;
//! ```

pub mod args;
pub mod commands;
pub mod version;

pub use args::{parse_args, Cli, CliCommand, UsageError, USAGE};
pub use version::{version_line, VERSION};

use std::io;

use color_eyre::Result;

use crate::adapters::ReqwestHttpClient;
use crate::api::RagApiClient;
use crate::config::ClientConfig;
use crate::store::ChatStore;

/// Resolves on Ctrl-C. If the signal handler cannot be installed it never
/// resolves, so nothing is aborted by accident.
pub async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Ctrl-C handler unavailable: {}", err);
        std::future::pending::<()>().await;
    }
}

/// Run a command against the configured backend, printing to stdout.
///
/// `Version` and `Help` need no backend and are handled here too.
pub async fn run(command: CliCommand) -> Result<()> {
    let mut out = io::stdout();

    let api = match command {
        CliCommand::Version => {
            println!("{}", version_line());
            return Ok(());
        }
        CliCommand::Help => {
            println!("{}", USAGE);
            return Ok(());
        }
        _ => {
            let config = ClientConfig::from_env()?;
            tracing::debug!(base_url = %config.base_url, "Using backend");
            RagApiClient::new(ReqwestHttpClient::new(), config)
        }
    };

    match command {
        CliCommand::Build { url } => commands::build(&api, &url, &mut out).await,
        CliCommand::Status { session_id } => commands::status(&api, &session_id, &mut out).await,
        CliCommand::Ask { session_id, query } => {
            commands::ask(&api, &session_id, &query, &mut out).await
        }
        CliCommand::Stream { session_id, query } => {
            commands::stream(&api, &session_id, &query, &mut out, ctrl_c()).await
        }
        CliCommand::History { session_id } => {
            commands::history(&api, &session_id, &mut out).await
        }
        CliCommand::Chat { url } => {
            let store = ChatStore::new(api);
            let input = tokio::io::BufReader::new(tokio::io::stdin());
            commands::chat(&store, &url, input, &mut out, ctrl_c).await
        }
        CliCommand::Version | CliCommand::Help => Ok(()),
    }
}
