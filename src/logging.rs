//! Tracing subscriber setup for the binary.
//!
//! Logs go to stderr so that answers printed on stdout stay clean.

use std::io;

use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_FILTER: &str = "ragchat=info";
pub const VERBOSE_FILTER: &str = "ragchat=debug";

/// Build the filter from a `RUST_LOG`-style value, falling back to the
/// default when it is missing or unparsable.
pub fn filter_from(rust_log: Option<&str>, verbose: bool) -> EnvFilter {
    let fallback = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    match rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => {
            EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(fallback))
        }
        None => EnvFilter::new(fallback),
    }
}

/// Install the global fmt subscriber. `RUST_LOG` overrides the default level.
pub fn init_logging(verbose: bool) -> Result<(), TryInitError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    fmt()
        .with_env_filter(filter_from(rust_log.as_deref(), verbose))
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .finish()
        .try_init()
}
