//! Client configuration.
//!
//! Settings come from `RAGCHAT_*` environment variables with defaults for a
//! local backend, and can be overridden with the builder methods.
//!
//! # Example
//!
//! ```ignore
//! use ragchat::config::ClientConfig;
//!
//! let config = ClientConfig::from_env()?
//!     .with_poll_interval(Duration::from_millis(250));
//! ```

use std::time::Duration;

use crate::error::ConfigError;
use crate::sse::TrailingLinePolicy;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_STREAM_PATH: &str = "/chat/stream";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 60;

pub const ENV_API_URL: &str = "RAGCHAT_API_URL";
pub const ENV_STREAM_PATH: &str = "RAGCHAT_STREAM_PATH";
pub const ENV_POLL_INTERVAL_MS: &str = "RAGCHAT_POLL_INTERVAL_MS";
pub const ENV_MAX_POLL_ATTEMPTS: &str = "RAGCHAT_MAX_POLL_ATTEMPTS";
pub const ENV_FLUSH_TRAILING: &str = "RAGCHAT_FLUSH_TRAILING";

/// How build status is polled by `wait_until_ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

/// Configuration for the API client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL, without a trailing slash
    pub base_url: String,
    /// Path of the streaming chat endpoint
    pub stream_path: String,
    pub poll: PollSettings,
    /// What to do with an unterminated last line when a stream closes
    pub trailing_line: TrailingLinePolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            stream_path: DEFAULT_STREAM_PATH.to_string(),
            poll: PollSettings::default(),
            trailing_line: TrailingLinePolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL. Trailing slashes are removed.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(&url.into());
        self
    }

    /// Set the streaming endpoint path. A leading slash is added if missing.
    pub fn with_stream_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.stream_path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll.interval = interval;
        self
    }

    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.poll.max_attempts = attempts;
        self
    }

    pub fn with_trailing_line(mut self, policy: TrailingLinePolicy) -> Self {
        self.trailing_line = policy;
        self
    }

    /// Create config from the `RAGCHAT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = read(ENV_API_URL) {
            let url = url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidBaseUrl(url.to_string()));
            }
            config = config.with_base_url(url);
        }

        if let Some(path) = read(ENV_STREAM_PATH) {
            config = config.with_stream_path(path.trim());
        }

        if let Some(raw) = read(ENV_POLL_INTERVAL_MS) {
            let ms: u64 = raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid_value(ENV_POLL_INTERVAL_MS, &raw, e))?;
            config = config.with_poll_interval(Duration::from_millis(ms));
        }

        if let Some(raw) = read(ENV_MAX_POLL_ATTEMPTS) {
            let attempts: u32 = raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid_value(ENV_MAX_POLL_ATTEMPTS, &raw, e))?;
            if attempts == 0 {
                return Err(ConfigError::invalid_value(
                    ENV_MAX_POLL_ATTEMPTS,
                    &raw,
                    "must be at least 1",
                ));
            }
            config = config.with_max_poll_attempts(attempts);
        }

        if let Some(raw) = read(ENV_FLUSH_TRAILING) {
            config = config.with_trailing_line(parse_flush_flag(&raw)?);
        }

        Ok(config)
    }

    /// Absolute URL for an API path such as `/rag/build`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Absolute URL of the streaming chat endpoint.
    pub fn stream_url(&self) -> String {
        self.endpoint(&self.stream_path)
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_flush_flag(raw: &str) -> Result<TrailingLinePolicy, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(TrailingLinePolicy::Flush),
        "0" | "false" | "no" | "off" => Ok(TrailingLinePolicy::Drop),
        _ => Err(ConfigError::invalid_value(
            ENV_FLUSH_TRAILING,
            raw,
            "expected 1 or 0",
        )),
    }
}
