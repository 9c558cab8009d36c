//! Crate-wide error type.
//!
//! `RagError` is returned by the REST client and the chat store. It wraps the
//! layer-specific errors and adds the failures that only make sense at the
//! session level (builds that fail or never finish, queries with no session).

use std::fmt;

use super::category::ErrorCategory;
use super::config::ConfigError;
use super::network::NetworkError;
use super::stream::StreamError;

/// Unified error type for the RAG chat client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RagError {
    /// Transport failure or non-2xx status from a REST call.
    Network(NetworkError),

    /// A streamed chat answer failed.
    Stream(StreamError),

    /// A request or response body could not be encoded or decoded.
    Json { message: String },

    /// The source URL was rejected before any request was made.
    InvalidUrl { url: String, reason: String },

    /// A chat operation was attempted before a session was built.
    NoActiveSession,

    /// The backend reported the build as failed or expired.
    BuildFailed { session_id: String, status: String },

    /// The build was still processing after the last poll.
    BuildTimeout { session_id: String, attempts: u32 },

    /// Configuration could not be loaded.
    Config(ConfigError),
}

impl RagError {
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        RagError::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            RagError::Network(err) if err.is_server_error() => ErrorCategory::Server,
            RagError::Network(NetworkError::HttpStatus { .. }) => ErrorCategory::Client,
            RagError::Network(_) => ErrorCategory::Network,
            RagError::Stream(StreamError::Transport(err)) if err.is_server_error() => {
                ErrorCategory::Server
            }
            RagError::Stream(StreamError::Transport(_)) => ErrorCategory::Network,
            RagError::Stream(StreamError::Serialize { .. }) => ErrorCategory::Client,
            RagError::Json { .. } => ErrorCategory::Client,
            RagError::InvalidUrl { .. } | RagError::NoActiveSession => ErrorCategory::User,
            RagError::BuildFailed { .. } | RagError::BuildTimeout { .. } => ErrorCategory::Server,
            RagError::Config(_) => ErrorCategory::Configuration,
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            RagError::Network(err) => err.user_message(),
            RagError::Stream(err) => err.user_message(),
            RagError::Json { .. } => {
                "The chat service sent a response this client does not understand.".to_string()
            }
            RagError::InvalidUrl { url, reason } => format!("Cannot use '{}': {}.", url, reason),
            RagError::NoActiveSession => {
                "No active session. Build a session from a URL first.".to_string()
            }
            RagError::BuildFailed { status, .. } => {
                format!("Building the knowledge base did not succeed (status: {}).", status)
            }
            RagError::BuildTimeout { .. } => {
                "Building the knowledge base is taking too long. Check its status later."
                    .to_string()
            }
            RagError::Config(err) => format!("Configuration problem: {}", err),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            RagError::Network(err) => err.error_code(),
            RagError::Stream(err) => err.error_code(),
            RagError::Json { .. } => "E_JSON",
            RagError::InvalidUrl { .. } => "E_INVALID_URL",
            RagError::NoActiveSession => "E_NO_SESSION",
            RagError::BuildFailed { .. } => "E_BUILD_FAILED",
            RagError::BuildTimeout { .. } => "E_BUILD_TIMEOUT",
            RagError::Config(_) => "E_CONFIG",
        }
    }

    /// Get the recovery hint for this error.
    pub fn recovery_hint(&self) -> &'static str {
        self.category().recovery_hint()
    }

    /// HTTP status behind this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RagError::Network(err) => err.status_code(),
            RagError::Stream(err) => err.transport().and_then(NetworkError::status_code),
            _ => None,
        }
    }
}

impl fmt::Display for RagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RagError::Network(err) => write!(f, "{}", err),
            RagError::Stream(err) => write!(f, "{}", err),
            RagError::Json { message } => write!(f, "JSON error: {}", message),
            RagError::InvalidUrl { url, reason } => write!(f, "Invalid URL '{}': {}", url, reason),
            RagError::NoActiveSession => write!(f, "No active session"),
            RagError::BuildFailed { session_id, status } => {
                write!(f, "RAG build for session {} ended with status '{}'", session_id, status)
            }
            RagError::BuildTimeout {
                session_id,
                attempts,
            } => write!(
                f,
                "RAG build for session {} not ready after {} status checks",
                session_id, attempts
            ),
            RagError::Config(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for RagError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RagError::Network(err) => Some(err),
            RagError::Stream(err) => Some(err),
            RagError::Config(err) => Some(err),
            _ => None,
        }
    }
}

// ============================================================================
// From implementations for automatic error conversion
// ============================================================================

impl From<NetworkError> for RagError {
    fn from(err: NetworkError) -> Self {
        RagError::Network(err)
    }
}

impl From<StreamError> for RagError {
    fn from(err: StreamError) -> Self {
        RagError::Stream(err)
    }
}

impl From<ConfigError> for RagError {
    fn from(err: ConfigError) -> Self {
        RagError::Config(err)
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        RagError::Json {
            message: err.to_string(),
        }
    }
}
