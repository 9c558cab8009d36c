//! Streaming-related error types.
//!
//! A [`StreamError`] is what a stream's `on_error` callback receives. It is
//! delivered at most once per connection attempt and always ends the session.
//! Malformed individual events are not errors at this level; they are logged
//! and skipped by the dispatcher.

use std::fmt;

use super::network::NetworkError;

/// Stream-specific error variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The request failed or the response stream broke.
    Transport(NetworkError),

    /// The request body could not be serialized to JSON.
    Serialize {
        message: String,
    },
}

impl StreamError {
    /// The underlying transport error, if this is one.
    pub fn transport(&self) -> Option<&NetworkError> {
        match self {
            StreamError::Transport(err) => Some(err),
            StreamError::Serialize { .. } => None,
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            StreamError::Transport(err) => err.user_message(),
            StreamError::Serialize { .. } => {
                "The chat request could not be prepared.".to_string()
            }
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            StreamError::Transport(err) => err.error_code(),
            StreamError::Serialize { .. } => "E_STREAM_SERIALIZE",
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Transport(err) => write!(f, "{}", err),
            StreamError::Serialize { message } => {
                write!(f, "Failed to serialize stream request: {}", message)
            }
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StreamError::Transport(err) => Some(err),
            StreamError::Serialize { .. } => None,
        }
    }
}

impl From<NetworkError> for StreamError {
    fn from(err: NetworkError) -> Self {
        StreamError::Transport(err)
    }
}
