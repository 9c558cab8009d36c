//! Transport-level error types.
//!
//! Every failure between this client and the backend (connecting, non-2xx
//! statuses, broken streams) is expressed as a [`NetworkError`].

use std::fmt;

/// Network-specific error variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// Connection to the server failed.
    ConnectionFailed {
        url: String,
        message: String,
    },

    /// Request timed out.
    Timeout {
        message: String,
    },

    /// HTTP status error (non-2xx response).
    HttpStatus {
        status: u16,
        message: String,
    },

    /// The URL could not be used for a request.
    InvalidUrl {
        url: String,
    },

    /// Reading the response body failed part way through.
    Io {
        message: String,
    },

    /// Request was cancelled.
    Cancelled,

    /// Generic network error.
    Other {
        message: String,
    },
}

impl NetworkError {
    /// Build an [`NetworkError::HttpStatus`] from a status code and raw body.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        NetworkError::HttpStatus {
            status,
            message: message.into(),
        }
    }

    /// Status code carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            NetworkError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a server-side failure caused this error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, NetworkError::HttpStatus { status, .. } if *status >= 500)
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            NetworkError::ConnectionFailed { .. } => {
                "Unable to reach the chat service. Is the backend running?".to_string()
            }
            NetworkError::Timeout { .. } => {
                "The chat service did not answer in time.".to_string()
            }
            NetworkError::HttpStatus { status, .. } => match *status {
                400 => "The request was rejected by the chat service.".to_string(),
                404 => "The requested session was not found.".to_string(),
                501 => "The chat service does not support this operation yet.".to_string(),
                500..=599 => "The chat service is experiencing issues. Please try again later.".to_string(),
                _ => format!("The chat service returned an error (HTTP {}).", status),
            },
            NetworkError::InvalidUrl { url } => format!("'{}' is not a usable URL.", url),
            NetworkError::Io { .. } => "The response stream was interrupted.".to_string(),
            NetworkError::Cancelled => "The request was cancelled.".to_string(),
            NetworkError::Other { message } => format!("Network error: {}", message),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed { .. } => "E_NET_CONN",
            NetworkError::Timeout { .. } => "E_NET_TIMEOUT",
            NetworkError::HttpStatus { .. } => "E_NET_HTTP",
            NetworkError::InvalidUrl { .. } => "E_NET_URL",
            NetworkError::Io { .. } => "E_NET_IO",
            NetworkError::Cancelled => "E_NET_CANCEL",
            NetworkError::Other { .. } => "E_NET_OTHER",
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::ConnectionFailed { url, message } => {
                write!(f, "Connection failed to '{}': {}", url, message)
            }
            NetworkError::Timeout { message } => write!(f, "Request timed out: {}", message),
            NetworkError::HttpStatus { status, message } => {
                if message.is_empty() {
                    write!(f, "HTTP error! status: {}", status)
                } else {
                    write!(f, "HTTP error! status: {} ({})", status, message)
                }
            }
            NetworkError::InvalidUrl { url } => write!(f, "Invalid URL: {}", url),
            NetworkError::Io { message } => write!(f, "Stream read failed: {}", message),
            NetworkError::Cancelled => write!(f, "Request cancelled"),
            NetworkError::Other { message } => write!(f, "Network error: {}", message),
        }
    }
}

impl std::error::Error for NetworkError {}

/// Classify a reqwest error into a NetworkError.
pub fn classify_reqwest_error(err: &reqwest::Error, url: &str) -> NetworkError {
    if err.is_connect() {
        NetworkError::ConnectionFailed {
            url: url.to_string(),
            message: err.to_string(),
        }
    } else if err.is_timeout() {
        NetworkError::Timeout {
            message: err.to_string(),
        }
    } else if err.is_builder() {
        NetworkError::InvalidUrl {
            url: url.to_string(),
        }
    } else if let Some(status) = err.status() {
        NetworkError::status(status.as_u16(), err.to_string())
    } else if err.is_body() || err.is_decode() {
        NetworkError::Io {
            message: err.to_string(),
        }
    } else {
        NetworkError::Other {
            message: err.to_string(),
        }
    }
}
