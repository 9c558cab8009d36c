//! SSE event types and definitions
//!
//! Contains the [`StreamEvent`] classification produced for every decoded
//! line, and the parse error surfaced when a data line is not valid JSON.

use serde_json::Value;
use std::fmt;

/// Literal prefix a line must carry to be considered a data event.
pub const DATA_PREFIX: &str = "data: ";

/// Application-level end-of-stream marker.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Classification of a single decoded line.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A `data:` line carrying a JSON payload.
    Data(Value),
    /// The `[DONE]` sentinel; the logical stream ends here.
    Terminal,
    /// Blank lines, non-data lines and malformed payloads.
    Noise,
}

impl StreamEvent {
    /// Returns the event type name as a string for debugging purposes.
    pub fn event_type_name(&self) -> &'static str {
        match self {
            StreamEvent::Data(_) => "data",
            StreamEvent::Terminal => "terminal",
            StreamEvent::Noise => "noise",
        }
    }

    /// Whether this event ends the logical stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Terminal)
    }
}

/// Error when a data line's payload cannot be parsed.
///
/// This is never fatal for a stream; the dispatcher logs it and moves on.
#[derive(Debug, Clone, PartialEq)]
pub enum SseParseError {
    /// Invalid JSON in data payload
    InvalidJson { payload: String, source: String },
}

impl fmt::Display for SseParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SseParseError::InvalidJson { payload, source } => {
                write!(f, "Invalid JSON in SSE data '{}': {}", payload, source)
            }
        }
    }
}

impl std::error::Error for SseParseError {}
