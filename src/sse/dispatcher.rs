//! Line classification for the chat stream.
//!
//! Only single-line `data: ` fields are understood. `event:`, `id:`,
//! `retry:` and comment lines are treated as noise, as are payloads that fail
//! to parse.

use super::events::{SseParseError, StreamEvent, DATA_PREFIX, DONE_SENTINEL};

/// Parse one decoded line, reporting malformed JSON as an error.
pub fn parse_line(raw_line: &str) -> Result<StreamEvent, SseParseError> {
    let line = raw_line.trim();
    if line.is_empty() {
        return Ok(StreamEvent::Noise);
    }

    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(StreamEvent::Noise);
    };

    if payload == DONE_SENTINEL {
        return Ok(StreamEvent::Terminal);
    }

    serde_json::from_str(payload)
        .map(StreamEvent::Data)
        .map_err(|e| SseParseError::InvalidJson {
            payload: payload.to_string(),
            source: e.to_string(),
        })
}

/// Classify one decoded line. Malformed payloads are logged and become
/// [`StreamEvent::Noise`].
pub fn classify(raw_line: &str) -> StreamEvent {
    match parse_line(raw_line) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!("Failed to parse SSE JSON: {}", err);
            StreamEvent::Noise
        }
    }
}
