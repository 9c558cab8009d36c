//! Helpers for streamed chat payloads.

use serde_json::Value;

/// Keys the backend has used for the text of a streamed token.
const TEXT_KEYS: [&str; 6] = ["text", "content", "token", "chunk", "data", "response"];

/// Extract the text delta from one streamed JSON payload.
///
/// Accepts a bare JSON string, an object with one of the [`TEXT_KEYS`] holding
/// a string, or an OpenAI-style `{"delta": {"content": ...}}`. Returns `None`
/// for payloads that carry no text (metadata, keep-alives).
pub fn delta_text(payload: &Value) -> Option<&str> {
    match payload {
        Value::String(text) => Some(text.as_str()),
        Value::Object(map) => TEXT_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .or_else(|| {
                map.get("delta").and_then(|delta| {
                    delta
                        .get("content")
                        .or_else(|| delta.get("text"))
                        .and_then(Value::as_str)
                })
            }),
        _ => None,
    }
}
