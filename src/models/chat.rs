//! Chat transcript and query models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::deserialize_optional_id;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    /// Client-side notices, including failed queries
    System,
}

/// A single transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    /// When the message was added; history entries from the server may omit it
    #[serde(default, alias = "created_at")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Set on system messages that report a failed query
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Some(at),
            is_error: false,
        }
    }

    pub fn user(content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(MessageRole::User, content, at)
    }

    pub fn assistant(content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(MessageRole::Assistant, content, at)
    }

    /// A system message reporting a failed query, rendered as `Error: <message>`.
    pub fn error(message: &str, at: DateTime<Utc>) -> Self {
        Self {
            is_error: true,
            ..Self::new(MessageRole::System, format!("Error: {}", message), at)
        }
    }
}

/// Body of `POST /chat/query` and of the streaming request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatQueryRequest {
    pub session_id: String,
    pub query: String,
}

impl ChatQueryRequest {
    pub fn new(session_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            query: query.into(),
        }
    }
}

/// Response to `POST /chat/query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatQueryResponse {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub session_id: Option<String>,
    pub response: String,
    /// Free-form details such as the model name
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ChatQueryResponse {
    /// The `model` entry of the metadata, if present.
    pub fn model(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("model"))
            .and_then(|v| v.as_str())
    }
}

/// Response to `GET /chat/{session_id}/history`.
///
/// The backend wraps the list as `{"history": [...]}`; a bare array is
/// accepted too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryResponse {
    Wrapped {
        history: Vec<ChatMessage>,
        #[serde(
            default,
            deserialize_with = "deserialize_optional_id",
            skip_serializing_if = "Option::is_none"
        )]
        session_id: Option<String>,
    },
    Bare(Vec<ChatMessage>),
}

impl HistoryResponse {
    pub fn messages(&self) -> &[ChatMessage] {
        match self {
            HistoryResponse::Wrapped { history, .. } => history,
            HistoryResponse::Bare(history) => history,
        }
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        match self {
            HistoryResponse::Wrapped { history, .. } => history,
            HistoryResponse::Bare(history) => history,
        }
    }
}
