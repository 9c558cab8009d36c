//! RAG session build models.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{deserialize_id, deserialize_optional_id};

/// Server-side state of a RAG session.
///
/// Values this client does not know about are kept verbatim in
/// [`RagStatus::Unknown`] instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RagStatus {
    Processing,
    Ready,
    Failed,
    Expired,
    Unknown(String),
}

impl RagStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RagStatus::Processing => "processing",
            RagStatus::Ready => "ready",
            RagStatus::Failed => "failed",
            RagStatus::Expired => "expired",
            RagStatus::Unknown(other) => other,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, RagStatus::Ready)
    }

    /// The build ended without producing a usable session.
    pub fn is_failure(&self) -> bool {
        matches!(self, RagStatus::Failed | RagStatus::Expired)
    }

    /// Polling can stop at this status.
    pub fn is_terminal(&self) -> bool {
        self.is_ready() || self.is_failure()
    }
}

impl From<String> for RagStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "processing" => RagStatus::Processing,
            "ready" => RagStatus::Ready,
            "failed" => RagStatus::Failed,
            "expired" => RagStatus::Expired,
            _ => RagStatus::Unknown(value),
        }
    }
}

impl From<RagStatus> for String {
    fn from(status: RagStatus) -> Self {
        match status {
            RagStatus::Unknown(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RagStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Details the backend attaches to a built session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagMetadata {
    #[serde(default)]
    pub article_title: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub content_size: Option<u64>,
    #[serde(default)]
    pub processing_time_ms: Option<u64>,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}

/// Body of `POST /rag/build`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub url: String,
}

impl BuildRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Response to `POST /rag/build`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildResponse {
    #[serde(deserialize_with = "deserialize_id")]
    pub session_id: String,
    pub status: RagStatus,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub chunk_count: Option<u64>,
    #[serde(default)]
    pub metadata: Option<RagMetadata>,
}

/// Response to `GET /rag/{session_id}/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildStatus {
    pub status: RagStatus,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub chunk_count: Option<u64>,
    #[serde(default)]
    pub metadata: Option<RagMetadata>,
}

impl BuildStatus {
    /// Error message reported by the backend for a failed build.
    pub fn error_message(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.error_message.as_deref())
    }
}
