//! Chat transcript state.

use chrono::{DateTime, Utc};

use crate::models::{ChatMessage, MessageRole, RagStatus};

/// Where the session behind the chat is in its build.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BuildPhase {
    #[default]
    Idle,
    /// Build requested, no answer yet
    Building,
    /// Status last reported by the backend
    Remote(RagStatus),
    Error,
}

impl BuildPhase {
    pub fn is_ready(&self) -> bool {
        matches!(self, BuildPhase::Remote(RagStatus::Ready))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatState {
    pub session_id: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub is_loading: bool,
    /// Last build error; query failures go into the transcript instead
    pub error: Option<String>,
    pub rag_status: BuildPhase,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    SessionSelected { session_id: String },
    BuildStarted,
    BuildAccepted { session_id: String, status: RagStatus },
    BuildStatusChanged(RagStatus),
    BuildFailed { error: String },
    MessageAdded(ChatMessage),
    /// A REST query was sent
    QuerySent { query: String, at: DateTime<Utc> },
    AnswerReceived { content: String, at: DateTime<Utc> },
    QueryFailed { error: String, at: DateTime<Utc> },
    /// A streamed query was sent; an empty assistant message collects tokens
    StreamStarted { query: String, at: DateTime<Utc> },
    StreamToken { token: String },
    StreamComplete,
    StreamError { error: String, at: DateTime<Utc> },
    /// The stream was aborted by the user
    StreamCancelled,
    HistoryLoaded { messages: Vec<ChatMessage> },
    /// Clear the transcript but keep the session
    TranscriptCleared,
    Reset,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent assistant reply, if any.
    pub fn last_answer(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
            .map(|m| m.content.as_str())
    }

    pub fn reduce(&self, event: ChatEvent) -> Self {
        match event {
            ChatEvent::SessionSelected { session_id } => Self {
                session_id: Some(session_id),
                ..self.clone()
            },
            ChatEvent::BuildStarted => Self {
                is_loading: true,
                error: None,
                rag_status: BuildPhase::Building,
                ..self.clone()
            },
            ChatEvent::BuildAccepted { session_id, status } => Self {
                session_id: Some(session_id),
                rag_status: BuildPhase::Remote(status),
                is_loading: false,
                ..self.clone()
            },
            ChatEvent::BuildStatusChanged(status) => Self {
                rag_status: BuildPhase::Remote(status),
                ..self.clone()
            },
            ChatEvent::BuildFailed { error } => Self {
                is_loading: false,
                error: Some(error),
                rag_status: BuildPhase::Error,
                ..self.clone()
            },
            ChatEvent::MessageAdded(message) => self.with_message(message),
            ChatEvent::QuerySent { query, at } => Self {
                is_loading: true,
                ..self.with_message(ChatMessage::user(query, at))
            },
            ChatEvent::AnswerReceived { content, at } => Self {
                is_loading: false,
                ..self.with_message(ChatMessage::assistant(content, at))
            },
            ChatEvent::QueryFailed { error, at } => Self {
                is_loading: false,
                ..self.with_message(ChatMessage::error(&error, at))
            },
            ChatEvent::StreamStarted { query, at } => {
                let next = self
                    .with_message(ChatMessage::user(query, at))
                    .with_message(ChatMessage::assistant(String::new(), at));
                Self {
                    is_loading: true,
                    ..next
                }
            }
            ChatEvent::StreamToken { token } => {
                let mut next = self.clone();
                let appended = match next.messages.last_mut() {
                    Some(last) if last.role == MessageRole::Assistant => {
                        last.content.push_str(&token);
                        true
                    }
                    _ => false,
                };
                if !appended {
                    // no placeholder yet: start one without a timestamp
                    next.messages.push(ChatMessage {
                        role: MessageRole::Assistant,
                        content: token,
                        timestamp: None,
                        is_error: false,
                    });
                }
                next
            }
            ChatEvent::StreamComplete => Self {
                is_loading: false,
                ..self.without_empty_answer()
            },
            ChatEvent::StreamError { error, at } => Self {
                is_loading: false,
                ..self
                    .without_empty_answer()
                    .with_message(ChatMessage::error(&error, at))
            },
            ChatEvent::StreamCancelled => Self {
                is_loading: false,
                ..self.without_empty_answer()
            },
            ChatEvent::HistoryLoaded { messages } => Self {
                messages,
                ..self.clone()
            },
            ChatEvent::TranscriptCleared => Self {
                messages: Vec::new(),
                is_loading: false,
                ..self.clone()
            },
            ChatEvent::Reset => Self::default(),
        }
    }

    fn with_message(&self, message: ChatMessage) -> Self {
        let mut next = self.clone();
        next.messages.push(message);
        next
    }

    /// Drop a trailing assistant placeholder that never received a token.
    fn without_empty_answer(&self) -> Self {
        let mut next = self.clone();
        if next
            .messages
            .last()
            .is_some_and(|m| m.role == MessageRole::Assistant && m.content.is_empty())
        {
            next.messages.pop();
        }
        next
    }
}
