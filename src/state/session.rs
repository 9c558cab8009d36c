//! RAG session lifecycle as seen by the user.

use crate::models::RagStatus;

/// Coarse status shown while a session is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

impl From<&RagStatus> for SessionStatus {
    fn from(status: &RagStatus) -> Self {
        match status {
            RagStatus::Ready => SessionStatus::Ready,
            RagStatus::Failed | RagStatus::Expired => SessionStatus::Error,
            RagStatus::Processing | RagStatus::Unknown(_) => SessionStatus::Loading,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub session_id: Option<String>,
    pub status: SessionStatus,
    pub error: Option<String>,
    pub article_url: Option<String>,
    /// Build progress, 0 to 100
    pub progress: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A build was requested for `article_url`
    Loading { article_url: String },
    SessionCreated { session_id: String },
    StatusChanged(SessionStatus),
    Progress(u8),
    Failed { error: String },
    Reset,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.status == SessionStatus::Ready && self.session_id.is_some()
    }

    pub fn reduce(&self, event: SessionEvent) -> Self {
        match event {
            SessionEvent::Loading { article_url } => Self {
                status: SessionStatus::Loading,
                error: None,
                progress: 0,
                article_url: Some(article_url),
                ..self.clone()
            },
            SessionEvent::SessionCreated { session_id } => Self {
                session_id: Some(session_id),
                ..self.clone()
            },
            SessionEvent::StatusChanged(status) => Self {
                status,
                progress: if status == SessionStatus::Ready {
                    100
                } else {
                    self.progress
                },
                ..self.clone()
            },
            SessionEvent::Progress(progress) => Self {
                progress: progress.min(100),
                ..self.clone()
            },
            SessionEvent::Failed { error } => Self {
                status: SessionStatus::Error,
                error: Some(error),
                ..self.clone()
            },
            SessionEvent::Reset => Self::default(),
        }
    }
}
