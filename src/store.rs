//! Chat store: runs API calls and streams and folds their results into
//! [`ChatState`] and [`SessionState`].
//!
//! Failures end up in state (the `error` fields or an error message in the
//! transcript) so a front end only ever renders snapshots. Snapshots are
//! published on `tokio::sync::watch` channels.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::watch;

use crate::api::RagApiClient;
use crate::error::{RagError, RagResult, StreamError};
use crate::models::{delta_text, BuildResponse, BuildStatus};
use crate::sse::SessionOutcome;
use crate::state::{ChatEvent, ChatState, SessionEvent, SessionState, SessionStatus};
use crate::traits::{HttpClient, StreamHandler};

pub struct ChatStore<C: HttpClient> {
    api: Arc<RagApiClient<C>>,
    chat: watch::Sender<ChatState>,
    session: watch::Sender<SessionState>,
}

impl<C: HttpClient> ChatStore<C> {
    pub fn new(api: RagApiClient<C>) -> Self {
        Self::with_shared_api(Arc::new(api))
    }

    pub fn with_shared_api(api: Arc<RagApiClient<C>>) -> Self {
        let (chat, _) = watch::channel(ChatState::default());
        let (session, _) = watch::channel(SessionState::default());
        Self { api, chat, session }
    }

    pub fn api(&self) -> &RagApiClient<C> {
        &self.api
    }

    /// Current chat snapshot.
    pub fn snapshot(&self) -> ChatState {
        self.chat.borrow().clone()
    }

    /// Current session snapshot.
    pub fn session(&self) -> SessionState {
        self.session.borrow().clone()
    }

    /// Receive every new chat snapshot.
    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.chat.subscribe()
    }

    pub fn subscribe_session(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    pub fn dispatch(&self, event: ChatEvent) {
        self.chat.send_modify(|state| *state = state.reduce(event));
    }

    pub fn dispatch_session(&self, event: SessionEvent) {
        self.session.send_modify(|state| *state = state.reduce(event));
    }

    /// Use an existing session without building one.
    pub fn set_session_id(&self, session_id: impl Into<String>) {
        let session_id = session_id.into();
        self.dispatch_session(SessionEvent::SessionCreated {
            session_id: session_id.clone(),
        });
        self.dispatch(ChatEvent::SessionSelected { session_id });
    }

    /// Start a build and record the new session.
    ///
    /// The error is recorded in state and also returned, since a caller that
    /// asked for a build usually cannot continue without one.
    pub async fn build_rag(&self, url: &str) -> RagResult<BuildResponse> {
        self.dispatch(ChatEvent::BuildStarted);
        self.dispatch_session(SessionEvent::Loading {
            article_url: url.trim().to_string(),
        });

        match self.api.build_rag(url).await {
            Ok(response) => {
                self.dispatch(ChatEvent::BuildAccepted {
                    session_id: response.session_id.clone(),
                    status: response.status.clone(),
                });
                self.dispatch_session(SessionEvent::SessionCreated {
                    session_id: response.session_id.clone(),
                });
                self.dispatch_session(SessionEvent::StatusChanged(SessionStatus::from(
                    &response.status,
                )));
                Ok(response)
            }
            Err(err) => {
                self.record_build_error(&err);
                Err(err)
            }
        }
    }

    /// Poll until the current session is ready, recording each status.
    ///
    /// While the build is still processing, session progress advances with
    /// the share of poll attempts used, staying below 100 until ready.
    pub async fn wait_until_ready(&self) -> RagResult<BuildStatus> {
        let session_id = self.require_session()?;
        let poll = self.api.config().poll;
        let attempts = poll.max_attempts.max(1);

        let result = self
            .api
            .wait_until_ready_with(&session_id, poll, |attempt, status| {
                self.dispatch(ChatEvent::BuildStatusChanged(status.status.clone()));
                self.dispatch_session(SessionEvent::StatusChanged(SessionStatus::from(
                    &status.status,
                )));
                if !status.status.is_terminal() {
                    let progress = poll_progress(attempt, attempts);
                    self.dispatch_session(SessionEvent::Progress(progress));
                }
            })
            .await;

        if let Err(err) = &result {
            self.record_build_error(err);
        }
        result
    }

    /// Ask a question over REST. The answer, or the failure, is appended to
    /// the transcript.
    pub async fn send_query(&self, query: &str) {
        self.dispatch(ChatEvent::QuerySent {
            query: query.to_string(),
            at: Utc::now(),
        });

        let result = match self.require_session() {
            Ok(session_id) => self.api.chat_query(&session_id, query).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(answer) => self.dispatch(ChatEvent::AnswerReceived {
                content: answer.response,
                at: Utc::now(),
            }),
            Err(err) => {
                tracing::warn!(code = err.error_code(), "Chat query failed: {}", err);
                self.dispatch(ChatEvent::QueryFailed {
                    error: err.to_string(),
                    at: Utc::now(),
                });
            }
        }
    }

    /// Stream the answer to `query` into the transcript.
    pub async fn stream_query(&self, query: &str) -> SessionOutcome {
        self.stream_query_with(query, |_| {}).await
    }

    /// Like [`ChatStore::stream_query`], also passing each text delta to
    /// `on_token` as it arrives.
    pub async fn stream_query_with<F>(&self, query: &str, on_token: F) -> SessionOutcome
    where
        F: FnMut(&str) + Send,
    {
        self.dispatch(ChatEvent::StreamStarted {
            query: query.to_string(),
            at: Utc::now(),
        });

        let session_id = match self.require_session() {
            Ok(id) => id,
            Err(err) => {
                self.dispatch(ChatEvent::StreamError {
                    error: err.to_string(),
                    at: Utc::now(),
                });
                return SessionOutcome::Errored;
            }
        };

        let mut handler = StoreStreamHandler {
            chat: &self.chat,
            on_token,
        };
        let outcome = match self.api.stream_chat(&session_id, query, &mut handler).await {
            Ok(outcome) => outcome,
            Err(err) => {
                handler.fail(err.to_string());
                SessionOutcome::Errored
            }
        };

        if outcome == SessionOutcome::Aborted {
            self.dispatch(ChatEvent::StreamCancelled);
        }
        outcome
    }

    /// Abort the stream started by the latest `stream_query`, if any.
    pub fn abort_stream(&self) {
        self.api.abort_stream();
    }

    /// Replace the transcript with the server's history.
    pub async fn load_history(&self) {
        let result = match self.require_session() {
            Ok(session_id) => self.api.get_history(&session_id).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(messages) => self.dispatch(ChatEvent::HistoryLoaded { messages }),
            Err(err) => {
                tracing::warn!(code = err.error_code(), "Loading history failed: {}", err);
                self.dispatch(ChatEvent::QueryFailed {
                    error: err.to_string(),
                    at: Utc::now(),
                });
            }
        }
    }

    /// Empty the transcript, keeping the session.
    pub fn clear_transcript(&self) {
        self.dispatch(ChatEvent::TranscriptCleared);
    }

    /// Forget the session and the transcript.
    pub fn reset(&self) {
        self.dispatch(ChatEvent::Reset);
        self.dispatch_session(SessionEvent::Reset);
    }

    fn require_session(&self) -> RagResult<String> {
        self.chat
            .borrow()
            .session_id
            .clone()
            .ok_or(RagError::NoActiveSession)
    }

    fn record_build_error(&self, err: &RagError) {
        tracing::warn!(code = err.error_code(), "RAG build failed: {}", err);
        self.dispatch(ChatEvent::BuildFailed {
            error: err.to_string(),
        });
        self.dispatch_session(SessionEvent::Failed {
            error: err.to_string(),
        });
    }
}

fn poll_progress(attempt: u32, attempts: u32) -> u8 {
    let percent = u64::from(attempt) * 100 / u64::from(attempts.max(1));
    percent.min(99) as u8
}

/// Folds stream callbacks into chat events.
struct StoreStreamHandler<'a, F> {
    chat: &'a watch::Sender<ChatState>,
    on_token: F,
}

impl<F> StoreStreamHandler<'_, F> {
    fn dispatch(&self, event: ChatEvent) {
        self.chat.send_modify(|state| *state = state.reduce(event));
    }

    fn fail(&self, error: String) {
        self.dispatch(ChatEvent::StreamError {
            error,
            at: Utc::now(),
        });
    }
}

impl<F> StreamHandler for StoreStreamHandler<'_, F>
where
    F: FnMut(&str) + Send,
{
    fn on_message(&mut self, payload: Value) {
        if let Some(token) = delta_text(&payload) {
            (self.on_token)(token);
            self.dispatch(ChatEvent::StreamToken {
                token: token.to_string(),
            });
        }
    }

    fn on_error(&mut self, error: StreamError) {
        tracing::warn!(code = error.error_code(), "Chat stream failed: {}", error);
        self.fail(error.to_string());
    }

    fn on_complete(&mut self) {
        self.dispatch(ChatEvent::StreamComplete);
    }
}
