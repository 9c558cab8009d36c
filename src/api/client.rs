//! Typed calls for the backend's build, status, query and history endpoints,
//! plus the streamed chat answer.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{ClientConfig, PollSettings};
use crate::error::{RagError, RagResult};
use crate::models::{
    BuildRequest, BuildResponse, BuildStatus, ChatMessage, ChatQueryRequest, ChatQueryResponse,
    HistoryResponse,
};
use crate::sse::{SessionOutcome, SseHandler, StreamSession};
use crate::traits::{json_headers, Headers, HttpClient, StreamHandler};
use crate::validation::validate_source_url;

pub const BUILD_PATH: &str = "/rag/build";
pub const CHAT_QUERY_PATH: &str = "/chat/query";

/// Client for the RAG chat service.
///
/// # Example
///
/// ```ignore
/// use ragchat::adapters::ReqwestHttpClient;
/// use ragchat::api::RagApiClient;
/// use ragchat::config::ClientConfig;
///
/// let api = RagApiClient::new(ReqwestHttpClient::new(), ClientConfig::from_env()?);
/// let build = api.build_rag("https://en.wikipedia.org/wiki/Rust").await?;
/// api.wait_until_ready(&build.session_id, api.config().poll).await?;
/// let answer = api.chat_query(&build.session_id, "Who designed it?").await?;
/// ```
pub struct RagApiClient<C: HttpClient> {
    config: ClientConfig,
    client: Arc<C>,
    sse: SseHandler<C>,
}

impl<C: HttpClient> RagApiClient<C> {
    pub fn new(client: C, config: ClientConfig) -> Self {
        Self::with_shared_client(Arc::new(client), config)
    }

    pub fn with_shared_client(client: Arc<C>, config: ClientConfig) -> Self {
        let sse = SseHandler::with_shared_client(Arc::clone(&client))
            .with_trailing_line(config.trailing_line);
        Self {
            config,
            client,
            sse,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The streaming controller used by [`RagApiClient::stream_chat`].
    pub fn stream_handler(&self) -> &SseHandler<C> {
        &self.sse
    }

    /// Start building a RAG session from `url`.
    ///
    /// The URL is checked locally first; no request is made for an invalid one.
    pub async fn build_rag(&self, url: &str) -> RagResult<BuildResponse> {
        let url = validate_source_url(url)?;
        let response: BuildResponse = self
            .post_json(&self.config.endpoint(BUILD_PATH), &BuildRequest::new(url))
            .await?;
        tracing::info!(
            session = %response.session_id,
            status = %response.status,
            "RAG build started"
        );
        Ok(response)
    }

    /// Fetch the build status of a session.
    pub async fn check_status(&self, session_id: &str) -> RagResult<BuildStatus> {
        let url = self.config.endpoint(&format!(
            "/rag/{}/status",
            encode_session_id(session_id)?
        ));
        self.get_json(&url).await
    }

    /// Ask a question and wait for the whole answer.
    pub async fn chat_query(&self, session_id: &str, query: &str) -> RagResult<ChatQueryResponse> {
        require_session(session_id)?;
        self.post_json(
            &self.config.endpoint(CHAT_QUERY_PATH),
            &ChatQueryRequest::new(session_id, query),
        )
        .await
    }

    /// Fetch the stored transcript of a session.
    pub async fn get_history(&self, session_id: &str) -> RagResult<Vec<ChatMessage>> {
        let url = self.config.endpoint(&format!(
            "/chat/{}/history",
            encode_session_id(session_id)?
        ));
        let history: HistoryResponse = self.get_json(&url).await?;
        Ok(history.into_messages())
    }

    /// Stream the answer to `query`, reporting each event to `handler`.
    ///
    /// A stream started earlier through this client is aborted first.
    pub async fn stream_chat<H>(
        &self,
        session_id: &str,
        query: &str,
        handler: &mut H,
    ) -> RagResult<SessionOutcome>
    where
        H: StreamHandler + ?Sized,
    {
        require_session(session_id)?;
        let body = ChatQueryRequest::new(session_id, query);
        Ok(self
            .sse
            .connect(&self.config.stream_url(), &body, handler)
            .await)
    }

    /// Like [`RagApiClient::stream_chat`] on a caller-owned session, so the
    /// caller can keep a handle for aborting it.
    pub async fn stream_chat_session<H>(
        &self,
        session: StreamSession,
        session_id: &str,
        query: &str,
        handler: &mut H,
    ) -> RagResult<SessionOutcome>
    where
        H: StreamHandler + ?Sized,
    {
        require_session(session_id)?;
        let body = ChatQueryRequest::new(session_id, query);
        Ok(self
            .sse
            .connect_session(session, &self.config.stream_url(), &body, handler)
            .await)
    }

    /// Abort the stream started by the latest `stream_chat`, if any.
    pub fn abort_stream(&self) {
        self.sse.abort();
    }

    /// Poll the build status until the session is ready.
    ///
    /// Fails with [`RagError::BuildFailed`] once the backend reports `failed`
    /// or `expired`, and with [`RagError::BuildTimeout`] after
    /// `poll.max_attempts` checks that were still processing. Request errors
    /// are returned as they happen.
    pub async fn wait_until_ready(
        &self,
        session_id: &str,
        poll: PollSettings,
    ) -> RagResult<BuildStatus> {
        self.wait_until_ready_with(session_id, poll, |_, _| {}).await
    }

    /// Like [`RagApiClient::wait_until_ready`], passing every polled status
    /// and its 1-based attempt number to `on_status` as it arrives.
    pub async fn wait_until_ready_with<F>(
        &self,
        session_id: &str,
        poll: PollSettings,
        mut on_status: F,
    ) -> RagResult<BuildStatus>
    where
        F: FnMut(u32, &BuildStatus) + Send,
    {
        let attempts = poll.max_attempts.max(1);

        for attempt in 1..=attempts {
            let status = self.check_status(session_id).await?;
            tracing::debug!(session = %session_id, attempt, status = %status.status, "Polled build status");
            on_status(attempt, &status);

            if status.status.is_ready() {
                tracing::info!(session = %session_id, "RAG session ready");
                return Ok(status);
            }
            if status.status.is_failure() {
                tracing::warn!(
                    session = %session_id,
                    status = %status.status,
                    error = status.error_message().unwrap_or(""),
                    "RAG build did not succeed"
                );
                return Err(RagError::BuildFailed {
                    session_id: session_id.to_string(),
                    status: status.status.to_string(),
                });
            }
            if attempt < attempts {
                tokio::time::sleep(poll.interval).await;
            }
        }

        Err(RagError::BuildTimeout {
            session_id: session_id.to_string(),
            attempts,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> RagResult<T> {
        tracing::debug!(url, "GET");
        let response = self.client.get(url, &Headers::new()).await?.error_for_status()?;
        Ok(response.json()?)
    }

    async fn post_json<B, T>(&self, url: &str, body: &B) -> RagResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!(url, "POST");
        let body = serde_json::to_string(body)?;
        let response = self
            .client
            .post(url, &body, &json_headers())
            .await?
            .error_for_status()?;
        Ok(response.json()?)
    }
}

fn require_session(session_id: &str) -> RagResult<()> {
    if session_id.trim().is_empty() {
        Err(RagError::NoActiveSession)
    } else {
        Ok(())
    }
}

fn encode_session_id(session_id: &str) -> RagResult<String> {
    require_session(session_id)?;
    Ok(urlencoding::encode(session_id).into_owned())
}
