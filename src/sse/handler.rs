//! Streaming connection controller.
//!
//! [`SseHandler`] issues the streaming POST, feeds each arriving chunk through
//! the line decoder and dispatcher, and reports to a [`StreamHandler`]. Reading
//! stops at the `[DONE]` sentinel, at the end of the transport stream, on a
//! transport error, or when the session is aborted.

use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use serde::Serialize;

use super::dispatcher::classify;
use super::events::StreamEvent;
use super::session::{ConnectionState, SessionHandle, StreamSession};
use crate::error::{NetworkError, StreamError};
use crate::traits::{event_stream_headers, HttpClient, StreamHandler};

/// What to do with an unterminated final line when the transport closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailingLinePolicy {
    /// Discard it. A line only counts once its newline has arrived.
    #[default]
    Drop,
    /// Classify and dispatch it like any other line before completing.
    Flush,
}

/// How a connection attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Aborted,
    Errored,
}

impl SessionOutcome {
    fn state(self) -> ConnectionState {
        match self {
            SessionOutcome::Completed => ConnectionState::Completed,
            SessionOutcome::Aborted => ConnectionState::Aborted,
            SessionOutcome::Errored => ConnectionState::Errored,
        }
    }
}

/// SSE consumer over an [`HttpClient`].
///
/// # Example
///
/// ```ignore
/// use ragchat::adapters::ReqwestHttpClient;
/// use ragchat::sse::SseHandler;
/// use ragchat::traits::Callbacks;
///
/// let handler = SseHandler::new(ReqwestHttpClient::new());
/// let mut callbacks = Callbacks::new().on_message(|payload| println!("{}", payload));
/// handler
///     .connect("http://localhost:3000/chat/stream", &body, &mut callbacks)
///     .await;
/// ```
pub struct SseHandler<C: HttpClient> {
    client: Arc<C>,
    trailing_line: TrailingLinePolicy,
    /// Session started by the most recent [`SseHandler::connect`].
    current: Mutex<Option<SessionHandle>>,
}

impl<C: HttpClient> SseHandler<C> {
    pub fn new(client: C) -> Self {
        Self::with_shared_client(Arc::new(client))
    }

    pub fn with_shared_client(client: Arc<C>) -> Self {
        Self {
            client,
            trailing_line: TrailingLinePolicy::default(),
            current: Mutex::new(None),
        }
    }

    pub fn with_trailing_line(mut self, policy: TrailingLinePolicy) -> Self {
        self.trailing_line = policy;
        self
    }

    pub fn trailing_line(&self) -> TrailingLinePolicy {
        self.trailing_line
    }

    /// Handle of the session started by the latest `connect`, while it runs.
    pub fn current_session(&self) -> Option<SessionHandle> {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Stream `body` to `endpoint` on a fresh session.
    ///
    /// Any session left running by an earlier `connect` on this handler is
    /// aborted first.
    pub async fn connect<B, H>(&self, endpoint: &str, body: &B, handler: &mut H) -> SessionOutcome
    where
        B: Serialize + Sync + ?Sized,
        H: StreamHandler + ?Sized,
    {
        let session = StreamSession::new();
        let id = session.id();

        let previous = self
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(session.handle());
        if let Some(previous) = previous {
            tracing::debug!(previous = %previous.id(), "Replacing active stream session");
            previous.abort();
        }

        let outcome = self.connect_session(session, endpoint, body, handler).await;

        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if current.as_ref().map(SessionHandle::id) == Some(id) {
            *current = None;
        }

        outcome
    }

    /// Abort and release the session started by the latest `connect`.
    ///
    /// A no-op when nothing is running.
    pub fn abort(&self) {
        let current = self.current.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = current {
            handle.abort();
        }
    }

    /// Run one connection attempt on an explicit session.
    ///
    /// The session is consumed; take a [`SessionHandle`] beforehand to abort
    /// it from another task.
    pub async fn connect_session<B, H>(
        &self,
        mut session: StreamSession,
        endpoint: &str,
        body: &B,
        handler: &mut H,
    ) -> SessionOutcome
    where
        B: Serialize + Sync + ?Sized,
        H: StreamHandler + ?Sized,
    {
        let id = session.id();

        if session.is_cancelled() {
            tracing::debug!(session = %id, "Session aborted before connecting");
            return finish(&session, SessionOutcome::Aborted);
        }

        let body = match serde_json::to_string(body) {
            Ok(body) => body,
            Err(e) => {
                return fail(
                    &session,
                    handler,
                    StreamError::Serialize {
                        message: e.to_string(),
                    },
                )
            }
        };

        session.transition(ConnectionState::Connecting);
        tracing::debug!(session = %id, endpoint, "Connecting stream");

        let headers = event_stream_headers();
        let request = self.client.post_stream(endpoint, &body, &headers);

        let mut stream = tokio::select! {
            biased;
            _ = session.cancelled() => {
                tracing::debug!(session = %id, "Stream aborted while connecting");
                return finish(&session, SessionOutcome::Aborted);
            }
            response = request => match response {
                Ok(stream) => stream,
                Err(NetworkError::Cancelled) => return finish(&session, SessionOutcome::Aborted),
                Err(err) => return fail(&session, handler, err.into()),
            },
        };

        session.transition(ConnectionState::Streaming);

        loop {
            let next = tokio::select! {
                biased;
                _ = session.cancelled() => {
                    tracing::debug!(session = %id, "Stream aborted");
                    return finish(&session, SessionOutcome::Aborted);
                }
                chunk = stream.next() => chunk,
            };

            match next {
                Some(Ok(bytes)) => {
                    let lines = session.decoder.feed(&bytes);
                    for line in lines {
                        if let Some(outcome) = dispatch(&session, &line, handler) {
                            return outcome;
                        }
                    }
                }
                Some(Err(NetworkError::Cancelled)) => {
                    return finish(&session, SessionOutcome::Aborted);
                }
                Some(Err(err)) => return fail(&session, handler, err.into()),
                None => {
                    if let Some(tail) = session.decoder.flush() {
                        match self.trailing_line {
                            TrailingLinePolicy::Flush => {
                                if let Some(outcome) = dispatch(&session, &tail, handler) {
                                    return outcome;
                                }
                            }
                            TrailingLinePolicy::Drop => {
                                tracing::debug!(
                                    session = %id,
                                    dropped = tail.len(),
                                    "Discarding unterminated trailing line"
                                );
                            }
                        }
                    }
                    return complete(&session, handler);
                }
            }
        }
    }
}

/// Route one line. Returns the outcome when the line ends the session.
fn dispatch<H>(session: &StreamSession, line: &str, handler: &mut H) -> Option<SessionOutcome>
where
    H: StreamHandler + ?Sized,
{
    // An abort issued from inside a callback silences the rest of the chunk.
    if session.is_cancelled() {
        return Some(finish(session, SessionOutcome::Aborted));
    }

    match classify(line) {
        StreamEvent::Data(payload) => {
            handler.on_message(payload);
            None
        }
        StreamEvent::Terminal => Some(complete(session, handler)),
        StreamEvent::Noise => None,
    }
}

fn complete<H>(session: &StreamSession, handler: &mut H) -> SessionOutcome
where
    H: StreamHandler + ?Sized,
{
    if !session.transition(ConnectionState::Completed) {
        // Aborted concurrently; stay silent.
        return SessionOutcome::Aborted;
    }
    tracing::debug!(session = %session.id(), "Stream complete");
    handler.on_complete();
    SessionOutcome::Completed
}

fn fail<H>(session: &StreamSession, handler: &mut H, error: StreamError) -> SessionOutcome
where
    H: StreamHandler + ?Sized,
{
    if !session.transition(ConnectionState::Errored) {
        return SessionOutcome::Aborted;
    }
    tracing::error!(session = %session.id(), code = error.error_code(), "SSE Error: {}", error);
    handler.on_error(error);
    SessionOutcome::Errored
}

fn finish(session: &StreamSession, outcome: SessionOutcome) -> SessionOutcome {
    session.transition(outcome.state());
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockHttpClient, MockResponse};
    use crate::traits::Response;
    use bytes::Bytes;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::sync::mpsc;

    const URL: &str = "http://test/chat/stream";

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Message(Value),
        Error(StreamError),
        Complete,
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
    }

    impl StreamHandler for Recorder {
        fn on_message(&mut self, payload: Value) {
            self.calls.push(Call::Message(payload));
        }
        fn on_error(&mut self, error: StreamError) {
            self.calls.push(Call::Error(error));
        }
        fn on_complete(&mut self) {
            self.calls.push(Call::Complete);
        }
    }

    /// Forwards every callback over a channel so tests can react mid-stream.
    struct Forwarder(mpsc::UnboundedSender<Call>);

    impl StreamHandler for Forwarder {
        fn on_message(&mut self, payload: Value) {
            let _ = self.0.send(Call::Message(payload));
        }
        fn on_error(&mut self, error: StreamError) {
            let _ = self.0.send(Call::Error(error));
        }
        fn on_complete(&mut self) {
            let _ = self.0.send(Call::Complete);
        }
    }

    fn chunks(parts: &[&str]) -> Vec<Bytes> {
        parts.iter().map(|p| Bytes::from(p.to_string())).collect()
    }

    fn body() -> Value {
        json!({"session_id": "s-1", "query": "hello"})
    }

    #[tokio::test]
    async fn test_messages_then_done_stops_reading() {
        let client = MockHttpClient::new();
        client.set_response(
            URL,
            MockResponse::Stream(chunks(&[
                "data: {\"x\":1}\n",
                "data: {\"x\":2}\n",
                "data: [DONE]\n",
                "data: {\"x\":3}\n",
                "data: {\"x\":4}\n",
            ])),
        );
        let handler = SseHandler::new(client.clone());
        let mut recorder = Recorder::default();

        let outcome = handler.connect(URL, &body(), &mut recorder).await;

        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(
            recorder.calls,
            vec![
                Call::Message(json!({"x": 1})),
                Call::Message(json!({"x": 2})),
                Call::Complete,
            ]
        );
        assert_eq!(client.chunks_read(), 3);
    }

    #[tokio::test]
    async fn test_request_shape() {
        let client = MockHttpClient::new();
        client.set_response(URL, MockResponse::Stream(chunks(&["data: [DONE]\n"])));
        let handler = SseHandler::new(client.clone());

        handler.connect(URL, &body(), &mut Recorder::default()).await;

        let requests = client.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].url, URL);
        assert_eq!(
            requests[0].headers.get("Content-Type"),
            Some(&"application/json".to_string())
        );
        assert_eq!(requests[0].json_body(), Some(body()));
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let client = MockHttpClient::new();
        client.set_response(
            URL,
            MockResponse::Stream(chunks(&["da", "ta: {\"te", "xt\":\"hi\"}\n\nda", "ta: [DO", "NE]\n"])),
        );
        let handler = SseHandler::new(client);
        let mut recorder = Recorder::default();

        let outcome = handler.connect(URL, &body(), &mut recorder).await;

        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(
            recorder.calls,
            vec![Call::Message(json!({"text": "hi"})), Call::Complete]
        );
    }

    #[tokio::test]
    async fn test_malformed_event_is_skipped() {
        let client = MockHttpClient::new();
        client.set_response(
            URL,
            MockResponse::Stream(chunks(&[
                "data: {\"x\":1}\ndata: not-json\n: ping\nevent: message\n",
                "data: {\"x\":2}\n",
            ])),
        );
        let handler = SseHandler::new(client);
        let mut recorder = Recorder::default();

        let outcome = handler.connect(URL, &body(), &mut recorder).await;

        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(
            recorder.calls,
            vec![
                Call::Message(json!({"x": 1})),
                Call::Message(json!({"x": 2})),
                Call::Complete,
            ]
        );
    }

    #[tokio::test]
    async fn test_transport_close_completes_once() {
        let client = MockHttpClient::new();
        client.set_response(URL, MockResponse::Stream(chunks(&["data: {\"x\":1}\n"])));
        let handler = SseHandler::new(client);
        let mut recorder = Recorder::default();

        let outcome = handler.connect(URL, &body(), &mut recorder).await;

        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(
            recorder.calls,
            vec![Call::Message(json!({"x": 1})), Call::Complete]
        );
    }

    #[tokio::test]
    async fn test_trailing_line_dropped_by_default() {
        let client = MockHttpClient::new();
        client.set_response(
            URL,
            MockResponse::Stream(chunks(&["data: {\"x\":1}\ndata: {\"x\":2}"])),
        );
        let handler = SseHandler::new(client);
        assert_eq!(handler.trailing_line(), TrailingLinePolicy::Drop);
        let mut recorder = Recorder::default();

        handler.connect(URL, &body(), &mut recorder).await;

        assert_eq!(
            recorder.calls,
            vec![Call::Message(json!({"x": 1})), Call::Complete]
        );
    }

    #[tokio::test]
    async fn test_trailing_line_flushed_when_configured() {
        let client = MockHttpClient::new();
        client.set_response(
            URL,
            MockResponse::Stream(chunks(&["data: {\"x\":1}\ndata: {\"x\":2}"])),
        );
        let handler = SseHandler::new(client).with_trailing_line(TrailingLinePolicy::Flush);
        let mut recorder = Recorder::default();

        handler.connect(URL, &body(), &mut recorder).await;

        assert_eq!(
            recorder.calls,
            vec![
                Call::Message(json!({"x": 1})),
                Call::Message(json!({"x": 2})),
                Call::Complete,
            ]
        );
    }

    #[tokio::test]
    async fn test_flushed_done_sentinel_completes_once() {
        let client = MockHttpClient::new();
        client.set_response(URL, MockResponse::Stream(chunks(&["data: [DONE]"])));
        let handler = SseHandler::new(client).with_trailing_line(TrailingLinePolicy::Flush);
        let mut recorder = Recorder::default();

        let outcome = handler.connect(URL, &body(), &mut recorder).await;

        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(recorder.calls, vec![Call::Complete]);
    }

    #[tokio::test]
    async fn test_non_success_status_errors_once() {
        let client = MockHttpClient::new();
        client.set_response(
            URL,
            MockResponse::Success(Response::new(503, Bytes::from("data: {\"x\":1}\n"))),
        );
        let handler = SseHandler::new(client.clone());
        let mut recorder = Recorder::default();

        let outcome = handler.connect(URL, &body(), &mut recorder).await;

        assert_eq!(outcome, SessionOutcome::Errored);
        assert_eq!(recorder.calls.len(), 1);
        match &recorder.calls[0] {
            Call::Error(StreamError::Transport(NetworkError::HttpStatus { status, .. })) => {
                assert_eq!(*status, 503)
            }
            other => panic!("Expected HTTP status error, got {:?}", other),
        }
        assert_eq!(client.chunks_read(), 0);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_errors_without_complete() {
        let client = MockHttpClient::new();
        client.set_response(
            URL,
            MockResponse::StreamThenError(
                chunks(&["data: {\"x\":1}\n"]),
                NetworkError::Io {
                    message: "connection reset".to_string(),
                },
            ),
        );
        let handler = SseHandler::new(client);
        let mut recorder = Recorder::default();

        let outcome = handler.connect(URL, &body(), &mut recorder).await;

        assert_eq!(outcome, SessionOutcome::Errored);
        assert_eq!(
            recorder.calls,
            vec![
                Call::Message(json!({"x": 1})),
                Call::Error(StreamError::Transport(NetworkError::Io {
                    message: "connection reset".to_string()
                })),
            ]
        );
    }

    #[tokio::test]
    async fn test_connect_failure_errors_once() {
        let client = MockHttpClient::new();
        client.set_response(
            URL,
            MockResponse::Error(NetworkError::ConnectionFailed {
                url: URL.to_string(),
                message: "refused".to_string(),
            }),
        );
        let handler = SseHandler::new(client);
        let mut recorder = Recorder::default();

        let outcome = handler.connect(URL, &body(), &mut recorder).await;

        assert_eq!(outcome, SessionOutcome::Errored);
        assert_eq!(recorder.calls.len(), 1);
        assert!(matches!(recorder.calls[0], Call::Error(_)));
    }

    #[tokio::test]
    async fn test_abort_mid_stream_is_silent() {
        let client = MockHttpClient::new();
        let tx = client.stream_channel(URL);
        let handler = Arc::new(SseHandler::new(client.clone()));
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();

        let task = {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let mut forwarder = Forwarder(events_tx);
                handler.connect(URL, &body(), &mut forwarder).await
            })
        };

        tx.send(Ok(Bytes::from("data: {\"x\":1}\n"))).unwrap();
        assert_eq!(
            events_rx.recv().await,
            Some(Call::Message(json!({"x": 1})))
        );

        let session = handler.current_session().expect("session should be active");
        assert_eq!(session.state(), ConnectionState::Streaming);

        handler.abort();
        let _ = tx.send(Ok(Bytes::from("data: {\"x\":2}\n")));

        let outcome = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("read loop did not stop")
            .unwrap();

        assert_eq!(outcome, SessionOutcome::Aborted);
        assert_eq!(session.state(), ConnectionState::Aborted);
        // Sender dropped with the forwarder: nothing else was delivered.
        assert_eq!(events_rx.recv().await, None);
        assert!(handler.current_session().is_none());
    }

    #[tokio::test]
    async fn test_abort_pending_stream() {
        let client = MockHttpClient::new();
        client.set_response(
            URL,
            MockResponse::StreamThenPending(chunks(&["data: {\"x\":1}\n"])),
        );
        let handler = SseHandler::new(client);
        let session = StreamSession::new();
        let abort = session.handle();

        let request_body = body();
        let mut recorder = Recorder::default();
        let (outcome, ()) = tokio::join!(
            handler.connect_session(session, URL, &request_body, &mut recorder),
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                abort.abort();
            }
        );

        assert_eq!(outcome, SessionOutcome::Aborted);
        assert_eq!(abort.state(), ConnectionState::Aborted);
    }

    #[tokio::test]
    async fn test_abort_before_connect_sends_nothing() {
        let client = MockHttpClient::new();
        client.set_response(URL, MockResponse::Stream(chunks(&["data: {\"x\":1}\n"])));
        let handler = SseHandler::new(client.clone());
        let session = StreamSession::new();
        session.handle().abort();
        let mut recorder = Recorder::default();

        let outcome = handler
            .connect_session(session, URL, &body(), &mut recorder)
            .await;

        assert_eq!(outcome, SessionOutcome::Aborted);
        assert!(recorder.calls.is_empty());
        assert!(client.get_requests().is_empty());
    }

    #[tokio::test]
    async fn test_abort_from_callback_stops_rest_of_chunk() {
        struct AbortOnFirst {
            handle: SessionHandle,
            seen: Vec<Value>,
        }

        impl StreamHandler for AbortOnFirst {
            fn on_message(&mut self, payload: Value) {
                self.seen.push(payload);
                self.handle.abort();
            }
            fn on_complete(&mut self) {
                panic!("aborted stream must not complete");
            }
        }

        let client = MockHttpClient::new();
        client.set_response(
            URL,
            MockResponse::Stream(chunks(&["data: {\"x\":1}\ndata: {\"x\":2}\ndata: [DONE]\n"])),
        );
        let handler = SseHandler::new(client);
        let session = StreamSession::new();
        let mut recorder = AbortOnFirst {
            handle: session.handle(),
            seen: Vec::new(),
        };

        let outcome = handler
            .connect_session(session, URL, &body(), &mut recorder)
            .await;

        assert_eq!(outcome, SessionOutcome::Aborted);
        assert_eq!(recorder.seen, vec![json!({"x": 1})]);
    }

    #[tokio::test]
    async fn test_abort_without_session_is_noop() {
        let handler = SseHandler::new(MockHttpClient::new());
        handler.abort();
        handler.abort();
        assert!(handler.current_session().is_none());
    }

    #[tokio::test]
    async fn test_second_connect_aborts_first() {
        let client = MockHttpClient::new();
        client.set_response(URL, MockResponse::StreamThenPending(Vec::new()));
        let other = "http://test/chat/other";
        client.set_response(other, MockResponse::Stream(chunks(&["data: [DONE]\n"])));
        let handler = Arc::new(SseHandler::new(client));

        let first = {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                handler
                    .connect(URL, &body(), &mut Recorder::default())
                    .await
            })
        };

        // Wait until the first connect has registered its session.
        let mut first_session = None;
        for _ in 0..100 {
            if let Some(session) = handler.current_session() {
                first_session = Some(session);
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let first_session = first_session.expect("first session never started");

        let mut recorder = Recorder::default();
        let second = handler.connect(other, &body(), &mut recorder).await;

        assert_eq!(second, SessionOutcome::Completed);
        assert_eq!(recorder.calls, vec![Call::Complete]);
        assert_eq!(first.await.unwrap(), SessionOutcome::Aborted);
        assert!(first_session.is_aborted());
    }

    #[tokio::test]
    async fn test_serialize_failure_reports_error() {
        use std::collections::HashMap;

        // Non-string map keys cannot be encoded as a JSON object.
        let mut bad: HashMap<(u8, u8), u8> = HashMap::new();
        bad.insert((1, 2), 3);

        let client = MockHttpClient::new();
        let handler = SseHandler::new(client.clone());
        let mut recorder = Recorder::default();

        let outcome = handler.connect(URL, &bad, &mut recorder).await;

        assert_eq!(outcome, SessionOutcome::Errored);
        assert!(matches!(
            recorder.calls.as_slice(),
            [Call::Error(StreamError::Serialize { .. })]
        ));
        assert!(client.get_requests().is_empty());
    }
}
