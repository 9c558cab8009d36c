//! Mock HTTP client for testing.
//!
//! Provides a configurable mock HTTP client that can return predefined
//! responses, chunked streams, or errors for testing purposes.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::error::NetworkError;
use crate::traits::{ByteStream, Headers, HttpClient, Response};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method (GET or POST)
    pub method: String,
    /// Request URL
    pub url: String,
    /// Request headers
    pub headers: Headers,
    /// Request body (for POST requests)
    pub body: Option<String>,
}

impl RecordedRequest {
    /// Parse the recorded body as JSON.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_str(b).ok())
    }
}

type ChunkReceiver = mpsc::UnboundedReceiver<Result<Bytes, NetworkError>>;

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a buffered response
    Success(Response),
    /// Return an error
    Error(NetworkError),
    /// Return a stream of bytes that ends after the last chunk
    Stream(Vec<Bytes>),
    /// Return the chunks, then fail the stream with the error
    StreamThenError(Vec<Bytes>, NetworkError),
    /// Return the chunks, then never yield again
    StreamThenPending(Vec<Bytes>),
    /// Stream whatever is pushed through the sender from [`MockHttpClient::stream_channel`]
    Channel(Arc<Mutex<Option<ChunkReceiver>>>),
}

/// Mock HTTP client for testing.
///
/// Responses are matched by exact URL first, then by URL prefix, then the
/// default response. Clones share configuration and recorded requests.
///
/// # Example
///
/// ```ignore
/// use ragchat::adapters::mock::{MockHttpClient, MockResponse};
///
/// let client = MockHttpClient::new();
/// client.set_response(
///     "http://test/chat/stream",
///     MockResponse::Stream(vec![Bytes::from("data: {\"x\":1}\n")]),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct MockHttpClient {
    /// Configured responses by URL pattern
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    /// Default response when no specific match
    default_response: Arc<Mutex<Option<MockResponse>>>,
    /// Recorded requests for verification
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    /// Chunks pulled out of streaming responses so far
    chunks_read: Arc<AtomicUsize>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            default_response: Arc::new(Mutex::new(None)),
            requests: Arc::new(Mutex::new(Vec::new())),
            chunks_read: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set a response for a URL (exact or prefix match).
    pub fn set_response(&self, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses.insert(url.to_string(), response);
    }

    /// Set a JSON success response for a URL.
    pub fn set_json(&self, url: &str, status: u16, value: serde_json::Value) {
        self.set_response(url, MockResponse::Success(Response::json_body(status, &value)));
    }

    /// Set a default response for URLs without specific matches.
    pub fn set_default_response(&self, response: MockResponse) {
        let mut default = self.default_response.lock().unwrap();
        *default = Some(response);
    }

    /// Serve `url` as a stream fed through the returned sender.
    ///
    /// The stream ends when the sender is dropped.
    pub fn stream_channel(
        &self,
        url: &str,
    ) -> mpsc::UnboundedSender<Result<Bytes, NetworkError>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.set_response(url, MockResponse::Channel(Arc::new(Mutex::new(Some(rx)))));
        tx
    }

    /// Get all recorded requests.
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Clear all recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    /// Number of chunks consumers have pulled from streaming responses.
    pub fn chunks_read(&self) -> usize {
        self.chunks_read.load(Ordering::SeqCst)
    }

    /// Record a request.
    fn record_request(&self, method: &str, url: &str, headers: &Headers, body: Option<String>) {
        let mut requests = self.requests.lock().unwrap();
        requests.push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
            body,
        });
    }

    /// Get the response for a URL.
    fn get_response(&self, url: &str) -> Option<MockResponse> {
        let responses = self.responses.lock().unwrap();

        if let Some(response) = responses.get(url) {
            return Some(response.clone());
        }

        // Longest prefix wins so nested paths can be configured separately.
        let prefix_match = responses
            .iter()
            .filter(|(pattern, _)| url.starts_with(pattern.as_str()))
            .max_by_key(|(pattern, _)| pattern.len())
            .map(|(_, response)| response.clone());
        if prefix_match.is_some() {
            return prefix_match;
        }

        let default = self.default_response.lock().unwrap();
        default.clone()
    }

    fn buffered_response(&self, url: &str) -> Result<Response, NetworkError> {
        match self.get_response(url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Error(err)) => Err(err),
            Some(_) => Err(NetworkError::Other {
                message: "Stream response on non-stream request".to_string(),
            }),
            None => Err(NetworkError::Other {
                message: format!("No mock response for URL: {}", url),
            }),
        }
    }

    fn counted(&self, stream: ByteStream) -> ByteStream {
        let counter = Arc::clone(&self.chunks_read);
        Box::pin(stream.inspect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

impl Default for MockHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, NetworkError> {
        self.record_request("GET", url, headers, None);
        self.buffered_response(url)
    }

    async fn post(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<Response, NetworkError> {
        self.record_request("POST", url, headers, Some(body.to_string()));
        self.buffered_response(url)
    }

    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, NetworkError> {
        self.record_request("POST", url, headers, Some(body.to_string()));

        let stream: ByteStream = match self.get_response(url) {
            Some(MockResponse::Stream(chunks)) => {
                Box::pin(futures::stream::iter(chunks.into_iter().map(Ok)))
            }
            Some(MockResponse::StreamThenError(chunks, err)) => Box::pin(
                futures::stream::iter(chunks.into_iter().map(Ok))
                    .chain(futures::stream::once(async move { Err(err) })),
            ),
            Some(MockResponse::StreamThenPending(chunks)) => Box::pin(
                futures::stream::iter(chunks.into_iter().map(Ok))
                    .chain(futures::stream::pending()),
            ),
            Some(MockResponse::Channel(slot)) => {
                let receiver = slot.lock().unwrap().take().ok_or_else(|| NetworkError::Other {
                    message: "Mock stream channel already consumed".to_string(),
                })?;
                Box::pin(futures::stream::unfold(receiver, |mut rx| async move {
                    rx.recv().await.map(|item| (item, rx))
                }))
            }
            Some(MockResponse::Success(response)) => {
                // Mirror the production adapter: non-2xx never yields a body.
                if !response.is_success() {
                    return Err(NetworkError::status(response.status, response.text()));
                }
                Box::pin(futures::stream::iter(vec![Ok(response.body)]))
            }
            Some(MockResponse::Error(err)) => return Err(err),
            None => {
                return Err(NetworkError::Other {
                    message: format!("No mock response for URL: {}", url),
                })
            }
        };

        Ok(self.counted(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_http_client_new() {
        let client = MockHttpClient::new();
        assert!(client.get_requests().is_empty());
        assert_eq!(client.chunks_read(), 0);
    }

    #[tokio::test]
    async fn test_get_with_response() {
        let client = MockHttpClient::new();
        client.set_response(
            "https://example.com/test",
            MockResponse::Success(Response::new(200, Bytes::from("Hello"))),
        );

        let response = client
            .get("https://example.com/test", &Headers::new())
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, Bytes::from("Hello"));

        let requests = client.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].url, "https://example.com/test");
    }

    #[tokio::test]
    async fn test_post_records_body() {
        let client = MockHttpClient::new();
        client.set_json("https://example.com/api", 200, serde_json::json!({"id": 1}));

        client
            .post("https://example.com/api", r#"{"name":"test"}"#, &Headers::new())
            .await
            .unwrap();

        let requests = client.get_requests();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(
            requests[0].json_body(),
            Some(serde_json::json!({"name": "test"}))
        );
    }

    #[tokio::test]
    async fn test_post_stream_with_chunks() {
        let client = MockHttpClient::new();
        client.set_response(
            "https://example.com/stream",
            MockResponse::Stream(vec![Bytes::from("chunk1"), Bytes::from("chunk2")]),
        );

        let mut stream = client
            .post_stream("https://example.com/stream", "{}", &Headers::new())
            .await
            .unwrap();

        let mut chunks = Vec::new();
        while let Some(result) = stream.next().await {
            chunks.push(result.unwrap());
        }

        assert_eq!(chunks, vec![Bytes::from("chunk1"), Bytes::from("chunk2")]);
        assert_eq!(client.chunks_read(), 2);
    }

    #[tokio::test]
    async fn test_post_stream_then_error() {
        let client = MockHttpClient::new();
        client.set_response(
            "https://example.com/stream",
            MockResponse::StreamThenError(
                vec![Bytes::from("one")],
                NetworkError::Io {
                    message: "reset".to_string(),
                },
            ),
        );

        let mut stream = client
            .post_stream("https://example.com/stream", "{}", &Headers::new())
            .await
            .unwrap();

        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_post_stream_non_success_status() {
        let client = MockHttpClient::new();
        client.set_response(
            "https://example.com/stream",
            MockResponse::Success(Response::new(500, Bytes::from("boom"))),
        );

        let result = client
            .post_stream("https://example.com/stream", "{}", &Headers::new())
            .await;
        assert!(matches!(
            result,
            Err(NetworkError::HttpStatus { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_stream_channel() {
        let client = MockHttpClient::new();
        let tx = client.stream_channel("https://example.com/stream");

        let mut stream = client
            .post_stream("https://example.com/stream", "{}", &Headers::new())
            .await
            .unwrap();

        tx.send(Ok(Bytes::from("a"))).unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), Bytes::from("a"));
        drop(tx);
        assert!(stream.next().await.is_none());

        // The channel can only back one stream.
        let again = client
            .post_stream("https://example.com/stream", "{}", &Headers::new())
            .await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn test_no_response_configured() {
        let client = MockHttpClient::new();

        let result = client
            .get("https://example.com/missing", &Headers::new())
            .await;

        assert!(matches!(result, Err(NetworkError::Other { .. })));
    }

    #[tokio::test]
    async fn test_longest_prefix_match() {
        let client = MockHttpClient::new();
        client.set_json("https://example.com/rag", 200, serde_json::json!({"a": 1}));
        client.set_json(
            "https://example.com/rag/abc",
            200,
            serde_json::json!({"b": 2}),
        );

        let response = client
            .get("https://example.com/rag/abc/status", &Headers::new())
            .await
            .unwrap();
        assert_eq!(response.text(), r#"{"b":2}"#);
    }

    #[tokio::test]
    async fn test_clone_shares_requests() {
        let client = MockHttpClient::new();
        client.set_default_response(MockResponse::Success(Response::new(200, Bytes::new())));

        let cloned = client.clone();
        cloned.get("https://example.com", &Headers::new()).await.unwrap();

        assert_eq!(client.get_requests().len(), 1);
        assert_eq!(cloned.get_requests().len(), 1);
    }
}
