//! Common test utilities for integration tests.
//!
//! # Example
//!
//! ```ignore
//! let server = MockServer::start().await;
//! let api = api_for(&server);
//! ```

#![allow(dead_code)]

use std::time::Duration;

use ragchat::adapters::ReqwestHttpClient;
use ragchat::api::RagApiClient;
use ragchat::config::ClientConfig;
use ragchat::error::StreamError;
use ragchat::traits::StreamHandler;
use serde_json::Value;
use wiremock::MockServer;

/// Config pointing at a wiremock server with fast polling.
pub fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::new()
        .with_base_url(server.uri())
        .with_poll_interval(Duration::from_millis(5))
        .with_max_poll_attempts(5)
}

/// A real reqwest-backed client pointing at a wiremock server.
pub fn api_for(server: &MockServer) -> RagApiClient<ReqwestHttpClient> {
    RagApiClient::new(ReqwestHttpClient::new(), config_for(server))
}

/// An SSE body with one `data:` line per payload.
pub fn sse_body(payloads: &[&str]) -> String {
    payloads
        .iter()
        .map(|p| format!("data: {}\n", p))
        .collect()
}

/// Callback recorded by [`RecordingHandler`].
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Message(Value),
    Error(StreamError),
    Complete,
}

/// Stream handler that records every callback in order.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub events: Vec<Recorded>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Value> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Recorded::Message(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<StreamError> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Recorded::Error(err) => Some(err.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn completions(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Recorded::Complete))
            .count()
    }
}

impl StreamHandler for RecordingHandler {
    fn on_message(&mut self, payload: Value) {
        self.events.push(Recorded::Message(payload));
    }

    fn on_error(&mut self, error: StreamError) {
        self.events.push(Recorded::Error(error));
    }

    fn on_complete(&mut self) {
        self.events.push(Recorded::Complete);
    }
}
