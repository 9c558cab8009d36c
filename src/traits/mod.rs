//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - HTTP client operations (GET, POST, streaming POST)
//! - [`StreamHandler`] - Callbacks fired while consuming an SSE stream

pub mod http;
pub mod sse;

pub use http::{event_stream_headers, json_headers, ByteStream, Headers, HttpClient, Response};
pub use sse::{Callbacks, StreamHandler};
