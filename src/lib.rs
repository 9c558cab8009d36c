//! ragchat - client for a retrieval-augmented chat service.
//!
//! Builds RAG sessions from a source URL, sends chat queries over JSON/HTTP
//! and consumes streamed answers over server-sent events.
//!
//! This library exposes modules for use by the binary and integration tests.

pub mod adapters;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod sse;
pub mod state;
pub mod store;
pub mod traits;
pub mod validation;
